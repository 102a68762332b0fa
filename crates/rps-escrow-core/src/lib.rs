//! RPS Escrow Core Library
//!
//! This crate provides the commit-reveal primitives, game records, and the
//! escrow engine for wagered two-player rock-paper-scissors.
//!
//! A creator commits to a move by publishing `GameId::commit(move, password)`
//! together with a wager; the designated opponent joins with an open move and
//! an equal wager; the creator reveals to settle. Winnings accumulate in a
//! pull-payment ledger and are withdrawn in a separate step. Expiry timeouts
//! let the creator reclaim an ignored game and the opponent claim the pot of
//! an unrevealed one.

pub mod crypto;
pub mod engine;
pub mod error;
pub mod game;

pub use crypto::{GameId, Password};
pub use engine::{
    BalanceLedger, Clock, EscrowEngine, EscrowEvent, GameRegistry, MAX_WINDOW_MINUTES,
};
pub use error::EscrowError;
pub use game::{judge, Address, Game, GameState, Move, Outcome};
