//! Error types for the escrow engine.

use thiserror::Error;

use crate::crypto::GameId;

/// Everything that can go wrong while creating, joining, or settling a game.
///
/// Every rejected operation leaves the engine untouched: no game record,
/// ledger entry, or event is written on the error path.
#[derive(Debug, Error)]
pub enum EscrowError {
    #[error("move is not a playable move")]
    InvalidMove,

    #[error("password must not be the zero sentinel")]
    InvalidPassword,

    #[error("commitment must not be the zero sentinel")]
    InvalidCommitment,

    #[error("wager must be greater than zero")]
    InsufficientWager,

    #[error("expiry window must be positive and at most a year")]
    InvalidExpiry,

    #[error("attached wager {attached} does not match the game's wager {expected}")]
    WagerMismatch { expected: u64, attached: u64 },

    #[error("caller is not the designated opponent")]
    NotDesignatedOpponent,

    #[error("caller is not the game's creator")]
    NotCreator,

    #[error("creator cannot name themselves as the opponent")]
    SelfPlay,

    #[error("commitment already used by another game: {0}")]
    DuplicateCommitment(GameId),

    #[error("game not found: {0}")]
    GameNotFound(GameId),

    #[error("game is no longer open to a join")]
    AlreadyJoined,

    #[error("game is not awaiting a reveal")]
    GameNotJoined,

    #[error("game expired")]
    GameExpired,

    #[error("game has not expired yet")]
    NotExpired,

    #[error("move and password do not reproduce the game's commitment")]
    HashMismatch,

    #[error("no balance to withdraw")]
    NothingToWithdraw,
}
