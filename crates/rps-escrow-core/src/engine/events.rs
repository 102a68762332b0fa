//! Settlement events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::GameId;
use crate::game::{Address, Move};

/// Events appended by the engine as games are created, joined, and settled.
///
/// The log is append-only and ordered; an observer replaying it sees every
/// state transition and every coin movement exactly once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EscrowEvent {
    GameCreated {
        game_id: GameId,
        creator: Address,
        opponent: Address,
        wager: u64,
        expires_at: DateTime<Utc>,
    },
    GameJoined {
        game_id: GameId,
        opponent: Address,
        #[serde(rename = "move")]
        mv: Move,
    },
    /// `winner` is `None` for a tie.
    GameResult {
        game_id: GameId,
        winner: Option<Address>,
    },
    GameReclaimed {
        game_id: GameId,
        claimant: Address,
        amount: u64,
    },
    BalanceWithdrawn {
        address: Address,
        amount: u64,
    },
}
