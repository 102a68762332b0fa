//! Rock-paper-scissors moves and duel judging.

use serde::{Deserialize, Serialize};

/// A player's move.
///
/// `Unset` is the sentinel a game record carries before the opponent has
/// played. It is never accepted from a caller and never hashes into a
/// commitment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Move {
    #[default]
    Unset = 0,
    Rock = 1,
    Paper = 2,
    Scissors = 3,
}

impl Move {
    /// Whether this is a playable move rather than the sentinel.
    pub fn is_set(&self) -> bool {
        !matches!(self, Move::Unset)
    }

    /// Stable byte encoding used when hashing a commitment.
    pub fn to_bytes(&self) -> &'static [u8] {
        match self {
            Move::Unset => b"",
            Move::Rock => b"Rock",
            Move::Paper => b"Paper",
            Move::Scissors => b"Scissors",
        }
    }

    /// Whether this move beats the other under the classic cycle.
    pub fn beats(&self, other: &Move) -> bool {
        matches!(
            (self, other),
            (Move::Rock, Move::Scissors)
                | (Move::Scissors, Move::Paper)
                | (Move::Paper, Move::Rock)
        )
    }
}

/// Outcome of a duel between the creator's and the opponent's moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    CreatorWins,
    OpponentWins,
    Tie,
}

/// Judge a duel. Both moves must be playable; identical moves tie.
pub fn judge(creator: Move, opponent: Move) -> Outcome {
    debug_assert!(creator.is_set() && opponent.is_set());
    if creator == opponent {
        Outcome::Tie
    } else if creator.beats(&opponent) {
        Outcome::CreatorWins
    } else {
        Outcome::OpponentWins
    }
}
