//! Game records and player addresses.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::game::Move;

/// A player's address (20 bytes), the identity wagers settle to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(#[serde(with = "addr_serde")] [u8; 20]);

mod addr_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 20], s: S) -> Result<S::Ok, S::Error> {
        hex::encode(bytes).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 20], D::Error> {
        let hex_str = String::deserialize(d)?;
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(&hex_str, &mut bytes).map_err(serde::de::Error::custom)?;
        Ok(bytes)
    }
}

impl Address {
    /// Generate a random address.
    pub fn random() -> Self {
        let mut bytes = [0u8; 20];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

/// Lifecycle of an escrowed game.
///
/// `Open -> Joined -> Resolved` is the normal path. `Reclaimed` is reached
/// from `Open` when no opponent showed up, or from `Joined` when the creator
/// never revealed. `Resolved` and `Reclaimed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    Open,
    Joined,
    Resolved,
    Reclaimed,
}

/// One wagered game held in escrow.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Game {
    pub creator: Address,
    pub opponent: Address,
    pub wager: u64,
    /// The opponent's move, `Unset` until the game is joined. The creator's
    /// move exists only inside the commitment until the reveal.
    pub opponent_move: Move,
    pub state: GameState,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Expiry window chosen at creation, re-armed for the reveal phase.
    pub window_minutes: i64,
}

impl Game {
    /// Open a fresh game record with the expiry window armed.
    pub fn open(
        creator: Address,
        opponent: Address,
        wager: u64,
        window_minutes: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            creator,
            opponent,
            wager,
            opponent_move: Move::Unset,
            state: GameState::Open,
            created_at: now,
            expires_at: Self::deadline(now, window_minutes),
            window_minutes,
        }
    }

    /// `now + window`, clamped to the calendar's edge for windows the
    /// calendar cannot hold.
    fn deadline(now: DateTime<Utc>, window_minutes: i64) -> DateTime<Utc> {
        Duration::try_minutes(window_minutes)
            .and_then(|window| now.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Re-arm the expiry to a fresh window from `now`, opening the reveal
    /// phase after a join.
    pub fn rearm_expiry(&mut self, now: DateTime<Utc>) {
        self.expires_at = Self::deadline(now, self.window_minutes);
    }

    /// A game expires the instant `now` reaches the deadline.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Funds currently held in escrow for this game. Settled and reclaimed
    /// games hold nothing; their funds have moved to the balance ledger.
    pub fn escrowed(&self) -> u64 {
        match self.state {
            GameState::Open => self.wager,
            GameState::Joined => self.wager.saturating_mul(2),
            GameState::Resolved | GameState::Reclaimed => 0,
        }
    }
}
