//! Move commitments.
//!
//! A game is keyed by the SHA-256 hash of the creator's move and a secret
//! password. Publishing the hash commits the creator to the move without
//! revealing it; the reveal is checked by recomputing the hash.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::EscrowError;
use crate::game::Move;

/// Secret password mixed into a commitment (32 bytes).
///
/// The all-zero value is a sentinel and never accepted as a real password.
#[derive(Clone, Serialize, Deserialize)]
pub struct Password([u8; 32]);

impl Password {
    /// Generate a random password.
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Derive a password from a human-chosen phrase.
    pub fn from_phrase(phrase: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(phrase.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub(crate) fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Password({})", hex::encode(&self.0[..8]))
    }
}

/// Identifier of a game: `SHA-256(move bytes || password bytes)`.
///
/// The id doubles as the creator's commitment. Once a game exists under an
/// id the id stays taken forever, whatever state the game reaches.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameId(#[serde(with = "digest_serde")] [u8; 32]);

mod digest_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        hex::encode(bytes).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let hex_str = String::deserialize(d)?;
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&hex_str, &mut bytes).map_err(serde::de::Error::custom)?;
        Ok(bytes)
    }
}

impl GameId {
    /// Compute the commitment for a move and password.
    ///
    /// Rejects the `Unset` move and the zero password, so a well-formed id
    /// always binds a playable move.
    pub fn commit(mv: Move, password: &Password) -> Result<Self, EscrowError> {
        if !mv.is_set() {
            return Err(EscrowError::InvalidMove);
        }
        if password.is_zero() {
            return Err(EscrowError::InvalidPassword);
        }
        let mut hasher = Sha256::new();
        hasher.update(mv.to_bytes());
        hasher.update(password.as_bytes());
        Ok(Self(hasher.finalize().into()))
    }

    /// Check whether a move and password reproduce this id.
    pub fn verify(&self, mv: Move, password: &Password) -> bool {
        match Self::commit(mv, password) {
            Ok(id) => id == *self,
            Err(_) => false,
        }
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl fmt::Debug for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GameId({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for GameId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}
