//! Game storage keyed by commitment.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::crypto::GameId;
use crate::error::EscrowError;
use crate::game::Game;

/// All games ever created, keyed by their commitment id.
///
/// Records are never evicted. A finished game keeps occupying its id, which
/// is what makes a commitment single-use: replaying the same move and
/// password can never open a second game.
#[derive(Clone, Debug, Default)]
pub struct GameRegistry {
    games: HashMap<GameId, Game>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh game under its id, refusing ids that are already taken.
    pub fn create(&mut self, game_id: GameId, game: Game) -> Result<(), EscrowError> {
        match self.games.entry(game_id) {
            Entry::Occupied(_) => Err(EscrowError::DuplicateCommitment(game_id)),
            Entry::Vacant(slot) => {
                slot.insert(game);
                Ok(())
            }
        }
    }

    pub fn get(&self, game_id: GameId) -> Result<&Game, EscrowError> {
        self.games
            .get(&game_id)
            .ok_or(EscrowError::GameNotFound(game_id))
    }

    pub fn get_mut(&mut self, game_id: GameId) -> Result<&mut Game, EscrowError> {
        self.games
            .get_mut(&game_id)
            .ok_or(EscrowError::GameNotFound(game_id))
    }

    /// Lookup that treats a missing game as an ordinary `None`.
    pub fn find(&self, game_id: GameId) -> Option<&Game> {
        self.games.get(&game_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GameId, &Game)> {
        self.games.iter()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}
