//! Game domain types: moves, outcomes, and the escrowed game record.

mod moves;
mod record;

pub use moves::{judge, Move, Outcome};
pub use record::{Address, Game, GameState};
