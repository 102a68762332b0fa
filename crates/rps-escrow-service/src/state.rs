//! Application state management.
//!
//! Simulates the ledger environment around the escrow engine: named player
//! identities, a bank of spendable funds per address, and the engine's own
//! custody behind it. Opening or joining a game debits the caller's bank
//! funds in the same lock as the engine call; if the engine refuses, the
//! debit is refunded before the lock is released, so a failed operation
//! never strands funds.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use thiserror::Error;

use rps_escrow_core::{
    Address, EscrowEngine, EscrowError, EscrowEvent, Game, GameId, Move, Password,
};

/// Funds handed to every newly registered player.
pub const STARTING_FUNDS: u64 = 1_000;

/// Failures at the environment boundary, on top of engine errors.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("player name already taken")]
    NameTaken,

    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error(transparent)]
    Engine(#[from] EscrowError),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Mutex<AppStateInner>>,
}

struct AppStateInner {
    engine: EscrowEngine,
    /// Spendable funds outside escrow, per player.
    bank: HashMap<Address, u64>,
    /// Registered display names.
    players: HashMap<String, Address>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(AppStateInner {
                engine: EscrowEngine::new(),
                bank: HashMap::new(),
                players: HashMap::new(),
            })),
        }
    }

    // Player operations

    /// Register a player under a fresh address and seed their bank funds.
    pub fn register_player(&self, name: String) -> Result<Address, EnvError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.players.contains_key(&name) {
            return Err(EnvError::NameTaken);
        }

        let address = Address::random();
        inner.players.insert(name, address);
        inner.bank.insert(address, STARTING_FUNDS);
        Ok(address)
    }

    pub fn list_players(&self) -> Vec<(String, Address)> {
        let inner = self.inner.lock().unwrap();
        let mut players: Vec<(String, Address)> = inner
            .players
            .iter()
            .map(|(name, address)| (name.clone(), *address))
            .collect();
        players.sort_by(|a, b| a.0.cmp(&b.0));
        players
    }

    /// Spendable funds outside escrow.
    pub fn bank_balance(&self, address: Address) -> u64 {
        self.inner
            .lock()
            .unwrap()
            .bank
            .get(&address)
            .copied()
            .unwrap_or(0)
    }

    /// Settled winnings waiting inside the engine's ledger.
    pub fn escrow_balance(&self, address: Address) -> u64 {
        self.inner.lock().unwrap().engine.balance_of(address)
    }

    // Game operations

    pub fn open_game(
        &self,
        game_id: GameId,
        opponent: Address,
        wager: u64,
        expiry_minutes: i64,
        creator: Address,
    ) -> Result<Game, EnvError> {
        let mut inner = self.inner.lock().unwrap();
        inner.debit(creator, wager)?;

        let result = inner
            .engine
            .open_game(game_id, opponent, wager, expiry_minutes, creator)
            .map(Game::clone);
        if result.is_err() {
            inner.refund(creator, wager);
        }
        Ok(result?)
    }

    pub fn join_game(
        &self,
        game_id: GameId,
        mv: Move,
        wager: u64,
        joiner: Address,
    ) -> Result<(), EnvError> {
        let mut inner = self.inner.lock().unwrap();
        inner.debit(joiner, wager)?;

        let result = inner.engine.join_game(game_id, mv, wager, joiner);
        if result.is_err() {
            inner.refund(joiner, wager);
        }
        Ok(result?)
    }

    pub fn resolve(
        &self,
        game_id: GameId,
        mv: Move,
        password: &Password,
        revealer: Address,
    ) -> Result<Option<Address>, EnvError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.engine.resolve(game_id, mv, password, revealer)?)
    }

    /// Reclaim an expired, never-joined game. Returns the amount credited.
    pub fn reclaim_no_opponent(
        &self,
        game_id: GameId,
        claimant: Address,
    ) -> Result<u64, EnvError> {
        let mut inner = self.inner.lock().unwrap();
        let pot = inner.engine.game(game_id).map(Game::escrowed).unwrap_or(0);
        inner.engine.reclaim_no_opponent(game_id, claimant)?;
        Ok(pot)
    }

    /// Claim the pot of a joined game whose creator never revealed.
    pub fn reclaim_no_reveal(
        &self,
        game_id: GameId,
        claimant: Address,
    ) -> Result<u64, EnvError> {
        let mut inner = self.inner.lock().unwrap();
        let pot = inner.engine.game(game_id).map(Game::escrowed).unwrap_or(0);
        inner.engine.reclaim_no_reveal(game_id, claimant)?;
        Ok(pot)
    }

    /// Move the caller's settled winnings from the engine ledger back into
    /// their spendable bank funds.
    pub fn withdraw(&self, caller: Address) -> Result<u64, EnvError> {
        let mut inner = self.inner.lock().unwrap();
        let amount = inner.engine.withdraw(caller)?;
        inner.refund(caller, amount);
        Ok(amount)
    }

    pub fn game(&self, game_id: GameId) -> Option<Game> {
        self.inner.lock().unwrap().engine.game(game_id).cloned()
    }

    pub fn list_games(&self) -> Vec<(GameId, Game)> {
        let inner = self.inner.lock().unwrap();
        let mut games: Vec<(GameId, Game)> = inner
            .engine
            .games()
            .map(|(id, game)| (*id, game.clone()))
            .collect();
        games.sort_by_key(|(_, game)| game.created_at);
        games
    }

    pub fn events(&self) -> Vec<EscrowEvent> {
        self.inner.lock().unwrap().engine.events().to_vec()
    }

    // System operations

    /// Current time (real or simulated).
    pub fn now(&self) -> DateTime<Utc> {
        self.inner.lock().unwrap().engine.now()
    }

    /// Advance simulated time by seconds.
    pub fn advance_time(&self, seconds: i64) {
        self.inner.lock().unwrap().engine.advance_time(seconds);
    }
}

impl AppStateInner {
    fn debit(&mut self, address: Address, amount: u64) -> Result<(), EnvError> {
        let available = self.bank.get(&address).copied().unwrap_or(0);
        if available < amount {
            return Err(EnvError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        self.bank.insert(address, available - amount);
        Ok(())
    }

    fn refund(&mut self, address: Address, amount: u64) {
        let funds = self.bank.entry(address).or_insert(0);
        *funds = funds.saturating_add(amount);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
