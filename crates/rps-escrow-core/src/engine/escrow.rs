//! The escrow and settlement engine.
//!
//! One engine instance owns every game record, the balance ledger, the event
//! log, and the clock. All operations take `&mut self` and run as a single
//! atomic step: every precondition is checked before the first mutation, so
//! a failed call leaves no trace. Serialization is the caller's concern; the
//! hosting service wraps the engine in a mutex, tests drive it directly.

use chrono::{DateTime, Utc};

use crate::crypto::{GameId, Password};
use crate::engine::{BalanceLedger, Clock, EscrowEvent, GameRegistry};
use crate::error::EscrowError;
use crate::game::{judge, Address, Game, GameState, Move, Outcome};

/// Longest accepted expiry window, one year in minutes. Windows beyond the
/// cap would push deadlines toward the edge of the representable time range.
pub const MAX_WINDOW_MINUTES: i64 = 60 * 24 * 365;

/// Escrowed rock-paper-scissors over commit-reveal.
///
/// The creator publishes `GameId::commit(move, password)` together with a
/// wager; the opponent joins with an open move and a matching wager; the
/// creator then reveals to settle. Timeouts let either side recover funds
/// when the other walks away.
#[derive(Debug, Default)]
pub struct EscrowEngine {
    games: GameRegistry,
    ledger: BalanceLedger,
    events: Vec<EscrowEvent>,
    clock: Clock,
}

impl EscrowEngine {
    /// Engine on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Clock::system())
    }

    /// Engine on a caller-supplied clock, for tests and demos.
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            clock,
            ..Self::default()
        }
    }

    /// Open a game under a previously computed commitment.
    ///
    /// The caller has already paid `wager` into custody; the engine records
    /// the debt. The id must be fresh: commitments are single-use forever.
    pub fn open_game(
        &mut self,
        game_id: GameId,
        opponent: Address,
        wager: u64,
        expiry_minutes: i64,
        creator: Address,
    ) -> Result<&Game, EscrowError> {
        if wager == 0 {
            return Err(EscrowError::InsufficientWager);
        }
        if expiry_minutes < 1 || expiry_minutes > MAX_WINDOW_MINUTES {
            return Err(EscrowError::InvalidExpiry);
        }
        if game_id.is_zero() {
            return Err(EscrowError::InvalidCommitment);
        }
        if opponent == creator {
            return Err(EscrowError::SelfPlay);
        }

        let now = self.clock.now();
        let game = Game::open(creator, opponent, wager, expiry_minutes, now);
        let expires_at = game.expires_at;
        self.games.create(game_id, game)?;

        self.events.push(EscrowEvent::GameCreated {
            game_id,
            creator,
            opponent,
            wager,
            expires_at,
        });
        self.games.get(game_id)
    }

    /// Join an open game as its designated opponent.
    ///
    /// The join re-arms the expiry to `now + the game's window`, opening a
    /// full reveal phase for the creator.
    pub fn join_game(
        &mut self,
        game_id: GameId,
        mv: Move,
        wager: u64,
        joiner: Address,
    ) -> Result<(), EscrowError> {
        let now = self.clock.now();
        let game = self.games.get_mut(game_id)?;

        if game.state != GameState::Open {
            return Err(EscrowError::AlreadyJoined);
        }
        if game.is_expired(now) {
            return Err(EscrowError::GameExpired);
        }
        if joiner != game.opponent {
            return Err(EscrowError::NotDesignatedOpponent);
        }
        if !mv.is_set() {
            return Err(EscrowError::InvalidMove);
        }
        if wager != game.wager {
            return Err(EscrowError::WagerMismatch {
                expected: game.wager,
                attached: wager,
            });
        }

        game.opponent_move = mv;
        game.state = GameState::Joined;
        game.rearm_expiry(now);

        self.events.push(EscrowEvent::GameJoined {
            game_id,
            opponent: joiner,
            mv,
        });
        Ok(())
    }

    /// Reveal the committed move and settle the game.
    ///
    /// The reveal must reproduce the game id from the move and password.
    /// Returns the winner's address, or `None` for a tie. A win credits the
    /// winner with twice the wager; a tie returns each player their stake.
    pub fn resolve(
        &mut self,
        game_id: GameId,
        mv: Move,
        password: &Password,
        revealer: Address,
    ) -> Result<Option<Address>, EscrowError> {
        let now = self.clock.now();
        let game = self.games.get_mut(game_id)?;

        if game.state != GameState::Joined {
            return Err(EscrowError::GameNotJoined);
        }
        if game.is_expired(now) {
            return Err(EscrowError::GameExpired);
        }
        if revealer != game.creator {
            return Err(EscrowError::NotCreator);
        }
        if GameId::commit(mv, password)? != game_id {
            return Err(EscrowError::HashMismatch);
        }

        game.state = GameState::Resolved;
        let creator = game.creator;
        let opponent = game.opponent;
        let wager = game.wager;
        let opponent_move = game.opponent_move;

        let winner = match judge(mv, opponent_move) {
            Outcome::CreatorWins => {
                self.ledger.credit(creator, wager.saturating_mul(2));
                Some(creator)
            }
            Outcome::OpponentWins => {
                self.ledger.credit(opponent, wager.saturating_mul(2));
                Some(opponent)
            }
            Outcome::Tie => {
                self.ledger.credit(creator, wager);
                self.ledger.credit(opponent, wager);
                None
            }
        };

        self.events.push(EscrowEvent::GameResult { game_id, winner });
        Ok(winner)
    }

    /// Reclaim the wager of a game nobody joined.
    ///
    /// Only the creator, only once the expiry has passed, and only while the
    /// game is still `Open`. After a join this path is closed for good;
    /// settlement must then go through `resolve` or `reclaim_no_reveal`.
    pub fn reclaim_no_opponent(
        &mut self,
        game_id: GameId,
        claimant: Address,
    ) -> Result<(), EscrowError> {
        let now = self.clock.now();
        let game = self.games.get_mut(game_id)?;

        if game.state != GameState::Open {
            return Err(EscrowError::AlreadyJoined);
        }
        if !game.is_expired(now) {
            return Err(EscrowError::NotExpired);
        }
        if claimant != game.creator {
            return Err(EscrowError::NotCreator);
        }

        game.state = GameState::Reclaimed;
        let wager = game.wager;

        self.ledger.credit(claimant, wager);
        self.events.push(EscrowEvent::GameReclaimed {
            game_id,
            claimant,
            amount: wager,
        });
        Ok(())
    }

    /// Claim the whole pot of a joined game whose creator never revealed.
    ///
    /// Only the opponent, only once the re-armed reveal deadline has passed.
    /// The opponent played openly and paid in; a creator who refuses to
    /// reveal a losing move forfeits both stakes.
    pub fn reclaim_no_reveal(
        &mut self,
        game_id: GameId,
        claimant: Address,
    ) -> Result<(), EscrowError> {
        let now = self.clock.now();
        let game = self.games.get_mut(game_id)?;

        if game.state != GameState::Joined {
            return Err(EscrowError::GameNotJoined);
        }
        if !game.is_expired(now) {
            return Err(EscrowError::NotExpired);
        }
        if claimant != game.opponent {
            return Err(EscrowError::NotDesignatedOpponent);
        }

        game.state = GameState::Reclaimed;
        let pot = game.wager.saturating_mul(2);

        self.ledger.credit(claimant, pot);
        self.events.push(EscrowEvent::GameReclaimed {
            game_id,
            claimant,
            amount: pot,
        });
        Ok(())
    }

    /// Withdraw the caller's entire ledger balance.
    ///
    /// Returns the amount paid out; the environment performs the actual
    /// transfer. This is the single debit path out of the ledger.
    pub fn withdraw(&mut self, caller: Address) -> Result<u64, EscrowError> {
        let amount = self.ledger.withdraw_all(caller)?;
        self.events.push(EscrowEvent::BalanceWithdrawn {
            address: caller,
            amount,
        });
        Ok(amount)
    }

    pub fn balance_of(&self, address: Address) -> u64 {
        self.ledger.balance_of(address)
    }

    pub fn game(&self, game_id: GameId) -> Option<&Game> {
        self.games.find(game_id)
    }

    pub fn games(&self) -> impl Iterator<Item = (&GameId, &Game)> {
        self.games.iter()
    }

    /// The ordered, append-only event log.
    pub fn events(&self) -> &[EscrowEvent] {
        &self.events
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Advance the engine clock, freezing it if it was on system time.
    pub fn advance_time(&mut self, seconds: i64) {
        self.clock.advance(seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const WAGER: u64 = 100;
    const WINDOW_MINUTES: i64 = 3;

    fn fixed_engine() -> EscrowEngine {
        EscrowEngine::with_clock(Clock::fixed(Utc::now()))
    }

    fn commit(mv: Move, phrase: &str) -> (GameId, Password) {
        let password = Password::from_phrase(phrase);
        let game_id = GameId::commit(mv, &password).unwrap();
        (game_id, password)
    }

    #[test]
    fn test_open_game_records_an_open_game() {
        let mut engine = fixed_engine();
        let creator = Address::random();
        let opponent = Address::random();
        let (game_id, _) = commit(Move::Rock, "pw");

        let game = engine
            .open_game(game_id, opponent, WAGER, WINDOW_MINUTES, creator)
            .unwrap();
        assert_eq!(game.state, GameState::Open);
        assert_eq!(game.wager, WAGER);
        assert_eq!(game.expires_at, game.created_at + Duration::minutes(3));

        assert!(matches!(
            engine.events(),
            [EscrowEvent::GameCreated { wager: 100, .. }]
        ));
    }

    #[test]
    fn test_open_game_validations() {
        let mut engine = fixed_engine();
        let creator = Address::random();
        let opponent = Address::random();
        let (game_id, _) = commit(Move::Rock, "pw");

        let zero_wager = engine.open_game(game_id, opponent, 0, WINDOW_MINUTES, creator);
        assert!(matches!(zero_wager, Err(EscrowError::InsufficientWager)));

        let zero_id = engine.open_game(
            GameId::from_bytes([0u8; 32]),
            opponent,
            WAGER,
            WINDOW_MINUTES,
            creator,
        );
        assert!(matches!(zero_id, Err(EscrowError::InvalidCommitment)));

        let self_play = engine.open_game(game_id, creator, WAGER, WINDOW_MINUTES, creator);
        assert!(matches!(self_play, Err(EscrowError::SelfPlay)));

        // None of the rejected opens left a record behind.
        assert!(engine.game(game_id).is_none());
        assert!(engine.events().is_empty());
    }

    #[test]
    fn test_open_game_rejects_out_of_range_windows() {
        let mut engine = fixed_engine();
        let creator = Address::random();
        let opponent = Address::random();
        let (game_id, _) = commit(Move::Rock, "pw");

        for window in [
            0,
            -1,
            i64::MIN,
            MAX_WINDOW_MINUTES + 1,
            1_000_000_000_000,
            i64::MAX,
        ] {
            let result = engine.open_game(game_id, opponent, WAGER, window, creator);
            assert!(matches!(result, Err(EscrowError::InvalidExpiry)));
        }

        // Rejected opens left nothing behind.
        assert!(engine.game(game_id).is_none());
        assert!(engine.events().is_empty());

        // The cap itself is accepted.
        engine
            .open_game(game_id, opponent, WAGER, MAX_WINDOW_MINUTES, creator)
            .unwrap();
    }

    #[test]
    fn test_new_engine_runs_on_the_system_clock() {
        let engine = EscrowEngine::new();
        let delta = engine.now().signed_duration_since(Utc::now());
        assert!(delta.num_seconds().abs() < 5);
    }

    #[test]
    fn test_commitment_is_single_use() {
        let mut engine = fixed_engine();
        let creator = Address::random();
        let opponent = Address::random();
        let (game_id, password) = commit(Move::Rock, "pw");

        engine
            .open_game(game_id, opponent, WAGER, WINDOW_MINUTES, creator)
            .unwrap();
        engine.join_game(game_id, Move::Paper, WAGER, opponent).unwrap();
        engine
            .resolve(game_id, Move::Rock, &password, creator)
            .unwrap();

        // Same commitment again, even after the game settled.
        let replay = engine.open_game(game_id, opponent, WAGER, WINDOW_MINUTES, creator);
        assert!(matches!(replay, Err(EscrowError::DuplicateCommitment(_))));
    }

    #[test]
    fn test_join_rearms_expiry_for_the_reveal() {
        let mut engine = fixed_engine();
        let creator = Address::random();
        let opponent = Address::random();
        let (game_id, _) = commit(Move::Rock, "pw");

        engine
            .open_game(game_id, opponent, WAGER, WINDOW_MINUTES, creator)
            .unwrap();

        // Join two minutes into a three-minute window.
        engine.advance_time(120);
        engine.join_game(game_id, Move::Paper, WAGER, opponent).unwrap();

        let game = engine.game(game_id).unwrap();
        assert_eq!(game.state, GameState::Joined);
        assert_eq!(game.expires_at, engine.now() + Duration::minutes(3));
    }

    #[test]
    fn test_join_guards() {
        let mut engine = fixed_engine();
        let creator = Address::random();
        let opponent = Address::random();
        let outsider = Address::random();
        let (game_id, _) = commit(Move::Rock, "pw");

        engine
            .open_game(game_id, opponent, WAGER, WINDOW_MINUTES, creator)
            .unwrap();

        let missing = engine.join_game(GameId::from_bytes([9u8; 32]), Move::Paper, WAGER, opponent);
        assert!(matches!(missing, Err(EscrowError::GameNotFound(_))));

        let wrong_player = engine.join_game(game_id, Move::Paper, WAGER, outsider);
        assert!(matches!(wrong_player, Err(EscrowError::NotDesignatedOpponent)));

        let unset_move = engine.join_game(game_id, Move::Unset, WAGER, opponent);
        assert!(matches!(unset_move, Err(EscrowError::InvalidMove)));

        let short_wager = engine.join_game(game_id, Move::Paper, WAGER - 1, opponent);
        assert!(matches!(
            short_wager,
            Err(EscrowError::WagerMismatch {
                expected: 100,
                attached: 99,
            })
        ));

        // Still open and joinable after every rejection.
        assert_eq!(engine.game(game_id).unwrap().state, GameState::Open);
        engine.join_game(game_id, Move::Paper, WAGER, opponent).unwrap();

        let second_join = engine.join_game(game_id, Move::Rock, WAGER, opponent);
        assert!(matches!(second_join, Err(EscrowError::AlreadyJoined)));
    }

    #[test]
    fn test_join_after_expiry_fails() {
        let mut engine = fixed_engine();
        let creator = Address::random();
        let opponent = Address::random();
        let (game_id, _) = commit(Move::Rock, "pw");

        engine
            .open_game(game_id, opponent, WAGER, WINDOW_MINUTES, creator)
            .unwrap();
        engine.advance_time(WINDOW_MINUTES * 60);

        let late = engine.join_game(game_id, Move::Paper, WAGER, opponent);
        assert!(matches!(late, Err(EscrowError::GameExpired)));
    }

    #[test]
    fn test_resolve_pays_the_winner_double() {
        let mut engine = fixed_engine();
        let creator = Address::random();
        let opponent = Address::random();
        let (game_id, password) = commit(Move::Scissors, "pw");

        engine
            .open_game(game_id, opponent, WAGER, WINDOW_MINUTES, creator)
            .unwrap();
        engine.join_game(game_id, Move::Paper, WAGER, opponent).unwrap();

        let winner = engine
            .resolve(game_id, Move::Scissors, &password, creator)
            .unwrap();
        assert_eq!(winner, Some(creator));
        assert_eq!(engine.balance_of(creator), 2 * WAGER);
        assert_eq!(engine.balance_of(opponent), 0);
        assert_eq!(engine.game(game_id).unwrap().state, GameState::Resolved);
    }

    #[test]
    fn test_resolve_tie_returns_both_stakes() {
        let mut engine = fixed_engine();
        let creator = Address::random();
        let opponent = Address::random();
        let (game_id, password) = commit(Move::Scissors, "pw");

        engine
            .open_game(game_id, opponent, WAGER, WINDOW_MINUTES, creator)
            .unwrap();
        engine
            .join_game(game_id, Move::Scissors, WAGER, opponent)
            .unwrap();

        let winner = engine
            .resolve(game_id, Move::Scissors, &password, creator)
            .unwrap();
        assert_eq!(winner, None);
        assert_eq!(engine.balance_of(creator), WAGER);
        assert_eq!(engine.balance_of(opponent), WAGER);
    }

    #[test]
    fn test_resolve_guards() {
        let mut engine = fixed_engine();
        let creator = Address::random();
        let opponent = Address::random();
        let (game_id, password) = commit(Move::Rock, "pw");

        engine
            .open_game(game_id, opponent, WAGER, WINDOW_MINUTES, creator)
            .unwrap();

        // No opponent yet: nothing to settle.
        let unjoined = engine.resolve(game_id, Move::Rock, &password, creator);
        assert!(matches!(unjoined, Err(EscrowError::GameNotJoined)));

        engine.join_game(game_id, Move::Paper, WAGER, opponent).unwrap();

        let not_creator = engine.resolve(game_id, Move::Rock, &password, opponent);
        assert!(matches!(not_creator, Err(EscrowError::NotCreator)));

        let wrong_move = engine.resolve(game_id, Move::Paper, &password, creator);
        assert!(matches!(wrong_move, Err(EscrowError::HashMismatch)));

        let wrong_password =
            engine.resolve(game_id, Move::Rock, &Password::from_phrase("nope"), creator);
        assert!(matches!(wrong_password, Err(EscrowError::HashMismatch)));

        // A failed reveal releases nothing.
        assert_eq!(engine.balance_of(creator), 0);
        assert_eq!(engine.balance_of(opponent), 0);
        assert_eq!(engine.game(game_id).unwrap().state, GameState::Joined);

        // The honest reveal still works, exactly once.
        let winner = engine.resolve(game_id, Move::Rock, &password, creator).unwrap();
        assert_eq!(winner, Some(opponent));
        let second = engine.resolve(game_id, Move::Rock, &password, creator);
        assert!(matches!(second, Err(EscrowError::GameNotJoined)));
    }

    #[test]
    fn test_resolve_after_reveal_deadline_fails() {
        let mut engine = fixed_engine();
        let creator = Address::random();
        let opponent = Address::random();
        let (game_id, password) = commit(Move::Rock, "pw");

        engine
            .open_game(game_id, opponent, WAGER, WINDOW_MINUTES, creator)
            .unwrap();
        engine.join_game(game_id, Move::Paper, WAGER, opponent).unwrap();
        engine.advance_time(WINDOW_MINUTES * 60);

        let late = engine.resolve(game_id, Move::Rock, &password, creator);
        assert!(matches!(late, Err(EscrowError::GameExpired)));
    }

    #[test]
    fn test_reclaim_no_opponent() {
        let mut engine = fixed_engine();
        let creator = Address::random();
        let opponent = Address::random();
        let (game_id, _) = commit(Move::Rock, "pw");

        engine
            .open_game(game_id, opponent, WAGER, WINDOW_MINUTES, creator)
            .unwrap();

        let early = engine.reclaim_no_opponent(game_id, creator);
        assert!(matches!(early, Err(EscrowError::NotExpired)));

        engine.advance_time(181);

        let wrong_claimant = engine.reclaim_no_opponent(game_id, opponent);
        assert!(matches!(wrong_claimant, Err(EscrowError::NotCreator)));

        engine.reclaim_no_opponent(game_id, creator).unwrap();
        assert_eq!(engine.balance_of(creator), WAGER);
        assert_eq!(engine.game(game_id).unwrap().state, GameState::Reclaimed);

        // Terminal: the reclaim path is closed behind itself.
        let again = engine.reclaim_no_opponent(game_id, creator);
        assert!(matches!(again, Err(EscrowError::AlreadyJoined)));
    }

    #[test]
    fn test_reclaim_no_opponent_closed_after_join() {
        let mut engine = fixed_engine();
        let creator = Address::random();
        let opponent = Address::random();
        let (game_id, _) = commit(Move::Rock, "pw");

        engine
            .open_game(game_id, opponent, WAGER, WINDOW_MINUTES, creator)
            .unwrap();
        engine.join_game(game_id, Move::Paper, WAGER, opponent).unwrap();
        engine.advance_time(WINDOW_MINUTES * 60 + 1);

        let reclaim = engine.reclaim_no_opponent(game_id, creator);
        assert!(matches!(reclaim, Err(EscrowError::AlreadyJoined)));
    }

    #[test]
    fn test_reclaim_no_reveal_awards_the_pot() {
        let mut engine = fixed_engine();
        let creator = Address::random();
        let opponent = Address::random();
        let (game_id, _) = commit(Move::Rock, "pw");

        engine
            .open_game(game_id, opponent, WAGER, WINDOW_MINUTES, creator)
            .unwrap();
        engine.join_game(game_id, Move::Paper, WAGER, opponent).unwrap();

        let early = engine.reclaim_no_reveal(game_id, opponent);
        assert!(matches!(early, Err(EscrowError::NotExpired)));

        engine.advance_time(WINDOW_MINUTES * 60);

        let not_opponent = engine.reclaim_no_reveal(game_id, creator);
        assert!(matches!(not_opponent, Err(EscrowError::NotDesignatedOpponent)));

        engine.reclaim_no_reveal(game_id, opponent).unwrap();
        assert_eq!(engine.balance_of(opponent), 2 * WAGER);
        assert_eq!(engine.balance_of(creator), 0);
        assert_eq!(engine.game(game_id).unwrap().state, GameState::Reclaimed);

        // The creator cannot reveal into a reclaimed game.
        let (_, password) = commit(Move::Rock, "pw");
        let late_reveal = engine.resolve(game_id, Move::Rock, &password, creator);
        assert!(matches!(late_reveal, Err(EscrowError::GameNotJoined)));
    }

    #[test]
    fn test_withdraw_empties_the_balance() {
        let mut engine = fixed_engine();
        let creator = Address::random();
        let opponent = Address::random();
        let (game_id, password) = commit(Move::Rock, "pw");

        engine
            .open_game(game_id, opponent, WAGER, WINDOW_MINUTES, creator)
            .unwrap();
        engine.join_game(game_id, Move::Paper, WAGER, opponent).unwrap();
        engine.resolve(game_id, Move::Rock, &password, creator).unwrap();

        let amount = engine.withdraw(opponent).unwrap();
        assert_eq!(amount, 2 * WAGER);
        assert_eq!(engine.balance_of(opponent), 0);

        let empty = engine.withdraw(opponent);
        assert!(matches!(empty, Err(EscrowError::NothingToWithdraw)));
        let never_credited = engine.withdraw(creator);
        assert!(matches!(never_credited, Err(EscrowError::NothingToWithdraw)));
    }

    #[test]
    fn test_event_log_orders_the_whole_history() {
        let mut engine = fixed_engine();
        let creator = Address::random();
        let opponent = Address::random();
        let (game_id, password) = commit(Move::Rock, "pw");

        engine
            .open_game(game_id, opponent, WAGER, WINDOW_MINUTES, creator)
            .unwrap();
        engine.join_game(game_id, Move::Paper, WAGER, opponent).unwrap();
        engine.resolve(game_id, Move::Rock, &password, creator).unwrap();
        engine.withdraw(opponent).unwrap();

        let events = engine.events();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], EscrowEvent::GameCreated { .. }));
        assert!(matches!(
            events[1],
            EscrowEvent::GameJoined { mv: Move::Paper, .. }
        ));
        assert!(matches!(
            events[2],
            EscrowEvent::GameResult { winner: Some(w), .. } if w == opponent
        ));
        assert!(matches!(
            events[3],
            EscrowEvent::BalanceWithdrawn { amount: 200, .. }
        ));
    }
}
