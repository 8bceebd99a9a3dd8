//! A single game session and its turn timer.
//!
//! `GameSession` is plain data guarded by one `tokio::sync::Mutex` in the
//! registry. Strike handling, AI follow-up moves, reconnects and the timer's
//! own expiry all lock it before touching anything, so at most one of them
//! mutates a given session at a time.

use crate::connections::ConnectionId;
use crate::stats::{GameStats, PlayerStats};
use shared::{resolve_strike, Coordinate, Ship, Strike, StrikeError, StrikeOutcome, FLEET_SHIP_LENGTHS};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

pub type GameId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    WaitingOpponent,
    WaitingFriend,
    TurnPlayer1,
    TurnPlayer2,
    Won,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Seat {
    Player1,
    Player2,
}

impl Seat {
    pub fn index(self) -> usize {
        match self {
            Seat::Player1 => 0,
            Seat::Player2 => 1,
        }
    }

    pub fn opponent(self) -> Seat {
        match self {
            Seat::Player1 => Seat::Player2,
            Seat::Player2 => Seat::Player1,
        }
    }

    fn turn_phase(self) -> Phase {
        match self {
            Seat::Player1 => Phase::TurnPlayer1,
            Seat::Player2 => Phase::TurnPlayer2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Controller {
    /// Nobody has taken this seat yet
    Vacant,
    Human,
    Computer,
}

#[derive(Debug)]
pub struct PlayerSlot {
    pub controller: Controller,
    /// Bound transport connection; `None` before joining and after a disconnect
    pub connection: Option<ConnectionId>,
    pub connected: bool,
    pub strikes: Vec<Strike>,
    pub active_ships: Vec<Ship>,
    pub sunken_ships: Vec<Ship>,
}

impl PlayerSlot {
    pub fn vacant() -> Self {
        Self {
            controller: Controller::Vacant,
            connection: None,
            connected: false,
            strikes: Vec::new(),
            active_ships: Vec::new(),
            sunken_ships: Vec::new(),
        }
    }

    pub fn human(connection: ConnectionId, ships: Vec<Ship>) -> Self {
        Self {
            controller: Controller::Human,
            connection: Some(connection),
            connected: true,
            active_ships: ships,
            ..Self::vacant()
        }
    }

    pub fn computer(ships: Vec<Ship>) -> Self {
        Self {
            controller: Controller::Computer,
            active_ships: ships,
            ..Self::vacant()
        }
    }

    pub fn is_human(&self) -> bool {
        self.controller == Controller::Human
    }

    /// A human who joined and has since lost their connection.
    pub fn is_reconnectable(&self) -> bool {
        self.is_human() && !self.connected
    }

    pub fn bind(&mut self, connection: ConnectionId) {
        self.connection = Some(connection);
        self.connected = true;
    }

    pub fn unbind(&mut self) {
        self.connection = None;
        self.connected = false;
    }

    fn stats(&self) -> PlayerStats {
        let hits = self.strikes.iter().filter(|s| s.hit).count() as u32;
        PlayerStats {
            hits,
            misses: self.strikes.len() as u32 - hits,
            ships_sunk: 0,
        }
    }
}

/// The one scheduled timeout a session may own.
///
/// Arming always aborts the previously spawned sleep and bumps `generation`;
/// an expiry callback carrying a stale generation is ignored by [`expire`].
///
/// [`expire`]: TurnTimer::expire
#[derive(Debug)]
pub struct TurnTimer {
    duration: Duration,
    deadline: Option<Instant>,
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl TurnTimer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            deadline: None,
            generation: 0,
            handle: None,
        }
    }

    pub fn arm<F, Fut>(&mut self, on_expire: F) -> u64
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.generation += 1;

        let generation = self.generation;
        let duration = self.duration;
        self.deadline = Some(Instant::now() + duration);
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            on_expire(generation).await;
        }));

        generation
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.deadline = None;
    }

    /// Claims the expiry for `generation`. Returns false for a timer that was
    /// re-armed or cancelled after that callback was scheduled.
    ///
    /// The handle is detached rather than aborted since the caller is running
    /// inside that very task.
    pub fn expire(&mut self, generation: u64) -> bool {
        if self.generation != generation || self.deadline.is_none() {
            return false;
        }
        self.handle.take();
        self.deadline = None;
        true
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whole seconds until expiry, rounded up; zero when not armed.
    pub fn time_left(&self) -> u64 {
        self.deadline
            .map(|deadline| {
                let remaining = deadline.saturating_duration_since(Instant::now());
                remaining.as_millis().div_ceil(1000) as u64
            })
            .unwrap_or(0)
    }
}

impl Drop for TurnTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug)]
pub struct GameSession {
    pub id: GameId,
    pub phase: Phase,
    pub players: [PlayerSlot; 2],
    pub against_friend: bool,
    pub against_ai: bool,
    pub started: bool,
    pub timer: TurnTimer,
    /// Bumped on every human disconnect in an AI game so that only the
    /// latest grace window may tear the session down.
    pub grace_epoch: u64,
}

impl GameSession {
    pub fn waiting(
        id: GameId,
        connection: ConnectionId,
        ships: Vec<Ship>,
        against_friend: bool,
        turn_timeout: Duration,
    ) -> Self {
        Self {
            id,
            phase: if against_friend {
                Phase::WaitingFriend
            } else {
                Phase::WaitingOpponent
            },
            players: [PlayerSlot::human(connection, ships), PlayerSlot::vacant()],
            against_friend,
            against_ai: false,
            started: false,
            timer: TurnTimer::new(turn_timeout),
            grace_epoch: 0,
        }
    }

    pub fn against_computer(
        id: GameId,
        connection: ConnectionId,
        ships: Vec<Ship>,
        computer_ships: Vec<Ship>,
        turn_timeout: Duration,
    ) -> Self {
        Self {
            id,
            phase: Phase::TurnPlayer1,
            players: [PlayerSlot::human(connection, ships), PlayerSlot::computer(computer_ships)],
            against_friend: false,
            against_ai: true,
            started: true,
            timer: TurnTimer::new(turn_timeout),
            grace_epoch: 0,
        }
    }

    pub fn slot(&self, seat: Seat) -> &PlayerSlot {
        &self.players[seat.index()]
    }

    pub fn slot_mut(&mut self, seat: Seat) -> &mut PlayerSlot {
        &mut self.players[seat.index()]
    }

    pub fn seat_of(&self, connection: ConnectionId) -> Option<Seat> {
        [Seat::Player1, Seat::Player2]
            .into_iter()
            .find(|seat| self.slot(*seat).connection == Some(connection))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.phase, Phase::Won | Phase::Aborted)
    }

    pub fn has_vacant_seat(&self) -> bool {
        self.slot(Seat::Player2).controller == Controller::Vacant
    }

    pub fn seat_second_player(&mut self, connection: ConnectionId, ships: Vec<Ship>) {
        self.players[Seat::Player2.index()] = PlayerSlot::human(connection, ships);
    }

    /// Player 1 opens every game.
    pub fn start(&mut self) {
        self.started = true;
        self.phase = Phase::TurnPlayer1;
    }

    pub fn turn(&self) -> Option<Seat> {
        match self.phase {
            Phase::TurnPlayer1 => Some(Seat::Player1),
            Phase::TurnPlayer2 => Some(Seat::Player2),
            _ => None,
        }
    }

    pub fn pass_turn(&mut self) {
        if let Some(seat) = self.turn() {
            self.phase = seat.opponent().turn_phase();
        }
    }

    /// Resolves a strike by `attacker` against the other seat's fleet.
    pub fn apply_strike(&mut self, attacker: Seat, target: Coordinate) -> Result<StrikeOutcome, StrikeError> {
        let [first, second] = &mut self.players;
        let (own, opponent) = match attacker {
            Seat::Player1 => (first, second),
            Seat::Player2 => (second, first),
        };
        resolve_strike(
            target,
            &mut own.strikes,
            &mut opponent.active_ships,
            &mut opponent.sunken_ships,
        )
    }

    pub fn is_fleet_destroyed(&self, seat: Seat) -> bool {
        shared::all_ships_sunk(&self.slot(seat).active_ships)
    }

    /// First disconnected human seat, player 1 before player 2.
    pub fn reconnectable_seat(&self) -> Option<Seat> {
        [Seat::Player1, Seat::Player2]
            .into_iter()
            .find(|seat| self.slot(*seat).is_reconnectable())
    }

    /// Connections currently bound to either seat.
    pub fn connections(&self) -> Vec<ConnectionId> {
        self.players.iter().filter_map(|p| p.connection).collect()
    }

    pub fn stats(&self, completed: bool) -> GameStats {
        let mut players = [self.players[0].stats(), self.players[1].stats()];
        players[0].ships_sunk = self.players[1].sunken_ships.len() as u32;
        players[1].ships_sunk = self.players[0].sunken_ships.len() as u32;

        GameStats {
            game_id: self.id,
            ai_game: self.against_ai,
            completed,
            won_against_ai: self.against_ai
                && self.slot(Seat::Player2).sunken_ships.len() == FLEET_SHIP_LENGTHS.len(),
            players,
        }
    }
}
