//! Turn orchestration for every live game
//!
//! `GameService` executes validated commands against sessions and emits the
//! resulting events. It is the only writer of session state, alongside the
//! tasks it spawns itself:
//! - the per-session turn timer, which ends a game whose player stalls
//! - the delayed computer move that follows every human strike in AI games
//! - the reconnect grace window of an AI game whose human dropped
//!
//! All of them lock the session before acting and re-check that the session
//! is still live and still in the state they were scheduled for, so a task
//! that loses a race against a strike, leave or teardown does nothing.
//!
//! ## Locking
//! The registry maps are never held across an `.await`. Session mutexes are
//! held for the whole of a command so that resolving a strike, flipping the
//! turn, re-arming the timer and queuing both peers' events happen as one
//! step. The pairing lobby is the one lock taken before a session lock;
//! nothing takes them in the opposite order.
//!
//! ## Teardown
//! Cancel the timer, mark the session terminal, remove it (and its bindings)
//! from the registry, report statistics if the game had started, then queue
//! the final events. Connections are closed after their final event.

use crate::ai;
use crate::config::ServerConfig;
use crate::connections::ConnectionId;
use crate::dispatch::{Delivery, Dispatcher, Transport};
use crate::events;
use crate::registry::SessionRegistry;
use crate::session::{Controller, GameId, GameSession, Phase, Seat};
use crate::stats::StatsSink;
use crate::validation::{
    self, parse_command, GameCommand, Rejection, Reply, INVALID_MESSAGE_TEXT,
};
use log::{debug, error, info, warn};
use shared::{CommandFrame, Coordinate, Ship, PING, PONG};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

pub struct GameService {
    config: ServerConfig,
    registry: SessionRegistry,
    /// Random-pairing sessions waiting for a second player, oldest first.
    /// Entries can go stale; they are skipped when popped.
    lobby: Mutex<VecDeque<GameId>>,
    dispatcher: Dispatcher,
    stats: Arc<dyn StatsSink>,
}

impl GameService {
    pub fn new(config: ServerConfig, transport: Arc<dyn Transport>, stats: Arc<dyn StatsSink>) -> Arc<Self> {
        Arc::new(Self {
            config,
            registry: SessionRegistry::new(),
            lobby: Mutex::new(VecDeque::new()),
            dispatcher: Dispatcher::new(transport),
            stats,
        })
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn live_sessions(&self) -> usize {
        self.registry.len()
    }

    /// Entry point for one inbound text message from `connection`.
    pub async fn handle_message(self: &Arc<Self>, connection: ConnectionId, text: &str) {
        if text == PING {
            self.dispatcher.send_text(connection, PONG);
            return;
        }

        let frame = match CommandFrame::from_json(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Unreadable message from {}: {}", connection, e);
                self.dispatcher.send_text(connection, INVALID_MESSAGE_TEXT);
                return;
            }
        };
        debug!("{} sent {:?}", connection, frame.command_type);

        let result = match parse_command(&frame) {
            Ok(command) => self.handle_command(connection, command).await,
            Err(rejection) => Err(rejection),
        };

        if let Err(rejection) = result {
            warn!(
                "Rejected {:?} from {} (game {}): {}",
                frame.command_type,
                connection,
                frame.game_id.as_deref().unwrap_or("-"),
                rejection
            );
            self.reply(connection, rejection.reply());
        }
    }

    pub async fn handle_command(
        self: &Arc<Self>,
        connection: ConnectionId,
        command: GameCommand,
    ) -> Result<(), Rejection> {
        match command {
            GameCommand::Join { ships } => self.join(connection, ships).await,
            GameCommand::JoinFriend { ships, game_id } => self.join_friend(connection, ships, game_id).await,
            GameCommand::JoinAi { ships } => self.join_ai(connection, ships).await,
            GameCommand::Reconnect { game_id } => self.reconnect(connection, game_id).await,
            GameCommand::Leave { game_id } => self.leave(connection, game_id).await,
            GameCommand::Strike { game_id, target } => self.strike(connection, game_id, target).await,
        }
    }

    fn reply(&self, connection: ConnectionId, reply: Reply) {
        match reply {
            Reply::Text(text) => self.dispatcher.send_text(connection, &text),
            Reply::Event { event, close } => self.dispatcher.deliver(&Delivery {
                connection,
                event,
                close,
            }),
        }
    }

    fn ensure_not_in_game(&self, connection: ConnectionId) -> Result<(), Rejection> {
        validation::validate_join(self.registry.resolve(connection).is_some())
    }

    async fn join(self: &Arc<Self>, connection: ConnectionId, ships: Vec<Ship>) -> Result<(), Rejection> {
        self.ensure_not_in_game(connection)?;

        let mut lobby = self.lobby.lock().await;
        while let Some(id) = lobby.pop_front() {
            let Some(handle) = self.registry.get(&id) else {
                continue;
            };
            let mut session = handle.lock().await;
            if session.phase != Phase::WaitingOpponent || !session.has_vacant_seat() {
                continue;
            }
            drop(lobby);

            session.seat_second_player(connection, ships);
            self.registry.bind(connection, id);
            info!("Game {}: {} paired as player 2", id, connection);
            self.start_game(&mut session);
            return Ok(());
        }

        let id = Uuid::new_v4();
        let session = GameSession::waiting(id, connection, ships, false, self.config.turn_timeout);
        self.registry.create(session);
        self.registry.bind(connection, id);
        lobby.push_back(id);
        drop(lobby);

        info!(
            "Game {} created by {}, waiting for opponent ({} live)",
            id,
            connection,
            self.registry.len()
        );
        self.dispatcher
            .deliver(&Delivery::new(connection, events::waiting(id, false)));
        Ok(())
    }

    async fn join_friend(
        self: &Arc<Self>,
        connection: ConnectionId,
        ships: Vec<Ship>,
        game_id: Option<GameId>,
    ) -> Result<(), Rejection> {
        self.ensure_not_in_game(connection)?;

        let Some(id) = game_id else {
            let id = Uuid::new_v4();
            let session = GameSession::waiting(id, connection, ships, true, self.config.turn_timeout);
            self.registry.create(session);
            self.registry.bind(connection, id);

            info!("Game {} created by {} for a friend", id, connection);
            self.dispatcher
                .deliver(&Delivery::new(connection, events::waiting(id, true)));
            return Ok(());
        };

        let handle = self.registry.get(&id).ok_or(Rejection::WrongGameId)?;
        let mut session = handle.lock().await;
        validation::validate_join_friend(&session)?;

        session.seat_second_player(connection, ships);
        self.registry.bind(connection, id);
        info!("Game {}: friend {} joined", id, connection);
        self.start_game(&mut session);
        Ok(())
    }

    async fn join_ai(self: &Arc<Self>, connection: ConnectionId, ships: Vec<Ship>) -> Result<(), Rejection> {
        self.ensure_not_in_game(connection)?;

        let computer_ships = ai::generate_fleet(&mut rand::thread_rng());
        let id = Uuid::new_v4();
        let session = GameSession::against_computer(id, connection, ships, computer_ships, self.config.turn_timeout);
        let (_, handle) = self.registry.create(session);
        self.registry.bind(connection, id);

        info!("Game {} created by {} against the computer", id, connection);
        let mut session = handle.lock().await;
        self.start_game(&mut session);
        Ok(())
    }

    /// Player 1 opens; both peers get the same `timeLeft`.
    fn start_game(self: &Arc<Self>, session: &mut GameSession) {
        session.start();
        let time_left = self.arm_turn_timer(session);

        let session = &*session;
        let deliveries: Vec<Delivery> = [Seat::Player1, Seat::Player2]
            .into_iter()
            .filter_map(|seat| {
                let connection = session.slot(seat).connection?;
                Some(Delivery::new(connection, events::game_started(session, seat, time_left)))
            })
            .collect();
        self.dispatcher.deliver_all(&deliveries);
    }

    async fn reconnect(self: &Arc<Self>, connection: ConnectionId, id: GameId) -> Result<(), Rejection> {
        self.ensure_not_in_game(connection)?;

        let handle = self.registry.get(&id).ok_or(Rejection::NoGame)?;
        let mut session = handle.lock().await;
        let seat = validation::validate_reconnect(&session)?;

        session.slot_mut(seat).bind(connection);
        if session.against_ai {
            session.grace_epoch += 1;
        }
        self.registry.bind(connection, id);
        info!("Game {}: {} reconnected as {:?}", id, connection, seat);

        let event = events::reconnected(&session, seat, session.timer.time_left());
        self.dispatcher.deliver(&Delivery::new(connection, event));
        Ok(())
    }

    async fn leave(self: &Arc<Self>, connection: ConnectionId, id: GameId) -> Result<(), Rejection> {
        let handle = self.registry.get(&id).ok_or(Rejection::GameNotFound)?;
        let mut session = handle.lock().await;
        let seat = validation::validate_leave(&session, connection)?;

        let opponent = session.slot(seat.opponent());
        let deliveries: Vec<Delivery> = opponent
            .connection
            .filter(|_| opponent.connected)
            .map(|c| Delivery::closing(c, events::opponent_left()))
            .into_iter()
            .collect();

        info!("Game {}: {} left", id, connection);
        self.teardown(&mut session, Phase::Aborted, false);
        self.dispatcher.deliver_all(&deliveries);
        self.dispatcher.close(connection);
        Ok(())
    }

    async fn strike(
        self: &Arc<Self>,
        connection: ConnectionId,
        id: GameId,
        target: Coordinate,
    ) -> Result<(), Rejection> {
        let handle = self.registry.get(&id).ok_or(Rejection::GameNotFound)?;
        let mut session = handle.lock().await;
        let seat = validation::validate_strike(&session, connection, target)?;

        let outcome = session
            .apply_strike(seat, target)
            .map_err(|_| Rejection::AlreadyStruck)?;
        debug!(
            "Game {}: {:?} struck {} (hit={}, sunk={})",
            id, seat, target, outcome.hit, outcome.sunk
        );

        if session.is_fleet_destroyed(seat.opponent()) {
            self.finish(&mut session, seat);
            return Ok(());
        }

        session.pass_turn();
        let time_left = self.arm_turn_timer(&mut session);

        let defender = seat.opponent();
        let mut deliveries = vec![Delivery::new(
            connection,
            events::strike_made(&session, seat, outcome.sunk, time_left),
        )];
        if let Some(peer) = session.slot(defender).connection {
            deliveries.push(Delivery::new(
                peer,
                events::strike_received(&session, defender, outcome.sunk, time_left),
            ));
        }
        self.dispatcher.deliver_all(&deliveries);

        if session.slot(defender).controller == Controller::Computer {
            self.schedule_ai_turn(id);
        }
        Ok(())
    }

    fn schedule_ai_turn(self: &Arc<Self>, id: GameId) {
        let service = Arc::clone(self);
        let delay = self.config.ai_response_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            service.ai_turn(id).await;
        });
    }

    /// Plays the computer's move if the game still expects one.
    pub async fn ai_turn(self: &Arc<Self>, id: GameId) {
        let Some(handle) = self.registry.get(&id) else {
            debug!("Game {} ended before the computer could move", id);
            return;
        };
        let mut session = handle.lock().await;
        if session.is_closed()
            || session.turn() != Some(Seat::Player2)
            || session.slot(Seat::Player2).controller != Controller::Computer
        {
            return;
        }

        let target = {
            let own = session.slot(Seat::Player2);
            let human = session.slot(Seat::Player1);
            ai::next_strike(
                &mut rand::thread_rng(),
                &own.strikes,
                &human.sunken_ships,
                &human.active_ships,
            )
        };
        let Some(target) = target else {
            error!("Game {}: computer found no cell left to strike", id);
            return;
        };

        let outcome = match session.apply_strike(Seat::Player2, target) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Game {}: computer strike rejected: {}", id, e);
                return;
            }
        };
        debug!(
            "Game {}: computer struck {} (hit={}, sunk={})",
            id, target, outcome.hit, outcome.sunk
        );

        if session.is_fleet_destroyed(Seat::Player1) {
            self.finish(&mut session, Seat::Player2);
            return;
        }

        session.pass_turn();
        let time_left = self.arm_turn_timer(&mut session);
        if let Some(connection) = session.slot(Seat::Player1).connection {
            let event = events::strike_received(&session, Seat::Player1, outcome.sunk, time_left);
            self.dispatcher.deliver(&Delivery::new(connection, event));
        }
    }

    fn finish(&self, session: &mut GameSession, winner: Seat) {
        let loser = winner.opponent();
        let mut deliveries = Vec::new();
        if let Some(connection) = session.slot(winner).connection {
            deliveries.push(Delivery::closing(connection, events::won(session, winner)));
        }
        if let Some(connection) = session.slot(loser).connection {
            deliveries.push(Delivery::closing(connection, events::lost(session, loser)));
        }

        info!("Game {} won by {:?}", session.id, winner);
        self.teardown(session, Phase::Won, true);
        self.dispatcher.deliver_all(&deliveries);
    }

    /// Arms the session's turn timer and returns the `timeLeft` to report.
    fn arm_turn_timer(self: &Arc<Self>, session: &mut GameSession) -> u64 {
        let service = Arc::downgrade(self);
        let id = session.id;
        session.timer.arm(move |generation| async move {
            if let Some(service) = service.upgrade() {
                service.on_turn_timeout(id, generation).await;
            }
        });
        session.timer.time_left()
    }

    async fn on_turn_timeout(&self, id: GameId, generation: u64) {
        let Some(handle) = self.registry.get(&id) else {
            return;
        };
        let mut session = handle.lock().await;
        if session.is_closed() || !session.timer.expire(generation) {
            return;
        }
        let Some(late) = session.turn() else {
            return;
        };

        let deliveries: Vec<Delivery> = [late, late.opponent()]
            .into_iter()
            .filter_map(|seat| {
                let connection = session.slot(seat).connection?;
                Some(Delivery::closing(connection, events::timeout(seat == late)))
            })
            .collect();

        info!("Game {}: {:?} ran out of time", id, late);
        self.teardown(&mut session, Phase::Aborted, false);
        self.dispatcher.deliver_all(&deliveries);
    }

    /// Transport-level close of `connection`.
    pub async fn handle_disconnect(self: &Arc<Self>, connection: ConnectionId) {
        let Some(id) = self.registry.unbind(connection) else {
            return;
        };
        let Some(handle) = self.registry.get(&id) else {
            return;
        };
        let mut session = handle.lock().await;
        if session.is_closed() {
            return;
        }
        let Some(seat) = session.seat_of(connection) else {
            return;
        };

        session.slot_mut(seat).unbind();
        let opponent_connected = session.slot(seat.opponent()).connected;

        if session.against_ai {
            session.grace_epoch += 1;
            info!(
                "Game {}: {} disconnected, holding game for {:?}",
                id, connection, self.config.reconnect_grace
            );
            self.schedule_grace_expiry(id, session.grace_epoch);
        } else if opponent_connected {
            info!("Game {}: {} disconnected, seat open for reconnect", id, connection);
        } else {
            info!("Game {}: {} disconnected with nobody left", id, connection);
            self.teardown(&mut session, Phase::Aborted, false);
        }
    }

    fn schedule_grace_expiry(self: &Arc<Self>, id: GameId, epoch: u64) {
        let service = Arc::clone(self);
        let grace = self.config.reconnect_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            service.on_grace_expired(id, epoch).await;
        });
    }

    async fn on_grace_expired(&self, id: GameId, epoch: u64) {
        let Some(handle) = self.registry.get(&id) else {
            return;
        };
        let mut session = handle.lock().await;
        if session.is_closed() || session.grace_epoch != epoch || session.slot(Seat::Player1).connected {
            return;
        }
        info!("Game {}: reconnect window expired", id);
        self.teardown(&mut session, Phase::Aborted, false);
    }

    fn teardown(&self, session: &mut GameSession, phase: Phase, completed: bool) {
        session.timer.cancel();
        session.phase = phase;
        self.registry.remove(&session.id, &session.connections());

        if session.started {
            self.stats.record(session.stats(completed));
        }
        info!(
            "Game {} closed as {:?}, {} games live",
            session.id,
            phase,
            self.registry.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connections::{ConnectionHub, Outbound};
    use crate::stats::StatsLedger;
    use shared::{GameEvent, GameEventType, ShipPlacement};
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Harness {
        service: Arc<GameService>,
        hub: Arc<ConnectionHub>,
        ledger: Arc<StatsLedger>,
    }

    impl Harness {
        fn new() -> Self {
            let hub = Arc::new(ConnectionHub::new());
            let ledger = Arc::new(StatsLedger::new());
            let service = GameService::new(ServerConfig::default(), hub.clone(), ledger.clone());
            Self { service, hub, ledger }
        }

        fn connect(&self) -> (ConnectionId, UnboundedReceiver<Outbound>) {
            self.hub.register()
        }

        async fn send(&self, connection: ConnectionId, frame: CommandFrame) {
            let text = frame.to_json().unwrap();
            self.service.handle_message(connection, &text).await;
        }
    }

    fn fleet() -> Vec<ShipPlacement> {
        [(5, 0), (4, 2), (3, 4), (3, 6), (2, 8)]
            .into_iter()
            .enumerate()
            .map(|(i, (length, row))| ShipPlacement {
                id: i.to_string(),
                is_horizontal: true,
                length,
                row,
                col: 0,
            })
            .collect()
    }

    fn next_text(rx: &mut UnboundedReceiver<Outbound>) -> String {
        match rx.try_recv() {
            Ok(Outbound::Text(text)) => text,
            other => panic!("expected text frame, got {:?}", other),
        }
    }

    fn next_event(rx: &mut UnboundedReceiver<Outbound>) -> GameEvent {
        GameEvent::from_json(&next_text(rx)).unwrap()
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let harness = Harness::new();
        let (conn, mut rx) = harness.connect();

        harness.service.handle_message(conn, "ping").await;
        assert_eq!(next_text(&mut rx), "pong");
    }

    #[tokio::test]
    async fn test_protocol_error_keeps_connection() {
        let harness = Harness::new();
        let (conn, mut rx) = harness.connect();

        harness.service.handle_message(conn, r#"{"type":"DANCE"}"#).await;
        assert_eq!(next_text(&mut rx), INVALID_MESSAGE_TEXT);
        assert!(harness.hub.contains(conn));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_join_in_same_game_rejected() {
        let harness = Harness::new();
        let (conn, mut rx) = harness.connect();

        harness.send(conn, CommandFrame::join(shared::CommandType::Join, fleet())).await;
        assert_eq!(next_event(&mut rx).event_type, GameEventType::WaitingOpponent);

        harness.send(conn, CommandFrame::join(shared::CommandType::JoinAi, fleet())).await;
        assert_eq!(next_text(&mut rx), "Can't join a game when already in one");
        assert_eq!(harness.service.live_sessions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_game_abandoned_without_stats() {
        let harness = Harness::new();
        let (conn, mut rx) = harness.connect();

        harness.send(conn, CommandFrame::join(shared::CommandType::Join, fleet())).await;
        next_event(&mut rx);

        harness.service.handle_disconnect(conn).await;
        assert_eq!(harness.service.live_sessions(), 0);
        assert_eq!(harness.ledger.totals().pvp.games, 0);

        // The stale lobby entry must not capture the next player.
        let (other, mut other_rx) = harness.connect();
        harness.send(other, CommandFrame::join(shared::CommandType::Join, fleet())).await;
        assert_eq!(next_event(&mut other_rx).event_type, GameEventType::WaitingOpponent);
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_friend_unknown_id() {
        let harness = Harness::new();
        let (conn, mut rx) = harness.connect();

        let frame = CommandFrame::join(shared::CommandType::JoinFriend, fleet()).with_game_id(Uuid::new_v4().to_string());
        harness.send(conn, frame).await;

        assert_eq!(next_event(&mut rx).event_type, GameEventType::WrongGameId);
        assert!(harness.service.registry().is_empty());
        assert!(harness.hub.contains(conn));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ai_replies_after_delay() {
        let harness = Harness::new();
        let (conn, mut rx) = harness.connect();

        harness.send(conn, CommandFrame::join(shared::CommandType::JoinAi, fleet())).await;
        let start = next_event(&mut rx);
        assert_eq!(start.event_type, GameEventType::TurnOwn);
        let game_id = start.game_id.unwrap().to_string();

        harness.send(conn, CommandFrame::strike(&game_id, 9, 9)).await;
        let after = next_event(&mut rx);
        assert_eq!(after.event_type, GameEventType::TurnOpponent);

        tokio::time::sleep(Duration::from_millis(1_900)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        let reply = next_event(&mut rx);
        assert_eq!(reply.event_type, GameEventType::TurnOwn);
        assert_eq!(reply.opponent_strikes.map(|s| s.len()), Some(1));
        assert_eq!(reply.time_left, Some(120));
    }

    async fn computer_fleet(harness: &Harness, game_id: &str) -> Vec<Coordinate> {
        let id = Uuid::parse_str(game_id).unwrap();
        let handle = harness.service.registry().get(&id).unwrap();
        let session = handle.lock().await;
        session
            .slot(Seat::Player2)
            .active_ships
            .iter()
            .flat_map(|ship| ship.coordinates.iter().copied())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_computer_sinks_human_fleet() {
        let harness = Harness::new();
        let (conn, mut rx) = harness.connect();

        harness.send(conn, CommandFrame::join(shared::CommandType::JoinAi, fleet())).await;
        let game_id = next_event(&mut rx).game_id.unwrap().to_string();

        // Keep one computer cell untouched so the human can never win.
        let spared = computer_fleet(&harness, &game_id).await[0];
        let mut targets = Coordinate::all().filter(|c| *c != spared);

        let last = loop {
            let target = targets.next().expect("computer should win before the board runs out");
            harness
                .send(conn, CommandFrame::strike(&game_id, target.row as i32, target.column as i32))
                .await;
            assert_eq!(next_event(&mut rx).event_type, GameEventType::TurnOpponent);

            tokio::time::sleep(Duration::from_millis(2_100)).await;
            let reply = next_event(&mut rx);
            if reply.event_type != GameEventType::TurnOwn {
                break reply;
            }
        };

        assert_eq!(last.event_type, GameEventType::Lost);
        assert_eq!(rx.try_recv(), Ok(Outbound::Close));
        assert_eq!(harness.service.live_sessions(), 0);
        assert_eq!(harness.service.registry().resolve(conn), None);

        let totals = harness.ledger.totals();
        assert_eq!(totals.ai.games, 1);
        assert_eq!(totals.ai.completed, 1);
        assert_eq!(totals.won_against_ai, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_human_sinks_computer_fleet() {
        let harness = Harness::new();
        let (conn, mut rx) = harness.connect();

        harness.send(conn, CommandFrame::join(shared::CommandType::JoinAi, fleet())).await;
        let game_id = next_event(&mut rx).game_id.unwrap().to_string();

        let targets = computer_fleet(&harness, &game_id).await;
        assert_eq!(targets.len(), 17);

        for (turn, target) in targets.iter().enumerate() {
            harness
                .send(conn, CommandFrame::strike(&game_id, target.row as i32, target.column as i32))
                .await;
            if turn + 1 == targets.len() {
                break;
            }
            assert_eq!(next_event(&mut rx).event_type, GameEventType::TurnOpponent);
            tokio::time::sleep(Duration::from_millis(2_100)).await;
            assert_eq!(next_event(&mut rx).event_type, GameEventType::TurnOwn);
        }

        assert_eq!(next_event(&mut rx).event_type, GameEventType::Won);
        assert_eq!(rx.try_recv(), Ok(Outbound::Close));
        assert_eq!(harness.service.live_sessions(), 0);
        assert_eq!(harness.service.registry().resolve(conn), None);

        let totals = harness.ledger.totals();
        assert_eq!(totals.ai.completed, 1);
        assert!(totals.ai.ships_sunk >= 5);
        assert_eq!(totals.won_against_ai, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ai_game_grace_window() {
        let harness = Harness::new();
        let (conn, mut rx) = harness.connect();

        harness.send(conn, CommandFrame::join(shared::CommandType::JoinAi, fleet())).await;
        let game_id = next_event(&mut rx).game_id.unwrap();

        harness.service.handle_disconnect(conn).await;
        assert_eq!(harness.service.live_sessions(), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        let (back, mut back_rx) = harness.connect();
        harness
            .send(back, CommandFrame::new(shared::CommandType::Reconnect).with_game_id(game_id.to_string()))
            .await;
        assert_eq!(next_event(&mut back_rx).event_type, GameEventType::TurnOwn);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(harness.service.live_sessions(), 1);

        harness.service.handle_disconnect(back).await;
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(harness.service.live_sessions(), 0);
        assert_eq!(harness.ledger.totals().ai.games, 1);
    }
}
