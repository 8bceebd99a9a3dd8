//! Builders for every outbound event, viewed from one seat of a session.

use crate::session::{GameId, GameSession, Seat};
use shared::{GameEvent, GameEventType};

pub fn waiting(game_id: GameId, against_friend: bool) -> GameEvent {
    let event_type = if against_friend {
        GameEventType::WaitingFriend
    } else {
        GameEventType::WaitingOpponent
    };
    GameEvent::new(event_type).game_id(game_id)
}

/// Start-of-game event for `seat`; `time_left` is shared by both peers.
pub fn game_started(session: &GameSession, seat: Seat, time_left: u64) -> GameEvent {
    GameEvent::new(turn_type(session, seat))
        .game_id(session.id)
        .time_left(time_left)
}

/// Sent to the player who just struck. The turn has already passed.
pub fn strike_made(session: &GameSession, striker: Seat, sunk: bool, time_left: u64) -> GameEvent {
    let own = session.slot(striker);
    let opponent = session.slot(striker.opponent());

    let event = GameEvent::new(GameEventType::TurnOpponent)
        .own_strikes(&own.strikes)
        .time_left(time_left);
    if sunk {
        event.opponent_sunken_ships(&opponent.sunken_ships)
    } else {
        event
    }
}

/// Sent to the player who was just struck and now has the turn.
pub fn strike_received(session: &GameSession, defender: Seat, sunk: bool, time_left: u64) -> GameEvent {
    let own = session.slot(defender);
    let opponent = session.slot(defender.opponent());

    let event = GameEvent::new(GameEventType::TurnOwn)
        .opponent_strikes(&opponent.strikes)
        .time_left(time_left);
    if sunk {
        event
            .own_sunken_ships(&own.sunken_ships)
            .own_active_ships(&own.active_ships)
    } else {
        event
    }
}

pub fn won(session: &GameSession, winner: Seat) -> GameEvent {
    GameEvent::new(GameEventType::Won)
        .own_strikes(&session.slot(winner).strikes)
        .opponent_sunken_ships(&session.slot(winner.opponent()).sunken_ships)
}

pub fn lost(session: &GameSession, loser: Seat) -> GameEvent {
    GameEvent::new(GameEventType::Lost)
        .opponent_strikes(&session.slot(loser.opponent()).strikes)
        .own_sunken_ships(&session.slot(loser).sunken_ships)
}

/// Full state replay for a player rejoining `seat`.
pub fn reconnected(session: &GameSession, seat: Seat, time_left: u64) -> GameEvent {
    let own = session.slot(seat);
    let opponent = session.slot(seat.opponent());

    GameEvent::new(turn_type(session, seat))
        .game_id(session.id)
        .own_strikes(&own.strikes)
        .opponent_strikes(&opponent.strikes)
        .own_active_ships(&own.active_ships)
        .own_sunken_ships(&own.sunken_ships)
        .opponent_sunken_ships(&opponent.sunken_ships)
        .time_left(time_left)
}

pub fn opponent_left() -> GameEvent {
    GameEvent::new(GameEventType::OpponentLeft)
}

pub fn timeout(own: bool) -> GameEvent {
    GameEvent::new(if own {
        GameEventType::TimeoutOwn
    } else {
        GameEventType::TimeoutOpponent
    })
}

fn turn_type(session: &GameSession, seat: Seat) -> GameEventType {
    if session.turn() == Some(seat) {
        GameEventType::TurnOwn
    } else {
        GameEventType::TurnOpponent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connections::ConnectionId;
    use shared::{Coordinate, Ship};
    use std::time::Duration;
    use uuid::Uuid;

    fn at(row: i32, column: i32) -> Coordinate {
        Coordinate::new(row, column).unwrap()
    }

    fn fleet() -> Vec<Ship> {
        (0..5)
            .zip([5, 4, 3, 3, 2])
            .map(|(row, length)| Ship::new(row.to_string(), (0..length).map(|c| at(row * 2, c)).collect()))
            .collect()
    }

    fn session() -> GameSession {
        let mut session = GameSession::waiting(Uuid::new_v4(), ConnectionId(1), fleet(), false, Duration::from_secs(120));
        session.seat_second_player(ConnectionId(2), fleet());
        session.start();
        session
    }

    #[test]
    fn test_waiting_event_kinds() {
        let id = Uuid::new_v4();
        assert_eq!(waiting(id, false).event_type, GameEventType::WaitingOpponent);
        assert_eq!(waiting(id, true).event_type, GameEventType::WaitingFriend);
        assert_eq!(waiting(id, true).game_id, Some(id));
    }

    #[test]
    fn test_start_events_mirror_turn() {
        let session = session();
        let first = game_started(&session, Seat::Player1, 120);
        let second = game_started(&session, Seat::Player2, 120);

        assert_eq!(first.event_type, GameEventType::TurnOwn);
        assert_eq!(second.event_type, GameEventType::TurnOpponent);
        assert_eq!(first.time_left, second.time_left);
        assert_eq!(first.game_id, Some(session.id));
    }

    #[test]
    fn test_strike_events_without_sink() {
        let mut session = session();
        session.apply_strike(Seat::Player1, at(8, 0)).unwrap();
        session.pass_turn();

        let striker = strike_made(&session, Seat::Player1, false, 120);
        assert_eq!(striker.event_type, GameEventType::TurnOpponent);
        assert_eq!(striker.own_strikes.as_ref().map(Vec::len), Some(1));
        assert!(striker.opponent_sunken_ships.is_none());

        let defender = strike_received(&session, Seat::Player2, false, 120);
        assert_eq!(defender.event_type, GameEventType::TurnOwn);
        assert_eq!(defender.opponent_strikes, striker.own_strikes);
        assert!(defender.own_active_ships.is_none());
    }

    #[test]
    fn test_strike_events_with_sink() {
        let mut session = session();
        session.apply_strike(Seat::Player1, at(8, 0)).unwrap();
        session.apply_strike(Seat::Player1, at(8, 1)).unwrap();

        let striker = strike_made(&session, Seat::Player1, true, 90);
        assert_eq!(striker.opponent_sunken_ships.map(|s| s.len()), Some(1));

        let defender = strike_received(&session, Seat::Player2, true, 90);
        assert_eq!(defender.own_sunken_ships.map(|s| s.len()), Some(1));
        assert_eq!(defender.own_active_ships.map(|s| s.len()), Some(4));
    }

    #[test]
    fn test_reconnect_snapshot() {
        let mut session = session();
        session.apply_strike(Seat::Player1, at(5, 5)).unwrap();
        session.pass_turn();

        let event = reconnected(&session, Seat::Player2, 77);
        assert_eq!(event.event_type, GameEventType::TurnOwn);
        assert_eq!(event.time_left, Some(77));
        assert_eq!(event.own_strikes, Some(vec![]));
        assert_eq!(event.opponent_strikes.map(|s| s.len()), Some(1));
        assert_eq!(event.own_active_ships.map(|s| s.len()), Some(5));
        assert_eq!(event.own_sunken_ships, Some(vec![]));

        let event = reconnected(&session, Seat::Player1, 77);
        assert_eq!(event.event_type, GameEventType::TurnOpponent);
    }

    #[test]
    fn test_timeout_events() {
        assert_eq!(timeout(true).event_type, GameEventType::TimeoutOwn);
        assert_eq!(timeout(false).event_type, GameEventType::TimeoutOpponent);
        assert_eq!(opponent_left().event_type, GameEventType::OpponentLeft);
    }
}
