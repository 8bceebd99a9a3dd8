//! Request validation
//!
//! Inbound frames are shaped into a typed [`GameCommand`] first. That step
//! only looks at the frame itself: id syntax, required fields, coordinate
//! range and fleet layout. The checks that need a session (`validate_*`) are
//! pure functions over a borrowed `GameSession` and never mutate it.
//!
//! Every failure is a [`Rejection`] whose `Display` text is exactly what the
//! client receives.

use crate::connections::ConnectionId;
use crate::session::{GameId, GameSession, Phase, Seat};
use shared::{
    fleet_from_placements, is_position_struck, CommandFrame, CommandType, Coordinate, FleetError,
    GameEvent, GameEventType, Ship,
};
use thiserror::Error;

pub const INVALID_MESSAGE_TEXT: &str = "Error: invalid message";
pub const TOO_MANY_REQUESTS_TEXT: &str = "Error: too many requests";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameCommand {
    Join { ships: Vec<Ship> },
    JoinFriend { ships: Vec<Ship>, game_id: Option<GameId> },
    JoinAi { ships: Vec<Ship> },
    Reconnect { game_id: GameId },
    Leave { game_id: GameId },
    Strike { game_id: GameId, target: Coordinate },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Game id is not valid.")]
    InvalidGameId,
    #[error("Game with that id does not exist")]
    GameNotFound,
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Row and/or column values are missing")]
    MissingCoordinates,
    #[error("Row and/or column values are not valid")]
    InvalidCoordinates,
    #[error("Wrong session for this game")]
    WrongSession,
    #[error("Game has not started yet")]
    NotStarted,
    #[error("Not your turn to play")]
    NotYourTurn,
    #[error("Can't hit same position twice")]
    AlreadyStruck,
    #[error("Can't join a game when already in one")]
    AlreadyInGame,
    #[error("Can't join a game without correct setup of ships.")]
    InvalidFleet(FleetError),
    #[error("Both players for this game are already active")]
    BothPlayersActive,
    #[error("No game with that id")]
    NoGame,
    #[error("Wrong game id")]
    WrongGameId,
}

/// What goes back to the sender of a rejected command.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Event { event: GameEvent, close: bool },
}

impl Rejection {
    pub fn reply(&self) -> Reply {
        match self {
            Rejection::NoGame => Reply::Event {
                event: GameEvent::new(GameEventType::NoGame),
                close: true,
            },
            Rejection::WrongGameId => Reply::Event {
                event: GameEvent::new(GameEventType::WrongGameId),
                close: false,
            },
            other => Reply::Text(other.to_string()),
        }
    }
}

pub fn parse_game_id(raw: Option<&str>) -> Result<GameId, Rejection> {
    let raw = raw.ok_or(Rejection::MissingField("gameId"))?;
    GameId::parse_str(raw).map_err(|_| Rejection::InvalidGameId)
}

fn parse_fleet(frame: &CommandFrame) -> Result<Vec<Ship>, Rejection> {
    let placements = frame.ships.as_deref().ok_or(Rejection::MissingField("ships"))?;
    fleet_from_placements(placements).map_err(Rejection::InvalidFleet)
}

fn parse_target(frame: &CommandFrame) -> Result<Coordinate, Rejection> {
    let (Some(row), Some(column)) = (frame.strike_row, frame.strike_column) else {
        return Err(Rejection::MissingCoordinates);
    };
    Coordinate::new(row, column).ok_or(Rejection::InvalidCoordinates)
}

/// Shapes a raw frame into a command, checking everything that does not
/// depend on live sessions.
pub fn parse_command(frame: &CommandFrame) -> Result<GameCommand, Rejection> {
    let command = match frame.command_type {
        CommandType::Join => GameCommand::Join {
            ships: parse_fleet(frame)?,
        },
        CommandType::JoinFriend => {
            let game_id = match frame.game_id.as_deref() {
                None | Some("") => None,
                Some(raw) => Some(parse_game_id(Some(raw))?),
            };
            GameCommand::JoinFriend {
                ships: parse_fleet(frame)?,
                game_id,
            }
        }
        CommandType::JoinAi => GameCommand::JoinAi {
            ships: parse_fleet(frame)?,
        },
        CommandType::Reconnect => GameCommand::Reconnect {
            game_id: parse_game_id(frame.game_id.as_deref())?,
        },
        CommandType::Leave => GameCommand::Leave {
            game_id: parse_game_id(frame.game_id.as_deref())?,
        },
        CommandType::Strike => GameCommand::Strike {
            game_id: parse_game_id(frame.game_id.as_deref())?,
            target: parse_target(frame)?,
        },
    };
    Ok(command)
}

pub fn validate_join(already_in_game: bool) -> Result<(), Rejection> {
    if already_in_game {
        return Err(Rejection::AlreadyInGame);
    }
    Ok(())
}

/// Seat a JOIN_FRIEND with an explicit id may take.
pub fn validate_join_friend(session: &GameSession) -> Result<(), Rejection> {
    if !session.against_friend || session.phase != Phase::WaitingFriend || !session.has_vacant_seat() {
        return Err(Rejection::WrongGameId);
    }
    Ok(())
}

/// Returns the seat the caller will take over.
pub fn validate_reconnect(session: &GameSession) -> Result<Seat, Rejection> {
    if session.is_closed() {
        return Err(Rejection::NoGame);
    }
    session.reconnectable_seat().ok_or(Rejection::BothPlayersActive)
}

pub fn validate_leave(session: &GameSession, connection: ConnectionId) -> Result<Seat, Rejection> {
    if session.is_closed() {
        return Err(Rejection::GameNotFound);
    }
    session.seat_of(connection).ok_or(Rejection::WrongSession)
}

pub fn validate_strike(
    session: &GameSession,
    connection: ConnectionId,
    target: Coordinate,
) -> Result<Seat, Rejection> {
    if session.is_closed() {
        return Err(Rejection::GameNotFound);
    }
    let seat = session.seat_of(connection).ok_or(Rejection::WrongSession)?;
    let Some(turn) = session.turn() else {
        return Err(Rejection::NotStarted);
    };
    if turn != seat {
        return Err(Rejection::NotYourTurn);
    }
    if is_position_struck(target, &session.slot(seat).strikes) {
        return Err(Rejection::AlreadyStruck);
    }
    Ok(seat)
}
