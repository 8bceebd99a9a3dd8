//! JSON wire format between clients and the game server.
//!
//! Inbound messages are `CommandFrame`s tagged by `type`; outbound messages
//! are `GameEvent`s tagged by `eventType`. Optional fields that are absent
//! are omitted from the serialized JSON.

use crate::{Ship, ShipPlacement, Strike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Keep-alive payload. Answered with [`PONG`] and never parsed as JSON.
pub const PING: &str = "ping";
pub const PONG: &str = "pong";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    Join,
    JoinFriend,
    JoinAi,
    Reconnect,
    Leave,
    Strike,
}

/// Raw inbound command. Every field except `type` is optional at this layer;
/// which ones are required depends on the command type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFrame {
    #[serde(rename = "type")]
    pub command_type: CommandType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strike_row: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strike_column: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ships: Option<Vec<ShipPlacement>>,
}

impl CommandFrame {
    pub fn new(command_type: CommandType) -> Self {
        Self {
            command_type,
            game_id: None,
            strike_row: None,
            strike_column: None,
            ships: None,
        }
    }

    pub fn join(command_type: CommandType, ships: Vec<ShipPlacement>) -> Self {
        Self {
            ships: Some(ships),
            ..Self::new(command_type)
        }
    }

    pub fn with_game_id(mut self, game_id: impl Into<String>) -> Self {
        self.game_id = Some(game_id.into());
        self
    }

    pub fn strike(game_id: impl Into<String>, row: i32, column: i32) -> Self {
        Self {
            strike_row: Some(row),
            strike_column: Some(column),
            ..Self::new(CommandType::Strike)
        }
        .with_game_id(game_id)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameEventType {
    WaitingOpponent,
    WaitingFriend,
    TurnOwn,
    TurnOpponent,
    Won,
    Lost,
    OpponentLeft,
    TimeoutOwn,
    TimeoutOpponent,
    NoGame,
    WrongGameId,
}

impl GameEventType {
    /// Events after which the server closes the receiving connection.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GameEventType::Won
                | GameEventType::Lost
                | GameEventType::OpponentLeft
                | GameEventType::TimeoutOwn
                | GameEventType::TimeoutOpponent
                | GameEventType::NoGame
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<Uuid>,
    pub event_type: GameEventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub own_strikes: Option<Vec<Strike>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponent_strikes: Option<Vec<Strike>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_left: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub own_active_ships: Option<Vec<ShipPlacement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub own_sunken_ships: Option<Vec<ShipPlacement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponent_sunken_ships: Option<Vec<ShipPlacement>>,
}

impl GameEvent {
    pub fn new(event_type: GameEventType) -> Self {
        Self {
            game_id: None,
            event_type,
            own_strikes: None,
            opponent_strikes: None,
            time_left: None,
            own_active_ships: None,
            own_sunken_ships: None,
            opponent_sunken_ships: None,
        }
    }

    pub fn game_id(mut self, game_id: Uuid) -> Self {
        self.game_id = Some(game_id);
        self
    }

    pub fn time_left(mut self, seconds: u64) -> Self {
        self.time_left = Some(seconds);
        self
    }

    pub fn own_strikes(mut self, strikes: &[Strike]) -> Self {
        self.own_strikes = Some(strikes.to_vec());
        self
    }

    pub fn opponent_strikes(mut self, strikes: &[Strike]) -> Self {
        self.opponent_strikes = Some(strikes.to_vec());
        self
    }

    pub fn own_active_ships(mut self, ships: &[Ship]) -> Self {
        self.own_active_ships = Some(crate::to_placements(ships));
        self
    }

    pub fn own_sunken_ships(mut self, ships: &[Ship]) -> Self {
        self.own_sunken_ships = Some(crate::to_placements(ships));
        self
    }

    pub fn opponent_sunken_ships(mut self, ships: &[Ship]) -> Self {
        self.opponent_sunken_ships = Some(crate::to_placements(ships));
        self
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
