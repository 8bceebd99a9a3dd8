//! Runtime configuration for the game server.

use std::time::Duration;

pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_AI_RESPONSE_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_RECONNECT_GRACE: Duration = Duration::from_secs(10);
pub const DEFAULT_RATE_LIMIT: u32 = 20;
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to
    pub bind_address: String,
    /// Time a player has to strike before the game is forfeited
    pub turn_timeout: Duration,
    /// Pause before the computer opponent answers a strike
    pub ai_response_delay: Duration,
    /// How long an AI game survives after its human player disconnects
    pub reconnect_grace: Duration,
    /// Inbound messages accepted per connection within one window
    pub rate_limit: u32,
    pub rate_window: Duration,
    /// Accepted `Origin` header values; empty accepts any origin
    pub allowed_origins: Vec<String>,
    /// Request path the WebSocket endpoint is served on
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            turn_timeout: DEFAULT_TURN_TIMEOUT,
            ai_response_delay: DEFAULT_AI_RESPONSE_DELAY,
            reconnect_grace: DEFAULT_RECONNECT_GRACE,
            rate_limit: DEFAULT_RATE_LIMIT,
            rate_window: DEFAULT_RATE_WINDOW,
            allowed_origins: Vec::new(),
            path: "/play".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn is_origin_allowed(&self, origin: Option<&str>) -> bool {
        if self.allowed_origins.is_empty() {
            return true;
        }
        origin.is_some_and(|o| self.allowed_origins.iter().any(|allowed| allowed == o))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timings() {
        let config = ServerConfig::default();
        assert_eq!(config.turn_timeout, Duration::from_secs(120));
        assert_eq!(config.ai_response_delay, Duration::from_secs(2));
        assert_eq!(config.reconnect_grace, Duration::from_secs(10));
        assert_eq!(config.path, "/play");
    }

    #[test]
    fn test_origin_allow_list() {
        let mut config = ServerConfig::default();
        assert!(config.is_origin_allowed(None));
        assert!(config.is_origin_allowed(Some("http://anywhere")));

        config.allowed_origins = vec!["https://battleship.example".to_string()];
        assert!(config.is_origin_allowed(Some("https://battleship.example")));
        assert!(!config.is_origin_allowed(Some("http://evil.example")));
        assert!(!config.is_origin_allowed(None));
    }
}
