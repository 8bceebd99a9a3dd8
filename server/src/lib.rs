//! # Battleship Session Server
//!
//! This library hosts real-time two-player Battleship games over WebSockets.
//! The server owns every board: clients submit their fleet once when joining
//! and afterwards only send strike coordinates. All hits, sinks and wins are
//! decided here and pushed back to both players as JSON events.
//!
//! ## Core Responsibilities
//!
//! ### Matchmaking
//! Three ways into a game:
//! - `JOIN` pairs the caller with the oldest open public game, or opens one
//! - `JOIN_FRIEND` opens a private game, or joins one by its id
//! - `JOIN_AI` starts immediately against a computer opponent
//!
//! ### Turn Enforcement
//! Exactly one seat may strike at a time. Each turn runs against a countdown;
//! when it lapses the player on turn loses and the session is torn down.
//!
//! ### Reconnection
//! A player who drops out of a game against the computer keeps their seat for
//! a short grace period and can `RECONNECT` with the game id.
//!
//! ## Architecture Design
//!
//! ### Session-Scoped Locking
//! Every session lives behind its own async mutex, so unrelated games never
//! contend. The registry maps are guarded by short synchronous locks that are
//! never held across an await point.
//!
//! ### Outbound Queues
//! Each socket has a dedicated writer task fed by an unbounded channel. Game
//! logic only pushes text into [`connections::ConnectionHub`] and never waits
//! on a slow client.
//!
//! ## Module Organization
//!
//! ### Game Rules (`session`, `ai`, `stats`)
//! - Session phases, seats, the per-turn countdown
//! - Computer fleet placement and strike selection
//! - End-of-game statistics and running totals
//!
//! ### Request Handling (`validation`, `orchestrator`, `events`)
//! - Command parsing and rule checks with exact rejection texts
//! - Join/strike/leave/reconnect flows and background timers
//! - Event construction for each player's point of view
//!
//! ### Plumbing (`network`, `connections`, `dispatch`, `registry`, `rate_limit`, `config`)
//! - WebSocket accept loop with path and origin filtering
//! - Per-connection outbound channels and event delivery
//! - Session lookup by game id and by connection
//! - Fixed-window inbound rate limiting
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//! use server::stats::StatsLedger;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         bind_address: "127.0.0.1:8080".to_string(),
//!         ..ServerConfig::default()
//!     };
//!
//!     let server = Server::bind(config, Arc::new(StatsLedger::new())).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod ai;
pub mod config;
pub mod connections;
pub mod dispatch;
pub mod events;
pub mod network;
pub mod orchestrator;
pub mod rate_limit;
pub mod registry;
pub mod session;
pub mod stats;
pub mod validation;
