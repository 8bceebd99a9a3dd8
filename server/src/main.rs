use clap::Parser;
use log::{error, info};
use server::config::{self, ServerConfig};
use server::network::Server;
use server::stats::StatsLedger;
use std::sync::Arc;
use std::time::Duration;

/// Main-method of the application.
/// Parses command-line arguments, then runs the WebSocket server until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "8080")]
        port: u16,
        /// WebSocket endpoint path
        #[clap(long, default_value = "/play")]
        path: String,
        /// Seconds a player has to make a strike
        #[clap(long, default_value_t = config::DEFAULT_TURN_TIMEOUT.as_secs())]
        turn_timeout: u64,
        /// Milliseconds the computer opponent waits before striking
        #[clap(long, default_value_t = config::DEFAULT_AI_RESPONSE_DELAY.as_millis() as u64)]
        ai_delay_ms: u64,
        /// Seconds an AI game is kept after its player disconnects
        #[clap(long, default_value_t = config::DEFAULT_RECONNECT_GRACE.as_secs())]
        reconnect_grace: u64,
        /// Messages accepted per connection each second
        #[clap(long, default_value_t = config::DEFAULT_RATE_LIMIT)]
        rate_limit: u32,
        /// Allowed Origin header value (repeatable; none allows any)
        #[clap(long = "allowed-origin")]
        allowed_origins: Vec<String>,
    }

    // Parse command line arguments
    let args = Args::parse();

    let config = ServerConfig {
        bind_address: format!("{}:{}", args.host, args.port),
        turn_timeout: Duration::from_secs(args.turn_timeout),
        ai_response_delay: Duration::from_millis(args.ai_delay_ms),
        reconnect_grace: Duration::from_secs(args.reconnect_grace),
        rate_limit: args.rate_limit,
        allowed_origins: args.allowed_origins,
        path: args.path,
        ..ServerConfig::default()
    };

    let ledger = Arc::new(StatsLedger::new());
    let server = Server::bind(config, ledger.clone()).await?;
    let server_handle = tokio::spawn(server.run());

    // Handle shutdown gracefully
    tokio::select! {
        result = server_handle => {
            match result {
                Ok(Err(e)) => error!("Server stopped: {}", e),
                Err(e) => error!("Server task panicked: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    let totals = ledger.totals();
    info!(
        "Games finished: {} player vs player, {} against the computer ({} won by players)",
        totals.pvp.games, totals.ai.games, totals.won_against_ai
    );

    Ok(())
}
