//! Headless client that plays one game against the computer opponent.
//!
//! Places a random fleet, then answers every `TURN_OWN` with the same
//! targeting the server's computer player uses, until the game ends.

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use server::ai;
use shared::{to_placements, CommandFrame, CommandType, GameEvent, GameEventType, Ship, Strike, PING, PONG};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// WebSocket endpoint of the server
    #[clap(short, long, default_value = "ws://127.0.0.1:8080/play")]
    url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let (ws_stream, _) = connect_async(args.url.as_str()).await?;
    info!("Connected to {}", args.url);
    let (mut write, mut read) = ws_stream.split();

    let mut rng = rand::thread_rng();
    let fleet = ai::generate_fleet(&mut rng);
    write.send(Message::Text(PING.to_string())).await?;
    let join = CommandFrame::join(CommandType::JoinAi, to_placements(&fleet));
    write.send(Message::Text(join.to_json()?)).await?;

    let mut game_id = None;
    let mut strikes: Vec<Strike> = Vec::new();
    let mut sunken: Vec<Ship> = Vec::new();
    let mut turns = 0u32;
    while let Some(frame) = read.next().await {
        let text = match frame? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        if text == PONG {
            info!("Server answered ping");
            continue;
        }

        let event = match GameEvent::from_json(&text) {
            Ok(event) => event,
            Err(_) => {
                warn!("Server said: {}", text);
                continue;
            }
        };

        if event.game_id.is_some() {
            game_id = event.game_id;
        }
        if let Some(own) = event.own_strikes {
            strikes = own;
        }
        if let Some(placements) = event.opponent_sunken_ships {
            sunken = placements
                .iter()
                .filter_map(|placement| Ship::from_placement(placement).ok())
                .collect();
        }

        match event.event_type {
            GameEventType::TurnOwn => {
                let Some(id) = game_id else {
                    warn!("Turn event before the game id was known");
                    continue;
                };
                let Some(target) = ai::next_strike(&mut rng, &strikes, &sunken, &[]) else {
                    warn!("No cells left to strike");
                    break;
                };

                turns += 1;
                info!("Turn {}: striking {}", turns, target);
                let strike = CommandFrame::strike(id.to_string(), target.row as i32, target.column as i32);
                write.send(Message::Text(strike.to_json()?)).await?;
            }
            GameEventType::TurnOpponent => {
                if let Some(last) = strikes.last() {
                    info!("{} was a {}", last.coordinate, if last.hit { "hit" } else { "miss" });
                }
            }
            other if other.is_terminal() => {
                info!("Game over after {} turns: {:?}", turns, other);
                break;
            }
            other => info!("Event: {:?}", other),
        }
    }

    Ok(())
}
