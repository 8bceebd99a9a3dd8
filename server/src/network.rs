//! WebSocket front end: accepts connections and shuttles text frames between
//! sockets and the game service.

use crate::config::ServerConfig;
use crate::connections::{ConnectionHub, Outbound};
use crate::dispatch::Transport;
use crate::orchestrator::GameService;
use crate::rate_limit::{Budget, Decision, RateLimiter};
use crate::stats::StatsSink;
use crate::validation::TOO_MANY_REQUESTS_TEXT;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Listening server with its game service and connection hub
pub struct Server {
    listener: TcpListener,
    config: Arc<ServerConfig>,
    service: Arc<GameService>,
    hub: Arc<ConnectionHub>,
    limiter: Arc<RateLimiter>,
}

impl Server {
    pub async fn bind(config: ServerConfig, stats: Arc<dyn StatsSink>) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.bind_address)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.bind_address.clone(),
                source,
            })?;
        info!(
            "Server listening on ws://{}{}",
            listener.local_addr()?,
            config.path
        );

        let hub = Arc::new(ConnectionHub::new());
        let service = GameService::new(config.clone(), hub.clone(), stats);
        let limiter = Arc::new(RateLimiter::new(config.rate_limit));

        Ok(Self {
            listener,
            config: Arc::new(config),
            service,
            hub,
            limiter,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn service(&self) -> Arc<GameService> {
        Arc::clone(&self.service)
    }

    /// Accepts connections until the task is dropped.
    pub async fn run(self) -> Result<(), ServerError> {
        let reset_task = self.limiter.spawn_reset_task(self.config.rate_window);

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("TCP connection from {}", addr);
                    tokio::spawn(handle_connection(
                        stream,
                        addr,
                        Arc::clone(&self.config),
                        Arc::clone(&self.service),
                        Arc::clone(&self.hub),
                        Arc::clone(&self.limiter),
                    ));
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                    if is_fatal(&e) {
                        reset_task.abort();
                        return Err(e.into());
                    }
                }
            }
        }
    }
}

fn is_fatal(error: &std::io::Error) -> bool {
    !matches!(
        error.kind(),
        std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::Interrupted
            | std::io::ErrorKind::WouldBlock
    ) && error.raw_os_error() != Some(24)
}

/// Handshake filter: only the configured path and allowed origins upgrade.
fn check_handshake(config: &ServerConfig, request: &Request) -> Result<(), ErrorResponse> {
    if request.uri().path() != config.path {
        return Err(reject(StatusCode::NOT_FOUND, "Unknown path"));
    }

    let origin = request
        .headers()
        .get("origin")
        .and_then(|value| value.to_str().ok());
    if !config.is_origin_allowed(origin) {
        warn!("Rejected handshake from origin {:?}", origin);
        return Err(reject(StatusCode::FORBIDDEN, "Origin not allowed"));
    }

    Ok(())
}

fn reject(status: StatusCode, reason: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(reason.to_string()));
    *response.status_mut() = status;
    response
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    config: Arc<ServerConfig>,
    service: Arc<GameService>,
    hub: Arc<ConnectionHub>,
    limiter: Arc<RateLimiter>,
) {
    let handshake_config = Arc::clone(&config);
    let callback = move |request: &Request, response: Response| {
        check_handshake(&handshake_config, request).map(|_| response)
    };

    let ws_stream = match accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake failed for {}: {}", addr, e);
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (connection, mut outbound) = hub.register();
    info!("Client {} connected from {}", connection, addr);

    let writer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            match message {
                Outbound::Text(text) => {
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Outbound::Close => {
                    if let Err(e) = ws_sender.close().await {
                        debug!("Close handshake failed: {}", e);
                    }
                    break;
                }
            }
        }
    });

    let mut budget = Budget::default();
    while let Some(frame) = ws_receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => match limiter.check(&mut budget) {
                Decision::Allow => service.handle_message(connection, &text).await,
                Decision::Reject { notify } => {
                    warn!("Client {} exceeded the message rate", connection);
                    if notify {
                        if let Err(e) = hub.send(connection, TOO_MANY_REQUESTS_TEXT.to_string()) {
                            debug!("{}", e);
                        }
                    }
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("WebSocket error for {}: {}", connection, e);
                break;
            }
        }
    }

    service.handle_disconnect(connection).await;
    hub.remove(connection);
    if let Err(e) = writer.await {
        error!("Writer task for {} failed: {}", connection, e);
    }
    info!("Client {} disconnected", connection);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::tungstenite::http;

    fn request(path: &str, origin: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri(path);
        if let Some(origin) = origin {
            builder = builder.header("Origin", origin);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_handshake_path() {
        let config = ServerConfig::default();
        assert!(check_handshake(&config, &request("/play", None)).is_ok());

        let rejected = check_handshake(&config, &request("/other", None)).unwrap_err();
        assert_eq!(rejected.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_handshake_origin() {
        let config = ServerConfig {
            allowed_origins: vec!["https://play.example".to_string()],
            ..ServerConfig::default()
        };

        assert!(check_handshake(&config, &request("/play", Some("https://play.example"))).is_ok());

        let rejected = check_handshake(&config, &request("/play", Some("https://other.example"))).unwrap_err();
        assert_eq!(rejected.status(), StatusCode::FORBIDDEN);
        assert!(check_handshake(&config, &request("/play", None)).is_err());
    }

    #[test]
    fn test_accept_errors_classified() {
        use std::io::{Error, ErrorKind};
        assert!(!is_fatal(&Error::from(ErrorKind::ConnectionAborted)));
        assert!(is_fatal(&Error::from(ErrorKind::PermissionDenied)));
    }
}
