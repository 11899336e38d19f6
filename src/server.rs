//! Accept loop
//!
//! Hands every accepted TCP connection to its own handler task. Errors on
//! one connection, or on a single accept, never stop the server.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::room::RoomHandle;
use crate::types::SessionId;

/// Pause after a failed accept, so descriptor exhaustion does not spin
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accept connections forever
pub async fn serve(listener: TcpListener, room: RoomHandle, config: Arc<Config>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let id = SessionId::new();
                info!("New connection from {} (session {})", addr, id);

                let room = room.clone();
                let config = Arc::clone(&config);

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    match handle_connection(stream, id, room, config).await {
                        Ok(()) => {}
                        Err(AppError::LoginAborted) => {
                            debug!("Session {} from {} left before logging in", id, addr);
                        }
                        Err(e) => {
                            error!("Connection handler error for {}: {}", id, e);
                        }
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}
