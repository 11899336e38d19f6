//! Line chat server - Entry Point
//!
//! Starts the TCP listener and Room actor, accepting connections.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use line_chat::{serve, Config, Room};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=line_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("line_chat=info")),
        )
        .init();

    // Bind address from the first argument, tuning from LINE_CHAT_* vars
    let config = Config::from_env()?;

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Chat server listening on {}", config.bind_addr);

    let (room, room_handle) = Room::new(config.overflow_policy);
    tokio::spawn(room.run());

    serve(listener, room_handle, Arc::new(config)).await;

    Ok(())
}
