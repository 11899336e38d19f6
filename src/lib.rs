//! Line-Oriented TCP Chat Server Library
//!
//! A multi-client chat room over plain newline-terminated text, built on
//! tokio with the Actor pattern for state management.
//!
//! # Protocol
//! - Server greets with a banner and asks for a display name
//! - Every joined client receives join/leave notices and
//!   `[name]: text` lines for each non-empty line any member sends
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Room` is the central actor owning the membership table
//! - Each connection runs a read task and a write task
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use line_chat::{serve, Config, Room};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let listener = TcpListener::bind(&config.bind_addr).await.unwrap();
//!     let (room, handle) = Room::new(config.overflow_policy);
//!
//!     tokio::spawn(room.run());
//!     serve(listener, handle, Arc::new(config)).await;
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod room;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use codec::ChatCodec;
pub use config::{Config, OverflowPolicy};
pub use error::{AppError, CodecError, ConfigError, SendError};
pub use handler::handle_connection;
pub use message::ServerLine;
pub use room::{Room, RoomCommand, RoomHandle};
pub use server::serve;
pub use session::{Session, SessionHandle};
pub use types::SessionId;
