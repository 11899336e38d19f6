//! Connection handler
//!
//! Drives one accepted connection through its lifecycle: login, join,
//! then the session's read and write loops until both have finished.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::AppError;
use crate::room::RoomHandle;
use crate::session::Session;
use crate::types::SessionId;

/// Handle a new connection
///
/// A failed login returns the error and leaves no trace in the room. The
/// join intent is queued before the read loop starts, so a member's own
/// messages always follow their join notice.
pub async fn handle_connection<T>(
    transport: T,
    id: SessionId,
    room: RoomHandle,
    config: Arc<Config>,
) -> Result<(), AppError>
where
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let session = Session::login(id, transport, &config).await?;
    let name = session.name().to_string();

    room.join(session.handle())?;

    let (reader, writer) = session.start(room);
    let (read_result, write_result) = tokio::join!(reader, writer);

    if let Err(e) = read_result {
        debug!("Read task for {} failed: {}", id, e);
    }
    if let Err(e) = write_result {
        debug!("Write task for {} failed: {}", id, e);
    }

    info!("Session {} ('{}') closed", id, name);

    Ok(())
}
