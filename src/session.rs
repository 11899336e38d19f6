//! Per-connection session
//!
//! A `Session` performs the login handshake on a framed transport, then
//! splits it into a read loop (client lines → room intents) and a write
//! loop (outbound queue → client). The room only ever holds a
//! `SessionHandle`: the outbound sender plus the close signal.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec::ChatCodec;
use crate::config::Config;
use crate::error::{AppError, SendError};
use crate::message::ServerLine;
use crate::room::RoomHandle;
use crate::types::SessionId;

type LineStream<T> = SplitStream<Framed<T, ChatCodec>>;
type LineSink<T> = SplitSink<Framed<T, ChatCodec>, String>;

/// The room's reference to a joined session
///
/// Cloning is cheap. Dropping every handle closes the outbound queue,
/// which also ends the write loop.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    name: String,
    sender: mpsc::Sender<String>,
    disconnecting: CancellationToken,
}

impl SessionHandle {
    /// Create a handle from its parts
    pub fn new(
        id: SessionId,
        name: String,
        sender: mpsc::Sender<String>,
        disconnecting: CancellationToken,
    ) -> Self {
        Self {
            id,
            name,
            sender,
            disconnecting,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue a line, waiting for space if the queue is full
    pub async fn send(&self, line: String) -> Result<(), SendError> {
        self.sender
            .send(line)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Queue a line without waiting
    pub fn try_send(&self, line: String) -> Result<(), SendError> {
        self.sender.try_send(line).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Mark the session as disconnecting and stop both loops
    ///
    /// Idempotent. The loops shut the transport down on their way out.
    pub fn close(&self) {
        self.disconnecting.cancel();
    }

    #[cfg(test)]
    pub(crate) fn is_disconnecting(&self) -> bool {
        self.disconnecting.is_cancelled()
    }
}

/// A logged-in connection whose loops have not started yet
pub struct Session<T> {
    id: SessionId,
    name: String,
    framed: Framed<T, ChatCodec>,
    outbound_tx: mpsc::Sender<String>,
    outbound_rx: mpsc::Receiver<String>,
    disconnecting: CancellationToken,
}

impl<T> Session<T>
where
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    /// Run the login handshake
    ///
    /// Sends the banner and prompt, then reads the display name. Blank
    /// names are prompted for again; any other name is kept as sent.
    /// Fails if the peer goes away or the line is too long; the session
    /// is then never joined.
    pub async fn login(id: SessionId, transport: T, config: &Config) -> Result<Self, AppError> {
        let codec = match config.max_line_length {
            Some(max) => ChatCodec::new_with_max_length(max),
            None => ChatCodec::new(),
        };
        let mut framed = Framed::new(transport, codec);

        framed.send(ServerLine::Banner.to_string()).await?;
        framed.send(ServerLine::Prompt.to_string()).await?;

        let name = loop {
            match framed.next().await {
                Some(Ok(line)) => {
                    if !line.trim().is_empty() {
                        break line;
                    }
                    debug!("Session {} sent a blank name, prompting again", id);
                    framed.send(ServerLine::Prompt.to_string()).await?;
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Err(AppError::LoginAborted),
            }
        };

        framed
            .send(
                ServerLine::Greeting {
                    name: name.clone(),
                }
                .to_string(),
            )
            .await?;

        info!("Session {} logged in as '{}'", id, name);

        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_capacity.max(1));

        Ok(Self {
            id,
            name,
            framed,
            outbound_tx,
            outbound_rx,
            disconnecting: CancellationToken::new(),
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle to register with the room
    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(
            self.id,
            self.name.clone(),
            self.outbound_tx.clone(),
            self.disconnecting.clone(),
        )
    }

    /// Spawn the read and write loops
    ///
    /// Returns the (read, write) task handles. The session keeps no sender
    /// of its own, so the outbound queue lives only as long as the room
    /// holds a handle.
    pub fn start(self, room: RoomHandle) -> (JoinHandle<()>, JoinHandle<()>) {
        let Session {
            id,
            name,
            framed,
            outbound_tx,
            outbound_rx,
            disconnecting,
        } = self;
        drop(outbound_tx);

        let (sink, stream) = framed.split();

        let reader = tokio::spawn(read_loop(
            id,
            name.clone(),
            stream,
            room.clone(),
            disconnecting.clone(),
        ));
        let writer = tokio::spawn(write_loop(id, name, sink, outbound_rx, room, disconnecting));

        (reader, writer)
    }
}

/// Client lines → room intents
async fn read_loop<T>(
    id: SessionId,
    name: String,
    mut stream: LineStream<T>,
    room: RoomHandle,
    disconnecting: CancellationToken,
) where
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    loop {
        let frame = tokio::select! {
            biased;
            _ = disconnecting.cancelled() => break,
            frame = stream.next() => frame,
        };

        if disconnecting.is_cancelled() {
            break;
        }

        match frame {
            Some(Ok(line)) => {
                if line.is_empty() {
                    continue;
                }
                let chat = ServerLine::Chat {
                    from: name.clone(),
                    text: line,
                };
                if room.broadcast(chat.to_string()).is_err() {
                    debug!("Room closed, ending read loop for {}", id);
                    break;
                }
            }
            Some(Err(e)) => {
                warn!("Read error for {} ('{}'): {}", id, name, e);
                let _ = room.logout(name.clone());
                break;
            }
            None => {
                debug!("Session {} ('{}') reached end of stream", id, name);
                let _ = room.logout(name.clone());
                break;
            }
        }
    }
    debug!("Read loop ended for {}", id);
}

/// Outbound queue → client
async fn write_loop<T>(
    id: SessionId,
    name: String,
    mut sink: LineSink<T>,
    mut outbound: mpsc::Receiver<String>,
    room: RoomHandle,
    disconnecting: CancellationToken,
) where
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    loop {
        let line = tokio::select! {
            biased;
            _ = disconnecting.cancelled() => break,
            line = outbound.recv() => match line {
                Some(line) => line,
                None => break,
            },
        };

        // `send` flushes after writing.
        if let Err(e) = sink.send(line).await {
            warn!("Write error for {} ('{}'): {}", id, name, e);
            // A session the room already closed must not evict the new
            // holder of its name.
            if !disconnecting.is_cancelled() {
                let _ = room.logout(name.clone());
            }
            disconnecting.cancel();
            break;
        }
    }
    debug!("Write loop ended for {}", id);

    let _ = sink.close().await;
}
