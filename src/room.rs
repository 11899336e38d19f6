//! Room actor implementation
//!
//! The single coordinator that owns the membership table. Sessions never
//! touch the table; they submit `RoomCommand`s through a `RoomHandle`.
//! One channel carries every intent kind, so the run loop applies joins,
//! broadcasts and logouts in the exact order they arrive.

use std::collections::{HashMap, VecDeque};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::OverflowPolicy;
use crate::error::AppError;
use crate::message::ServerLine;
use crate::session::SessionHandle;

/// Intents sent from sessions to the Room actor
#[derive(Debug)]
pub enum RoomCommand {
    /// A logged-in session enters the room
    Join(SessionHandle),
    /// A fully formatted line for every member
    Broadcast(String),
    /// Remove the member with this name
    Logout(String),
    /// Sorted member names, answered after all earlier intents
    Members(oneshot::Sender<Vec<String>>),
}

/// Producer side of the room's intent channel
///
/// Submitting never waits. The room stops once every handle is dropped.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    sender: mpsc::UnboundedSender<RoomCommand>,
}

impl RoomHandle {
    pub fn join(&self, session: SessionHandle) -> Result<(), AppError> {
        self.submit(RoomCommand::Join(session))
    }

    pub fn broadcast(&self, line: impl Into<String>) -> Result<(), AppError> {
        self.submit(RoomCommand::Broadcast(line.into()))
    }

    pub fn logout(&self, name: impl Into<String>) -> Result<(), AppError> {
        self.submit(RoomCommand::Logout(name.into()))
    }

    /// Current member names, sorted
    pub async fn members(&self) -> Result<Vec<String>, AppError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.submit(RoomCommand::Members(reply_tx))?;
        reply_rx.await.map_err(|_| AppError::RoomClosed)
    }

    fn submit(&self, cmd: RoomCommand) -> Result<(), AppError> {
        self.sender.send(cmd).map_err(|_| AppError::RoomClosed)
    }

    /// A handle wired to a bare receiver instead of a running room
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, mpsc::UnboundedReceiver<RoomCommand>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

/// The Room actor
///
/// Exactly one task runs `run`, so membership changes and fan-out are
/// applied one intent at a time.
pub struct Room {
    /// Joined sessions: display name -> handle
    members: HashMap<String, SessionHandle>,
    /// What to do when a member's outbound queue is full
    policy: OverflowPolicy,
    /// Intent receiver channel
    receiver: mpsc::UnboundedReceiver<RoomCommand>,
}

impl Room {
    /// Create a room and the handle sessions use to reach it
    pub fn new(policy: OverflowPolicy) -> (Self, RoomHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let room = Self {
            members: HashMap::new(),
            policy,
            receiver,
        };
        (room, RoomHandle { sender })
    }

    /// Run the Room event loop
    ///
    /// Processes intents until all handles are dropped.
    pub async fn run(mut self) {
        info!("Room started ({:?} on full queues)", self.policy);

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        info!("Room shutting down");
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join(session) => self.handle_join(session).await,
            RoomCommand::Broadcast(line) => self.broadcast(line).await,
            RoomCommand::Logout(name) => self.handle_logout(name).await,
            RoomCommand::Members(reply) => {
                let mut names: Vec<String> = self.members.keys().cloned().collect();
                names.sort();
                let _ = reply.send(names);
            }
        }
    }

    /// Insert the session, displacing any member with the same name
    async fn handle_join(&mut self, session: SessionHandle) {
        let name = session.name().to_string();
        let id = session.id();

        if let Some(previous) = self.members.insert(name.clone(), session) {
            if previous.id() != id {
                info!(
                    "Session {} took over name '{}' from session {}",
                    id,
                    name,
                    previous.id()
                );
                previous.close();
            }
        }

        info!("'{}' joined (session {})", name, id);
        debug!("Total members: {}", self.members.len());

        self.broadcast(ServerLine::Joined { name }.to_string()).await;
    }

    /// Close and remove a member; unknown names are ignored
    async fn handle_logout(&mut self, name: String) {
        let Some(member) = self.members.remove(&name) else {
            debug!("Logout for '{}' ignored, not a member", name);
            return;
        };

        member.close();
        info!("'{}' disconnected (session {})", name, member.id());
        debug!("Total members: {}", self.members.len());

        self.broadcast(ServerLine::Disconnected { name }.to_string())
            .await;
    }

    /// Deliver a line to every member
    ///
    /// Members that cannot take the line (queue closed, or full under
    /// `OverflowPolicy::Disconnect`) are removed after the pass and their
    /// disconnect notice goes out as a follow-up broadcast.
    async fn broadcast(&mut self, line: String) {
        let mut pending = VecDeque::from([line]);

        while let Some(line) = pending.pop_front() {
            let mut dropped = Vec::new();

            for (name, member) in &self.members {
                let delivered = match self.policy {
                    OverflowPolicy::Block => member.send(line.clone()).await,
                    OverflowPolicy::Disconnect => member.try_send(line.clone()),
                };
                if let Err(e) = delivered {
                    warn!("Dropping '{}' (session {}): {}", name, member.id(), e);
                    dropped.push(name.clone());
                }
            }

            for name in dropped {
                if let Some(member) = self.members.remove(&name) {
                    member.close();
                    pending.push_back(ServerLine::Disconnected { name }.to_string());
                }
            }
        }
    }
}
