//! Line protocol definitions
//!
//! Every server → client line is a `ServerLine`. Lines are rendered
//! without their terminator; the `ChatCodec` appends `\n` on the wire.

use std::fmt;

/// Server → Client line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerLine {
    /// First line after connect
    Banner,
    /// Asks for the display name
    Prompt,
    /// Personalized greeting after login
    Greeting { name: String },
    /// A member joined the room
    Joined { name: String },
    /// A member left the room
    Disconnected { name: String },
    /// A chat line relayed from `from`
    Chat { from: String, text: String },
}

impl fmt::Display for ServerLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerLine::Banner => f.write_str("Welcome to my Chat Server!"),
            ServerLine::Prompt => f.write_str("Please enter your username:"),
            ServerLine::Greeting { name } => write!(f, "Welcome, {}", name),
            ServerLine::Joined { name } => write!(f, "*** {} has joined", name),
            ServerLine::Disconnected { name } => write!(f, "*** {} has disconnected", name),
            ServerLine::Chat { from, text } => write!(f, "[{}]: {}", from, text),
        }
    }
}

impl From<ServerLine> for String {
    fn from(line: ServerLine) -> Self {
        line.to_string()
    }
}
