//! Server configuration
//!
//! The listen address comes from the first command line argument, the
//! rest from `LINE_CHAT_*` environment variables. Everything has a default.

use std::env;
use std::str::FromStr;

use crate::error::ConfigError;

/// Default listen address
pub const DEFAULT_ADDR: &str = "0.0.0.0:6677";

/// Default per-session outbound queue size
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 32;

const ENV_OVERFLOW: &str = "LINE_CHAT_OVERFLOW";
const ENV_OUTBOUND_CAPACITY: &str = "LINE_CHAT_OUTBOUND_CAPACITY";
const ENV_MAX_LINE: &str = "LINE_CHAT_MAX_LINE";

/// What the room does when a member's outbound queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Wait for the member's write loop to make room. A stalled client
    /// stalls every broadcast until it drains.
    #[default]
    Block,
    /// Log the member out instead of waiting.
    Disconnect,
}

impl FromStr for OverflowPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(Self::Block),
            "disconnect" => Ok(Self::Disconnect),
            _ => Err(ConfigError::InvalidOverflowPolicy(s.to_string())),
        }
    }
}

/// Runtime settings shared by the accept loop and every session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address the listener binds to
    pub bind_addr: String,
    /// Capacity of each session's outbound queue (at least 1)
    pub outbound_capacity: usize,
    /// Room behavior on a full outbound queue
    pub overflow_policy: OverflowPolicy,
    /// Longest accepted inbound line in bytes; `None` means unbounded
    pub max_line_length: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR.to_string(),
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
            max_line_length: None,
        }
    }
}

impl Config {
    /// Build the configuration from process arguments and environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_parts(
            env::args().nth(1),
            env::var(ENV_OVERFLOW).ok(),
            env::var(ENV_OUTBOUND_CAPACITY).ok(),
            env::var(ENV_MAX_LINE).ok(),
        )
    }

    fn from_parts(
        addr: Option<String>,
        overflow: Option<String>,
        outbound_capacity: Option<String>,
        max_line: Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = addr {
            config.bind_addr = addr;
        }
        if let Some(policy) = overflow {
            config.overflow_policy = policy.parse()?;
        }
        if let Some(capacity) = outbound_capacity {
            config.outbound_capacity = parse_positive(ENV_OUTBOUND_CAPACITY, &capacity)?;
        }
        if let Some(max) = max_line {
            config.max_line_length = Some(parse_positive(ENV_MAX_LINE, &max)?);
        }

        Ok(config)
    }
}

fn parse_positive(var: &'static str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            var,
            value: value.to_string(),
        }),
    }
}
