//! Inbound command dispatch.
//!
//! Subscribers opt in and out of broadcasts by messaging the relay:
//! `start` and `help` subscribe, `stop` unsubscribes. Any other text is
//! ignored without a reply.

use crate::relay::registry::SubscriberRegistry;
use crate::relay::transport::{InboundMessage, Transport, TransportError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const START_REPLY: &str = "Hello there!";
pub const HELP_REPLY: &str = "This bot is only for logging and is not interactive.";
pub const STOP_REPLY: &str = "I'll be back.";

/// Recognized inbound commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Stop,
}

impl Command {
    /// Parse a command from message text.
    ///
    /// Accepts `start`, `/start` and `/start@botname`, followed by optional
    /// arguments. Matching is case-sensitive.
    pub fn parse(text: &str) -> Option<Self> {
        let token = text.split_whitespace().next()?;
        let token = token.strip_prefix('/').unwrap_or(token);
        let name = token.split('@').next().unwrap_or(token);
        match name {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "stop" => Some(Command::Stop),
            _ => None,
        }
    }

    /// Acknowledgement sent back to the sender.
    pub fn reply(&self) -> &'static str {
        match self {
            Command::Start => START_REPLY,
            Command::Help => HELP_REPLY,
            Command::Stop => STOP_REPLY,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Start => write!(f, "start"),
            Command::Help => write!(f, "help"),
            Command::Stop => write!(f, "stop"),
        }
    }
}

/// Applies inbound commands to the subscriber registry.
///
/// Only takes the registry lock, never the broadcast path, so a command can
/// be handled while a broadcast is in flight.
pub struct CommandRouter {
    registry: Arc<SubscriberRegistry>,
    transport: Arc<dyn Transport>,
    send_timeout: Duration,
}

impl CommandRouter {
    /// Acknowledgements are bounded by `send_timeout`.
    pub fn new(
        registry: Arc<SubscriberRegistry>,
        transport: Arc<dyn Transport>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            transport,
            send_timeout,
        }
    }

    /// Handle one inbound message. Returns the command applied, if any.
    ///
    /// A failed acknowledgement is logged; the registry change stands.
    pub async fn handle(&self, message: &InboundMessage) -> Option<Command> {
        let command = match Command::parse(&message.text) {
            Some(command) => command,
            None => {
                debug!(subscriber = %message.sender, "ignoring non-command message");
                return None;
            }
        };

        match command {
            Command::Start | Command::Help => {
                self.registry.add(message.sender).await;
            }
            Command::Stop => {
                self.registry.remove(message.sender).await;
            }
        }
        debug!(subscriber = %message.sender, %command, "command applied");

        let ack = self.transport.send_message(message.sender, command.reply());
        let sent = match tokio::time::timeout(self.send_timeout, ack).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.send_timeout)),
        };
        if let Err(error) = sent {
            warn!(subscriber = %message.sender, %command, %error, "failed to acknowledge command");
        }
        Some(command)
    }
}
