//! Broadcast Relay
//!
//! Streams training progress to remote subscribers:
//! - Thread-safe subscriber registry
//! - Inbound start/help/stop command dispatch
//! - Best-effort fan-out with per-subscriber failure isolation
//! - Pluggable message transport

pub mod broadcast;
pub mod command;
pub mod registry;
pub mod transport;
pub mod wire;

pub use broadcast::{BroadcastRelay, DeliveryReport};
pub use command::{Command, CommandRouter};
pub use registry::SubscriberRegistry;
pub use transport::{InboundMessage, LoopbackTransport, Transport, TransportError};
