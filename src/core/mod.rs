//! Core utilities and common types for trainwatch.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ObserverConfig, RelaySettings, TransportCredentials};
pub use error::{Error, Result};
pub use types::*;
