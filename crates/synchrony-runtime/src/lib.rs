//! Synchrony Runtime - Node wiring for the protocol clock
//!
//! This crate connects the clock to the rest of a node:
//! 1. Load and validate node configuration
//! 2. Initialise logging
//! 3. Arm the clock on the start signal
//! 4. Report round and send window state once per second
//! 5. Stop the reporter on shutdown

pub mod config;
pub mod node;
pub mod observability;
pub mod reporter;

pub use config::*;
pub use node::*;
pub use observability::*;
pub use reporter::*;
