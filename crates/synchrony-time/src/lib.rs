//! Synchrony Time - the local timing oracle of a round-based protocol
//!
//! This crate implements the protocol clock:
//! - Time sources (monotonic OS clock, hand-driven clock)
//! - Start signal handling with an explicit repeated-start policy
//! - Round number and send window queries
//! - Status snapshots for observability

pub mod clock;
pub mod source;
pub mod status;

pub use clock::*;
pub use source::*;
pub use status::*;
