//! Synchrony Core - Fundamental round primitives
//!
//! This crate defines the types shared by every synchrony crate:
//! - The synchrony bound Δ and the derived round length (3Δ)
//! - Round numbers and the three phases of a round
//! - Exact round schedule arithmetic over elapsed time
//! - Error types

pub mod error;
pub mod round;
pub mod time;

pub use error::*;
pub use round::*;
pub use time::*;
