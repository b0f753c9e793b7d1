//! Synchrony Test Harness - round simulation and protocol validation
//!
//! This crate provides:
//! - Message delay models (bounded and bound-violating)
//! - Multi-node round simulation on a shared hand-driven clock
//! - Delivery-before-round-end verification of the send window

pub mod delay;
pub mod round_simulator;

pub use delay::*;
pub use round_simulator::*;
