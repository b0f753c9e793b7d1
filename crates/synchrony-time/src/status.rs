//! Status snapshots of the protocol clock

use std::fmt;

use synchrony_core::RoundNumber;

/// Sampled clock state, as reported once per second
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SynchronyStatus {
    /// Current round, `None` before the start signal
    pub round: Option<RoundNumber>,
    /// Whether the node is inside its send window
    pub should_send: bool,
}

impl SynchronyStatus {
    pub const UNSTARTED: SynchronyStatus = SynchronyStatus {
        round: None,
        should_send: false,
    };
}

impl fmt::Display for SynchronyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.round {
            Some(round) => write!(f, "Round: {}  Should send: {}", round, self.should_send),
            None => write!(f, "Round: none  Should send: {}", self.should_send),
        }
    }
}
