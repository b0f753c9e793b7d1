//! Time primitives for the synchrony clock
//!
//! A round-based protocol is parameterised by a single constant:
//! - Δ (synchrony bound): the assumed maximum one-way message delay
//!
//! Everything else is derived from it. A round is exactly 3Δ long.

use std::fmt;
use std::time::Duration;

use crate::{SynchronyError, SynchronyResult};

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Synchrony bound (Δ) - upper bound on one-way message delay
/// INVARIANT: Δ > 0 and 3Δ is representable as a `Duration`
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SynchronyBound(Duration);

impl SynchronyBound {
    /// Number of Δ-sized phases in a round
    pub const PHASES_PER_ROUND: u32 = 3;

    /// Default Δ (2 seconds)
    pub const DEFAULT: SynchronyBound = SynchronyBound(Duration::from_secs(2));

    /// Create a synchrony bound, rejecting zero and bounds whose round
    /// length would overflow
    pub fn new(delta: Duration) -> SynchronyResult<Self> {
        if delta.is_zero() {
            return Err(SynchronyError::InvalidSynchronyBound(
                "synchrony bound must be greater than zero".into(),
            ));
        }
        if delta.checked_mul(Self::PHASES_PER_ROUND).is_none() {
            return Err(SynchronyError::InvalidSynchronyBound(format!(
                "round length for {:?} overflows",
                delta
            )));
        }
        Ok(SynchronyBound(delta))
    }

    /// Create a synchrony bound from seconds
    ///
    /// This is the only conversion that may round (to nanosecond resolution).
    pub fn from_secs_f64(secs: f64) -> SynchronyResult<Self> {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(SynchronyError::InvalidSynchronyBound(format!(
                "synchrony bound must be a positive number of seconds, got {}",
                secs
            )));
        }
        let delta = Duration::try_from_secs_f64(secs)
            .map_err(|e| SynchronyError::InvalidSynchronyBound(e.to_string()))?;
        Self::new(delta)
    }

    #[inline]
    pub fn as_duration(self) -> Duration {
        self.0
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0.as_secs_f64()
    }

    /// Round length, always 3Δ
    #[inline]
    pub fn round_length(self) -> Duration {
        // Checked in `new`
        self.0 * Self::PHASES_PER_ROUND
    }
}

impl Default for SynchronyBound {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<Duration> for SynchronyBound {
    type Error = SynchronyError;

    fn try_from(delta: Duration) -> SynchronyResult<Self> {
        Self::new(delta)
    }
}

impl fmt::Debug for SynchronyBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Δ({:.3}s)", self.as_secs_f64())
    }
}

/// Round number - zero-based index of a 3Δ slice since the start instant
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RoundNumber(pub u64);

impl RoundNumber {
    pub const ZERO: RoundNumber = RoundNumber(0);

    #[inline]
    pub fn new(round: u64) -> Self {
        RoundNumber(round)
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn next(self) -> Self {
        RoundNumber(self.0.saturating_add(1))
    }
}

impl fmt::Display for RoundNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RoundNumber> for u64 {
    fn from(round: RoundNumber) -> Self {
        round.0
    }
}

/// Build a `Duration` from a nanosecond count, saturating at `Duration::MAX`
pub(crate) fn duration_from_nanos(nanos: u128) -> Duration {
    let secs = nanos / NANOS_PER_SEC;
    let subsec = (nanos % NANOS_PER_SEC) as u32;
    match u64::try_from(secs) {
        Ok(secs) => Duration::new(secs, subsec),
        Err(_) => Duration::MAX,
    }
}
