//! Protocol clock - round number and send window from the start instant

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use synchrony_core::{
    RoundNumber, RoundPosition, RoundSchedule, SynchronyBound, SynchronyError, SynchronyResult,
};

use crate::{SynchronyStatus, SystemTimeSource, TimeSource};

/// What to do with a start signal once the clock is already started
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StartPolicy {
    /// Last start signal wins: the round origin moves to the new instant
    #[default]
    Rearm,
    /// Keep the first start instant, silently drop later signals
    IgnoreRepeated,
    /// Refuse later signals with [`SynchronyError::AlreadyStarted`]
    Reject,
}

impl StartPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            StartPolicy::Rearm => "rearm",
            StartPolicy::IgnoreRepeated => "ignore",
            StartPolicy::Reject => "reject",
        }
    }
}

impl fmt::Display for StartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StartPolicy {
    type Err = SynchronyError;

    fn from_str(s: &str) -> SynchronyResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rearm" => Ok(StartPolicy::Rearm),
            "ignore" | "ignore-repeated" => Ok(StartPolicy::IgnoreRepeated),
            "reject" => Ok(StartPolicy::Reject),
            other => Err(SynchronyError::InvalidConfig(format!(
                "unknown start policy '{}' (expected rearm, ignore or reject)",
                other
            ))),
        }
    }
}

/// Result of a start signal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    /// First start signal, the clock is now started
    Armed,
    /// Clock was already started, origin moved to now
    Rearmed,
    /// Clock was already started, signal dropped
    Ignored,
}

impl StartOutcome {
    #[inline]
    pub fn is_first_arm(self) -> bool {
        matches!(self, StartOutcome::Armed)
    }
}

/// Protocol clock configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClockConfig {
    /// Synchrony bound Δ; the round length is always 3Δ
    pub synchrony_bound: SynchronyBound,
    /// Handling of repeated start signals
    pub start_policy: StartPolicy,
}

impl ClockConfig {
    pub fn new(synchrony_bound: SynchronyBound) -> Self {
        ClockConfig {
            synchrony_bound,
            start_policy: StartPolicy::default(),
        }
    }

    pub fn with_start_policy(mut self, start_policy: StartPolicy) -> Self {
        self.start_policy = start_policy;
        self
    }
}

/// Protocol clock
///
/// Unstarted until [`on_start_signal`](Self::on_start_signal) is called, then
/// started for the rest of its life. All queries are non-blocking for each
/// other and may be called from any thread; only the start signal takes the
/// write side of the lock.
pub struct SynchronyClock {
    schedule: RoundSchedule,
    start_policy: StartPolicy,
    source: Arc<dyn TimeSource>,
    /// Start instant, `None` until the start signal
    start: RwLock<Option<Instant>>,
}

impl SynchronyClock {
    /// Create a clock on the OS monotonic clock with the default start policy
    pub fn new(synchrony_bound: SynchronyBound) -> Self {
        Self::with_config(ClockConfig::new(synchrony_bound))
    }

    pub fn with_config(config: ClockConfig) -> Self {
        Self::with_source(config, Arc::new(SystemTimeSource))
    }

    pub fn with_source(config: ClockConfig, source: Arc<dyn TimeSource>) -> Self {
        SynchronyClock {
            schedule: RoundSchedule::new(config.synchrony_bound),
            start_policy: config.start_policy,
            source,
            start: RwLock::new(None),
        }
    }

    /// Configured synchrony bound Δ
    pub fn synchrony_bound(&self) -> SynchronyBound {
        self.schedule.bound()
    }

    /// Round length (3Δ)
    pub fn round_length(&self) -> Duration {
        self.schedule.round_length()
    }

    /// Round arithmetic for this clock's bound
    pub fn schedule(&self) -> RoundSchedule {
        self.schedule
    }

    /// Policy applied to repeated start signals
    pub fn start_policy(&self) -> StartPolicy {
        self.start_policy
    }

    /// Instant of the start signal in effect, `None` before start
    pub fn start_instant(&self) -> Option<Instant> {
        *self.start.read()
    }

    /// Whether a start signal has been received
    pub fn is_started(&self) -> bool {
        self.start.read().is_some()
    }

    /// Record the start instant
    ///
    /// The first call always arms the clock. Later calls follow the
    /// configured [`StartPolicy`].
    pub fn on_start_signal(&self) -> SynchronyResult<StartOutcome> {
        let mut start = self.start.write();
        let now = self.source.now();
        match (*start, self.start_policy) {
            (None, _) => {
                *start = Some(now);
                Ok(StartOutcome::Armed)
            }
            (Some(_), StartPolicy::Rearm) => {
                *start = Some(now);
                Ok(StartOutcome::Rearmed)
            }
            (Some(_), StartPolicy::IgnoreRepeated) => Ok(StartOutcome::Ignored),
            (Some(_), StartPolicy::Reject) => Err(SynchronyError::AlreadyStarted),
        }
    }

    /// Time since the start instant
    pub fn elapsed(&self) -> Option<Duration> {
        let start = self.start_instant()?;
        Some(self.elapsed_since(start))
    }

    /// Current round: `floor((now - start) / 3Δ)`, `None` before start
    pub fn current_round(&self) -> Option<RoundNumber> {
        let start = self.start_instant()?;
        Some(self.round_since(start))
    }

    /// Whether the node is strictly inside the middle third of its round
    ///
    /// The round is chosen from one reading of the time source and the
    /// offset into it from a second, later reading. If the second reading
    /// has already crossed into the next round, the offset exceeds the round
    /// length and the answer is `false`.
    pub fn is_send_window(&self) -> bool {
        let Some(start) = self.start_instant() else {
            return false;
        };
        let round = self.round_since(start);
        let offset = self
            .elapsed_since(start)
            .saturating_sub(self.schedule.round_start(round));
        self.schedule.phase_of(offset).is_send()
    }

    /// Round, offset and phase from a single reading
    pub fn position(&self) -> Option<RoundPosition> {
        self.elapsed().map(|elapsed| self.schedule.position_at(elapsed))
    }

    /// Time until the first instant inside the next send window, zero
    /// while inside one
    pub fn time_until_send_window(&self) -> Option<Duration> {
        self.elapsed()
            .map(|elapsed| self.schedule.time_until_send_window(elapsed))
    }

    /// Sample the round and send window for reporting
    pub fn status(&self) -> SynchronyStatus {
        SynchronyStatus {
            round: self.current_round(),
            should_send: self.is_send_window(),
        }
    }

    #[inline]
    fn elapsed_since(&self, start: Instant) -> Duration {
        self.source.now().saturating_duration_since(start)
    }

    #[inline]
    fn round_since(&self, start: Instant) -> RoundNumber {
        self.schedule.round_at(self.elapsed_since(start))
    }
}

impl fmt::Debug for SynchronyClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynchronyClock")
            .field("synchrony_bound", &self.schedule.bound())
            .field("start_policy", &self.start_policy)
            .field("started", &self.is_started())
            .finish()
    }
}
