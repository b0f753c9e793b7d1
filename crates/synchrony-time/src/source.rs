//! Time sources for the protocol clock

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Source of the current instant
/// INVARIANT: readings MUST be monotonically non-decreasing
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Instant;
}

/// Monotonic OS clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-driven clock for tests and simulation
///
/// Readings are `origin + elapsed`, where `elapsed` only moves when
/// [`advance`](Self::advance) or [`set_elapsed`](Self::set_elapsed) is called.
pub struct ManualTimeSource {
    /// Reference instant, fixed at creation
    origin: Instant,
    /// Time advanced since `origin`
    elapsed: Mutex<Duration>,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        ManualTimeSource {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    pub fn origin(&self) -> Instant {
        self.origin
    }

    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }

    /// Move the clock forward
    pub fn advance(&self, dt: Duration) {
        let mut elapsed = self.elapsed.lock();
        *elapsed = elapsed.saturating_add(dt);
    }

    /// Jump to an absolute offset from the origin
    /// Only allowed to move forward
    pub fn set_elapsed(&self, target: Duration) {
        let mut elapsed = self.elapsed.lock();
        if target > *elapsed {
            *elapsed = target;
        }
    }
}

impl Default for ManualTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock()
    }
}

impl fmt::Debug for ManualTimeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualTimeSource")
            .field("elapsed", &self.elapsed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_source_monotonic() {
        let source = SystemTimeSource;
        let t1 = source.now();
        std::thread::sleep(Duration::from_millis(5));
        let t2 = source.now();
        assert!(t2 > t1);
    }

    #[test]
    fn test_manual_source_advance() {
        let source = ManualTimeSource::new();
        let t0 = source.now();
        assert_eq!(t0, source.origin());

        source.advance(Duration::from_millis(1500));
        assert_eq!(source.now() - t0, Duration::from_millis(1500));
        assert_eq!(source.elapsed(), Duration::from_millis(1500));
    }

    #[test]
    fn test_manual_source_never_goes_back() {
        let source = ManualTimeSource::new();
        source.set_elapsed(Duration::from_secs(5));
        source.set_elapsed(Duration::from_secs(3));
        assert_eq!(source.elapsed(), Duration::from_secs(5));
    }
}
