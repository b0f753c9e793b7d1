//! Round schedule - partitions elapsed protocol time into rounds and phases
//!
//! Each round is 3Δ long and split into three Δ-sized phases:
//!
//! ```text
//! offset: 0          Δ            2Δ          3Δ
//!         [  Setup   ](    Send    )[  Settle   )
//! ```
//!
//! Both edges of the send window are open: `offset == Δ` and `offset == 2Δ`
//! are not part of it. Anything sent strictly inside the window arrives,
//! under the Δ-synchrony assumption, before the round ends.
//!
//! All arithmetic is on integer nanoseconds. Nothing is rounded before the
//! final floor division.

use std::time::Duration;

use crate::time::duration_from_nanos;
use crate::{RoundNumber, SynchronyBound};

/// Resolution of the schedule arithmetic
const SMALLEST_STEP: Duration = Duration::from_nanos(1);

/// Phase of a round
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoundPhase {
    /// `0 <= offset <= Δ` - reserved for round initiation traffic
    Setup,
    /// `Δ < offset < 2Δ` - the node may broadcast
    Send,
    /// `2Δ <= offset` - messages settle before the round ends
    Settle,
}

impl RoundPhase {
    /// Only the middle phase permits broadcasts
    #[inline]
    pub fn is_send(self) -> bool {
        matches!(self, RoundPhase::Send)
    }
}

/// Decomposition of an elapsed time into round, offset and phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundPosition {
    pub round: RoundNumber,
    /// Time since the start of `round`
    pub offset: Duration,
    pub phase: RoundPhase,
}

impl RoundPosition {
    #[inline]
    pub fn is_send_window(&self) -> bool {
        self.phase.is_send()
    }
}

/// Send window of one round, as offsets from the start instant
/// The interval is open on both ends: `(opens_after, closes_at)`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SendWindow {
    pub round: RoundNumber,
    pub opens_after: Duration,
    pub closes_at: Duration,
}

impl SendWindow {
    /// Check if an elapsed time lies strictly inside the window
    #[inline]
    pub fn contains(&self, elapsed: Duration) -> bool {
        elapsed > self.opens_after && elapsed < self.closes_at
    }
}

/// Round schedule for a fixed synchrony bound
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundSchedule {
    bound: SynchronyBound,
}

impl RoundSchedule {
    pub fn new(bound: SynchronyBound) -> Self {
        RoundSchedule { bound }
    }

    /// Synchrony bound Δ
    #[inline]
    pub fn bound(&self) -> SynchronyBound {
        self.bound
    }

    /// Round length (3Δ)
    #[inline]
    pub fn round_length(&self) -> Duration {
        self.bound.round_length()
    }

    /// Round containing an elapsed time: `floor(elapsed / 3Δ)`
    pub fn round_at(&self, elapsed: Duration) -> RoundNumber {
        let rounds = elapsed.as_nanos() / self.round_length().as_nanos();
        RoundNumber(u64::try_from(rounds).unwrap_or(u64::MAX))
    }

    /// Elapsed time at which a round begins
    pub fn round_start(&self, round: RoundNumber) -> Duration {
        duration_from_nanos(self.round_length().as_nanos() * u128::from(round.0))
    }

    /// Offset of an elapsed time within its own round
    pub fn offset_in_round(&self, elapsed: Duration) -> Duration {
        duration_from_nanos(elapsed.as_nanos() % self.round_length().as_nanos())
    }

    /// Classify an offset from a round start
    ///
    /// Offsets past the round length (a later reading than the one that
    /// chose the round) fall in `Settle`.
    pub fn phase_of(&self, offset: Duration) -> RoundPhase {
        let delta = self.bound.as_duration();
        if offset <= delta {
            RoundPhase::Setup
        } else if offset < delta * 2 {
            RoundPhase::Send
        } else {
            RoundPhase::Settle
        }
    }

    /// Round, offset and phase of an elapsed time
    pub fn position_at(&self, elapsed: Duration) -> RoundPosition {
        let offset = self.offset_in_round(elapsed);
        RoundPosition {
            round: self.round_at(elapsed),
            offset,
            phase: self.phase_of(offset),
        }
    }

    /// Send window of a round, as offsets from the start instant
    pub fn send_window_of(&self, round: RoundNumber) -> SendWindow {
        let start = self.round_start(round);
        let delta = self.bound.as_duration();
        SendWindow {
            round,
            opens_after: start.saturating_add(delta),
            closes_at: start.saturating_add(delta * 2),
        }
    }

    /// Time until the first instant inside the next send window, zero
    /// while inside one
    ///
    /// The window is open at `Δ`, so the result lands one nanosecond past
    /// it. With `Δ` of one nanosecond the window holds no instant at all.
    pub fn time_until_send_window(&self, elapsed: Duration) -> Duration {
        let offset = self.offset_in_round(elapsed);
        let opens = self.bound.as_duration() + SMALLEST_STEP;
        match self.phase_of(offset) {
            RoundPhase::Send => Duration::ZERO,
            RoundPhase::Setup => opens - offset,
            RoundPhase::Settle => (self.round_length() - offset).saturating_add(opens),
        }
    }
}

impl From<SynchronyBound> for RoundSchedule {
    fn from(bound: SynchronyBound) -> Self {
        RoundSchedule::new(bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn schedule(secs: u64) -> RoundSchedule {
        RoundSchedule::new(SynchronyBound::new(Duration::from_secs(secs)).unwrap())
    }

    #[test]
    fn test_reference_scenario() {
        // Δ = 2s, round length = 6s
        let s = schedule(2);
        let cases = [
            (500, 0, false),
            (2500, 0, true),
            (4500, 0, false),
            (6500, 1, false),
            (8500, 1, true),
        ];
        for (ms, round, send) in cases {
            let pos = s.position_at(Duration::from_millis(ms));
            assert_eq!(pos.round, RoundNumber(round), "round at {}ms", ms);
            assert_eq!(pos.is_send_window(), send, "send at {}ms", ms);
        }
    }

    #[test]
    fn test_send_window_edges_are_open() {
        let s = schedule(2);
        assert_eq!(s.phase_of(Duration::from_secs(2)), RoundPhase::Setup);
        assert_eq!(s.phase_of(Duration::from_secs(4)), RoundPhase::Settle);
        assert_eq!(
            s.phase_of(Duration::from_secs(2) + Duration::from_nanos(1)),
            RoundPhase::Send
        );
        assert_eq!(
            s.phase_of(Duration::from_secs(4) - Duration::from_nanos(1)),
            RoundPhase::Send
        );
        assert_eq!(s.phase_of(Duration::ZERO), RoundPhase::Setup);
    }

    #[test]
    fn test_round_boundary_starts_new_round() {
        let s = schedule(2);
        assert_eq!(s.round_at(Duration::from_secs(6) - Duration::from_nanos(1)), RoundNumber(0));
        assert_eq!(s.round_at(Duration::from_secs(6)), RoundNumber(1));
        assert_eq!(s.position_at(Duration::from_secs(6)).phase, RoundPhase::Setup);
    }

    #[test]
    fn test_offset_past_round_length_is_settle() {
        let s = schedule(2);
        assert_eq!(s.phase_of(Duration::from_secs(7)), RoundPhase::Settle);
    }

    #[test]
    fn test_send_window_of() {
        let s = schedule(2);
        let w = s.send_window_of(RoundNumber(3));
        assert_eq!(w.opens_after, Duration::from_secs(20));
        assert_eq!(w.closes_at, Duration::from_secs(22));
        assert!(!w.contains(Duration::from_secs(20)));
        assert!(w.contains(Duration::from_millis(21_000)));
        assert!(!w.contains(Duration::from_secs(22)));
    }

    #[test]
    fn test_time_until_send_window() {
        let s = schedule(2);
        let ns = Duration::from_nanos(1);
        assert_eq!(s.time_until_send_window(Duration::from_millis(500)), Duration::from_millis(1500) + ns);
        assert_eq!(s.time_until_send_window(Duration::from_secs(3)), Duration::ZERO);
        assert_eq!(s.time_until_send_window(Duration::from_secs(4)), Duration::from_secs(4) + ns);
    }

    #[test]
    fn test_time_until_send_window_on_opening_edge() {
        let s = schedule(2);
        let edge = Duration::from_secs(2);
        assert!(!s.position_at(edge).is_send_window());

        let wait = s.time_until_send_window(edge);
        assert_eq!(wait, Duration::from_nanos(1));
        assert!(s.position_at(edge + wait).is_send_window());
    }

    #[test]
    fn test_round_start_saturates() {
        let s = schedule(2);
        assert_eq!(s.round_start(RoundNumber(u64::MAX)), Duration::MAX);
    }

    proptest! {
        #[test]
        fn prop_round_is_floor_of_elapsed(delta_ms in 1u64..10_000, elapsed_ns in 0u64..u64::MAX / 4) {
            let s = RoundSchedule::new(SynchronyBound::new(Duration::from_millis(delta_ms)).unwrap());
            let elapsed = Duration::from_nanos(elapsed_ns);
            let expected = elapsed_ns as u128 / (delta_ms as u128 * 3 * 1_000_000);
            prop_assert_eq!(s.round_at(elapsed).0 as u128, expected);
        }

        #[test]
        fn prop_send_iff_strictly_inside_middle_third(delta_ms in 1u64..10_000, elapsed_ns in 0u64..u64::MAX / 4) {
            let s = RoundSchedule::new(SynchronyBound::new(Duration::from_millis(delta_ms)).unwrap());
            let delta_ns = delta_ms as u128 * 1_000_000;
            let offset = elapsed_ns as u128 % (delta_ns * 3);
            let expected = offset > delta_ns && offset < 2 * delta_ns;
            prop_assert_eq!(s.position_at(Duration::from_nanos(elapsed_ns)).is_send_window(), expected);
        }

        #[test]
        fn prop_round_is_monotonic(delta_ms in 1u64..10_000, a in 0u64..u64::MAX / 4, b in 0u64..u64::MAX / 4) {
            let s = RoundSchedule::new(SynchronyBound::new(Duration::from_millis(delta_ms)).unwrap());
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(s.round_at(Duration::from_nanos(lo)) <= s.round_at(Duration::from_nanos(hi)));
        }

        #[test]
        fn prop_position_recomposes(delta_ms in 1u64..10_000, elapsed_ns in 0u64..u64::MAX / 4) {
            let s = RoundSchedule::new(SynchronyBound::new(Duration::from_millis(delta_ms)).unwrap());
            let elapsed = Duration::from_nanos(elapsed_ns);
            let pos = s.position_at(elapsed);
            prop_assert_eq!(s.round_start(pos.round) + pos.offset, elapsed);
            prop_assert!(pos.offset < s.round_length());
        }

        #[test]
        fn prop_waiting_lands_inside_send_window(delta_ms in 1u64..10_000, elapsed_ns in 0u64..u64::MAX / 4) {
            let s = RoundSchedule::new(SynchronyBound::new(Duration::from_millis(delta_ms)).unwrap());
            let elapsed = Duration::from_nanos(elapsed_ns);
            let wait = s.time_until_send_window(elapsed);
            prop_assert!(s.position_at(elapsed + wait).is_send_window());
        }
    }
}
