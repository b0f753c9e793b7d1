//! Synchrony node - owns the shared clock and its status reporter

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;

use synchrony_core::{RoundNumber, SynchronyError, SynchronyResult};
use synchrony_time::{ClockConfig, StartOutcome, SynchronyClock, SynchronyStatus};

use crate::{NodeConfig, StatusReporter, StatusSink, TracingSink};

/// Node-local protocol timing
///
/// Hands out the clock to collaborators (transport, protocol engine) for
/// queries. Start signals must go through [`on_start_signal`](Self::on_start_signal)
/// so the reporter is armed together with the clock.
pub struct SynchronyNode {
    clock: Arc<SynchronyClock>,
    sink: Arc<dyn StatusSink>,
    reporter: Mutex<Option<StatusReporter>>,
}

impl SynchronyNode {
    /// Create a node on the OS clock, reporting through `tracing`
    pub fn new(config: ClockConfig) -> Self {
        Self::with_sink(Arc::new(SynchronyClock::with_config(config)), Arc::new(TracingSink))
    }

    pub fn from_config(config: &NodeConfig) -> SynchronyResult<Self> {
        Ok(Self::new(config.clock_config()?))
    }

    pub fn with_sink(clock: Arc<SynchronyClock>, sink: Arc<dyn StatusSink>) -> Self {
        SynchronyNode {
            clock,
            sink,
            reporter: Mutex::new(None),
        }
    }

    pub fn clock(&self) -> Arc<SynchronyClock> {
        Arc::clone(&self.clock)
    }

    /// Handle the network-level start message
    ///
    /// The first successful signal spawns the status reporter, so it must
    /// arrive on a tokio runtime. Without one the clock is left untouched
    /// and [`SynchronyError::NoRuntime`] is returned. Later signals follow
    /// the clock's start policy and never spawn a second reporter.
    pub fn on_start_signal(&self) -> SynchronyResult<StartOutcome> {
        let mut reporter = self.reporter.lock();
        if reporter.is_none() && !self.clock.is_started() {
            if let Err(e) = Handle::try_current() {
                tracing::warn!(error = %e, "start signal outside a tokio runtime");
                return Err(SynchronyError::NoRuntime(e.to_string()));
            }
        }

        let outcome = match self.clock.on_start_signal() {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "start signal rejected");
                return Err(e);
            }
        };

        match outcome {
            StartOutcome::Armed => tracing::info!(
                synchrony_bound = %humantime::format_duration(self.clock.synchrony_bound().as_duration()),
                round_length = %humantime::format_duration(self.clock.round_length()),
                start_policy = %self.clock.start_policy(),
                "protocol clock armed"
            ),
            StartOutcome::Rearmed => {
                tracing::info!("protocol clock re-armed, round counting restarts at 0")
            }
            StartOutcome::Ignored => tracing::debug!("repeated start signal ignored"),
        }

        if outcome.is_first_arm() && reporter.is_none() {
            *reporter = Some(StatusReporter::spawn(self.clock(), Arc::clone(&self.sink)));
        }

        Ok(outcome)
    }

    pub fn is_started(&self) -> bool {
        self.clock.is_started()
    }

    pub fn current_round(&self) -> Option<RoundNumber> {
        self.clock.current_round()
    }

    pub fn is_send_window(&self) -> bool {
        self.clock.is_send_window()
    }

    pub fn time_until_send_window(&self) -> Option<Duration> {
        self.clock.time_until_send_window()
    }

    pub fn status(&self) -> SynchronyStatus {
        self.clock.status()
    }

    pub fn is_reporting(&self) -> bool {
        self.reporter
            .lock()
            .as_ref()
            .is_some_and(|reporter| !reporter.is_finished())
    }

    /// Stop the status reporter; the clock stays queryable
    pub fn shutdown(&self) {
        if let Some(reporter) = self.reporter.lock().take() {
            reporter.shutdown();
            tracing::debug!("status reporter shut down");
        }
    }
}

impl Drop for SynchronyNode {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChannelSink;
    use synchrony_core::SynchronyBound;
    use synchrony_time::{ManualTimeSource, StartPolicy};

    fn manual_node(policy: StartPolicy) -> (SynchronyNode, Arc<ManualTimeSource>, tokio::sync::mpsc::UnboundedReceiver<SynchronyStatus>) {
        let source = Arc::new(ManualTimeSource::new());
        let config = ClockConfig::new(SynchronyBound::new(Duration::from_secs(2)).unwrap())
            .with_start_policy(policy);
        let clock = Arc::new(SynchronyClock::with_source(config, source.clone()));
        let (sink, rx) = ChannelSink::new();
        (SynchronyNode::with_sink(clock, Arc::new(sink)), source, rx)
    }

    #[test]
    fn test_node_unstarted() {
        let node = SynchronyNode::new(ClockConfig::default());
        assert!(!node.is_started());
        assert_eq!(node.current_round(), None);
        assert!(!node.is_send_window());
        assert!(!node.is_reporting());
    }

    #[test]
    fn test_from_config_rejects_invalid_bound() {
        let config = NodeConfig {
            synchrony_bound_secs: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            SynchronyNode::from_config(&config),
            Err(SynchronyError::InvalidSynchronyBound(_))
        ));
    }

    #[test]
    fn test_start_signal_outside_runtime_leaves_clock_unarmed() {
        let (node, _source, _rx) = manual_node(StartPolicy::Rearm);

        assert!(matches!(node.on_start_signal(), Err(SynchronyError::NoRuntime(_))));
        assert!(!node.is_started());
        assert!(!node.is_reporting());

        // The same node arms normally once a runtime is available
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        runtime.block_on(async {
            assert_eq!(node.on_start_signal(), Ok(StartOutcome::Armed));
            assert!(node.is_started());
            assert!(node.is_reporting());
            node.shutdown();
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_signal_arms_clock_and_reporter() {
        let (node, source, mut rx) = manual_node(StartPolicy::Rearm);

        assert_eq!(node.on_start_signal(), Ok(StartOutcome::Armed));
        assert!(node.is_started());
        assert!(node.is_reporting());

        let first = rx.recv().await.unwrap();
        assert_eq!(first.round, Some(RoundNumber(0)));

        source.set_elapsed(Duration::from_millis(2500));
        assert!(node.is_send_window());
        assert_eq!(node.status().to_string(), "Round: 0  Should send: true");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_does_not_spawn_second_reporter() {
        let (node, source, mut rx) = manual_node(StartPolicy::Rearm);
        node.on_start_signal().unwrap();
        rx.recv().await.unwrap();

        source.set_elapsed(Duration::from_secs(13));
        assert_eq!(node.current_round(), Some(RoundNumber(2)));
        assert_eq!(node.on_start_signal(), Ok(StartOutcome::Rearmed));
        assert_eq!(node.current_round(), Some(RoundNumber(0)));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        node.shutdown();

        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        // One reporter: ticks at t = 1 and t = 2
        assert_eq!(count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_start_keeps_state() {
        let (node, source, _rx) = manual_node(StartPolicy::Reject);
        node.on_start_signal().unwrap();
        source.advance(Duration::from_secs(7));

        assert_eq!(node.on_start_signal(), Err(SynchronyError::AlreadyStarted));
        assert_eq!(node.current_round(), Some(RoundNumber(1)));
        assert!(node.is_reporting());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_reporting() {
        let (node, _source, mut rx) = manual_node(StartPolicy::Rearm);
        node.on_start_signal().unwrap();
        rx.recv().await.unwrap();

        node.shutdown();
        node.shutdown();
        assert!(!node.is_reporting());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());

        // Queries still work after the reporter is gone
        assert_eq!(node.current_round(), Some(RoundNumber(0)));
    }
}
