//! Status reporter - samples the clock once per second

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use synchrony_time::{SynchronyClock, SynchronyStatus};

/// Reporting cadence
pub const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Destination for status samples
pub trait StatusSink: Send + Sync {
    fn emit(&self, status: &SynchronyStatus);
}

/// Emits status lines as `tracing` events on target `synchrony`
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn emit(&self, status: &SynchronyStatus) {
        tracing::info!(
            target: "synchrony",
            round = status.round.map(u64::from),
            should_send = status.should_send,
            "{}",
            status
        );
    }
}

/// Forwards status samples over a channel
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SynchronyStatus>,
    closed: AtomicBool,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SynchronyStatus>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = ChannelSink {
            tx,
            closed: AtomicBool::new(false),
        };
        (sink, rx)
    }
}

impl StatusSink for ChannelSink {
    fn emit(&self, status: &SynchronyStatus) {
        if self.tx.send(*status).is_err() && !self.closed.swap(true, Ordering::Relaxed) {
            tracing::debug!("status receiver dropped, discarding samples");
        }
    }
}

/// Background task reporting [`SynchronyClock::status`] every [`REPORT_INTERVAL`]
///
/// The first sample is emitted immediately. The task stops on
/// [`shutdown`](Self::shutdown) or when the reporter is dropped.
#[derive(Debug)]
pub struct StatusReporter {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl StatusReporter {
    /// Spawn the reporter on the current tokio runtime
    pub fn spawn(clock: Arc<SynchronyClock>, sink: Arc<dyn StatusSink>) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(REPORT_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::debug!("status reporter started");

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => sink.emit(&clock.status()),
                }
            }

            tracing::debug!("status reporter stopped");
        });

        StatusReporter { shutdown_tx, handle }
    }

    /// Signal the task to stop; it exits at its next await point
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal shutdown and wait for the task to exit
    pub async fn stop(self) {
        self.shutdown();
        let _ = self.handle.await;
    }
}
