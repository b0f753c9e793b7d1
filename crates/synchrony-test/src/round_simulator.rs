//! Round Simulator - multi-node harness for the send window guarantee
//!
//! Simulates:
//! - Several nodes, each with its own protocol clock on one shared manual clock
//! - Start signals arriving at different times
//! - Broadcasts from every node once per round, inside its send window
//! - One-way delays drawn from a [`DelayModel`]
//!
//! Every delivery is checked against the end of the sender's round.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use synchrony_core::{RoundNumber, SynchronyResult};
use synchrony_time::{ClockConfig, ManualTimeSource, StartOutcome, SynchronyClock};

use crate::DelayModel;

/// Finest harness step
const MIN_STEP: Duration = Duration::from_nanos(1);

/// Simulated node identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimNodeId(pub usize);

/// Simulated node with its own protocol clock
pub struct SimulatedNode {
    pub id: SimNodeId,
    pub clock: SynchronyClock,
    /// Harness time of the start signal in effect
    started_at: Option<Duration>,
    last_sent_round: Option<RoundNumber>,
    sent: u64,
    received: u64,
}

impl SimulatedNode {
    fn new(id: SimNodeId, clock: SynchronyClock) -> Self {
        SimulatedNode {
            id,
            clock,
            started_at: None,
            last_sent_round: None,
            sent: 0,
            received: 0,
        }
    }

    fn start(&mut self, now: Duration) -> SynchronyResult<StartOutcome> {
        let outcome = self.clock.on_start_signal()?;
        if outcome != StartOutcome::Ignored {
            self.started_at = Some(now);
            self.last_sent_round = None;
        }
        Ok(outcome)
    }

    pub fn started_at(&self) -> Option<Duration> {
        self.started_at
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn received(&self) -> u64 {
        self.received
    }
}

#[derive(Clone, Debug)]
struct InFlight {
    from: SimNodeId,
    to: SimNodeId,
    round: RoundNumber,
    arrives_at: Duration,
    /// Harness time at which the sender's round ends
    deadline: Duration,
}

/// A message that arrived at or after the end of its sender's round
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LateDelivery {
    pub from: SimNodeId,
    pub to: SimNodeId,
    pub round: RoundNumber,
    pub overshoot: Duration,
}

/// Simulation statistics
#[derive(Debug, Default)]
pub struct SimulationReport {
    /// Steps executed
    pub steps: u64,
    /// Messages sent
    pub sent: u64,
    /// Messages delivered before the sender's round ended
    pub delivered: u64,
    /// Messages delivered at or after the sender's round ended
    pub late: u64,
    /// Messages still in flight when the run stopped
    pub pending: u64,
    /// Highest round observed on any node
    pub max_round: Option<RoundNumber>,
    pub late_deliveries: Vec<LateDelivery>,
}

impl SimulationReport {
    pub fn new() -> Self {
        SimulationReport::default()
    }

    /// No message missed its round
    pub fn is_safe(&self) -> bool {
        self.late == 0
    }

    fn observe_round(&mut self, round: RoundNumber) {
        self.max_round = self.max_round.max(Some(round));
    }
}

/// Round simulation scenario
pub struct RoundSimulator {
    source: Arc<ManualTimeSource>,
    config: ClockConfig,
    delay: DelayModel,
    /// Harness step
    step: Duration,
    rng: StdRng,
    nodes: Vec<SimulatedNode>,
    in_flight: Vec<InFlight>,
    /// Start signals not yet delivered, by harness time
    scheduled_starts: Vec<(Duration, SimNodeId)>,
}

impl RoundSimulator {
    /// Create a simulator stepping in Δ/8 increments, never below 1ns
    pub fn new(config: ClockConfig, delay: DelayModel, seed: u64) -> Self {
        RoundSimulator {
            source: Arc::new(ManualTimeSource::new()),
            step: (config.synchrony_bound.as_duration() / 8).max(MIN_STEP),
            config,
            delay,
            rng: StdRng::seed_from_u64(seed),
            nodes: Vec::new(),
            in_flight: Vec::new(),
            scheduled_starts: Vec::new(),
        }
    }

    /// Set the harness step; zero is ignored
    pub fn with_step(mut self, step: Duration) -> Self {
        if !step.is_zero() {
            self.step = step;
        }
        self
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    pub fn add_node(&mut self) -> SimNodeId {
        let id = SimNodeId(self.nodes.len());
        let clock = SynchronyClock::with_source(self.config, self.source.clone());
        self.nodes.push(SimulatedNode::new(id, clock));
        id
    }

    /// Deliver a start signal to a node now
    pub fn start_node(&mut self, id: SimNodeId) -> Option<SynchronyResult<StartOutcome>> {
        let now = self.source.elapsed();
        self.nodes.get_mut(id.0).map(|node| node.start(now))
    }

    /// Deliver a start signal to every node now
    pub fn start_all(&mut self) -> SynchronyResult<()> {
        let now = self.source.elapsed();
        for node in &mut self.nodes {
            node.start(now)?;
        }
        Ok(())
    }

    /// Deliver a start signal to a node once the harness reaches `at`
    pub fn schedule_start(&mut self, id: SimNodeId, at: Duration) {
        self.scheduled_starts.push((at, id));
    }

    pub fn node(&self, id: SimNodeId) -> Option<&SimulatedNode> {
        self.nodes.get(id.0)
    }

    pub fn node_ids(&self) -> Vec<SimNodeId> {
        self.nodes.iter().map(|node| node.id).collect()
    }

    /// Harness time since creation
    pub fn elapsed(&self) -> Duration {
        self.source.elapsed()
    }

    /// Run the simulation for a duration
    pub fn run(&mut self, duration: Duration) -> SimulationReport {
        let mut report = SimulationReport::new();
        let steps = duration.as_nanos() / self.step.as_nanos();

        for _ in 0..steps {
            self.step_once(&mut report);
        }

        report.pending = self.in_flight.len() as u64;
        report
    }

    /// Execute one simulation step
    fn step_once(&mut self, report: &mut SimulationReport) {
        self.source.advance(self.step);
        let now = self.source.elapsed();
        report.steps += 1;

        self.deliver_starts(now);
        self.deliver_due(now, report);
        self.broadcast(now, report);
    }

    fn deliver_starts(&mut self, now: Duration) {
        let (due, later): (Vec<_>, Vec<_>) = self
            .scheduled_starts
            .drain(..)
            .partition(|(at, _)| *at <= now);
        self.scheduled_starts = later;

        for (_, id) in due {
            if let Some(node) = self.nodes.get_mut(id.0) {
                // Only reject policies fail here; the node keeps its first origin
                let _ = node.start(now);
            }
        }
    }

    fn deliver_due(&mut self, now: Duration, report: &mut SimulationReport) {
        let (due, pending): (Vec<_>, Vec<_>) = self
            .in_flight
            .drain(..)
            .partition(|msg| msg.arrives_at <= now);
        self.in_flight = pending;

        for msg in due {
            if msg.arrives_at < msg.deadline {
                report.delivered += 1;
            } else {
                report.late += 1;
                report.late_deliveries.push(LateDelivery {
                    from: msg.from,
                    to: msg.to,
                    round: msg.round,
                    overshoot: msg.arrives_at - msg.deadline,
                });
            }
            if let Some(node) = self.nodes.get_mut(msg.to.0) {
                node.received += 1;
            }
        }
    }

    fn broadcast(&mut self, now: Duration, report: &mut SimulationReport) {
        let mut senders = Vec::new();

        for node in &mut self.nodes {
            let Some(started_at) = node.started_at else {
                continue;
            };
            let Some(round) = node.clock.current_round() else {
                continue;
            };
            report.observe_round(round);

            if !node.clock.is_send_window() || node.last_sent_round == Some(round) {
                continue;
            }
            node.last_sent_round = Some(round);

            let deadline = started_at + node.clock.schedule().round_start(round.next());
            senders.push((node.id, round, deadline));
        }

        let ids = self.node_ids();
        for (from, round, deadline) in senders {
            for &to in ids.iter().filter(|&&to| to != from) {
                let delay = self.delay.sample(&mut self.rng);
                self.in_flight.push(InFlight {
                    from,
                    to,
                    round,
                    arrives_at: now + delay,
                    deadline,
                });
                report.sent += 1;
                self.nodes[from.0].sent += 1;
            }
        }
    }
}

/// Predefined test scenarios
pub mod scenarios {
    use super::*;
    use synchrony_core::SynchronyBound;

    fn config(delta: Duration) -> SynchronyResult<ClockConfig> {
        Ok(ClockConfig::new(SynchronyBound::new(delta)?))
    }

    /// Two nodes, delays within Δ, started together
    pub fn bounded_pair(delta: Duration, seed: u64) -> SynchronyResult<RoundSimulator> {
        let config = config(delta)?;
        let mut sim = RoundSimulator::new(config, DelayModel::within_bound(config.synchrony_bound), seed);
        sim.add_node();
        sim.add_node();
        Ok(sim)
    }

    /// Swarm whose start signals arrive spread over `spread`
    pub fn staggered_swarm(
        count: usize,
        delta: Duration,
        spread: Duration,
        seed: u64,
    ) -> SynchronyResult<RoundSimulator> {
        let config = config(delta)?;
        let mut sim = RoundSimulator::new(config, DelayModel::within_bound(config.synchrony_bound), seed);

        for i in 0..count {
            let id = sim.add_node();
            let offset = spread.mul_f64(i as f64 / count.max(1) as f64);
            sim.schedule_start(id, offset);
        }

        Ok(sim)
    }

    /// Two nodes whose links take 2Δ, breaking the synchrony assumption
    pub fn bound_violation_pair(delta: Duration, seed: u64) -> SynchronyResult<RoundSimulator> {
        let config = config(delta)?;
        let mut sim = RoundSimulator::new(config, DelayModel::Fixed(delta * 2), seed);
        sim.add_node();
        sim.add_node();
        Ok(sim)
    }
}
