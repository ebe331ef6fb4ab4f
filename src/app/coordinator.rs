use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::flows::{FlowRecord, Link, Node, SurfaceSize, TrafficGraph};

use super::layout::{Generation, LayoutHandle, LayoutMessage, LayoutParams, LayoutRequest};

#[derive(Clone, Copy, Debug)]
pub struct CoordinatorConfig {
    pub surface: SurfaceSize,
    pub params: LayoutParams,
    /// How long to wait for a layout result before keeping the seeded positions.
    pub timeout: Duration,
    pub seed: Option<u64>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            surface: SurfaceSize::default(),
            params: LayoutParams::default(),
            timeout: Duration::from_secs(20),
            seed: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Building,
    Computing,
    Ready,
}

/// How the most recent generation left the computing phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutOutcome {
    Completed,
    TimedOut,
    Failed,
    Unavailable,
}

#[derive(Clone, Copy, Debug)]
struct Awaiting {
    generation: Generation,
    started: Instant,
}

/// Owns the current graph generation and the layout thread working on it.
pub struct HostCoordinator {
    config: CoordinatorConfig,
    rng: StdRng,
    graph: TrafficGraph,
    generation: Generation,
    phase: Phase,
    awaiting: Option<Awaiting>,
    handle: Option<LayoutHandle>,
    progress: f32,
    revision: u64,
    outcome: Option<LayoutOutcome>,
    tx: Sender<LayoutMessage>,
    rx: Receiver<LayoutMessage>,
}

impl HostCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let (tx, rx) = mpsc::channel();

        Self {
            config,
            rng,
            graph: TrafficGraph::default(),
            generation: Generation::default(),
            phase: Phase::Idle,
            awaiting: None,
            handle: None,
            progress: 0.0,
            revision: 0,
            outcome: None,
            tx,
            rx,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.graph.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.graph.links
    }

    pub fn graph(&self) -> &TrafficGraph {
        &self.graph
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Building | Phase::Computing)
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Bumped whenever nodes or links change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn last_outcome(&self) -> Option<LayoutOutcome> {
        self.outcome
    }

    pub fn surface(&self) -> SurfaceSize {
        self.config.surface
    }

    /// Starts a new generation: cancels the running layout, rebuilds the
    /// graph with seeded positions and dispatches a fresh layout run.
    pub fn ingest(&mut self, records: &[FlowRecord]) -> Generation {
        self.terminate();
        self.phase = Phase::Building;

        let generation = self.generation.next();
        self.generation = generation;
        self.graph = TrafficGraph::build(records, self.config.surface, &mut self.rng);
        self.revision = self.revision.wrapping_add(1);
        self.progress = 0.0;
        self.outcome = None;
        info!(
            "generation {generation}: {} hosts, {} flows",
            self.graph.nodes.len(),
            self.graph.links.len()
        );

        self.phase = Phase::Computing;
        self.replace(generation);
        generation
    }

    /// Tears down the previous layout thread before installing one for `generation`.
    fn replace(&mut self, generation: Generation) {
        self.terminate();

        let request = LayoutRequest {
            generation,
            nodes: self.graph.nodes.clone(),
            links: self.graph.links.clone(),
            surface: self.config.surface,
            params: self.config.params,
        };

        match LayoutHandle::spawn(request, self.tx.clone()) {
            Ok(handle) => {
                self.awaiting = Some(Awaiting {
                    generation: handle.generation(),
                    started: Instant::now(),
                });
                self.handle = Some(handle);
            }
            Err(error) => {
                warn!("layout engine unavailable for generation {generation}: {error}");
                self.settle(LayoutOutcome::Unavailable);
            }
        }
    }

    /// Drains pending layout messages and applies the timeout. Returns
    /// whether anything visible changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        // Sampled before draining: a finished thread has already queued everything it sent.
        let worker_exited = self.handle.as_ref().is_some_and(LayoutHandle::is_finished);

        let mut changed = false;
        while let Ok(message) = self.rx.try_recv() {
            changed |= self.handle_message(message);
        }

        changed | self.settle_overdue(now, worker_exited)
    }

    fn handle_message(&mut self, message: LayoutMessage) -> bool {
        let generation = message.generation();
        if self.awaiting.is_none_or(|awaiting| awaiting.generation != generation) {
            debug!("dropping layout message for stale generation {generation}");
            return false;
        }

        match message {
            LayoutMessage::Progress { fraction, .. } => {
                self.progress = fraction.clamp(0.0, 1.0);
                true
            }
            LayoutMessage::Finished { nodes, .. } => {
                if nodes.len() != self.graph.nodes.len() {
                    warn!(
                        "layout for generation {generation} returned {} nodes, expected {}",
                        nodes.len(),
                        self.graph.nodes.len()
                    );
                    self.settle(LayoutOutcome::Failed);
                } else {
                    self.graph.nodes = nodes;
                    self.revision = self.revision.wrapping_add(1);
                    self.settle(LayoutOutcome::Completed);
                }
                true
            }
        }
    }

    fn settle_overdue(&mut self, now: Instant, worker_exited: bool) -> bool {
        let Some(awaiting) = self.awaiting else {
            return false;
        };

        if now.saturating_duration_since(awaiting.started) >= self.config.timeout {
            warn!(
                "layout for generation {} timed out after {:?}; keeping seeded positions",
                awaiting.generation, self.config.timeout
            );
            self.settle(LayoutOutcome::TimedOut);
            true
        } else if worker_exited {
            warn!(
                "layout for generation {} exited without a result; keeping seeded positions",
                awaiting.generation
            );
            self.settle(LayoutOutcome::Failed);
            true
        } else {
            false
        }
    }

    fn settle(&mut self, outcome: LayoutOutcome) {
        self.terminate();
        self.phase = Phase::Ready;
        self.progress = 1.0;
        self.outcome = Some(outcome);
        info!("generation {} ready ({outcome:?})", self.generation);
    }

    fn terminate(&mut self) {
        self.awaiting = None;
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }
}

impl Drop for HostCoordinator {
    fn drop(&mut self) {
        self.terminate();
    }
}
