//! Force-directed layout engine. Runs on its own thread per graph generation
//! and talks to the UI thread only through [`LayoutMessage`]s.

mod forces;
mod quadtree;
mod simulation;
mod worker;

use std::fmt;
use std::sync::atomic::AtomicBool;

use thiserror::Error;

use crate::flows::{Link, Node, SurfaceSize};
use simulation::Simulation;
pub(in crate::app) use worker::LayoutHandle;

/// Ordinal of one input snapshot; every message carries the generation it was computed for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutParams {
    pub max_iterations: usize,
    /// Largest per-node move (model units) below which the layout counts as converged.
    pub convergence_threshold: f32,
    pub progress_interval: usize,
    pub repulsion: f32,
    pub softening: f32,
    pub theta: f32,
    pub link_distance: f32,
    pub link_strength: f32,
    pub gravity: f32,
    pub damping: f32,
    pub max_force: f32,
    pub max_speed: f32,
    /// Cooling factor reached after `max_iterations`.
    pub min_alpha: f32,
    pub margin: f32,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            max_iterations: 300,
            convergence_threshold: 0.05,
            progress_interval: 10,
            repulsion: 60_000.0,
            softening: 600.0,
            theta: 0.72,
            link_distance: 80.0,
            link_strength: 0.08,
            gravity: 0.015,
            damping: 0.85,
            max_force: 60.0,
            max_speed: 25.0,
            min_alpha: 0.001,
            margin: 12.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("node `{id}` has a non-finite seed position")]
    NonFiniteInput { id: String },
    #[error("layout diverged at node `{id}`")]
    NonFiniteResult { id: String },
    #[error("layout run was cancelled")]
    Cancelled,
}

#[derive(Clone, Debug)]
pub struct LayoutRequest {
    pub generation: Generation,
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    pub surface: SurfaceSize,
    pub params: LayoutParams,
}

#[derive(Clone, Debug)]
pub enum LayoutMessage {
    Progress { generation: Generation, fraction: f32 },
    Finished { generation: Generation, nodes: Vec<Node> },
}

impl LayoutMessage {
    pub fn generation(&self) -> Generation {
        match self {
            Self::Progress { generation, .. } | Self::Finished { generation, .. } => *generation,
        }
    }
}

/// Runs the whole simulation for one request and returns the repositioned node set.
pub fn compute_layout(
    request: LayoutRequest,
    cancel: &AtomicBool,
    on_progress: impl FnMut(f32),
) -> Result<Vec<Node>, LayoutError> {
    let LayoutRequest {
        nodes,
        links,
        surface,
        params,
        ..
    } = request;

    let mut simulation = Simulation::new(&nodes, &links, surface, params)?;
    simulation.run(cancel, on_progress)?;
    simulation.apply_to(nodes)
}
