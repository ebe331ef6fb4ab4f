use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use eframe::egui::{Vec2, vec2};

use crate::flows::{Link, Node, SurfaceSize};

use super::forces::{Repulsion, accumulate_repulsion, separation};
use super::quadtree::QuadNode;
use super::{LayoutError, LayoutParams};

struct Spring {
    from: usize,
    to: usize,
    strength: f32,
    /// Share of the correction applied to `to`; the better connected end moves less.
    bias: f32,
}

pub(super) struct Simulation {
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    forces: Vec<Vec2>,
    springs: Vec<Spring>,
    center: Vec2,
    surface: SurfaceSize,
    params: LayoutParams,
    alpha: f32,
    alpha_decay: f32,
}

impl Simulation {
    pub(super) fn new(
        nodes: &[Node],
        links: &[Link],
        surface: SurfaceSize,
        params: LayoutParams,
    ) -> Result<Self, LayoutError> {
        let mut index_by_id = HashMap::with_capacity(nodes.len());
        let mut positions = Vec::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            if !node.x.is_finite() || !node.y.is_finite() {
                return Err(LayoutError::NonFiniteInput { id: node.id.clone() });
            }
            index_by_id.insert(node.id.as_str(), index);
            positions.push(vec2(node.x, node.y));
        }

        let mut link_counts = vec![0u32; nodes.len()];
        let mut pairs = Vec::with_capacity(links.len());
        for link in links {
            let (Some(&from), Some(&to)) = (
                index_by_id.get(link.source.as_str()),
                index_by_id.get(link.target.as_str()),
            ) else {
                continue;
            };
            if from == to {
                continue;
            }
            link_counts[from] += 1;
            link_counts[to] += 1;
            pairs.push((from, to));
        }

        let springs = pairs
            .into_iter()
            .map(|(from, to)| {
                let from_count = link_counts[from] as f32;
                let to_count = link_counts[to] as f32;
                Spring {
                    from,
                    to,
                    strength: params.link_strength / from_count.min(to_count),
                    bias: from_count / (from_count + to_count),
                }
            })
            .collect();

        let iterations = params.max_iterations.max(1) as f32;
        Ok(Self {
            velocities: vec![Vec2::ZERO; positions.len()],
            forces: vec![Vec2::ZERO; positions.len()],
            positions,
            springs,
            center: vec2(surface.width * 0.5, surface.height * 0.5),
            surface,
            params,
            alpha: 1.0,
            alpha_decay: params.min_alpha.clamp(1e-6, 0.999).powf(1.0 / iterations),
        })
    }

    /// Advances one iteration and returns the largest node displacement.
    pub(super) fn step(&mut self) -> f32 {
        let count = self.positions.len();
        if count == 0 {
            return 0.0;
        }

        let params = self.params;
        self.forces.fill(Vec2::ZERO);

        let repulsion = Repulsion {
            strength: params.repulsion,
            softening: params.softening,
            theta: params.theta,
        };
        if count > 1
            && let Some(tree) = QuadNode::build(&self.positions)
        {
            for (index, force) in self.forces.iter_mut().enumerate() {
                accumulate_repulsion(&tree, index, &self.positions, repulsion, force);
            }
        }

        for spring in &self.springs {
            let (direction, distance_sq) = separation(
                self.positions[spring.to],
                self.positions[spring.from],
                spring.to,
                spring.from,
            );
            let stretch = (distance_sq.sqrt() - params.link_distance) * spring.strength;
            let correction = direction * stretch;
            self.forces[spring.to] -= correction * spring.bias;
            self.forces[spring.from] += correction * (1.0 - spring.bias);
        }

        for (force, position) in self.forces.iter_mut().zip(&self.positions) {
            *force += (self.center - *position) * params.gravity;
        }

        let max_force_sq = params.max_force * params.max_force;
        let max_speed_sq = params.max_speed * params.max_speed;
        let mut largest_move = 0.0_f32;
        for index in 0..count {
            let mut force = self.forces[index];
            let force_sq = force.length_sq();
            if force_sq > max_force_sq {
                force *= params.max_force / force_sq.sqrt();
            }

            let mut velocity = (self.velocities[index] + force * self.alpha) * params.damping;
            let speed_sq = velocity.length_sq();
            if speed_sq > max_speed_sq {
                velocity *= params.max_speed / speed_sq.sqrt();
            }

            self.velocities[index] = velocity;
            self.positions[index] += velocity;
            largest_move = largest_move.max(velocity.length());
        }

        self.alpha *= self.alpha_decay;
        largest_move
    }

    /// Iterates until convergence, the iteration budget, or cancellation.
    pub(super) fn run(
        &mut self,
        cancel: &AtomicBool,
        mut on_progress: impl FnMut(f32),
    ) -> Result<usize, LayoutError> {
        let budget = self.params.max_iterations;
        let interval = self.params.progress_interval.max(1);

        for iteration in 1..=budget {
            if cancel.load(Ordering::Relaxed) {
                return Err(LayoutError::Cancelled);
            }

            let largest_move = self.step();
            if largest_move < self.params.convergence_threshold {
                return Ok(iteration);
            }

            if iteration % interval == 0 {
                on_progress(iteration as f32 / budget as f32);
            }
        }

        Ok(budget)
    }

    /// Writes the confined positions back onto the node set; every other field is kept.
    pub(super) fn apply_to(&self, mut nodes: Vec<Node>) -> Result<Vec<Node>, LayoutError> {
        let margin = self
            .params
            .margin
            .clamp(0.0, self.surface.width.min(self.surface.height) * 0.5);
        let min = vec2(margin, margin);
        let max = vec2(self.surface.width - margin, self.surface.height - margin);

        for (node, position) in nodes.iter_mut().zip(&self.positions) {
            if !position.x.is_finite() || !position.y.is_finite() {
                return Err(LayoutError::NonFiniteResult { id: node.id.clone() });
            }
            let confined = position.max(min).min(max);
            node.x = confined.x;
            node.y = confined.y;
        }

        Ok(nodes)
    }
}
