use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadNode;

#[derive(Clone, Copy)]
pub(super) struct Repulsion {
    pub(super) strength: f32,
    pub(super) softening: f32,
    pub(super) theta: f32,
}

/// Unit vector from `b` to `a`, or a deterministic spread direction when the
/// two points coincide.
pub(super) fn separation(a: Vec2, b: Vec2, a_index: usize, b_index: usize) -> (Vec2, f32) {
    let delta = a - b;
    let distance_sq = delta.length_sq();
    if distance_sq > 1e-8 {
        let distance = distance_sq.sqrt();
        return (delta / distance, distance_sq);
    }

    let (low, high) = (a_index.min(b_index), a_index.max(b_index));
    let angle = ((low as f32) * 0.618_034 + (high as f32) * 0.414_214) * std::f32::consts::TAU;
    let direction = vec2(angle.cos(), angle.sin());
    if a_index < b_index {
        (direction, distance_sq)
    } else {
        (-direction, distance_sq)
    }
}

pub(super) fn accumulate_repulsion(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    params: Repulsion,
    force: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other in &node.indices {
            if other == index {
                continue;
            }
            let (direction, distance_sq) = separation(point, positions[other], index, other);
            *force += direction * (params.strength / (distance_sq + params.softening));
        }
        return;
    }

    let delta = point - node.center_of_mass;
    let distance_sq = delta.length_sq().max(1e-4);
    let distance = distance_sq.sqrt();
    let far_enough = !node.square.contains(point) && node.square.side() / distance < params.theta;

    if far_enough {
        *force += (delta / distance) * (params.strength * node.mass / (distance_sq + params.softening));
        return;
    }

    for child in node.children.iter().flatten() {
        accumulate_repulsion(child, index, positions, params, force);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: Repulsion = Repulsion {
        strength: 1000.0,
        softening: 1.0,
        theta: 0.72,
    };

    fn exact_repulsion(index: usize, positions: &[Vec2]) -> Vec2 {
        let mut force = Vec2::ZERO;
        for (other, position) in positions.iter().enumerate() {
            if other == index {
                continue;
            }
            let (direction, distance_sq) = separation(positions[index], *position, index, other);
            force += direction * (PARAMS.strength / (distance_sq + PARAMS.softening));
        }
        force
    }

    #[test]
    fn pair_pushes_apart_symmetrically() {
        let positions = [vec2(0.0, 0.0), vec2(10.0, 0.0)];
        let tree = QuadNode::build(&positions).unwrap();

        let mut left = Vec2::ZERO;
        let mut right = Vec2::ZERO;
        accumulate_repulsion(&tree, 0, &positions, PARAMS, &mut left);
        accumulate_repulsion(&tree, 1, &positions, PARAMS, &mut right);

        assert!(left.x < 0.0);
        assert!(right.x > 0.0);
        assert!((left + right).length() < 1e-4);
    }

    #[test]
    fn coincident_points_get_opposite_directions() {
        let (a, _) = separation(Vec2::ZERO, Vec2::ZERO, 1, 2);
        let (b, _) = separation(Vec2::ZERO, Vec2::ZERO, 2, 1);
        assert!((a.length() - 1.0).abs() < 1e-5);
        assert!((a + b).length() < 1e-5);

        for (i, j) in [(0, 7), (3, 4), (12, 40)] {
            let (forward, _) = separation(vec2(5.0, 5.0), vec2(5.0, 5.0), i, j);
            let (backward, _) = separation(vec2(5.0, 5.0), vec2(5.0, 5.0), j, i);
            assert!((forward + backward).length() < 1e-5, "pair ({i}, {j})");
        }
    }

    #[test]
    fn approximation_tracks_exact_sum() {
        let mut positions = (0..60)
            .map(|i| vec2(400.0 + (i % 8) as f32 * 4.0, 400.0 + (i / 8) as f32 * 4.0))
            .collect::<Vec<_>>();
        positions.push(vec2(0.0, 0.0));
        let outlier = positions.len() - 1;
        let tree = QuadNode::build(&positions).unwrap();

        let mut approximate = Vec2::ZERO;
        accumulate_repulsion(&tree, outlier, &positions, PARAMS, &mut approximate);
        let exact = exact_repulsion(outlier, &positions);

        assert!((approximate - exact).length() <= exact.length() * 0.05);
    }
}
