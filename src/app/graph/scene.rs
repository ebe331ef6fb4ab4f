use std::collections::HashMap;

use eframe::egui::{Color32, Pos2, Stroke, pos2, vec2};

use crate::flows::{Link, Node};

use super::super::render_utils::{LABEL_COLOR, link_stroke, node_fill, node_radius};
use super::viewport::Viewport;

/// Model-space distance from the cursor within which a node gets its label.
/// Fixed in model space, so it covers more screen pixels when zoomed in.
pub const HOVER_THRESHOLD: f32 = 10.0;

#[derive(Clone, Debug, PartialEq)]
pub struct SceneLine {
    pub from: Pos2,
    pub to: Pos2,
    pub stroke: Stroke,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneCircle {
    pub center: Pos2,
    pub radius: f32,
    pub fill: Color32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneLabel {
    pub anchor: Pos2,
    pub text: String,
    pub color: Color32,
}

/// Everything one frame draws, in surface coordinates. Links first, then
/// nodes, then labels.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    pub lines: Vec<SceneLine>,
    pub circles: Vec<SceneCircle>,
    pub labels: Vec<SceneLabel>,
    pub skipped_links: usize,
}

/// Indices of the nodes within [`HOVER_THRESHOLD`] of the cursor, measured in model space.
pub fn hovered_nodes(nodes: &[Node], viewport: &Viewport, cursor: Option<Pos2>) -> Vec<usize> {
    let Some(cursor) = cursor else {
        return Vec::new();
    };
    let cursor = viewport.to_model_space(cursor);

    nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| pos2(node.x, node.y).distance(cursor) < HOVER_THRESHOLD)
        .map(|(index, _)| index)
        .collect()
}

pub fn build_scene(nodes: &[Node], links: &[Link], viewport: &Viewport, cursor: Option<Pos2>) -> Scene {
    let surface_positions = nodes
        .iter()
        .map(|node| viewport.to_surface_space(pos2(node.x, node.y)))
        .collect::<Vec<_>>();
    let index_by_id = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.id.as_str(), index))
        .collect::<HashMap<_, _>>();

    let mut scene = Scene::default();

    for link in links {
        let (Some(&from), Some(&to)) = (
            index_by_id.get(link.source.as_str()),
            index_by_id.get(link.target.as_str()),
        ) else {
            scene.skipped_links += 1;
            continue;
        };
        scene.lines.push(SceneLine {
            from: surface_positions[from],
            to: surface_positions[to],
            stroke: link_stroke(link.is_urgent()),
        });
    }

    for (node, &center) in nodes.iter().zip(&surface_positions) {
        scene.circles.push(SceneCircle {
            center,
            radius: node_radius(node.degree) * viewport.scale(),
            fill: node_fill(node.degree),
        });
    }

    for index in hovered_nodes(nodes, viewport, cursor) {
        let radius = node_radius(nodes[index].degree) * viewport.scale();
        scene.labels.push(SceneLabel {
            anchor: surface_positions[index] + vec2(radius + 4.0, 0.0),
            text: nodes[index].id.clone(),
            color: LABEL_COLOR,
        });
    }

    scene
}

#[cfg(test)]
mod tests {
    use super::super::viewport::ZoomDirection;
    use super::*;
    use crate::app::render_utils::{MUTED_LINK_COLOR, URGENT_LINK_COLOR};

    fn node(id: &str, x: f32, y: f32, degree: u32) -> Node {
        Node {
            id: id.to_owned(),
            x,
            y,
            degree,
            is_high_priority: false,
            group: None,
        }
    }

    fn link(source: &str, target: &str, priority: i64) -> Link {
        Link {
            source: source.to_owned(),
            target: target.to_owned(),
            protocol: "TCP".to_owned(),
            packet_size: 1000,
            priority,
        }
    }

    fn viewports() -> Vec<Viewport> {
        let mut viewports = Vec::new();
        for zoom_steps in [0i32, 3, -5, 12] {
            for pan in [vec2(0.0, 0.0), vec2(-240.0, 75.5), vec2(900.0, -1300.0)] {
                let mut viewport = Viewport::default();
                viewport.pan(pan);
                for _ in 0..zoom_steps.unsigned_abs() {
                    viewport.zoom(if zoom_steps > 0 {
                        ZoomDirection::In
                    } else {
                        ZoomDirection::Out
                    });
                }
                viewports.push(viewport);
            }
        }
        viewports
    }

    #[test]
    fn dangling_links_are_skipped() {
        let nodes = [node("a", 0.0, 0.0, 1), node("b", 10.0, 0.0, 1)];
        let links = [link("a", "b", 999), link("a", "ghost", 999), link("ghost", "b", 1)];

        let scene = build_scene(&nodes, &links, &Viewport::default(), None);
        assert_eq!(scene.lines.len(), 1);
        assert_eq!(scene.skipped_links, 2);
        assert_eq!(scene.circles.len(), 2);
    }

    #[test]
    fn urgency_picks_link_color() {
        let nodes = [node("a", 0.0, 0.0, 3), node("b", 10.0, 0.0, 3)];
        let links = [link("a", "b", 2), link("a", "b", 3), link("b", "a", 999)];

        let scene = build_scene(&nodes, &links, &Viewport::default(), None);
        let colors = scene.lines.iter().map(|line| line.stroke.color).collect::<Vec<_>>();
        assert_eq!(colors, vec![URGENT_LINK_COLOR, MUTED_LINK_COLOR, MUTED_LINK_COLOR]);
    }

    #[test]
    fn circles_follow_the_transform() {
        let nodes = [node("a", 100.0, 50.0, 4)];
        let mut viewport = Viewport::default();
        viewport.pan(vec2(10.0, 20.0));
        viewport.zoom(ZoomDirection::In);

        let scene = build_scene(&nodes, &[], &viewport, None);
        let circle = &scene.circles[0];
        assert!((circle.center - pos2(120.0, 75.0)).length() < 1e-3);
        assert!((circle.radius - 5.0 * 1.1).abs() < 1e-4);
    }

    #[test]
    fn label_iff_cursor_within_model_threshold() {
        let nodes = [node("10.0.0.7", 400.0, 300.0, 2)];
        let offsets = [0.0, 4.0, 9.5, 10.5, 25.0];

        for viewport in viewports() {
            for offset in offsets {
                let model_cursor = pos2(400.0 + offset, 300.0);
                let cursor = viewport.to_surface_space(model_cursor);
                let scene = build_scene(&nodes, &[], &viewport, Some(cursor));

                let expected = offset < HOVER_THRESHOLD;
                assert_eq!(
                    !scene.labels.is_empty(),
                    expected,
                    "offset {offset} at scale {} translate {:?}",
                    viewport.scale(),
                    viewport.translate()
                );
                if expected {
                    assert_eq!(scene.labels[0].text, "10.0.0.7");
                }
            }
        }
    }

    #[test]
    fn several_nearby_nodes_can_all_be_labelled() {
        let nodes = [
            node("a", 100.0, 100.0, 1),
            node("b", 104.0, 100.0, 1),
            node("c", 300.0, 100.0, 1),
        ];

        let scene = build_scene(&nodes, &[], &Viewport::default(), Some(pos2(102.0, 100.0)));
        let labels = scene.labels.iter().map(|label| label.text.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, vec!["a", "b"]);
    }

    #[test]
    fn no_cursor_no_labels() {
        let nodes = [node("a", 0.0, 0.0, 1)];
        assert!(hovered_nodes(&nodes, &Viewport::default(), None).is_empty());
    }
}
