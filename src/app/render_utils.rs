use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke};

use super::graph::viewport::Viewport;

pub(super) const LINK_WIDTH: f32 = 1.0;
pub(super) const URGENT_LINK_COLOR: Color32 = Color32::from_rgb(236, 94, 84);
pub(super) const MUTED_LINK_COLOR: Color32 = Color32::from_rgba_premultiplied(92, 104, 118, 150);
pub(super) const NODE_COLOR: Color32 = Color32::from_rgb(88, 166, 226);
pub(super) const HUB_NODE_COLOR: Color32 = Color32::from_rgb(246, 180, 84);
pub(super) const LABEL_COLOR: Color32 = Color32::from_gray(238);

/// Degree above which a host is drawn as a hub.
pub(super) const HUB_DEGREE: u32 = 5;
const NODE_BASE_RADIUS: f32 = 3.0;
const NODE_RADIUS_PER_LINK: f32 = 0.5;
const NODE_MAX_RADIUS: f32 = 12.0;

/// Model-space radius; grows with degree up to a cap.
pub(super) fn node_radius(degree: u32) -> f32 {
    (NODE_BASE_RADIUS + degree as f32 * NODE_RADIUS_PER_LINK).min(NODE_MAX_RADIUS)
}

pub(super) fn node_fill(degree: u32) -> Color32 {
    if degree > HUB_DEGREE {
        HUB_NODE_COLOR
    } else {
        NODE_COLOR
    }
}

pub(super) fn link_stroke(urgent: bool) -> Stroke {
    if urgent {
        Stroke::new(LINK_WIDTH, URGENT_LINK_COLOR)
    } else {
        Stroke::new(LINK_WIDTH, MUTED_LINK_COLOR)
    }
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, viewport: &Viewport, busy: bool) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = (60.0 * viewport.scale()).max(20.0);
    let origin = rect.min + viewport.translate();
    let grid = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], grid);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], grid);
        y += step;
    }

    let border = if busy {
        Color32::from_rgb(120, 120, 120)
    } else {
        Color32::from_rgb(70, 84, 100)
    };
    painter.rect_stroke(
        rect,
        0.0,
        Stroke::new(1.5, border),
        eframe::egui::StrokeKind::Inside,
    );
}
