use eframe::egui::{Align2, FontId, Painter, Pos2, Sense, Ui, Vec2};
use log::debug;

use super::super::ViewModel;
use super::super::render_utils::draw_background;
use super::scene::{Scene, build_scene};
use super::viewport::Viewport;

const LABEL_FONT_SIZE: f32 = 13.0;

#[derive(Clone, Copy, Debug, PartialEq)]
struct SceneCacheKey {
    revision: u64,
    viewport: Viewport,
    cursor: Option<Pos2>,
}

/// Last built scene; rebuilt only when the graph, the transform or the cursor moves.
pub(in crate::app) struct SceneCache {
    key: SceneCacheKey,
    scene: Scene,
}

fn paint_scene(painter: &Painter, offset: Vec2, scene: &Scene) {
    for line in &scene.lines {
        painter.line_segment([line.from + offset, line.to + offset], line.stroke);
    }

    for circle in &scene.circles {
        painter.circle_filled(circle.center + offset, circle.radius, circle.fill);
    }

    for label in &scene.labels {
        painter.text(
            label.anchor + offset,
            Align2::LEFT_CENTER,
            &label.text,
            FontId::proportional(LABEL_FONT_SIZE),
            label.color,
        );
    }
}

impl ViewModel {
    fn cached_scene(&mut self) -> &Scene {
        let key = SceneCacheKey {
            revision: self.coordinator.revision(),
            viewport: self.viewport,
            cursor: self.interaction.cursor(),
        };

        let cache = match self.scene_cache.take() {
            Some(cache) if cache.key == key => cache,
            _ => {
                let scene = build_scene(
                    self.coordinator.nodes(),
                    self.coordinator.links(),
                    &self.viewport,
                    key.cursor,
                );
                if scene.skipped_links > 0 {
                    debug!("skipped {} links with unknown endpoints", scene.skipped_links);
                }
                SceneCache { key, scene }
            }
        };

        &self.scene_cache.insert(cache).scene
    }

    /// Draws the surface at the top-left of the central panel. Surface
    /// coordinates are relative to its top-left corner; anything past the
    /// panel's edge is clipped.
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let surface = self.coordinator.surface();
        let size = Vec2::new(surface.width, surface.height).min(ui.available_size());
        let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());
        let loading = self.coordinator.is_loading();

        self.interaction
            .handle_frame(ui, rect, &response, &mut self.viewport);

        if response.hovered() || self.interaction.is_dragging() {
            ui.ctx()
                .set_cursor_icon(self.interaction.cursor_icon(loading));
        }

        let painter = ui.painter_at(rect);
        draw_background(&painter, rect, &self.viewport, loading);
        let offset = rect.min.to_vec2();
        let scene = self.cached_scene();
        paint_scene(&painter, offset, scene);
    }
}
