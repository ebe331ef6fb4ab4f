use eframe::egui::{self, CursorIcon, PointerButton, Pos2, Rect, Ui, Vec2};

use super::viewport::{Viewport, ZoomDirection};

#[derive(Clone, Copy, Debug, PartialEq)]
struct DragStart {
    pointer: Pos2,
    translate: Vec2,
}

/// Turns pointer and wheel input (in surface coordinates) into viewport
/// changes plus the hover cursor position.
#[derive(Clone, Debug, Default)]
pub struct InteractionController {
    drag: Option<DragStart>,
    cursor: Option<Pos2>,
}

impl InteractionController {
    pub fn cursor(&self) -> Option<Pos2> {
        self.cursor
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Returns whether the viewport changed.
    pub fn wheel(&self, delta_y: f32, viewport: &mut Viewport) -> bool {
        let Some(direction) = ZoomDirection::from_scroll(delta_y) else {
            return false;
        };
        let before = viewport.scale();
        viewport.zoom(direction);
        viewport.scale() != before
    }

    pub fn press(&mut self, pointer: Pos2, viewport: &Viewport) {
        self.drag = Some(DragStart {
            pointer,
            translate: viewport.translate(),
        });
    }

    /// Moves the view so the point grabbed at press time follows the pointer.
    pub fn drag_to(&mut self, pointer: Pos2, viewport: &mut Viewport) -> bool {
        let Some(start) = self.drag else {
            return false;
        };
        let translate = start.translate + (pointer - start.pointer);
        if translate == viewport.translate() {
            return false;
        }
        viewport.set_translate(translate);
        true
    }

    pub fn release(&mut self) {
        self.drag = None;
    }

    pub fn hover(&mut self, pointer: Option<Pos2>) {
        self.cursor = pointer;
    }

    pub fn cursor_icon(&self, loading: bool) -> CursorIcon {
        if loading {
            CursorIcon::Wait
        } else if self.is_dragging() {
            CursorIcon::Grabbing
        } else {
            CursorIcon::Grab
        }
    }

    /// Feeds one frame of egui input for the surface allocated at `rect`.
    /// egui keeps reporting a drag after the pointer leaves the widget, so a
    /// pan survives the cursor briefly exiting the surface.
    pub(in crate::app) fn handle_frame(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
        viewport: &mut Viewport,
    ) -> bool {
        let to_surface = |screen: Pos2| (screen - rect.min).to_pos2();
        let mut changed = false;

        if response.hovered() {
            let scroll = ui.input(|input| input.raw_scroll_delta.y);
            changed |= self.wheel(scroll, viewport);
        }

        if response.drag_started_by(PointerButton::Primary) {
            let origin = ui
                .input(|input| input.pointer.press_origin())
                .or_else(|| response.interact_pointer_pos());
            if let Some(origin) = origin {
                self.press(to_surface(origin), viewport);
            }
        }

        if self.is_dragging() {
            if let Some(pointer) = ui.input(|input| input.pointer.latest_pos()) {
                changed |= self.drag_to(to_surface(pointer), viewport);
            }
            if response.drag_stopped() || !ui.input(|input| input.pointer.primary_down()) {
                self.release();
            }
        }

        let hovered = ui.input(|input| input.pointer.hover_pos());
        self.hover(hovered.and_then(|pos| surface_hover(rect, pos)));
        changed
    }
}

/// Pointer position in surface coordinates, or `None` when it is outside the
/// visible part of the surface.
fn surface_hover(rect: Rect, screen: Pos2) -> Option<Pos2> {
    rect.contains(screen).then(|| (screen - rect.min).to_pos2())
}
