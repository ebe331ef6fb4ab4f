use eframe::egui::{Pos2, Vec2};

pub const MIN_SCALE: f32 = 0.5;
pub const MAX_SCALE: f32 = 5.0;
const ZOOM_IN_FACTOR: f32 = 1.1;
const ZOOM_OUT_FACTOR: f32 = 0.9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

impl ZoomDirection {
    /// egui reports a positive vertical scroll when the wheel moves away from the user.
    pub fn from_scroll(delta_y: f32) -> Option<Self> {
        if delta_y > 0.0 {
            Some(Self::In)
        } else if delta_y < 0.0 {
            Some(Self::Out)
        } else {
            None
        }
    }
}

/// Affine map from model space to surface space: `surface = model * scale + translate`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    scale: f32,
    translate: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate: Vec2::ZERO,
        }
    }
}

impl Viewport {
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn translate(&self) -> Vec2 {
        self.translate
    }

    pub fn zoom(&mut self, direction: ZoomDirection) {
        let factor = match direction {
            ZoomDirection::In => ZOOM_IN_FACTOR,
            ZoomDirection::Out => ZOOM_OUT_FACTOR,
        };
        self.scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.translate += delta;
    }

    pub fn set_translate(&mut self, translate: Vec2) {
        self.translate = translate;
    }

    pub fn to_model_space(&self, surface: Pos2) -> Pos2 {
        ((surface.to_vec2() - self.translate) / self.scale).to_pos2()
    }

    pub fn to_surface_space(&self, model: Pos2) -> Pos2 {
        (model.to_vec2() * self.scale + self.translate).to_pos2()
    }
}
