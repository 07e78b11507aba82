use serde::{Deserialize, Serialize};

use crate::{GraphLayout, Point};

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 2.5;
const FIT_MARGIN: f64 = 0.9;
/// Wheel sensitivity: one pixel of wheel delta scales by 2^0.002.
const WHEEL_RATE: f64 = 0.002;

/// Pan/zoom applied to the laid-out graph: `screen = world * scale + translate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }
}

impl ViewTransform {
    /// Centres a `graph_w` x `graph_h` graph in the view with a 10% margin,
    /// never enlarging it.
    pub fn fit(view_w: f64, view_h: f64, graph_w: f64, graph_h: f64) -> Self {
        let gw = if graph_w > 0.0 { graph_w } else { view_w };
        let gh = if graph_h > 0.0 { graph_h } else { view_h };
        let scale = ((view_w / gw).min(view_h / gh) * FIT_MARGIN)
            .min(1.0)
            .clamp(MIN_SCALE, MAX_SCALE);
        Self {
            scale,
            translate_x: (view_w - gw * scale) / 2.0,
            translate_y: (view_h - gh * scale) / 2.0,
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        Point {
            x: p.x * self.scale + self.translate_x,
            y: p.y * self.scale + self.translate_y,
        }
    }

    pub fn invert(&self, p: Point) -> Point {
        Point {
            x: (p.x - self.translate_x) / self.scale,
            y: (p.y - self.translate_y) / self.scale,
        }
    }

    /// Scales by `factor` keeping the world point under `anchor` in place.
    pub fn zoom_at(&mut self, factor: f64, anchor: Point) {
        let world = self.invert(anchor);
        self.scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        self.translate_x = anchor.x - world.x * self.scale;
        self.translate_y = anchor.y - world.y * self.scale;
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.translate_x += dx;
        self.translate_y += dy;
    }
}

/// Screen area of the tree plus the transform carried across re-layouts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    saved: Option<ViewTransform>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1200.0, 600.0)
    }
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            saved: None,
        }
    }

    pub fn saved(&self) -> Option<ViewTransform> {
        self.saved
    }

    /// Fits on first use; afterwards returns the saved transform unchanged.
    pub fn transform_for(&mut self, layout: &GraphLayout) -> ViewTransform {
        let (width, height) = (self.width, self.height);
        *self
            .saved
            .get_or_insert_with(|| ViewTransform::fit(width, height, layout.width, layout.height))
    }

    pub fn wheel(&mut self, delta_y: f64, anchor: Point) {
        let factor = 2f64.powf(-delta_y * WHEEL_RATE);
        self.saved.get_or_insert_with(ViewTransform::default).zoom_at(factor, anchor);
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.saved.get_or_insert_with(ViewTransform::default).pan(dx, dy);
    }

    /// Forgets the saved transform and fits `layout` again.
    pub fn reset(&mut self, layout: &GraphLayout) -> ViewTransform {
        self.saved = None;
        self.transform_for(layout)
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }
}
