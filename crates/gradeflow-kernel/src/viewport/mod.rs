//! Viewport controller: pan/zoom transform of the canvas layer
//!
//! Knows nothing about nodes. Screen to model is `(p - offset) / scale`,
//! model to screen is the inverse; every placement and hit test goes through
//! these two functions.

use crate::config::ViewportConfig;
use crate::types::Point;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub offset: Point,
    pub scale: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            offset: Point::ORIGIN,
            scale: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Viewport {
    transform: ViewTransform,
    config: ViewportConfig,
    /// Last pointer position of an active pan gesture
    pan_anchor: Option<Point>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

impl Viewport {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            transform: ViewTransform::default(),
            config,
            pan_anchor: None,
        }
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn offset(&self) -> Point {
        self.transform.offset
    }

    pub fn scale(&self) -> f32 {
        self.transform.scale
    }

    pub fn is_panning(&self) -> bool {
        self.pan_anchor.is_some()
    }

    pub fn begin_pan(&mut self, screen: Point) {
        self.pan_anchor = Some(screen);
    }

    /// Move an active pan gesture to `screen`. No-op without `begin_pan`.
    pub fn pan_to(&mut self, screen: Point) {
        if let Some(anchor) = self.pan_anchor {
            self.transform.offset += screen - anchor;
            self.pan_anchor = Some(screen);
        }
    }

    pub fn end_pan(&mut self) {
        self.pan_anchor = None;
    }

    /// Shift the view by a fixed amount (keyboard or toolbar panning).
    pub fn pan_by(&mut self, delta: Point) {
        self.transform.offset += delta;
    }

    /// Apply a wheel event. Positive `wheel_delta_y` (scrolling down) zooms
    /// out. Anchored at the canvas origin, not at the cursor.
    pub fn zoom(&mut self, wheel_delta_y: f32) {
        if !wheel_delta_y.is_finite() {
            return;
        }
        let delta = -wheel_delta_y * self.config.zoom_sensitivity;
        self.set_scale(self.transform.scale + delta);
    }

    /// Set the scale directly, clamped to the configured bounds. Non-finite
    /// values are ignored.
    pub fn set_scale(&mut self, scale: f32) {
        if !scale.is_finite() {
            return;
        }
        // Inverted bounds resolve to max_scale instead of panicking.
        self.transform.scale = scale.max(self.config.min_scale).min(self.config.max_scale);
    }

    pub fn reset(&mut self) {
        self.transform = ViewTransform::default();
        self.pan_anchor = None;
    }

    pub fn screen_to_model(&self, screen: Point) -> Point {
        (screen - self.transform.offset).scale(1.0 / self.transform.scale)
    }

    pub fn model_to_screen(&self, model: Point) -> Point {
        model.scale(self.transform.scale) + self.transform.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pan_accumulates_pointer_deltas() {
        let mut vp = Viewport::default();
        vp.begin_pan(Point::new(100.0, 100.0));
        vp.pan_to(Point::new(110.0, 95.0));
        vp.pan_to(Point::new(130.0, 90.0));
        vp.end_pan();
        vp.pan_to(Point::new(500.0, 500.0));
        assert_eq!(vp.offset(), Point::new(30.0, -10.0));
    }

    #[test]
    fn wheel_down_zooms_out() {
        let mut vp = Viewport::default();
        vp.zoom(100.0);
        assert!((vp.scale() - 0.9).abs() < 1e-6);
        vp.zoom(-300.0);
        assert!((vp.scale() - 1.2).abs() < 1e-6);
    }

    #[test]
    fn mapping_round_trips() {
        let mut vp = Viewport::default();
        vp.pan_by(Point::new(40.0, -25.0));
        vp.set_scale(2.0);
        let model = Point::new(12.5, 8.0);
        let screen = vp.model_to_screen(model);
        assert_eq!(screen, Point::new(65.0, -9.0));
        assert_eq!(vp.screen_to_model(screen), model);
    }

    #[test]
    fn reset_restores_identity() {
        let mut vp = Viewport::default();
        vp.pan_by(Point::new(5.0, 5.0));
        vp.zoom(-500.0);
        vp.begin_pan(Point::ORIGIN);
        vp.reset();
        assert_eq!(vp.transform(), ViewTransform::default());
        assert!(!vp.is_panning());
    }
}
