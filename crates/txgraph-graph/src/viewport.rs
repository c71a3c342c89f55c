//! Camera over the rendered scene: fit, center, zoom and animated focus.

use serde::{Deserialize, Serialize};
use txgraph_core::Point;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewportConfig {
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Screen padding used by `fit` when the caller passes none.
    pub fit_padding: f32,
    pub animation_duration_ms: u64,
    /// Zoom used by `animate_to_node` when the caller passes none.
    pub focus_zoom: f32,
    /// Factor applied per zoom-in/zoom-out step.
    pub zoom_step: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.1,
            max_zoom: 4.0,
            fit_padding: 24.0,
            animation_duration_ms: 600,
            focus_zoom: 1.5,
            zoom_step: 1.2,
        }
    }
}

/// Axis-aligned rectangle in graph space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Smallest bounds containing every circle `(center, radius)`.
    pub fn around_circles(circles: impl IntoIterator<Item = (Point, f32)>) -> Option<Self> {
        circles.into_iter().fold(None, |acc, (c, r)| {
            let circle = Bounds::new(Point::new(c.x - r, c.y - r), Point::new(c.x + r, c.y + r));
            Some(match acc {
                Some(bounds) => bounds.union(&circle),
                None => circle,
            })
        })
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds::new(
            Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        )
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        self.min.lerp(self.max, 0.5)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Graph point shown at the middle of the viewport.
    pub center: Point,
    pub zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            center: Point::ZERO,
            zoom: 1.0,
        }
    }
}

pub fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraAnimation {
    pub from: Camera,
    pub to: Camera,
    pub duration_ms: u64,
    pub elapsed_ms: u64,
}

impl CameraAnimation {
    pub fn progress(&self) -> f32 {
        if self.duration_ms == 0 {
            1.0
        } else {
            (self.elapsed_ms as f32 / self.duration_ms as f32).min(1.0)
        }
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }

    pub fn current(&self) -> Camera {
        let t = ease_in_out(self.progress());
        Camera {
            center: self.from.center.lerp(self.to.center, t),
            zoom: self.from.zoom + (self.to.zoom - self.from.zoom) * t,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewportManager {
    config: ViewportConfig,
    camera: Camera,
    /// Width and height of the render target in screen units.
    size: Point,
    animation: Option<CameraAnimation>,
}

impl Default for ViewportManager {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

impl ViewportManager {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            config,
            camera: Camera::default(),
            size: Point::new(800.0, 600.0),
            animation: None,
        }
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ViewportConfig) {
        self.config = config;
        self.camera.zoom = self.clamp_zoom(self.camera.zoom);
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn zoom(&self) -> f32 {
        self.camera.zoom
    }

    pub fn set_size(&mut self, width: f32, height: f32) {
        self.size = Point::new(width.max(1.0), height.max(1.0));
    }

    pub fn size(&self) -> Point {
        self.size
    }

    fn clamp_zoom(&self, zoom: f32) -> f32 {
        if !zoom.is_finite() {
            return self.camera.zoom.clamp(self.config.min_zoom, self.config.max_zoom);
        }
        zoom.clamp(self.config.min_zoom, self.config.max_zoom)
    }

    /// Fits `bounds` inside the viewport with `padding` screen units on each
    /// side. Degenerate bounds (a single node) only recenter.
    pub fn fit(&mut self, bounds: Bounds, padding: Option<f32>) {
        self.animation = None;
        let padding = padding.unwrap_or(self.config.fit_padding).max(0.0);
        self.camera.center = bounds.center();
        if bounds.width() <= 0.0 && bounds.height() <= 0.0 {
            return;
        }
        let available_w = (self.size.x - 2.0 * padding).max(1.0);
        let available_h = (self.size.y - 2.0 * padding).max(1.0);
        let scale_w = if bounds.width() > 0.0 {
            available_w / bounds.width()
        } else {
            f32::INFINITY
        };
        let scale_h = if bounds.height() > 0.0 {
            available_h / bounds.height()
        } else {
            f32::INFINITY
        };
        self.camera.zoom = scale_w.min(scale_h).clamp(self.config.min_zoom, self.config.max_zoom);
    }

    /// Recenters on `bounds` without changing zoom.
    pub fn center(&mut self, bounds: Bounds) {
        self.animation = None;
        self.camera.center = bounds.center();
    }

    /// Multiplies zoom by `factor`, clamped to `[min_zoom, max_zoom]`.
    pub fn zoom_by(&mut self, factor: f32) -> f32 {
        self.zoom_by_within(factor, self.config.min_zoom, self.config.max_zoom)
    }

    /// Like `zoom_by` with tighter caller bounds. The result never leaves the
    /// configured range.
    pub fn zoom_by_within(&mut self, factor: f32, min: f32, max: f32) -> f32 {
        if factor <= 0.0 || !factor.is_finite() {
            return self.camera.zoom;
        }
        self.animation = None;
        let (lo, hi) = (min.min(max), min.max(max));
        let zoom = (self.camera.zoom * factor).clamp(lo, hi);
        self.camera.zoom = self.clamp_zoom(zoom);
        self.camera.zoom
    }

    /// Zooms keeping the graph point under `anchor` (screen) fixed.
    pub fn zoom_at(&mut self, factor: f32, anchor: Point) -> f32 {
        let before = self.screen_to_graph(anchor);
        self.zoom_by(factor);
        let after = self.screen_to_graph(anchor);
        self.camera.center = Point::new(
            self.camera.center.x + before.x - after.x,
            self.camera.center.y + before.y - after.y,
        );
        self.camera.zoom
    }

    pub fn zoom_in(&mut self) -> f32 {
        self.zoom_by(self.config.zoom_step)
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.zoom_by(1.0 / self.config.zoom_step)
    }

    pub fn pan_by(&mut self, screen_delta: Point) {
        self.animation = None;
        self.camera.center = Point::new(
            self.camera.center.x - screen_delta.x / self.camera.zoom,
            self.camera.center.y - screen_delta.y / self.camera.zoom,
        );
    }

    /// Starts a smooth move to `target` at `zoom`. A zero duration jumps.
    pub fn animate_to(&mut self, target: Point, zoom: Option<f32>, duration_ms: Option<u64>) {
        let to = Camera {
            center: target,
            zoom: self.clamp_zoom(zoom.unwrap_or(self.config.focus_zoom)),
        };
        let duration_ms = duration_ms.unwrap_or(self.config.animation_duration_ms);
        if duration_ms == 0 {
            self.animation = None;
            self.camera = to;
            return;
        }
        self.animation = Some(CameraAnimation {
            from: self.camera,
            to,
            duration_ms,
            elapsed_ms: 0,
        });
    }

    /// Advances the camera animation. Returns whether it is still running.
    pub fn tick(&mut self, elapsed_ms: u64) -> bool {
        let Some(animation) = self.animation.as_mut() else {
            return false;
        };
        animation.elapsed_ms = animation.elapsed_ms.saturating_add(elapsed_ms);
        self.camera = animation.current();
        if animation.is_finished() {
            self.camera = animation.to;
            self.animation = None;
            return false;
        }
        true
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn animation(&self) -> Option<&CameraAnimation> {
        self.animation.as_ref()
    }

    pub fn graph_to_screen(&self, p: Point) -> Point {
        Point::new(
            self.size.x / 2.0 + (p.x - self.camera.center.x) * self.camera.zoom,
            self.size.y / 2.0 + (p.y - self.camera.center.y) * self.camera.zoom,
        )
    }

    pub fn screen_to_graph(&self, p: Point) -> Point {
        Point::new(
            self.camera.center.x + (p.x - self.size.x / 2.0) / self.camera.zoom,
            self.camera.center.y + (p.y - self.size.y / 2.0) / self.camera.zoom,
        )
    }

    /// Graph-space area currently on screen.
    pub fn visible_bounds(&self) -> Bounds {
        Bounds::new(
            self.screen_to_graph(Point::ZERO),
            self.screen_to_graph(self.size),
        )
    }
}
