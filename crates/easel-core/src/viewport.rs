//! Viewport transform math.
//!
//! The viewport is an affine `[a, b, c, d, e, f]` mapping world coordinates
//! to canvas-element pixels. Zoom is the `a` coefficient; `e`/`f` are the pan.

use kurbo::{Affine, Point, Size};
use std::time::{Duration, Instant};

/// Current zoom of a viewport transform.
pub fn zoom_of(transform: Affine) -> f64 {
    transform.as_coeffs()[0]
}

/// Set the zoom to `zoom`, keeping the world point under `point` fixed.
pub fn zoom_to_point(transform: Affine, point: Point, zoom: f64) -> Affine {
    let world = transform.inverse() * point;
    let [_, b, c, _, e, f] = transform.as_coeffs();
    let scaled = Affine::new([zoom, b, c, zoom, e, f]);
    let moved = scaled * world;
    Affine::new([zoom, b, c, zoom, e + point.x - moved.x, f + point.y - moved.y])
}

/// Translate so `world_center` lands on the middle of `canvas`.
pub fn center_on(transform: Affine, world_center: Point, canvas: Size) -> Affine {
    let [a, b, c, d, _, _] = transform.as_coeffs();
    Affine::new([
        a,
        b,
        c,
        d,
        canvas.width / 2.0 - world_center.x * a,
        canvas.height / 2.0 - world_center.y * d,
    ])
}

/// Largest uniform scale at which `content` fits inside `container`.
///
/// Degenerate content scales by 1.
pub fn scale_to_fit(content: Size, container: Size) -> f64 {
    if content.width <= 0.0 || content.height <= 0.0 {
        return 1.0;
    }
    (container.width / content.width).min(container.height / content.height)
}

/// Convert a canvas-element point to world coordinates.
pub fn screen_to_world(transform: Affine, point: Point) -> Point {
    transform.inverse() * point
}

/// Convert a world point to canvas-element coordinates.
pub fn world_to_screen(transform: Affine, point: Point) -> Point {
    transform * point
}

/// Exponential wheel zoom: `zoom * base^delta`, clamped to `[min, max]`.
pub fn wheel_zoom(zoom: f64, delta_y: f64, base: f64, min: f64, max: f64) -> f64 {
    (zoom * base.powf(delta_y)).clamp(min, max)
}

/// Leading + trailing throttle.
///
/// The first call in a quiet period fires immediately; calls inside the
/// interval are folded into one trailing call, fired by [`Throttle::flush`]
/// once the interval has passed.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_fired: Option<Instant>,
    pending: bool,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: None,
            pending: false,
        }
    }

    /// Register a call at `now`. Returns true when it should run right away.
    pub fn call(&mut self, now: Instant) -> bool {
        if self.ready(now) {
            self.fire(now);
            true
        } else {
            self.pending = true;
            false
        }
    }

    /// Returns true when a pending trailing call should run at `now`.
    pub fn flush(&mut self, now: Instant) -> bool {
        if self.pending && self.ready(now) {
            self.fire(now);
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    fn ready(&self, now: Instant) -> bool {
        match self.last_fired {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    fn fire(&mut self, now: Instant) {
        self.last_fired = Some(now);
        self.pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_zoom_to_point_keeps_point_fixed() {
        let start = Affine::new([1.5, 0.0, 0.0, 1.5, 30.0, -20.0]);
        let anchor = Point::new(400.0, 300.0);
        let world_before = screen_to_world(start, anchor);

        let zoomed = zoom_to_point(start, anchor, 3.0);
        assert!(close(zoom_of(zoomed), 3.0));
        let screen_after = world_to_screen(zoomed, world_before);
        assert!(close(screen_after.x, anchor.x));
        assert!(close(screen_after.y, anchor.y));
    }

    #[test]
    fn test_center_on() {
        let transform = Affine::new([2.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        let centered = center_on(transform, Point::new(50.0, 25.0), Size::new(800.0, 600.0));
        let screen = world_to_screen(centered, Point::new(50.0, 25.0));
        assert!(close(screen.x, 400.0));
        assert!(close(screen.y, 300.0));
    }

    #[test]
    fn test_scale_to_fit() {
        assert!(close(scale_to_fit(Size::new(800.0, 600.0), Size::new(400.0, 600.0)), 0.5));
        assert!(close(scale_to_fit(Size::new(100.0, 200.0), Size::new(400.0, 300.0)), 1.5));
        assert!(close(scale_to_fit(Size::ZERO, Size::new(400.0, 300.0)), 1.0));
    }

    #[test]
    fn test_wheel_zoom_clamps() {
        let mut zoom = 1.0;
        for _ in 0..200 {
            zoom = wheel_zoom(zoom, 500.0, 0.999, 0.01, 20.0);
            assert!(zoom >= 0.01);
        }
        assert!(close(zoom, 0.01));
        for _ in 0..200 {
            zoom = wheel_zoom(zoom, -500.0, 0.999, 0.01, 20.0);
            assert!(zoom <= 20.0);
        }
        assert!(close(zoom, 20.0));
    }

    #[test]
    fn test_throttle_leading_and_trailing() {
        let start = Instant::now();
        let mut throttle = Throttle::new(Duration::from_millis(50));

        assert!(throttle.call(start));
        assert!(!throttle.call(start + Duration::from_millis(10)));
        assert!(!throttle.call(start + Duration::from_millis(20)));
        assert!(throttle.is_pending());

        assert!(!throttle.flush(start + Duration::from_millis(30)));
        assert!(throttle.flush(start + Duration::from_millis(50)));
        assert!(!throttle.is_pending());
        assert!(!throttle.flush(start + Duration::from_millis(200)));

        assert!(throttle.call(start + Duration::from_millis(200)));
    }
}
