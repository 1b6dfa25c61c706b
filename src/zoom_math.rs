//! Screen/image coordinate mapping.
//!
//! The canvas maps image coordinates to the screen with a single scale
//! factor, given as a zoom percentage, plus a pan offset in screen pixels:
//! `screen = image * zoom / 100 + offset`.

use crate::constants::{DEFAULT_ZOOM_PERCENT, FIT_MARGIN, MAX_ZOOM_PERCENT, MIN_ZOOM_PERCENT};
use crate::model::Point;

/// Pan/zoom state of the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    /// Zoom level in percent (100 = one image pixel per screen pixel).
    pub zoom_percent: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl ViewTransform {
    pub fn new(zoom_percent: f32, offset_x: f32, offset_y: f32) -> Self {
        Self {
            zoom_percent: clamp_zoom(zoom_percent),
            offset_x,
            offset_y,
        }
    }

    /// 100% zoom, no pan.
    pub fn identity() -> Self {
        Self::new(DEFAULT_ZOOM_PERCENT, 0.0, 0.0)
    }

    /// Scale factor applied to image coordinates.
    pub fn scale(&self) -> f32 {
        self.zoom_percent / 100.0
    }

    pub fn to_image(&self, screen: Point) -> Point {
        let scale = self.scale();
        Point::new(
            (screen.x - self.offset_x) / scale,
            (screen.y - self.offset_y) / scale,
        )
    }

    pub fn to_screen(&self, image: Point) -> Point {
        let scale = self.scale();
        Point::new(
            image.x * scale + self.offset_x,
            image.y * scale + self.offset_y,
        )
    }

    /// Convert a screen distance to image units.
    pub fn to_image_distance(&self, screen_distance: f32) -> f32 {
        screen_distance / self.scale()
    }

    /// Change the zoom while keeping the image point under `cursor` fixed.
    pub fn zoom_to_cursor(&self, zoom_percent: f32, cursor: Point) -> ViewTransform {
        let anchor = self.to_image(cursor);
        let zoom_percent = clamp_zoom(zoom_percent);
        let scale = zoom_percent / 100.0;
        ViewTransform {
            zoom_percent,
            offset_x: cursor.x - anchor.x * scale,
            offset_y: cursor.y - anchor.y * scale,
        }
    }

    /// Apply a pan delta in screen pixels.
    pub fn pan_by(&self, dx: f32, dy: f32) -> ViewTransform {
        ViewTransform {
            offset_x: self.offset_x + dx,
            offset_y: self.offset_y + dy,
            ..*self
        }
    }

    /// Same pan, different zoom (clamped).
    pub fn with_zoom(&self, zoom_percent: f32) -> ViewTransform {
        ViewTransform {
            zoom_percent: clamp_zoom(zoom_percent),
            ..*self
        }
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Clamp a zoom percentage to the supported range.
pub fn clamp_zoom(zoom_percent: f32) -> f32 {
    zoom_percent.clamp(MIN_ZOOM_PERCENT, MAX_ZOOM_PERCENT)
}

/// Zoom percentage that fits the whole image into the viewport.
pub fn fit_window_percent(viewport: (f32, f32), image: (u32, u32)) -> Option<f32> {
    let (vw, vh) = (viewport.0 - FIT_MARGIN, viewport.1 - FIT_MARGIN);
    let (iw, ih) = (image.0 as f32, image.1 as f32);
    if vw <= 0.0 || vh <= 0.0 || iw <= 0.0 || ih <= 0.0 {
        return None;
    }
    let scale = if iw / ih >= vw / vh { vw / iw } else { vh / ih };
    Some(clamp_zoom(scale * 100.0))
}

/// Zoom percentage that fits the image width into the viewport.
pub fn fit_width_percent(viewport_width: f32, image_width: u32) -> Option<f32> {
    let vw = viewport_width - FIT_MARGIN;
    if vw <= 0.0 || image_width == 0 {
        return None;
    }
    Some(clamp_zoom(vw / image_width as f32 * 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.0001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_identity_transform() {
        let t = ViewTransform::identity();
        assert_eq!(t.scale(), 1.0);
        assert_eq!(t.to_image(Point::new(12.0, 7.0)), Point::new(12.0, 7.0));
    }

    #[test]
    fn test_round_trip_mapping() {
        let t = ViewTransform::new(250.0, 13.0, -4.0);
        let image = Point::new(40.0, 22.5);
        let back = t.to_image(t.to_screen(image));
        assert!(approx_eq(back.x, image.x));
        assert!(approx_eq(back.y, image.y));
    }

    #[test]
    fn test_zoom_to_cursor_preserves_cursor_point() {
        let t = ViewTransform::new(100.0, 50.0, 30.0);
        let cursor = Point::new(150.0, 120.0);
        let before = t.to_image(cursor);

        let zoomed = t.zoom_to_cursor(200.0, cursor);
        let after = zoomed.to_image(cursor);

        assert_eq!(zoomed.zoom_percent, 200.0);
        assert!(approx_eq(before.x, after.x));
        assert!(approx_eq(before.y, after.y));
    }

    #[test]
    fn test_pan_by_preserves_zoom() {
        let t = ViewTransform::new(250.0, 10.0, 20.0);
        let panned = t.pan_by(5.0, -10.0);
        assert_eq!(panned.zoom_percent, 250.0);
        assert_eq!(panned.offset_x, 15.0);
        assert_eq!(panned.offset_y, 10.0);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let t = ViewTransform::identity().with_zoom(100_000.0);
        assert_eq!(t.zoom_percent, MAX_ZOOM_PERCENT);
        let t = ViewTransform::identity().with_zoom(-5.0);
        assert_eq!(t.zoom_percent, MIN_ZOOM_PERCENT);
    }

    #[test]
    fn test_screen_distance_scales() {
        let t = ViewTransform::new(200.0, 0.0, 0.0);
        assert!(approx_eq(t.to_image_distance(8.0), 4.0));
    }

    #[test]
    fn test_fit_window_uses_limiting_side() {
        // Wide image in a square viewport: width limits
        let z = fit_window_percent((202.0, 202.0), (400, 100)).unwrap();
        assert!(approx_eq(z, 50.0));
        // Tall image: height limits
        let z = fit_window_percent((202.0, 202.0), (100, 400)).unwrap();
        assert!(approx_eq(z, 50.0));
    }

    #[test]
    fn test_fit_width() {
        let z = fit_width_percent(802.0, 400).unwrap();
        assert!(approx_eq(z, 200.0));
        assert!(fit_width_percent(1.0, 400).is_none());
    }
}
