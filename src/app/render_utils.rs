use chrono::NaiveDate;
use eframe::egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Stroke, Vec2, vec2};

use crate::view::TimeScale;

/// Screen mapping for layout coordinates. Layout space is the viewport at
/// zoom 1 with its center at `origin`.
#[derive(Clone, Copy)]
pub(super) struct Camera {
    pub(super) rect: Rect,
    pub(super) pan: Vec2,
    pub(super) zoom: f32,
    pub(super) origin: Vec2,
}

impl Camera {
    pub(super) fn world_to_screen(self, world: Vec2) -> Pos2 {
        self.rect.center() + self.pan + (world - self.origin) * self.zoom
    }

    pub(super) fn screen_to_world(self, screen: Pos2) -> Vec2 {
        (screen - self.rect.center() - self.pan) / self.zoom + self.origin
    }
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

/// Background fill plus one guide line per calendar year in `years`.
pub(super) fn draw_background(painter: &Painter, camera: Camera, scale: &TimeScale, years: &[i32]) {
    painter.rect_filled(camera.rect, 0.0, Color32::from_rgb(19, 23, 29));

    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 90));
    for &year in years {
        let Some(start) = NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
        else {
            continue;
        };

        let y = camera.world_to_screen(vec2(0.0, scale.map(start))).y;
        if y < camera.rect.top() || y > camera.rect.bottom() {
            continue;
        }

        painter.line_segment(
            [Pos2::new(camera.rect.left(), y), Pos2::new(camera.rect.right(), y)],
            stroke,
        );
        painter.text(
            Pos2::new(camera.rect.left() + 8.0, y - 2.0),
            Align2::LEFT_BOTTOM,
            year.to_string(),
            FontId::proportional(11.0),
            Color32::from_gray(130),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_round_trip() {
        let camera = Camera {
            rect: Rect::from_min_size(Pos2::new(100.0, 50.0), vec2(800.0, 600.0)),
            pan: vec2(12.0, -7.0),
            zoom: 1.5,
            origin: vec2(400.0, 300.0),
        };
        let world = vec2(123.0, 456.0);
        let back = camera.screen_to_world(camera.world_to_screen(world));
        assert!((back - world).length() < 0.001);
        assert_eq!(camera.world_to_screen(camera.origin), Pos2::new(512.0, 343.0));
    }

    #[test]
    fn test_circle_visible() {
        let rect = Rect::from_min_size(Pos2::ZERO, vec2(100.0, 100.0));
        assert!(circle_visible(rect, Pos2::new(50.0, 50.0), 5.0));
        assert!(circle_visible(rect, Pos2::new(-3.0, 50.0), 5.0));
        assert!(!circle_visible(rect, Pos2::new(-30.0, 50.0), 5.0));
    }
}
