use eframe::egui::{self, Pos2, Rect, Ui, Vec2};

use super::super::Workspace;
use super::super::render_utils::{Camera, circle_visible};

impl Workspace {
    pub(in crate::app) fn camera(&self, rect: Rect) -> Camera {
        let viewport = self.session.viewport();
        Camera {
            rect,
            pan: self.pan,
            zoom: self.zoom,
            origin: Vec2::new(viewport.center_x(), viewport.center_y()),
        }
    }

    pub(in crate::app) fn handle_graph_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let camera = self.camera(rect);
        let world_before = camera.screen_to_world(pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.2, 5.0);
        self.pan = pointer - rect.center() - ((world_before - camera.origin) * self.zoom);
    }

    /// Primary drag moves a node when it started on one, otherwise it pans
    /// like the secondary and middle buttons do.
    pub(in crate::app) fn handle_graph_drag(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
        screen_positions: &[Pos2],
        screen_radii: &[f32],
    ) {
        let camera = self.camera(rect);

        if response.drag_started_by(egui::PointerButton::Primary) {
            let origin = ui.input(|input| input.pointer.press_origin());
            let grabbed = origin
                .and_then(|pointer| node_at(pointer, screen_positions, screen_radii))
                .and_then(|index| self.session.view().nodes.get(index))
                .map(|node| node.id.clone());
            if let Some(id) = grabbed
                && let Some(pointer) = response.interact_pointer_pos()
            {
                self.session.drag_start(&id, camera.screen_to_world(pointer));
            }
        }

        if self.session.dragging().is_some() {
            if response.dragged_by(egui::PointerButton::Primary)
                && let Some(pointer) = response.interact_pointer_pos()
            {
                self.session.drag_move(camera.screen_to_world(pointer));
            }
            if response.drag_stopped_by(egui::PointerButton::Primary) {
                self.session.drag_end();
            }
            return;
        }

        if response.dragged_by(egui::PointerButton::Primary)
            || response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.pan += response.drag_delta();
        }
    }

    pub(in crate::app) fn hovered_index(
        ui: &Ui,
        rect: Rect,
        screen_positions: &[Pos2],
        screen_radii: &[f32],
    ) -> Option<usize> {
        ui.input(|input| input.pointer.hover_pos())
            .filter(|pointer| rect.contains(*pointer))
            .and_then(|pointer| node_at(pointer, screen_positions, screen_radii))
    }
}

/// Closest node whose on-screen disc contains `pointer`.
fn node_at(pointer: Pos2, screen_positions: &[Pos2], screen_radii: &[f32]) -> Option<usize> {
    screen_positions
        .iter()
        .zip(screen_radii)
        .enumerate()
        .filter_map(|(index, (position, radius))| {
            let distance = position.distance(pointer);
            (distance <= radius.max(4.0)).then_some((index, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}

pub(in crate::app) fn visible_indices(rect: Rect, screen_positions: &[Pos2], screen_radii: &[f32]) -> Vec<usize> {
    (0..screen_positions.len())
        .filter(|&index| circle_visible(rect, screen_positions[index], screen_radii[index]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_at_prefers_closest_disc() {
        let positions = [Pos2::new(0.0, 0.0), Pos2::new(10.0, 0.0), Pos2::new(100.0, 0.0)];
        let radii = [8.0, 8.0, 8.0];
        assert_eq!(node_at(Pos2::new(7.0, 0.0), &positions, &radii), Some(1));
        assert_eq!(node_at(Pos2::new(2.0, 0.0), &positions, &radii), Some(0));
        assert_eq!(node_at(Pos2::new(50.0, 0.0), &positions, &radii), None);
    }

    #[test]
    fn test_visible_indices_skips_offscreen() {
        let rect = Rect::from_min_size(Pos2::ZERO, Vec2::new(100.0, 100.0));
        let positions = [Pos2::new(50.0, 50.0), Pos2::new(400.0, 50.0)];
        assert_eq!(visible_indices(rect, &positions, &[5.0, 5.0]), vec![0]);
    }
}
