use eframe::egui::{self, Align2, Color32, FontId, Pos2, Sense, Stroke, Ui, vec2};

use crate::engine::SessionEvent;
use crate::util::truncate_chars;
use crate::view::{TimeScale, Viewport};

use super::super::render_utils::{dim_color, draw_background};
use super::super::{SceneState, Workspace};
use super::interaction::visible_indices;

impl Workspace {
    /// Drains position and rebuild events. A snapshot from an older revision
    /// is discarded and the scene resyncs from the session.
    fn sync_scene(&mut self) {
        let mut resync = false;
        while let Ok(event) = self.scene_events.try_recv() {
            match event {
                SessionEvent::Positions(snapshot) if snapshot.revision == self.session.revision() => {
                    self.scene = SceneState {
                        revision: snapshot.revision,
                        positions: snapshot.positions,
                    };
                }
                SessionEvent::Positions(_) | SessionEvent::ViewRebuilt { .. } => resync = true,
                SessionEvent::SelectionChanged(_) => {}
            }
        }

        if resync
            || self.scene.revision != self.session.revision()
            || self.scene.positions.len() != self.session.view().node_count()
        {
            let snapshot = self.session.snapshot();
            self.scene = SceneState {
                revision: snapshot.revision,
                positions: snapshot.positions,
            };
        }
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        self.session
            .resize(Viewport::new(rect.width().max(1.0), rect.height().max(1.0)));
        self.handle_graph_zoom(ui, rect, &response);

        if self.live_physics || self.session.dragging().is_some() {
            self.session.tick();
        }
        self.sync_scene();

        let camera = self.camera(rect);
        let scale = TimeScale::from_nodes(&self.session.view().nodes, self.session.viewport());
        let years = self.session.network().years();
        draw_background(&painter, camera, &scale, &years);

        let node_scale = self.zoom.powf(0.4);
        let screen_positions = self
            .scene
            .positions
            .iter()
            .map(|position| camera.world_to_screen(*position))
            .collect::<Vec<Pos2>>();
        let screen_radii = self
            .session
            .styles()
            .iter()
            .map(|style| (style.radius * node_scale).clamp(2.5, 60.0))
            .collect::<Vec<f32>>();

        self.handle_graph_drag(ui, rect, &response, &screen_positions, &screen_radii);

        let hovered = Self::hovered_index(ui, rect, &screen_positions, &screen_radii);
        if hovered.is_some() {
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::PointingHand);
        }

        if response.clicked_by(egui::PointerButton::Primary) {
            let picked = hovered
                .and_then(|index| self.session.view().nodes.get(index))
                .map(|node| node.id.clone());
            self.session.select(picked.as_deref());
        }

        let view = self.session.view();
        let styles = self.session.styles();
        let selected_index = self.session.selected().and_then(|id| view.index_of(id));
        let zoom_sqrt = self.zoom.sqrt();

        let edge_color = Color32::from_rgba_unmultiplied(110, 120, 135, 120);
        for edge in &view.edges {
            let (Some(start), Some(end)) = (
                screen_positions.get(edge.source),
                screen_positions.get(edge.target),
            ) else {
                continue;
            };

            let touches_selection =
                selected_index.is_some_and(|index| index == edge.source || index == edge.target);
            let stroke = if touches_selection {
                Stroke::new((2.0 * zoom_sqrt).clamp(1.0, 4.0), Color32::from_rgb(235, 235, 240))
            } else if selected_index.is_some() {
                Stroke::new((0.8 * zoom_sqrt).clamp(0.4, 2.0), dim_color(edge_color, 0.5))
            } else {
                Stroke::new((0.8 * zoom_sqrt).clamp(0.4, 2.0), edge_color)
            };
            painter.line_segment([*start, *end], stroke);
        }

        // Selected node on top.
        let mut order = visible_indices(rect, &screen_positions, &screen_radii);
        if let Some(selected) = selected_index
            && let Some(slot) = order.iter().position(|index| *index == selected)
        {
            let index = order.remove(slot);
            order.push(index);
        }

        for index in order {
            let (Some(node), Some(style)) = (view.nodes.get(index), styles.get(index)) else {
                continue;
            };
            let position = screen_positions[index];
            let radius = screen_radii[index];
            let is_selected = selected_index == Some(index);
            let is_hovered = hovered == Some(index);

            let fill = if is_hovered {
                Color32::from_rgb(255, 164, 101)
            } else {
                style.fill
            };
            painter.circle_filled(position, radius, fill);
            painter.circle_stroke(position, radius, style.stroke(is_selected));

            let draw_label = self.show_labels
                || node.is_owner()
                || is_selected
                || is_hovered
                || (style.is_matched() && self.zoom > 0.8)
                || self.zoom > 1.6;
            if draw_label {
                painter.text(
                    position + vec2(radius + 5.0, 0.0),
                    Align2::LEFT_CENTER,
                    truncate_chars(node.display_name(), 28),
                    FontId::proportional(12.0),
                    Color32::from_gray(238),
                );
            }
        }

        if let Some(index) = hovered
            && let Some(node) = view.nodes.get(index)
        {
            let mut hover_text = format!("{}  |  {}  |  {}", node.display_name(), node.headline(), node.year());
            if let Some(score) = styles.get(index).and_then(|style| style.match_score) {
                hover_text.push_str(&format!("  |  match {score:.0}"));
            }
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                hover_text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        if view.node_count() <= 1 {
            painter.text(
                rect.center() + vec2(0.0, 60.0),
                Align2::CENTER_CENTER,
                "No connections in this view.",
                FontId::proportional(14.0),
                Color32::from_gray(170),
            );
        }

        if self.session.simulation().is_active() || response.dragged() {
            ui.ctx().request_repaint();
        }
    }
}
