use eframe::egui::{RichText, Ui};

use super::super::Workspace;

impl Workspace {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        self.draw_match_summary(ui);
        self.draw_selection_details(ui);
        ui.separator();
        self.draw_connection_list(ui);
    }

    fn draw_match_summary(&self, ui: &mut Ui) {
        let Some(active) = self.session.active_match() else {
            return;
        };

        ui.heading("Matches");
        ui.label(RichText::new(active.query.as_str()).italics());
        if active.map.is_empty() {
            ui.label("Nobody in your network matched.");
        } else if !active.result.explanation.is_empty() {
            ui.label(active.result.explanation.as_str());
        }
        let missing = active.unknown_ids(self.session.network());
        if missing > 0 {
            ui.small(format!("{missing} suggested id(s) are not in your network."));
        }
        ui.separator();
    }

    fn draw_selection_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection");
        ui.add_space(4.0);

        let Some(node) = self.session.selected_node() else {
            ui.label("Select someone from the graph or the list.");
            return;
        };

        ui.label(RichText::new(node.display_name()).strong());
        if node.is_owner() {
            let profile = self.session.network().profile();
            if !profile.headline.is_empty() {
                ui.label(profile.headline.as_str());
            }
            if !profile.industry.is_empty() {
                ui.small(profile.industry.as_str());
            }
            ui.label(format!(
                "{} connection(s)",
                self.session.network().connection_count()
            ));
        } else {
            let headline = node.headline();
            if !headline.is_empty() {
                ui.label(headline);
            }
            ui.label(format!("Connected {}", node.connected.format("%d %b %Y")));
            if let Some(url) = &node.profile_url {
                ui.hyperlink_to("Open profile", url);
            }
        }

        let matched = self
            .session
            .active_match()
            .and_then(|active| active.map.get(&node.id));
        if let Some(entry) = matched {
            ui.add_space(4.0);
            ui.label(RichText::new(format!("Match score {:.0}", entry.score)).strong());
            if !entry.aspect.is_empty() {
                ui.small(entry.aspect.as_str());
            }
            if !entry.reason.is_empty() {
                ui.label(entry.reason.as_str());
            }
        }

        if ui.button("Clear selection").clicked() {
            self.session.select(None);
        }
    }
}
