use eframe::egui::{self, Color32, Key, RichText, Ui};

use crate::ai::{build_prompt, model_from_config, provider_display_name};
use crate::config::Config;
use crate::history::HistoryEntry;
use crate::util::truncate_chars;
use crate::view::{LayoutMode, ViewFilter};

use super::super::{StatusKind, Workspace};

enum HistoryAction {
    Apply(HistoryEntry),
    Export(HistoryEntry),
    Clear,
}

impl Workspace {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        egui::ScrollArea::vertical()
            .id_salt("controls_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                self.draw_view_controls(ui);
                ui.separator();
                self.draw_query_controls(ui);
                ui.separator();
                self.draw_physics_controls(ui);
                ui.separator();
                self.draw_history_controls(ui);
            });
    }

    fn draw_view_controls(&mut self, ui: &mut Ui) {
        ui.heading("View");
        ui.add_space(4.0);

        let current = self.session.filter().clone();
        let mut selected = current.clone();
        egui::ComboBox::from_label("Filter")
            .selected_text(current.label())
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut selected, ViewFilter::All, ViewFilter::All.label());
                for year in self.session.network().years() {
                    let filter = ViewFilter::ByYear(year);
                    let label = filter.label();
                    ui.selectable_value(&mut selected, filter, label);
                }
                if let ViewFilter::ByMatchSet(_) = &current {
                    ui.selectable_value(&mut selected, current.clone(), current.label());
                }
            });
        if selected != current {
            self.session.set_filter(selected);
        }

        ui.add_space(4.0);
        ui.horizontal_wrapped(|ui| {
            ui.label("Layout:");
            let mut mode = self.session.mode();
            for candidate in LayoutMode::ALL {
                ui.selectable_value(&mut mode, candidate, candidate.label());
            }
            if mode != self.session.mode() {
                self.session.set_layout_mode(mode);
            }
        });
    }

    fn submit_query(&mut self) {
        let query = self.query.trim().to_owned();
        if query.is_empty() {
            return;
        }

        let model = match model_from_config(&self.config) {
            Ok(model) => model,
            Err(error) => {
                log::warn!("{error}");
                self.set_status(StatusKind::Error, error.to_string());
                return;
            }
        };

        let prompt = build_prompt(self.session.network(), &query, self.config.prompt_node_limit);
        let provider = model.name().to_owned();
        self.runner.submit(model, query, prompt);
        self.set_status(StatusKind::Info, format!("Asking {provider}..."));
    }

    fn draw_query_controls(&mut self, ui: &mut Ui) {
        ui.heading("Ask");
        ui.small(format!(
            "Describe who you are looking for. Sent to {}.",
            provider_display_name(&self.config.ai_provider)
        ));
        ui.add_space(4.0);

        let response = ui.add(
            egui::TextEdit::multiline(&mut self.query)
                .desired_rows(2)
                .hint_text("e.g. people who could mentor me in Rust"),
        );
        let enter = response.has_focus()
            && ui.input(|input| input.key_pressed(Key::Enter) && input.modifiers.command);

        ui.horizontal(|ui| {
            let ask = ui.add_enabled(!self.query.trim().is_empty(), egui::Button::new("Ask"));
            if ask.clicked() || enter {
                self.submit_query();
            }
            if self.runner.in_flight() > 0 {
                ui.spinner();
                ui.label(format!("{} pending", self.runner.in_flight()));
            }
            let has_match = self.session.active_match().is_some();
            if ui
                .add_enabled(has_match, egui::Button::new("Clear match"))
                .clicked()
            {
                self.session.clear_match();
            }
        });

        if let Some(status) = &self.status {
            let color = match status.kind {
                StatusKind::Info => Color32::from_gray(200),
                StatusKind::Transient => Color32::from_rgb(240, 190, 90),
                StatusKind::Error => Color32::from_rgb(235, 100, 90),
            };
            ui.label(RichText::new(status.text.as_str()).color(color));
        }
    }

    fn draw_physics_controls(&mut self, ui: &mut Ui) {
        ui.heading("Physics");
        ui.horizontal(|ui| {
            ui.checkbox(&mut self.live_physics, "Live");
            ui.checkbox(&mut self.show_labels, "All labels");
            if ui.button("Reheat").clicked() {
                self.session.reheat();
            }
            if ui.button("Reset camera").clicked() {
                self.pan = egui::Vec2::ZERO;
                self.zoom = 1.0;
            }
        });

        let mut physics = self.config.physics;
        let mut changed = false;
        changed |= ui
            .add(egui::Slider::new(&mut physics.link_distance, 30.0..=300.0).text("Link distance"))
            .changed();
        changed |= ui
            .add(egui::Slider::new(&mut physics.link_strength, 0.0..=1.0).text("Link strength"))
            .changed();
        changed |= ui
            .add(egui::Slider::new(&mut physics.node_charge, 0.0..=800.0).text("Repulsion"))
            .changed();
        changed |= ui
            .add(egui::Slider::new(&mut physics.target_strength, 0.0..=1.0).text("Layout pull"))
            .changed();
        changed |= ui
            .add(egui::Slider::new(&mut physics.velocity_decay, 0.05..=0.9).text("Friction"))
            .changed();
        if changed {
            self.config.physics = physics;
            self.session.set_physics(physics);
        }

        if ui.button("Save settings").clicked() {
            match Config::default_path().and_then(|path| self.config.save_to(&path).map(|()| path)) {
                Ok(path) => {
                    self.set_status(StatusKind::Info, format!("Saved {}", path.display()));
                }
                Err(error) => {
                    log::warn!("{error:#}");
                    self.set_status(StatusKind::Error, format!("{error:#}"));
                }
            }
        }
    }

    fn draw_history_controls(&mut self, ui: &mut Ui) {
        ui.heading("History")
            .on_hover_text(self.history.path().display().to_string());
        if self.history.entries().is_empty() {
            ui.label("No past queries.");
            return;
        }

        let mut action = None;
        if let Some(last) = self.history.last()
            && ui
                .button(format!("Re-apply last: {}", truncate_chars(&last.query, 32)))
                .clicked()
        {
            action = Some(HistoryAction::Apply(last.clone()));
        }

        egui::ScrollArea::vertical()
            .id_salt("history_scroll")
            .max_height(220.0)
            .show(ui, |ui| {
                for entry in self.history.entries().iter().rev() {
                    ui.horizontal(|ui| {
                        ui.label(format!(
                            "{}  {} ({})",
                            entry.timestamp.format("%Y-%m-%d %H:%M"),
                            truncate_chars(&entry.query, 28),
                            entry.result.matches.len()
                        ))
                        .on_hover_text(entry.result.explanation.as_str());
                        if ui.small_button("Apply").clicked() {
                            action = Some(HistoryAction::Apply(entry.clone()));
                        }
                        if ui.small_button("Export").clicked() {
                            action = Some(HistoryAction::Export(entry.clone()));
                        }
                    });
                }
            });

        if ui.button("Clear history").clicked() {
            action = Some(HistoryAction::Clear);
        }

        match action {
            Some(HistoryAction::Apply(entry)) => {
                self.session.apply_match_result(&entry.query, entry.result);
                self.set_status(StatusKind::Info, format!("Re-applied \"{}\"", entry.query));
            }
            Some(HistoryAction::Export(entry)) => match self.history.export(&entry) {
                Ok(path) => self.set_status(StatusKind::Info, format!("Exported {}", path.display())),
                Err(error) => {
                    log::warn!("{error:#}");
                    self.set_status(StatusKind::Error, format!("{error:#}"));
                }
            },
            Some(HistoryAction::Clear) => {
                if let Err(error) = self.history.clear() {
                    log::warn!("{error:#}");
                }
            }
            None => {}
        }
    }
}
