use chrono::Utc;
use eframe::egui::{self, Align, Context, Layout, Vec2};

use crate::ai::{QueryRunner, provider_display_name};
use crate::config::Config;
use crate::engine::{QueryStatus, Session, SessionEvent};
use crate::history::History;
use crate::network::Network;
use crate::view::Viewport;

use super::super::{ListState, SceneState, StatusKind, StatusLine, Workspace};

impl Workspace {
    pub(in crate::app) fn new(network: Network, config: Config, history: History) -> Self {
        let mut session = Session::new(
            network,
            config.default_layout,
            Viewport::new(1200.0, 800.0),
            config.physics,
        );
        let scene_events = session.subscribe();
        let list_events = session.subscribe();

        let snapshot = session.snapshot();
        let list = ListState {
            entries: session.list_entries(),
        };
        log::info!(
            "session ready: {} connection(s), {} layout",
            session.network().connection_count(),
            session.mode()
        );

        Self {
            session,
            scene_events,
            list_events,
            scene: SceneState {
                revision: snapshot.revision,
                positions: snapshot.positions,
            },
            list,
            config,
            history,
            runner: QueryRunner::new(),
            query: String::new(),
            search: String::new(),
            status: None,
            pan: Vec2::ZERO,
            zoom: 1.0,
            live_physics: true,
            show_labels: false,
        }
    }

    pub(in crate::app) fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = Some(StatusLine {
            kind,
            text: text.into(),
        });
    }

    fn poll_queries(&mut self) {
        for reply in self.runner.poll() {
            let result = reply.outcome.as_ref().ok().cloned();
            match self
                .session
                .apply_query_outcome(reply.ticket, &reply.query, reply.outcome)
            {
                QueryStatus::Applied { matched } => {
                    if let Some(result) = result
                        && let Err(error) = self.history.record(&reply.query, &result, Utc::now())
                    {
                        log::warn!("{error:#}");
                    }
                    self.set_status(
                        StatusKind::Info,
                        format!("\"{}\" matched {matched} connection(s)", reply.query),
                    );
                }
                QueryStatus::Stale => {}
                QueryStatus::Transient(message) => {
                    self.set_status(StatusKind::Transient, format!("{message}. Try again shortly."));
                }
                QueryStatus::Failed(message) => self.set_status(StatusKind::Error, message),
            }
        }
    }

    /// The list is regenerated from scratch on any rebuild or selection change.
    fn sync_list(&mut self) {
        let mut dirty = false;
        while let Ok(event) = self.list_events.try_recv() {
            if matches!(
                event,
                SessionEvent::ViewRebuilt { .. } | SessionEvent::SelectionChanged(_)
            ) {
                dirty = true;
            }
        }
        if dirty {
            self.list.entries = self.session.list_entries();
        }
    }

    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        self.poll_queries();
        self.sync_list();
        if self.runner.in_flight() > 0 {
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("constellate");
                    ui.separator();
                    ui.label(format!("owner: {}", self.session.network().owner().display_name()));
                    ui.label(format!(
                        "connections: {}",
                        self.session.network().connection_count()
                    ));
                    ui.label(format!("view: {}", self.session.filter().label()));
                    ui.label(format!("layout: {}", self.session.mode()));
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(format!(
                            "ai: {}",
                            provider_display_name(&self.config.ai_provider)
                        ));
                        ui.label(format!(
                            "shown: {}  alpha {:.3}",
                            self.session.view().node_count() - 1,
                            self.session.simulation().alpha()
                        ));
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_graph(ui));
    }
}
