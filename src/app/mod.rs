use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use anyhow::Result;
use chrono::Utc;
use eframe::egui::{self, Context, Vec2};

use crate::ai::QueryRunner;
use crate::config::Config;
use crate::engine::{ListEntry, Session, SessionEvent};
use crate::history::History;
use crate::network::{Network, OwnerProfile, read_connections, read_profile};

mod graph;
mod render_utils;
mod ui;

#[derive(Clone, Debug)]
pub struct LoadRequest {
    pub connections: PathBuf,
    pub profile: Option<PathBuf>,
    pub owner_name: String,
}

pub struct ConstellateApp {
    request: LoadRequest,
    config: Config,
    state: AppState,
}

enum AppState {
    Loading { rx: Receiver<Result<Network, String>> },
    Ready(Box<Workspace>),
    Error(String),
}

/// What the scene last received from the session.
struct SceneState {
    revision: u64,
    positions: Arc<[Vec2]>,
}

/// Side list, regenerated in full whenever the view or the selection changes.
struct ListState {
    entries: Vec<ListEntry>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum StatusKind {
    Info,
    Transient,
    Error,
}

struct StatusLine {
    kind: StatusKind,
    text: String,
}

struct Workspace {
    session: Session,
    scene_events: Receiver<SessionEvent>,
    list_events: Receiver<SessionEvent>,
    scene: SceneState,
    list: ListState,
    config: Config,
    history: History,
    runner: QueryRunner,
    query: String,
    search: String,
    status: Option<StatusLine>,
    pan: Vec2,
    zoom: f32,
    live_physics: bool,
    show_labels: bool,
}

fn load_network(request: &LoadRequest) -> Result<Network> {
    let records = read_connections(&request.connections)?;
    let profile = match &request.profile {
        Some(path) => read_profile(path)?,
        None => OwnerProfile::default(),
    };
    Ok(Network::from_records(
        records,
        &request.owner_name,
        profile,
        Utc::now(),
    ))
}

impl ConstellateApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, request: LoadRequest, config: Config) -> Self {
        let state = Self::start_load(request.clone());
        Self {
            request,
            config,
            state,
        }
    }

    fn start_load(request: LoadRequest) -> AppState {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_network(&request).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        AppState::Loading { rx }
    }

    fn open_history(&self) -> History {
        let path = History::default_path().unwrap_or_else(|error| {
            log::warn!("{error:#}; keeping history next to the export");
            self.request
                .connections
                .with_file_name("constellate-history.json")
        });
        History::open(path, self.config.history_limit)
    }
}

impl eframe::App for ConstellateApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;
        let mut retry = false;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(result);
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading connections...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint();
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the connections export");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    retry = ui.button("Retry").clicked();
                });
            }
            AppState::Ready(workspace) => workspace.show(ctx),
        }

        if retry {
            self.state = Self::start_load(self.request.clone());
        }

        if let Some(result) = transition {
            self.state = match result {
                Ok(network) => {
                    let history = self.open_history();
                    AppState::Ready(Box::new(Workspace::new(
                        network,
                        self.config.clone(),
                        history,
                    )))
                }
                Err(error) => {
                    log::error!("{error}");
                    AppState::Error(error)
                }
            };
        }
    }
}
