use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context};
use log::{error, info};

use crate::flows::{FlowRecord, GraphSummary, RecordSource, load_records};

mod coordinator;
mod graph;
mod layout;
mod render_utils;
mod ui;

pub use coordinator::CoordinatorConfig;
pub use layout::LayoutParams;

use coordinator::HostCoordinator;
use graph::interaction::InteractionController;
use graph::view::SceneCache;
use graph::viewport::Viewport;

type LoadResult = Result<Vec<FlowRecord>, String>;

pub struct TrafficGraphApp {
    source: RecordSource,
    config: CoordinatorConfig,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    coordinator: HostCoordinator,
    viewport: Viewport,
    interaction: InteractionController,
    scene_cache: Option<SceneCache>,
    summary_cache: Option<(u64, GraphSummary)>,
    reload_error: Option<String>,
}

impl TrafficGraphApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        source: RecordSource,
        config: CoordinatorConfig,
    ) -> Self {
        let state = Self::start_load(source.clone());
        Self {
            source,
            config,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(source: RecordSource) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            info!("loading flow records from {source}");
            let result = load_records(&source).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(source: RecordSource) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(source),
        }
    }
}

/// Applies a finished load. A reload into an existing graph never replaces
/// it: failures are reported on the model and the current graph stays up.
fn apply_load(
    state: &mut AppState,
    config: CoordinatorConfig,
    result: LoadResult,
) -> Option<AppState> {
    match (state, result) {
        (AppState::Ready(model), Ok(records)) => {
            model.reload_error = None;
            model.ingest(&records);
            None
        }
        (AppState::Ready(model), Err(message)) => {
            error!("reload failed: {message}");
            model.reload_error = Some(message);
            None
        }
        (_, Ok(records)) => Some(AppState::Ready(Box::new(ViewModel::new(config, &records)))),
        (_, Err(message)) => {
            error!("{message}");
            Some(AppState::Error(message))
        }
    }
}

impl eframe::App for TrafficGraphApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;
        let mut loaded = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(result) => loaded = Some(result),
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(AppState::Error(
                            "Background record loader disconnected".to_owned(),
                        ));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading(format!("Loading flow records from {}...", self.source));
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load flow records");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.source.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &self.source, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.source.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => loaded = Some(result),
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            model.reload_error =
                                Some("Background record loader disconnected".to_owned());
                        }
                    }
                }
            }
        }

        if let Some(result) = loaded {
            transition = apply_load(&mut self.state, self.config, result).or(transition);
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}
