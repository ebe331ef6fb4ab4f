use std::time::{Duration, Instant};

use eframe::egui::{self, Align, Context, Layout, ProgressBar};

use crate::flows::{FlowRecord, RecordSource};

use super::super::coordinator::{CoordinatorConfig, HostCoordinator, LayoutOutcome, Phase};
use super::super::graph::interaction::InteractionController;
use super::super::graph::viewport::Viewport;
use super::super::ViewModel;

const LAYOUT_REPAINT_INTERVAL: Duration = Duration::from_millis(16);

impl ViewModel {
    pub(in crate::app) fn new(config: CoordinatorConfig, records: &[FlowRecord]) -> Self {
        let mut model = Self {
            coordinator: HostCoordinator::new(config),
            viewport: Viewport::default(),
            interaction: InteractionController::default(),
            scene_cache: None,
            summary_cache: None,
            reload_error: None,
        };
        model.ingest(records);
        model
    }

    /// Starts a new generation. The viewport is kept so a reload does not
    /// throw away where the user was looking.
    pub(in crate::app) fn ingest(&mut self, records: &[FlowRecord]) {
        self.coordinator.ingest(records);
    }

    fn layout_status_text(&self) -> String {
        match self.coordinator.phase() {
            Phase::Idle => return "idle".to_owned(),
            Phase::Building => return format!("building {}", self.coordinator.generation()),
            Phase::Computing => return format!("laying out {}", self.coordinator.generation()),
            Phase::Ready => {}
        }

        match self.coordinator.last_outcome() {
            Some(LayoutOutcome::Completed) | None => "layout ready".to_owned(),
            Some(LayoutOutcome::TimedOut) => "layout timed out, showing seeded positions".to_owned(),
            Some(LayoutOutcome::Failed) => "layout failed, showing seeded positions".to_owned(),
            Some(LayoutOutcome::Unavailable) => {
                "layout engine unavailable, showing seeded positions".to_owned()
            }
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        source: &RecordSource,
        reload_requested: &mut bool,
        is_reloading: bool,
    ) {
        if self.coordinator.poll(Instant::now()) {
            ctx.request_repaint();
        }
        if self.coordinator.is_loading() {
            ctx.request_repaint_after(LAYOUT_REPAINT_INTERVAL);
        }

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("traffic-graph");
                    ui.separator();
                    ui.label(format!("source: {source}"));
                    ui.label(format!("generation: {}", self.coordinator.generation()));
                    ui.label(format!("hosts: {}", self.coordinator.nodes().len()));
                    ui.label(format!("flows: {}", self.coordinator.links().len()));

                    let reload_button = ui.add_enabled(
                        !is_reloading && source.can_reload(),
                        egui::Button::new("Reload"),
                    );
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }

                    if let Some(error) = &self.reload_error {
                        ui.colored_label(ui.visuals().error_fg_color, "Reload failed")
                            .on_hover_text(error.as_str());
                    }

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(format!("zoom: {:.0}%", self.viewport.scale() * 100.0));
                        ui.add(
                            ProgressBar::new(self.coordinator.progress())
                                .desired_width(180.0)
                                .show_percentage(),
                        );
                        ui.label(self.layout_status_text());
                    });
                });
            });

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_graph(ui));
    }
}
