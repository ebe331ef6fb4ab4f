use std::collections::BTreeSet;

use eframe::egui::{RichText, Ui};

use crate::flows::{GraphSummary, Node};
use crate::util::format_bytes;

use super::super::ViewModel;
use super::super::graph::scene::hovered_nodes;

impl ViewModel {
    fn cached_summary(&mut self) -> &GraphSummary {
        let revision = self.coordinator.revision();
        let cache = match self.summary_cache.take() {
            Some(cache) if cache.0 == revision => cache,
            _ => (revision, self.coordinator.graph().summary()),
        };
        &self.summary_cache.insert(cache).1
    }

    fn draw_host(&self, ui: &mut Ui, node: &Node) {
        let graph = self.coordinator.graph();
        let mut protocols = BTreeSet::new();
        let mut bytes = 0u64;
        for link in graph.incident_links(&node.id) {
            protocols.insert(link.protocol.as_str());
            bytes = bytes.saturating_add(link.packet_size);
        }

        ui.label(RichText::new(node.id.as_str()).strong());
        if let Some(group) = &node.group {
            ui.label(format!("Subnet: {group}.0/24"));
        }
        ui.label(format!("Flows: {}", node.degree));
        ui.label(format!(
            "Protocols: {}",
            protocols.into_iter().collect::<Vec<_>>().join(", ")
        ));
        ui.label(format!("Traffic: {}", format_bytes(bytes)));
        if node.is_high_priority {
            ui.label(RichText::new("Carries urgent traffic").color(ui.visuals().warn_fg_color));
        }
    }

    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Hovered Hosts");
        ui.add_space(6.0);

        let hovered = hovered_nodes(
            self.coordinator.nodes(),
            &self.viewport,
            self.interaction.cursor(),
        );
        if hovered.is_empty() {
            ui.label("Move the pointer over a host to inspect it.");
        }
        for index in hovered {
            if let Some(node) = self.coordinator.nodes().get(index) {
                self.draw_host(ui, node);
                ui.add_space(4.0);
            }
        }

        ui.separator();
        ui.heading("Summary");
        ui.add_space(6.0);

        let summary = self.cached_summary().clone();
        ui.label(format!("Hosts: {}", summary.node_count));
        ui.label(format!("Flows: {}", summary.link_count));
        ui.label(format!("Urgent flows: {}", summary.urgent_links));
        ui.label(format!("Total traffic: {}", format_bytes(summary.total_bytes)));

        ui.add_space(4.0);
        ui.label(RichText::new("Protocols").strong());
        for (protocol, count) in &summary.protocols {
            ui.label(format!("{protocol}: {count}"));
        }
    }
}
