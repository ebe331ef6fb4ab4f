use std::collections::{BTreeMap, HashMap};

use rand::Rng;

use super::record::{FlowRecord, parse_packet_size};
use crate::util::ipv4_subnet;

pub const DEFAULT_PROTOCOL: &str = "TCP";
pub const DEFAULT_PACKET_SIZE: u64 = 1000;
/// Priority used when a record carries none; sorts as the least urgent.
pub const UNSPECIFIED_PRIORITY: i64 = 999;
/// Links at or below this priority are drawn and flagged as urgent.
pub const URGENT_PRIORITY: i64 = 2;
const DEFAULT_SURFACE_WIDTH: f32 = 1800.0;
const DEFAULT_SURFACE_HEIGHT: f32 = 1200.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSize {
    pub width: f32,
    pub height: f32,
}

impl SurfaceSize {
    /// Non-finite extents fall back to the default size; the rest are clamped to at least 1.
    pub fn new(width: f32, height: f32) -> Self {
        let extent = |value: f32, fallback: f32| {
            if value.is_finite() {
                value.max(1.0)
            } else {
                fallback
            }
        };
        Self {
            width: extent(width, DEFAULT_SURFACE_WIDTH),
            height: extent(height, DEFAULT_SURFACE_HEIGHT),
        }
    }

    pub fn contains(self, x: f32, y: f32) -> bool {
        (0.0..=self.width).contains(&x) && (0.0..=self.height).contains(&y)
    }
}

impl Default for SurfaceSize {
    fn default() -> Self {
        Self::new(DEFAULT_SURFACE_WIDTH, DEFAULT_SURFACE_HEIGHT)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub degree: u32,
    pub is_high_priority: bool,
    pub group: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub source: String,
    pub target: String,
    pub protocol: String,
    pub packet_size: u64,
    pub priority: i64,
}

impl Link {
    fn from_record(record: &FlowRecord) -> Self {
        let protocol = record
            .protocol
            .as_deref()
            .map(str::trim)
            .filter(|protocol| !protocol.is_empty())
            .unwrap_or(DEFAULT_PROTOCOL)
            .to_owned();
        let packet_size = record
            .packet_info
            .as_deref()
            .and_then(parse_packet_size)
            .unwrap_or(DEFAULT_PACKET_SIZE);

        Self {
            source: record.source_ip.clone(),
            target: record.destination_ip.clone(),
            protocol,
            packet_size,
            priority: record.priority.unwrap_or(UNSPECIFIED_PRIORITY),
        }
    }

    pub fn is_urgent(&self) -> bool {
        self.priority <= URGENT_PRIORITY
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }
}

/// A built generation of the traffic graph: deduplicated hosts plus one link per record.
#[derive(Clone, Debug, Default)]
pub struct TrafficGraph {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphSummary {
    pub node_count: usize,
    pub link_count: usize,
    pub urgent_links: usize,
    pub total_bytes: u64,
    pub protocols: BTreeMap<String, usize>,
}

impl TrafficGraph {
    /// Builds nodes and links from raw records. Never fails: every optional
    /// field has a default, and nodes are the union of all link endpoints.
    pub fn build<R: Rng>(records: &[FlowRecord], surface: SurfaceSize, rng: &mut R) -> Self {
        let links = records.iter().map(Link::from_record).collect::<Vec<_>>();

        let mut index_by_id: HashMap<&str, usize> = HashMap::with_capacity(links.len());
        let mut nodes: Vec<Node> = Vec::new();
        for link in &links {
            for endpoint in [link.source.as_str(), link.target.as_str()] {
                let index = *index_by_id.entry(endpoint).or_insert_with(|| {
                    nodes.push(Node {
                        id: endpoint.to_owned(),
                        x: rng.random_range(0.0..=surface.width),
                        y: rng.random_range(0.0..=surface.height),
                        degree: 0,
                        is_high_priority: false,
                        group: ipv4_subnet(endpoint),
                    });
                    nodes.len() - 1
                });

                let node = &mut nodes[index];
                node.degree += 1;
                node.is_high_priority |= link.is_urgent();
            }
        }

        Self { nodes, links }
    }

    #[cfg(test)]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn incident_links<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Link> + 'a {
        self.links.iter().filter(move |link| link.touches(id))
    }

    pub fn summary(&self) -> GraphSummary {
        let mut summary = GraphSummary {
            node_count: self.nodes.len(),
            link_count: self.links.len(),
            ..GraphSummary::default()
        };

        for link in &self.links {
            summary.total_bytes = summary.total_bytes.saturating_add(link.packet_size);
            if link.is_urgent() {
                summary.urgent_links += 1;
            }
            *summary.protocols.entry(link.protocol.clone()).or_default() += 1;
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn build(records: &[FlowRecord]) -> TrafficGraph {
        let mut rng = StdRng::seed_from_u64(7);
        TrafficGraph::build(records, SurfaceSize::default(), &mut rng)
    }

    #[test]
    fn triangle_yields_three_nodes_of_degree_two() {
        let records = [
            FlowRecord::new("A", "B"),
            FlowRecord::new("B", "C"),
            FlowRecord::new("A", "C"),
        ];
        let graph = build(&records);

        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.links.len(), 3);
        for node in &graph.nodes {
            assert_eq!(node.degree, 2, "node {}", node.id);
        }
        for link in &graph.links {
            assert_eq!(link.protocol, "TCP");
            assert_eq!(link.packet_size, 1000);
            assert_eq!(link.priority, 999);
        }
    }

    #[test]
    fn every_endpoint_appears_once_with_matching_degree() {
        let records = [
            FlowRecord::new("10.0.0.1", "10.0.0.2"),
            FlowRecord::new("10.0.0.1", "10.0.0.2"),
            FlowRecord::new("10.0.0.2", "10.0.0.3"),
            FlowRecord::new("10.0.0.4", "10.0.0.4"),
            FlowRecord::new("10.0.0.1", "192.168.1.9"),
        ];
        let graph = build(&records);

        let ids = graph.nodes.iter().map(|node| node.id.as_str()).collect::<Vec<_>>();
        let unique = ids.iter().copied().collect::<HashSet<_>>();
        assert_eq!(ids.len(), unique.len());

        for link in &graph.links {
            assert!(unique.contains(link.source.as_str()));
            assert!(unique.contains(link.target.as_str()));
        }

        for node in &graph.nodes {
            let expected = graph
                .links
                .iter()
                .map(|link| (link.source == node.id) as u32 + (link.target == node.id) as u32)
                .sum::<u32>();
            assert_eq!(node.degree, expected, "node {}", node.id);
        }
        assert_eq!(graph.node("10.0.0.4").map(|node| node.degree), Some(2));
    }

    #[test]
    fn explicit_fields_override_defaults() {
        let records = [
            FlowRecord::new("a", "b")
                .with_protocol("UDP")
                .with_packet_info("64 bytes")
                .with_priority(1),
            FlowRecord::new("b", "c")
                .with_protocol("  ")
                .with_packet_info("n/a"),
        ];
        let graph = build(&records);

        assert_eq!(graph.links[0].protocol, "UDP");
        assert_eq!(graph.links[0].packet_size, 64);
        assert_eq!(graph.links[0].priority, 1);
        assert_eq!(graph.links[1].protocol, "TCP");
        assert_eq!(graph.links[1].packet_size, 1000);
        assert_eq!(graph.links[1].priority, 999);
    }

    #[test]
    fn seeds_positions_inside_surface() {
        let records = (0..50)
            .map(|i| FlowRecord::new(format!("h{i}"), format!("h{}", (i * 7) % 50)))
            .collect::<Vec<_>>();
        let surface = SurfaceSize::new(300.0, 200.0);
        let mut rng = StdRng::seed_from_u64(3);
        let graph = TrafficGraph::build(&records, surface, &mut rng);

        assert!(!graph.nodes.is_empty());
        for node in &graph.nodes {
            assert!(surface.contains(node.x, node.y), "{node:?}");
        }
    }

    #[test]
    fn non_finite_surface_falls_back_and_still_seeds() {
        let surface = SurfaceSize::new(f32::INFINITY, f32::NAN);
        assert_eq!(surface, SurfaceSize::default());
        assert_eq!(SurfaceSize::new(-5.0, 0.0), SurfaceSize::new(1.0, 1.0));

        let mut rng = StdRng::seed_from_u64(5);
        let graph = TrafficGraph::build(&[FlowRecord::new("a", "b")], surface, &mut rng);
        for node in &graph.nodes {
            assert!(surface.contains(node.x, node.y));
        }
    }

    #[test]
    fn derives_group_and_priority_flag() {
        let records = [
            FlowRecord::new("10.1.2.3", "10.1.2.4").with_priority(2),
            FlowRecord::new("10.1.2.4", "fe80::1"),
        ];
        let graph = build(&records);

        let first = graph.node("10.1.2.3").unwrap();
        assert!(first.is_high_priority);
        assert_eq!(first.group.as_deref(), Some("10.1.2"));
        assert!(graph.node("10.1.2.4").unwrap().is_high_priority);

        let v6 = graph.node("fe80::1").unwrap();
        assert!(!v6.is_high_priority);
        assert_eq!(v6.group, None);
    }

    #[test]
    fn empty_input_builds_empty_graph() {
        let graph = build(&[]);
        assert!(graph.nodes.is_empty());
        assert!(graph.links.is_empty());
        assert_eq!(graph.summary(), GraphSummary::default());
    }

    #[test]
    fn summary_counts_protocols_and_bytes() {
        let records = [
            FlowRecord::new("a", "b").with_protocol("UDP").with_packet_info("100"),
            FlowRecord::new("a", "c").with_priority(0),
            FlowRecord::new("c", "b").with_protocol("UDP").with_packet_info("50"),
        ];
        let summary = build(&records).summary();

        assert_eq!(summary.node_count, 3);
        assert_eq!(summary.link_count, 3);
        assert_eq!(summary.urgent_links, 1);
        assert_eq!(summary.total_bytes, 1150);
        assert_eq!(summary.protocols.get("UDP"), Some(&2));
        assert_eq!(summary.protocols.get("TCP"), Some(&1));
    }
}
