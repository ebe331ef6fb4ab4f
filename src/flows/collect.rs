use std::fmt;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use rand::Rng;

use super::record::{FlowRecord, parse_records};

const DEMO_PROTOCOLS: [&str; 5] = ["TCP", "UDP", "ICMP", "TLS", "DNS"];

/// Where a generation of flow records comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordSource {
    File(PathBuf),
    Stdin,
    Demo { records: usize },
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Stdin => f.write_str("<stdin>"),
            Self::Demo { records } => write!(f, "demo traffic ({records} flows)"),
        }
    }
}

impl RecordSource {
    /// Stdin can only be drained once.
    pub fn can_reload(&self) -> bool {
        !matches!(self, Self::Stdin)
    }
}

pub fn load_records(source: &RecordSource) -> Result<Vec<FlowRecord>> {
    match source {
        RecordSource::File(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read flow records from {}", path.display()))?;
            parse_records(&raw)
                .with_context(|| format!("failed to parse flow records in {}", path.display()))
        }
        RecordSource::Stdin => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read flow records from stdin")?;
            parse_records(&raw).context("failed to parse flow records from stdin")
        }
        RecordSource::Demo { records } => Ok(demo_records(*records, &mut rand::rng())),
    }
}

/// Synthetic LAN traffic: a handful of busy servers in one subnet talking to
/// clients spread over a few others, with the occasional urgent flow.
pub fn demo_records<R: Rng>(count: usize, rng: &mut R) -> Vec<FlowRecord> {
    let servers = (1..=6).map(|host| format!("10.0.0.{host}")).collect::<Vec<_>>();
    let client_count = (count / 3).max(4);
    let clients = (0..client_count)
        .map(|index| format!("192.168.{}.{}", 1 + index % 3, 10 + index / 3))
        .collect::<Vec<_>>();

    (0..count)
        .map(|_| {
            let server = &servers[rng.random_range(0..servers.len())];
            let client = &clients[rng.random_range(0..clients.len())];
            let (source, target) = if rng.random_bool(0.5) {
                (client, server)
            } else {
                (server, client)
            };

            let mut record = FlowRecord::new(source.as_str(), target.as_str());
            if rng.random_bool(0.8) {
                record = record.with_protocol(DEMO_PROTOCOLS[rng.random_range(0..DEMO_PROTOCOLS.len())]);
            }
            if rng.random_bool(0.7) {
                record = record.with_packet_info(rng.random_range(40..1500).to_string());
            }
            if rng.random_bool(0.3) {
                record = record.with_priority(rng.random_range(0..6));
            }
            record
        })
        .collect()
}
