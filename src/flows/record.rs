use anyhow::{Context, Result, anyhow};
use log::warn;
use serde::Deserialize;
use serde_json::Value;

/// One captured flow between two endpoints, as it arrives from the ingestion source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct FlowRecord {
    #[serde(rename = "SourceIP")]
    pub source_ip: String,
    #[serde(rename = "DestinationIP")]
    pub destination_ip: String,
    #[serde(default, rename = "Protocol", deserialize_with = "lenient_text")]
    pub protocol: Option<String>,
    #[serde(default, rename = "PacketInfo", deserialize_with = "packet_info_text")]
    pub packet_info: Option<String>,
    #[serde(default, rename = "Priority", deserialize_with = "lenient_priority")]
    pub priority: Option<i64>,
}

impl FlowRecord {
    pub fn new(source_ip: impl Into<String>, destination_ip: impl Into<String>) -> Self {
        Self {
            source_ip: source_ip.into(),
            destination_ip: destination_ip.into(),
            ..Self::default()
        }
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn with_packet_info(mut self, packet_info: impl Into<String>) -> Self {
        self.packet_info = Some(packet_info.into());
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        _ => None,
    })
}

// PacketInfo shows up both as text and as a bare number depending on the exporter.
fn packet_info_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

fn lenient_priority<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|v| v.is_finite()).map(|v| v as i64)),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    })
}

/// Parses a JSON document holding either an array of records or an object
/// with a `records` array. Entries that cannot be read as records are skipped.
pub fn parse_records(raw: &str) -> Result<Vec<FlowRecord>> {
    let parsed: Value = serde_json::from_str(raw).context("invalid JSON in flow record source")?;

    let entries = match &parsed {
        Value::Array(entries) => entries,
        Value::Object(object) => object
            .get("records")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("JSON object has no `records` array"))?,
        _ => return Err(anyhow!("unexpected JSON type for flow records")),
    };

    let mut records = Vec::with_capacity(entries.len());
    let mut skipped = 0usize;
    for (index, entry) in entries.iter().enumerate() {
        match FlowRecord::deserialize(entry) {
            Ok(record) => records.push(record),
            Err(error) => {
                skipped += 1;
                if skipped <= 5 {
                    warn!("skipping flow record #{index}: {error}");
                }
            }
        }
    }

    if skipped > 5 {
        warn!("skipped {skipped} malformed flow records in total");
    }

    Ok(records)
}

/// Reads the leading decimal digits of a packet-info field ("1514 bytes" -> 1514).
pub fn parse_packet_size(packet_info: &str) -> Option<u64> {
    let trimmed = packet_info.trim_start();
    let digits = trimmed
        .char_indices()
        .take_while(|(_, ch)| ch.is_ascii_digit())
        .last()
        .map(|(index, ch)| &trimmed[..index + ch.len_utf8()])?;
    digits.parse().ok()
}
