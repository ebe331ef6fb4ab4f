mod collect;
mod graph;
mod record;

pub use collect::{RecordSource, load_records};
pub use graph::{GraphSummary, Link, Node, SurfaceSize, TrafficGraph};
pub use record::FlowRecord;
