// Domain models: nodes, per-mount traffic records, collection result.

use crate::error::CollectError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote host queried for NFS statistics; also tags every record it produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Node(String);

impl Node {
    pub fn new(host: impl Into<String>) -> Self {
        Self(host.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Unparsed stdout of the diagnostic command for one node. Discarded once parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawReport(String);

impl RawReport {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn text(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// One read or write line of an nfsiostat block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IoStats {
    pub ops_per_sec: f64,
    pub kb_per_sec: f64,
    pub kb_per_op: f64,
    pub retrans: f64,
    pub avg_rtt_ms: f64,
    pub avg_exe_ms: f64,
}

impl IoStats {
    pub const FIELDS: usize = 6;

    /// Builds stats from fields in report order.
    pub fn from_fields(v: [f64; Self::FIELDS]) -> Self {
        Self {
            ops_per_sec: v[0],
            kb_per_sec: v[1],
            kb_per_op: v[2],
            retrans: v[3],
            avg_rtt_ms: v[4],
            avg_exe_ms: v[5],
        }
    }

    pub fn to_fields(&self) -> [f64; Self::FIELDS] {
        [
            self.ops_per_sec,
            self.kb_per_sec,
            self.kb_per_op,
            self.retrans,
            self.avg_rtt_ms,
            self.avg_exe_ms,
        ]
    }
}

/// Traffic of one (node, device, user) mount. Only built when both sections were seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficRecord {
    pub node: Node,
    pub device: String,
    pub user: String,
    pub read: IoStats,
    pub write: IoStats,
}

/// Node that produced no usable report in this run.
#[derive(Debug)]
pub struct NodeFailure {
    pub node: Node,
    pub error: CollectError,
}

/// Output of one fleet run: records in node-list order plus the failed nodes.
#[derive(Debug, Default)]
pub struct CollectionResult {
    pub records: Vec<TrafficRecord>,
    pub failures: Vec<NodeFailure>,
    pub nodes_total: usize,
}

impl CollectionResult {
    pub fn succeeded(&self) -> usize {
        self.nodes_total.saturating_sub(self.failures.len())
    }

    pub fn failed_nodes(&self) -> Vec<&Node> {
        self.failures.iter().map(|f| &f.node).collect()
    }
}

/// Local partition usage (disks subcommand).
#[derive(Debug, Clone)]
pub struct PartitionStat {
    pub mount: String,
    pub name: String,
    pub file_system: String,
    pub total_space: u64,
    pub used_space: u64,
    pub available_space: u64,
    pub usage_percent: f64,
}
