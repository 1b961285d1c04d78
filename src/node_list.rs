// Node list file: one hostname per line.

use crate::models::Node;
use anyhow::Context;
use std::path::Path;

pub const DEFAULT_NODE_LIST: &str = "nodes.txt";

/// Hostnames in file order. Blank lines and `#` comments are skipped.
pub fn parse_nodes(text: &str) -> Vec<Node> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(Node::from)
        .collect()
}

pub fn load_nodes(path: &Path) -> anyhow::Result<Vec<Node>> {
    anyhow::ensure!(
        path.exists(),
        "node list {} not found; a list of nodes to check is required",
        path.display()
    );
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading node list {}", path.display()))?;
    Ok(parse_nodes(&text))
}
