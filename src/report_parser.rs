// nfsiostat report parser: one pass over the lines, explicit states.
//
// A block starts at a "<device>:/<export> mounted on <mountpoint>" header and
// holds one read and one write statistics line:
//
//   server:/export/alice mounted on /home/alice:
//
//      op/s         rpc bklog
//      4.12            0.00
//   read:   ops/s     kB/s    kB/op   retrans   avg RTT (ms)   avg exe (ms)
//           1.000    12.000   12.000   0 (0.0%)     0.300          0.400
//   write:  ops/s     kB/s    kB/op   retrans   avg RTT (ms)   avg exe (ms)
//           2.000    24.000   12.000   0 (0.0%)     0.500          0.600

use crate::models::{IoStats, Node, RawReport, TrafficRecord};

const HEADER_MARKER: &str = "mounted on";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No open block; section lines are ignored.
    Idle,
    AwaitingSection,
    InSection(Section),
}

#[derive(Debug)]
struct Block {
    device: String,
    user: String,
    read: Option<IoStats>,
    write: Option<IoStats>,
}

impl Block {
    fn into_record(self, node: &Node) -> Option<TrafficRecord> {
        Some(TrafficRecord {
            node: node.clone(),
            device: self.device,
            user: self.user,
            read: self.read?,
            write: self.write?,
        })
    }
}

/// Parses a whole report. Never fails: malformed input only yields fewer records.
pub fn parse(node: &Node, report: &RawReport) -> Vec<TrafficRecord> {
    let mut parser = ReportParser::new(node.clone());
    for line in report.text().lines() {
        parser.feed(line);
    }
    parser.finish()
}

/// Incremental form of [`parse`], fed one line at a time.
#[derive(Debug)]
pub struct ReportParser {
    node: Node,
    state: State,
    current: Option<Block>,
    records: Vec<TrafficRecord>,
    dropped_blocks: usize,
}

impl ReportParser {
    pub fn new(node: Node) -> Self {
        Self {
            node,
            state: State::Idle,
            current: None,
            records: Vec::new(),
            dropped_blocks: 0,
        }
    }

    pub fn feed(&mut self, line: &str) {
        if line.contains(HEADER_MARKER) {
            self.start_block(line);
            return;
        }
        if let Some(section) = section_intro(line) {
            if self.state != State::Idle {
                self.state = State::InSection(section);
            }
            return;
        }
        let State::InSection(section) = self.state else {
            return;
        };
        if line.trim().is_empty() {
            return;
        }
        if let (Some(stats), Some(block)) = (stats_fields(line), self.current.as_mut()) {
            let stats = IoStats::from_fields(stats);
            match section {
                Section::Read => block.read = Some(stats),
                Section::Write => block.write = Some(stats),
            }
        }
        self.state = State::AwaitingSection;
    }

    pub fn finish(mut self) -> Vec<TrafficRecord> {
        self.flush();
        if self.dropped_blocks > 0 {
            tracing::debug!(
                node = %self.node,
                dropped_blocks = self.dropped_blocks,
                "dropped blocks missing a read or write section"
            );
        }
        self.records
    }

    fn start_block(&mut self, line: &str) {
        self.flush();
        match parse_header(line) {
            Some((device, user)) => {
                self.current = Some(Block {
                    device,
                    user,
                    read: None,
                    write: None,
                });
                self.state = State::AwaitingSection;
            }
            None => {
                tracing::debug!(node = %self.node, line, "unrecognised mount header");
                self.state = State::Idle;
            }
        }
    }

    fn flush(&mut self) {
        if let Some(block) = self.current.take() {
            match block.into_record(&self.node) {
                Some(record) => self.records.push(record),
                None => self.dropped_blocks += 1,
            }
        }
    }
}

/// Splits a mount header into (device, user).
fn parse_header(line: &str) -> Option<(String, String)> {
    let (device, rest) = line.split_once(':')?;
    let device = device.trim();
    if device.is_empty() {
        return None;
    }
    let export = rest.split(HEADER_MARKER).next().unwrap_or_default().trim();
    let user = export
        .contains('/')
        .then(|| export.trim_end_matches('/').rsplit('/').next())
        .flatten()
        .filter(|s| !s.is_empty())
        .or_else(|| slash_word_before_colon(line))?;
    Some((device.to_string(), user.to_string()))
}

/// First `/<word>:` in the line, returning `<word>`.
fn slash_word_before_colon(line: &str) -> Option<&str> {
    line.match_indices('/').find_map(|(i, _)| {
        let tail = &line[i + 1..];
        let end = tail
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(tail.len());
        (end > 0 && tail[end..].starts_with(':')).then(|| &tail[..end])
    })
}

fn section_intro(line: &str) -> Option<Section> {
    if line.contains("read:") {
        Some(Section::Read)
    } else if line.contains("write:") {
        Some(Section::Write)
    } else {
        None
    }
}

/// First six value tokens of a statistics line. Parenthesised annotations such
/// as the retransmission percentage are skipped; unparseable tokens become 0.
fn stats_fields(line: &str) -> Option<[f64; IoStats::FIELDS]> {
    let tokens: Vec<&str> = line
        .split_whitespace()
        .filter(|t| !t.starts_with('(') && !t.ends_with(')'))
        .collect();
    if tokens.len() < IoStats::FIELDS || !tokens.iter().any(|t| t.parse::<f64>().is_ok()) {
        return None;
    }
    let mut fields = [0.0; IoStats::FIELDS];
    for (field, token) in fields.iter_mut().zip(&tokens) {
        *field = token
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0);
    }
    Some(fields)
}
