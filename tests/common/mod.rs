// Shared test helpers: canned nfsiostat output and a scripted executor

#![allow(dead_code)]

use nfsfleet::error::ExecError;
use nfsfleet::models::{Node, RawReport};
use nfsfleet::remote_repo::{RemoteCommand, RemoteExecutor};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

const COLUMNS: &str =
    "ops/s       kB/s      kB/op     retrans     avg RTT (ms)    avg exe (ms)";

/// One nfsiostat block in the layout the tool prints.
pub fn block(header: &str, read: [&str; 6], write: [&str; 6]) -> String {
    format!(
        "\n{header}\n\n   op/s\t\trpc bklog\n  12.40\t\t   0.00\n\
         read:           {COLUMNS}\n\
         \t\t{}\t{}\t{}\t{} (0.0%)\t{}\t{}\n\
         write:          {COLUMNS}\n\
         \t\t{}\t{}\t{}\t{} (0.0%)\t{}\t{}\n",
        read[0], read[1], read[2], read[3], read[4], read[5], write[0], write[1], write[2],
        write[3], write[4], write[5],
    )
}

/// Report of the end-to-end example: `/data:/alice`, read (10,100,10,0,1.0,2.0),
/// write (5,50,10,0,1.5,2.5).
pub fn alice_report() -> String {
    block(
        "/data:/alice mounted on /mnt/alice:",
        ["10", "100", "10", "0", "1.0", "2.0"],
        ["5", "50", "10", "0", "1.5", "2.5"],
    )
}

/// Report with one block per device, each mounted for `user`.
pub fn report_for(devices: &[&str], user: &str) -> String {
    devices
        .iter()
        .map(|d| {
            block(
                &format!("{d}:/{user} mounted on /mnt/{user}:"),
                ["1.000", "2.000", "3.000", "0", "0.100", "0.200"],
                ["4.000", "5.000", "6.000", "1", "0.300", "0.400"],
            )
        })
        .collect()
}

#[derive(Debug, Clone)]
pub enum Script {
    Report { text: String, delay: Duration },
    Timeout,
    Fail(String),
    /// Fails the first `failures` calls, then returns `text`.
    Flaky { failures: u32, text: String },
    /// Never returns on its own.
    Hang,
}

impl Script {
    pub fn report(text: impl Into<String>) -> Self {
        Script::Report {
            text: text.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(text: impl Into<String>, delay_ms: u64) -> Self {
        Script::Report {
            text: text.into(),
            delay: Duration::from_millis(delay_ms),
        }
    }
}

/// Executor answering from a per-node script. Unknown nodes fail.
#[derive(Default)]
pub struct ScriptedExecutor {
    scripts: HashMap<String, Script>,
    calls: Mutex<HashMap<String, u32>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, node: &str, script: Script) -> Self {
        self.scripts.insert(node.to_string(), script);
        self
    }

    pub fn calls(&self, node: &str) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(node)
            .copied()
            .unwrap_or(0)
    }
}

impl RemoteExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        node: &Node,
        _command: &RemoteCommand,
        timeout: Duration,
    ) -> Result<RawReport, ExecError> {
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(node.to_string()).or_insert(0);
            *n += 1;
            *n
        };
        match self.scripts.get(node.as_str()).cloned() {
            Some(Script::Report { text, delay }) => {
                tokio::time::sleep(delay).await;
                Ok(RawReport::new(text))
            }
            Some(Script::Timeout) => Err(ExecError::Timeout(timeout)),
            Some(Script::Fail(message)) => Err(ExecError::RemoteFailure(message)),
            Some(Script::Flaky { failures, text }) => {
                if attempt <= failures {
                    Err(ExecError::RemoteFailure(format!("attempt {attempt} failed")))
                } else {
                    Ok(RawReport::new(text))
                }
            }
            Some(Script::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ExecError::Timeout(timeout))
            }
            None => Err(ExecError::RemoteFailure(format!("unknown host {node}"))),
        }
    }
}

pub fn nodes(names: &[&str]) -> Vec<Node> {
    names.iter().map(|n| Node::from(*n)).collect()
}

pub fn command() -> RemoteCommand {
    RemoteCommand::new("/usr/sbin/nfsiostat")
}
