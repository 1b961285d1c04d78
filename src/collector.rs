// Fleet collector: one task per node, bounded by a semaphore, joined in node-list order.
// A node failure is recorded and never aborts the run.

use crate::error::{CollectError, ExecError};
use crate::models::{CollectionResult, Node, NodeFailure, RawReport, TrafficRecord};
use crate::remote_repo::{RemoteCommand, RemoteExecutor};
use crate::report_parser;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Pause before retry N is N times this.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

pub const DEFAULT_CONCURRENCY: usize = 16;

/// Upper bound on concurrent remote calls.
pub const MAX_CONCURRENCY: usize = 1024;

type NodeOutcome = Result<Vec<TrafficRecord>, CollectError>;

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub command: RemoteCommand,
    /// Bound for a single remote call (one attempt).
    pub node_timeout: Duration,
    /// Max remote calls in flight.
    pub concurrency: usize,
    /// Overall bound for the run; pending nodes are aborted when it passes.
    pub deadline: Option<Duration>,
    /// Extra attempts after a failed remote call.
    pub retries: u32,
    /// Keep only records of this device.
    pub device_filter: Option<String>,
}

impl CollectorConfig {
    pub fn new(command: RemoteCommand, node_timeout: Duration) -> Self {
        Self {
            command,
            node_timeout,
            concurrency: DEFAULT_CONCURRENCY,
            deadline: None,
            retries: 0,
            device_filter: None,
        }
    }
}

pub struct FleetCollector<E> {
    executor: Arc<E>,
    config: Arc<CollectorConfig>,
}

impl<E: RemoteExecutor> FleetCollector<E> {
    pub fn new(executor: E, config: CollectorConfig) -> Self {
        Self::with_shared(Arc::new(executor), config)
    }

    pub fn with_shared(executor: Arc<E>, config: CollectorConfig) -> Self {
        Self {
            executor,
            config: Arc::new(config),
        }
    }

    /// Collects every node and merges records in the order of `nodes`,
    /// independent of which remote call finishes first.
    #[instrument(skip_all, fields(nodes = nodes.len(), concurrency = self.config.concurrency))]
    pub async fn collect(&self, nodes: &[Node]) -> CollectionResult {
        let started = Instant::now();
        let deadline = self.config.deadline.map(|d| started + d);
        let permits = self.config.concurrency.clamp(1, MAX_CONCURRENCY);
        let semaphore = Arc::new(Semaphore::new(permits));

        let handles: Vec<JoinHandle<NodeOutcome>> = nodes
            .iter()
            .cloned()
            .map(|node| {
                let executor = self.executor.clone();
                let config = self.config.clone();
                let semaphore = semaphore.clone();
                tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| CollectError::WorkerAborted(e.to_string()))?;
                    collect_node(executor.as_ref(), &config, &node).await
                })
            })
            .collect();

        let mut result = CollectionResult {
            nodes_total: nodes.len(),
            ..Default::default()
        };
        for (node, handle) in nodes.iter().zip(handles) {
            match join_node(handle, deadline).await {
                Ok(records) => {
                    info!(node = %node, records = records.len(), "node collected");
                    result
                        .records
                        .extend(records.into_iter().filter(|r| self.keep(r)));
                }
                Err(error) => {
                    warn!(node = %node, error = %error, "node failed");
                    result.failures.push(NodeFailure {
                        node: node.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            succeeded = result.succeeded(),
            failed = result.failures.len(),
            records = result.records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "collection finished"
        );
        result
    }

    fn keep(&self, record: &TrafficRecord) -> bool {
        self.config
            .device_filter
            .as_deref()
            .is_none_or(|device| record.device == device)
    }
}

/// Waits for one node's task; past the deadline a still-running task is aborted.
/// A task that already finished is still harvested after the deadline.
async fn join_node(mut handle: JoinHandle<NodeOutcome>, deadline: Option<Instant>) -> NodeOutcome {
    let joined = match deadline {
        Some(deadline) => match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                handle.abort();
                return Err(CollectError::DeadlineExceeded);
            }
        },
        None => handle.await,
    };
    joined.map_err(|e| CollectError::WorkerAborted(e.to_string()))?
}

async fn collect_node<E: RemoteExecutor>(
    executor: &E,
    config: &CollectorConfig,
    node: &Node,
) -> NodeOutcome {
    let report = execute_with_retry(executor, config, node).await?;
    if report.is_blank() {
        return Err(CollectError::EmptyReport);
    }
    Ok(report_parser::parse(node, &report))
}

async fn execute_with_retry<E: RemoteExecutor>(
    executor: &E,
    config: &CollectorConfig,
    node: &Node,
) -> Result<RawReport, ExecError> {
    let mut attempt: u32 = 0;
    loop {
        match executor
            .execute(node, &config.command, config.node_timeout)
            .await
        {
            Ok(report) => return Ok(report),
            Err(e) if attempt < config.retries && !matches!(e, ExecError::Spawn { .. }) => {
                attempt += 1;
                warn!(node = %node, error = %e, attempt, "remote command failed, retrying");
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
            }
            Err(e) => return Err(e),
        }
    }
}
