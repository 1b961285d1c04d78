use crate::collector::{CollectorConfig, DEFAULT_CONCURRENCY, MAX_CONCURRENCY};
use crate::remote_repo::{RemoteCommand, SshRepo};
use crate::table_sink::OutputFormat;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Config file read when neither `--config` nor `NFSFLEET_CONFIG` is given. Optional.
pub const DEFAULT_CONFIG_FILE: &str = "nfsfleet.toml";

/// Upper bound on `collection.retries`.
pub const MAX_RETRIES: u32 = 10;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    /// Remote shell program, `ssh` unless a wrapper is needed.
    #[serde(default = "default_program")]
    pub program: String,
    /// Passed to the program before the host.
    #[serde(default = "default_options")]
    pub options: Vec<String>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Diagnostic command run on each node.
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_program() -> String {
    "ssh".into()
}

fn default_options() -> Vec<String> {
    vec!["-o".into(), "BatchMode=yes".into()]
}

fn default_connect_timeout_secs() -> u64 {
    3
}

fn default_command() -> String {
    "/usr/sbin/nfsiostat".into()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            options: default_options(),
            connect_timeout_secs: default_connect_timeout_secs(),
            command: default_command(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_node_timeout_secs")]
    pub node_timeout_secs: u64,
    /// Overall bound for one run; unset means no bound beyond the per-node timeout.
    #[serde(default)]
    pub deadline_secs: Option<u64>,
    #[serde(default)]
    pub retries: u32,
    /// Keep only records of this device.
    #[serde(default)]
    pub device: Option<String>,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_node_timeout_secs() -> u64 {
    30
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            node_timeout_secs: default_node_timeout_secs(),
            deadline_secs: None,
            retries: 0,
            device: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// File path, or `-` for stdout.
    #[serde(default = "default_output_path")]
    pub path: String,
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_output_path() -> String {
    "nfs.csv".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            format: OutputFormat::default(),
        }
    }
}

impl AppConfig {
    /// Loads `path` if given (must exist), else `NFSFLEET_CONFIG` (must exist),
    /// else `nfsfleet.toml` when present, else built-in defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("NFSFLEET_CONFIG").map(Into::into));
        let path = match explicit {
            Some(p) => p,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => DEFAULT_CONFIG_FILE.into(),
            None => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
        };
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("config {}: {}", path.display(), e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.remote.program.trim().is_empty(),
            "remote.program must be non-empty"
        );
        anyhow::ensure!(
            !self.remote.command.trim().is_empty(),
            "remote.command must be non-empty"
        );
        anyhow::ensure!(
            self.remote.connect_timeout_secs > 0,
            "remote.connect_timeout_secs must be > 0, got {}",
            self.remote.connect_timeout_secs
        );
        anyhow::ensure!(
            (1..=MAX_CONCURRENCY).contains(&self.collection.concurrency),
            "collection.concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY,
            self.collection.concurrency
        );
        anyhow::ensure!(
            self.collection.node_timeout_secs > 0,
            "collection.node_timeout_secs must be > 0, got {}",
            self.collection.node_timeout_secs
        );
        if let Some(deadline) = self.collection.deadline_secs {
            anyhow::ensure!(
                deadline > 0,
                "collection.deadline_secs must be > 0, got {}",
                deadline
            );
        }
        anyhow::ensure!(
            self.collection.retries <= MAX_RETRIES,
            "collection.retries must be <= {}, got {}",
            MAX_RETRIES,
            self.collection.retries
        );
        anyhow::ensure!(
            !self.output.path.is_empty(),
            "output.path must be non-empty"
        );
        Ok(())
    }

    pub fn ssh_repo(&self) -> SshRepo {
        SshRepo::new(
            self.remote.program.clone(),
            self.remote.options.clone(),
            Duration::from_secs(self.remote.connect_timeout_secs),
        )
    }

    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            command: RemoteCommand::new(self.remote.command.clone())
                .with_args(self.remote.args.iter().cloned()),
            node_timeout: Duration::from_secs(self.collection.node_timeout_secs),
            concurrency: self.collection.concurrency,
            deadline: self.collection.deadline_secs.map(Duration::from_secs),
            retries: self.collection.retries,
            device_filter: self.collection.device.clone(),
        }
    }
}
