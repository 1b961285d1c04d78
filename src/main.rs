use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use nfsfleet::collector::{FleetCollector, MAX_CONCURRENCY};
use nfsfleet::config::{AppConfig, MAX_RETRIES};
use nfsfleet::disk_repo::{self, DiskRepo};
use nfsfleet::node_list::{self, DEFAULT_NODE_LIST};
use nfsfleet::table_sink::{self, Destination, OutputFormat};
use nfsfleet::units::SizeUnit;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[derive(Parser)]
#[command(name = "nfsfleet", version, about = "NFS traffic across a fleet, and local disk usage")]
struct Cli {
    /// TOML config file (default: NFSFLEET_CONFIG, then ./nfsfleet.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run nfsiostat on every node over SSH and write one row per device and user.
    Nfs(NfsArgs),
    /// Show disk usage of local partitions.
    Disks(DisksArgs),
}

#[derive(Args)]
struct NfsArgs {
    /// List of nodes to check, one hostname per line
    #[arg(long, default_value = DEFAULT_NODE_LIST)]
    nodelist: PathBuf,

    /// Only keep records of this device
    #[arg(long)]
    device: Option<String>,

    /// Per-node timeout (e.g. "30s", "2m")
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Overall deadline for the run; nodes still pending are marked failed
    #[arg(long, value_parser = humantime::parse_duration)]
    deadline: Option<Duration>,

    /// Max concurrent SSH sessions
    #[arg(long)]
    concurrency: Option<usize>,

    /// Extra attempts per node after a failed remote call
    #[arg(long)]
    retries: Option<u32>,

    /// Output file, or "-" for stdout
    #[arg(short, long)]
    output: Option<String>,

    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Args)]
struct DisksArgs {
    /// Mount point or device to check; all partitions when omitted
    partition: Option<String>,

    /// Report sizes in this unit instead of the largest fitting one
    #[arg(short, long, value_enum, ignore_case = true)]
    size: Option<SizeUnit>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let app_config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Nfs(args) => run_nfs(app_config, args).await,
        Command::Disks(args) => run_disks(args).await,
    }
}

async fn run_nfs(app_config: AppConfig, args: NfsArgs) -> Result<()> {
    let nodes = node_list::load_nodes(&args.nodelist)?;
    if nodes.is_empty() {
        tracing::warn!(nodelist = %args.nodelist.display(), "node list is empty");
    }

    let mut config = app_config.collector_config();
    if let Some(timeout) = args.timeout {
        anyhow::ensure!(!timeout.is_zero(), "--timeout must be > 0");
        config.node_timeout = timeout;
    }
    if let Some(deadline) = args.deadline {
        anyhow::ensure!(!deadline.is_zero(), "--deadline must be > 0");
        config.deadline = Some(deadline);
    }
    if let Some(concurrency) = args.concurrency {
        anyhow::ensure!(
            (1..=MAX_CONCURRENCY).contains(&concurrency),
            "--concurrency must be between 1 and {}",
            MAX_CONCURRENCY
        );
        config.concurrency = concurrency;
    }
    if let Some(retries) = args.retries {
        anyhow::ensure!(retries <= MAX_RETRIES, "--retries must be <= {}", MAX_RETRIES);
        config.retries = retries;
    }
    if args.device.is_some() {
        config.device_filter = args.device;
    }

    tracing::info!(
        nodes = nodes.len(),
        command = %config.command.program,
        concurrency = config.concurrency,
        "starting collection"
    );
    let collector = FleetCollector::new(app_config.ssh_repo(), config);
    let result = collector.collect(&nodes).await;

    let destination = Destination::parse(args.output.as_deref().unwrap_or(&app_config.output.path));
    let format = args.format.unwrap_or(app_config.output.format);
    table_sink::write(&result, format, &destination)?;

    tracing::info!(
        succeeded = result.succeeded(),
        failed = result.failures.len(),
        records = result.records.len(),
        destination = %destination,
        "results written"
    );
    if !result.failures.is_empty() {
        let failed: Vec<&str> = result.failures.iter().map(|f| f.node.as_str()).collect();
        tracing::warn!(nodes = %failed.join(", "), "nodes failed");
    }
    Ok(())
}

async fn run_disks(args: DisksArgs) -> Result<()> {
    let repo = DiskRepo::new();
    let partitions = repo.get_partitions(args.partition.as_deref()).await?;
    println!("{}", disk_repo::render(&partitions, args.size));
    Ok(())
}
