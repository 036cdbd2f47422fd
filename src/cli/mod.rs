//! CLI command definitions and handlers

mod init;
mod monitor;
mod report;
mod scan;
mod status;

use crate::config::Settings;
use crate::reporters::OutputFormat;
use crate::store::{MemoryStore, MetricsStore, RedbStore};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Parse a detection level (1-3)
fn parse_level(s: &str) -> Result<i64, String> {
    let n: i64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if (1..=3).contains(&n) {
        Ok(n)
    } else {
        Err("detection level must be 1, 2 or 3".to_string())
    }
}

/// flowsentry - debugging-trait detection and runtime telemetry for
/// function nodes in flow exports
#[derive(Parser, Debug)]
#[command(name = "flowsentry")]
#[command(
    version,
    about = "Detect leftover debugging in flow function nodes, score their quality and watch process health",
    after_help = "\
Examples:
  flowsentry init                          Write an example flowsentry.toml
  flowsentry scan flows.json               Scan every function node once
  flowsentry scan flows.json --level 3     Scan with the full rule catalog
  flowsentry summary --format json         Quality summary as JSON
  flowsentry group <flow-id>               Per-node issues of one flow
  flowsentry monitor --ticks 12            Sample process health 12 times
  flowsentry alerts                        Recent threshold alerts"
)]
pub struct Cli {
    /// Project directory (config lookup and default database location)
    #[arg(long, short = 'C', global = true, default_value = ".")]
    pub project: PathBuf,

    /// Config file to use instead of <project>/flowsentry.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file (overrides databasePath)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Keep records in memory only (nothing is persisted)
    #[arg(long, global = true, conflicts_with = "db")]
    pub in_memory: bool,

    /// Output format: text, json
    #[arg(long, short = 'f', global = true, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a flowsentry.toml with example settings
    Init,

    /// Scan the function nodes of a flow export
    #[command(after_help = "\
Examples:
  flowsentry scan flows.json               One pass at the configured level
  flowsentry scan flows.json --level 2     Add logging and marker rules
  flowsentry scan flows.json --wait        Wait for the export to appear
  flowsentry scan flows.json --watch       Re-scan every scanInterval seconds")]
    Scan {
        /// Flow export (JSON array of nodes)
        flows: PathBuf,

        /// Detection level 1-3 (overrides detectionLevel)
        #[arg(long, short = 'l', value_parser = parse_level)]
        level: Option<i64>,

        /// Wait for the flow export to become readable
        #[arg(long)]
        wait: bool,

        /// Keep scanning every scanInterval seconds until Ctrl+C
        #[arg(long)]
        watch: bool,
    },

    /// Analyze one function node with every rule, without saving
    Unit {
        /// Flow export (JSON array of nodes)
        flows: PathBuf,

        /// Function node id
        unit_id: String,
    },

    /// Quality summary across flows from the latest scans
    Summary,

    /// Hourly quality history
    History {
        /// Hours to look back
        #[arg(long, default_value = "24")]
        hours: u32,
    },

    /// Latest issues of one flow, per function node
    Group {
        /// Flow id
        id: String,
    },

    /// Sample process health and raise alerts on sustained violations
    #[command(after_help = "\
Examples:
  flowsentry monitor                       Run until Ctrl+C
  flowsentry monitor --ticks 6 --interval 5")]
    Monitor {
        /// Stop after this many samples
        #[arg(long)]
        ticks: Option<u64>,

        /// Seconds between samples (overrides performanceInterval)
        #[arg(long)]
        interval: Option<u64>,

        /// Run even when performanceMonitoring is off
        #[arg(long)]
        force: bool,
    },

    /// Current performance, averages, trends and recent alerts
    Perf {
        /// Show the last N samples instead of the summary
        #[arg(long)]
        history: Option<usize>,
    },

    /// Recent threshold alerts, newest first
    Alerts {
        /// Maximum alerts to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Delete samples and alerts past retention
    Prune {
        /// Retention in days (overrides dbRetentionDays)
        #[arg(long)]
        days: Option<i64>,
    },

    /// Show database location, record counts and config problems
    Status,

    /// Delete every stored record
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

/// Everything a command needs: merged settings, an open store and the
/// chosen output format
pub(crate) struct Session {
    pub settings: Settings,
    pub store: Arc<dyn MetricsStore>,
    pub database: Option<PathBuf>,
    pub format: OutputFormat,
    pub config_problems: Vec<String>,
}

impl Session {
    fn open(cli: &Cli) -> Result<Self> {
        let settings = load_settings(&cli.project, cli.config.as_deref())?;

        let config_problems: Vec<String> =
            settings.validate().iter().map(|e| e.to_string()).collect();
        for problem in &config_problems {
            warn!("{}", problem);
        }

        let (store, database): (Arc<dyn MetricsStore>, Option<PathBuf>) = if cli.in_memory {
            (Arc::new(MemoryStore::new()), None)
        } else {
            let path = match &cli.db {
                Some(path) => path.clone(),
                None => settings.database_path(&cli.project),
            };
            debug!(path = %path.display(), "opening database");
            let store = RedbStore::open(&path)
                .with_context(|| format!("Failed to open database {}", path.display()))?;
            (Arc::new(store), Some(path))
        };

        Ok(Self {
            settings,
            store,
            database,
            format: cli.format.parse()?,
            config_problems,
        })
    }

    /// Print a rendered report to stdout
    pub fn emit<R>(&self, report: &R) -> Result<()>
    where
        R: serde::Serialize + crate::reporters::TextReport,
    {
        println!("{}", crate::reporters::render(report, self.format)?);
        Ok(())
    }
}

fn load_settings(project: &Path, explicit: Option<&Path>) -> Result<Settings> {
    Settings::load(project, explicit).context("Failed to load configuration")
}

/// Resolves on Ctrl+C. If the handler cannot be installed the failure is
/// logged and the future never resolves, so loops run until their own end.
pub(crate) async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

/// Run the CLI
pub fn run(cli: Cli) -> Result<()> {
    if let Commands::Init = cli.command {
        return init::run(&cli.project);
    }

    let session = Session::open(&cli)?;
    match cli.command {
        Commands::Init => Ok(()),
        Commands::Scan {
            flows,
            level,
            wait,
            watch,
        } => scan::run(&session, &flows, level, wait, watch),
        Commands::Unit { flows, unit_id } => scan::unit(&session, &flows, &unit_id),
        Commands::Summary => report::summary(&session),
        Commands::History { hours } => report::history(&session, hours),
        Commands::Group { id } => report::group(&session, &id),
        Commands::Monitor {
            ticks,
            interval,
            force,
        } => monitor::run(&session, ticks, interval, force),
        Commands::Perf { history } => monitor::perf(&session, history),
        Commands::Alerts { limit } => monitor::alerts(&session, limit),
        Commands::Prune { days } => monitor::prune(&session, days),
        Commands::Status => status::run(&session),
        Commands::Clear { yes } => status::clear(&session, yes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_scan() {
        let cli = Cli::try_parse_from(["flowsentry", "scan", "flows.json", "--level", "3"]).unwrap();
        match cli.command {
            Commands::Scan { flows, level, .. } => {
                assert_eq!(flows, PathBuf::from("flows.json"));
                assert_eq!(level, Some(3));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ctrl_c_waits_for_a_signal() {
        let waited = tokio::time::timeout(std::time::Duration::from_millis(20), ctrl_c()).await;
        assert!(waited.is_err());
    }

    #[test]
    fn test_level_out_of_range_is_rejected() {
        assert!(Cli::try_parse_from(["flowsentry", "scan", "f.json", "--level", "4"]).is_err());
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli =
            Cli::try_parse_from(["flowsentry", "summary", "--format", "json", "--in-memory"]).unwrap();
        assert_eq!(cli.format, "json");
        assert!(cli.in_memory);
    }

    #[test]
    fn test_command_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
