//! transit511 CLI
//!
//! Runs the configured entries against the 511 API with the log as display,
//! or performs one-shot lookups and checks.

#![allow(clippy::print_stdout)]

mod commands;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use application::{PollerRegistry, ResourceFetcher, TransitIntegration, project};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use domain::{LineFilter, ResourceKey};
use infrastructure::{AppConfig, TelemetryConfig, TracingDisplay, Transit511Adapter, init_telemetry};
use secrecy::SecretString;
use tracing::{error, info, warn};

/// transit511 CLI
#[derive(Debug, Parser)]
#[command(name = "transit511-cli")]
#[command(author, version, about = "Real-time 511.org transit monitor", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (default: ./transit511.toml if present)
    #[arg(short, long, global = true, env = "TRANSIT511_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Monitor all configured entries until interrupted
    Run {
        /// Seconds between printed summaries
        #[arg(long, default_value_t = 60)]
        summary_secs: u64,
    },

    /// Fetch a stop or vehicle once and print the result
    ///
    /// Example: transit511-cli fetch --stop 18031 --line N
    Fetch(FetchArgs),

    /// Classify a line as train or bus
    ///
    /// Example: transit511-cli classify --operator SC 902
    Classify {
        /// Operator code
        #[arg(short, long, default_value = "SF")]
        operator: String,

        /// Line reference
        line: String,

        /// Transport mode reported by the feed, if any
        #[arg(long)]
        mode: Option<String>,
    },

    /// Check that the API key is accepted
    ValidateKey {
        /// API key, overriding the configuration
        #[arg(long)]
        api_key: Option<String>,
    },

    /// List the devices the configured entries would create
    Devices,
}

#[derive(Debug, Args)]
struct FetchArgs {
    /// Operator code
    #[arg(short, long, default_value = "SF")]
    operator: String,

    /// Stop code to monitor
    #[arg(long, conflicts_with = "vehicle", required_unless_present = "vehicle")]
    stop: Option<String>,

    /// Vehicle id to track
    #[arg(long)]
    vehicle: Option<String>,

    /// Only show this line (stops only)
    #[arg(long, conflicts_with = "vehicle")]
    line: Option<String>,

    /// Only show this direction, IB or OB (stops only)
    #[arg(long, conflicts_with = "vehicle")]
    direction: Option<String>,

    /// API key, overriding the configuration
    #[arg(long)]
    api_key: Option<String>,

    /// Print the filtered snapshot as JSON
    #[arg(long)]
    json: bool,
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Logging for `run`: the configured filter unless `-v` was given
fn run_telemetry(configured: &TelemetryConfig, verbose: u8) -> TelemetryConfig {
    if verbose == 0 {
        configured.clone()
    } else {
        configured
            .clone()
            .with_log_filter(log_filter_from_verbosity(verbose))
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => AppConfig::load().context("failed to load configuration"),
    }
}

fn override_api_key(config: &mut AppConfig, api_key: Option<String>) {
    if let Some(key) = api_key {
        config.api.api_key = Some(SecretString::from(key));
    }
}

fn adapter_for(config: &AppConfig) -> anyhow::Result<Transit511Adapter> {
    config
        .api
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    Ok(Transit511Adapter::new(&config.to_client_config())?)
}

async fn run(config: AppConfig, summary_every: Duration) -> anyhow::Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    if config.entries.is_empty() {
        bail!("no entries configured");
    }

    let adapter = Arc::new(Transit511Adapter::new(&config.to_client_config())?);
    let registry = Arc::new(PollerRegistry::new(adapter));
    let display = Arc::new(TracingDisplay::new());
    let integration = TransitIntegration::new(Arc::clone(&registry), display.clone());

    for entry in config.entries {
        let operator = entry.operator.clone();
        match integration.setup_entry(entry).await {
            Ok(id) => info!(entry = %id, operator = %operator, "Entry loaded"),
            Err(e) => error!(operator = %operator, error = %e, "Entry setup failed"),
        }
    }

    if integration.entry_ids().is_empty() {
        bail!("no entry could be set up");
    }

    println!(
        "🚏 Monitoring {} resource(s), press Ctrl+C to stop",
        registry.len()
    );

    let mut ticker = tokio::time::interval(summary_every);
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "Signal handler failed, shutting down");
                }
                break;
            },
            _ = ticker.tick() => {
                println!();
                for line in display.summary(Utc::now()) {
                    println!("{line}");
                }
            },
        }
    }

    integration.shutdown();
    println!("👋 Stopped");
    Ok(())
}

async fn fetch(config: &AppConfig, args: FetchArgs) -> anyhow::Result<()> {
    let (key, filter) = match (args.stop, args.vehicle) {
        (Some(stop), _) => (
            ResourceKey::stop(&args.operator, &stop)?,
            LineFilter::from_parts(args.line, args.direction),
        ),
        (None, Some(vehicle)) => (
            ResourceKey::vehicle(&args.operator, &vehicle)?,
            LineFilter::all(),
        ),
        (None, None) => bail!("either --stop or --vehicle is required"),
    };

    let adapter = adapter_for(config)?;
    let snapshot = adapter.fetch(&key).await?;
    let projected = project(Some(&snapshot), &filter);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&projected)?);
    } else {
        for line in commands::render_fetch(&key, &filter, &projected, Utc::now()) {
            println!("{line}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let one_shot_logging =
        TelemetryConfig::default().with_log_filter(log_filter_from_verbosity(cli.verbose));

    match cli.command {
        Commands::Run { summary_secs } => {
            let config = load_config(cli.config.as_deref())?;
            init_telemetry(&run_telemetry(&config.telemetry, cli.verbose))?;
            run(config, Duration::from_secs(summary_secs.max(1))).await?;
        },

        Commands::Fetch(mut args) => {
            init_telemetry(&one_shot_logging)?;
            let mut config = load_config(cli.config.as_deref())?;
            override_api_key(&mut config, args.api_key.take());
            fetch(&config, args).await?;
        },

        Commands::Classify {
            operator,
            line,
            mode,
        } => {
            println!(
                "{}",
                commands::render_classify(&operator, &line, mode.as_deref())
            );
        },

        Commands::ValidateKey { api_key } => {
            init_telemetry(&one_shot_logging)?;
            let mut config = load_config(cli.config.as_deref())?;
            override_api_key(&mut config, api_key);

            match adapter_for(&config)?.validate_credentials().await {
                Ok(()) => println!("✅ API key accepted"),
                Err(e) => {
                    println!("❌ API key check failed: {e}");
                    std::process::exit(1);
                },
            }
        },

        Commands::Devices => {
            let config = load_config(cli.config.as_deref())?;
            if config.entries.is_empty() {
                println!("No entries configured");
            }
            for entry in &config.entries {
                for line in commands::render_devices(entry)? {
                    println!("{line}");
                }
            }
        },
    }

    Ok(())
}
