//! Bricks Planner CLI
//!
//! Plans the bricks of a volume-creation request against a device
//! inventory file and prints the resulting plan as JSON.
//!
//! ```text
//! bricks-planner plan --request req.json --inventory devices.yaml
//! bricks-planner resolve --request req.json
//! ```

use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bricks_planner::planner::{resolve, sizing};
use bricks_planner::{
    BricksPlanner, DeviceRegistry, PlannerConfig, RegisteredDevice, Result,
    VolumeCreateRequest,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Bricks Planner - brick layout and zone-aware placement for volumes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true, env = "LOG_JSON")]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan and place the bricks of a volume
    Plan {
        #[command(flatten)]
        common: CommonArgs,

        /// Device inventory (YAML list of devices)
        #[arg(long, env = "BRICKS_INVENTORY")]
        inventory: PathBuf,
    },

    /// Resolve the volume topology only, without placing bricks
    Resolve {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(ClapArgs, Debug)]
struct CommonArgs {
    /// Volume create request (JSON)
    #[arg(long)]
    request: PathBuf,

    /// Planner configuration (YAML)
    #[arg(long, env = "BRICKS_PLANNER_CONFIG")]
    config: Option<PathBuf>,

    /// Override the runtime directory bricks are created under
    #[arg(long, env = "GD2_RUNDIR")]
    rundir: Option<String>,

    /// Override the requested volume size (e.g. "10GiB", "500Mi")
    #[arg(long)]
    size: Option<String>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    debug!("Bricks Planner {}", bricks_planner::VERSION);

    match args.command {
        Command::Plan { common, inventory } => {
            let config = load_config(&common)?;
            let req = load_request(&common)?;

            let devices: Vec<RegisteredDevice> =
                serde_yaml::from_str(&std::fs::read_to_string(&inventory)?)?;
            info!(
                inventory = %inventory.display(),
                devices = devices.len(),
                "Loaded device inventory"
            );
            let registry = DeviceRegistry::with_devices(devices)?;

            let planner = BricksPlanner::new(config, registry);
            let plan = planner.plan(&req).await?;
            print_json(&plan, common.pretty)?;
        }
        Command::Resolve { common } => {
            let config = load_config(&common)?;
            let req = load_request(&common)?;
            let volume = resolve(&req, &config)?;
            print_json(&volume, common.pretty)?;
        }
    }

    Ok(())
}

// =============================================================================
// Input Loading
// =============================================================================

fn load_config(common: &CommonArgs) -> Result<PlannerConfig> {
    let mut config = match &common.config {
        Some(path) => PlannerConfig::from_file(path)?,
        None => PlannerConfig::default(),
    };
    if let Some(rundir) = &common.rundir {
        config.rundir = rundir.clone();
        config.validate()?;
    }
    debug!(rundir = %config.rundir, "Planner configuration loaded");
    Ok(config)
}

fn load_request(common: &CommonArgs) -> Result<VolumeCreateRequest> {
    let mut req = read_request(&common.request)?;
    if let Some(size) = &common.size {
        req.size = sizing::parse_size(size)?;
    }
    info!(
        volume = %req.name,
        size = %sizing::format_size(req.size),
        "Loaded volume create request"
    );
    Ok(req)
}

fn read_request(path: &Path) -> Result<VolumeCreateRequest> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // Logs go to stderr so stdout carries only the plan
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
