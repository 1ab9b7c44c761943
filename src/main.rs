use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hwmgr::config::AppConfig;
use hwmgr::report;
use hwmgr_core::{
    ComponentId, ComponentKind, HardwareComponent, HardwareManager, MonitorId, MonitorTarget,
    SharedDetectionSource, ALL_COMPONENTS, ALL_MONITORS,
};
use hwmgr_sources::{SyntheticTelemetry, SysinfoSource};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "hwmgr")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Debug verbosity level (0=quiet, 1=info, 2=debug, 3=trace); defaults to the configured log_level
    #[arg(short = 'd', long = "debug", value_name = "LEVEL", global = true)]
    debug: Option<u8>,

    /// Settings file to use instead of the per-user one
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Replace real telemetry with seeded random readings
    #[arg(long, global = true)]
    synthetic: bool,

    /// Seed for --synthetic
    #[arg(long, value_name = "SEED", global = true, requires = "synthetic")]
    seed: Option<u64>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the system and list the discovered components
    List {
        /// Only components of this kind (CPU, GPU, Storage, ...)
        #[arg(short, long, value_parser = parse_kind)]
        kind: Option<ComponentKind>,
        /// At most this many components (defaults to display.max_components)
        #[arg(short, long)]
        max: Option<usize>,
    },
    /// Show a single component
    Show { id: ComponentId },
    /// Sample components until interrupted
    Watch {
        /// Component to watch (all when omitted)
        #[arg(short, long, value_name = "ID")]
        target: Option<ComponentId>,
        /// Sampling interval in milliseconds (0 uses the configured monitor_interval)
        #[arg(short, long = "interval-ms", value_name = "MS")]
        interval: Option<u64>,
        /// Stop after this many seconds
        #[arg(long, value_name = "SECS")]
        duration: Option<u64>,
    },
    /// Sample every component once and print the health gauge
    Health {
        /// Number of recent events to show
        #[arg(short, long, default_value = "10")]
        events: usize,
    },
    /// Driver operations on one component
    Driver {
        id: ComponentId,
        #[arg(value_enum)]
        action: DriverAction,
        /// Load even when the driver is in the error state
        #[arg(long)]
        force: bool,
        /// With `update`, only report whether a newer version exists
        #[arg(long)]
        check: bool,
    },
    /// Print the effective settings
    Config {
        /// Write the effective settings back to the settings file
        #[arg(long)]
        save: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum DriverAction {
    Load,
    Unload,
    Update,
    Enable,
    Disable,
}

fn parse_kind(s: &str) -> Result<ComponentKind, String> {
    s.parse()
}

fn level_name(level: u8) -> &'static str {
    match level {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };

    // RUST_LOG overrides both -d and the configured level
    let log_level = level_name(cli.debug.unwrap_or(config.manager.log_level));
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    info!("Starting hwmgr v{}", env!("CARGO_PKG_VERSION"));

    if let Command::Config { save } = cli.command {
        return show_config(&cli, &config, save);
    }

    let manager = Arc::new(build_manager(&cli, &config)?);
    manager.init()?;
    let summary = manager.scan().context("Initial hardware scan failed")?;
    info!(
        "Initial scan: {} component(s) found, {} driver(s) updated",
        summary.added.len(),
        summary.updated
    );

    let outcome = match cli.command {
        Command::List { kind, max } => list(&manager, &config, kind, max, cli.json),
        Command::Show { id } => show(&manager, id, cli.json),
        Command::Watch { target, interval, duration } => {
            watch(manager.clone(), &config, target, interval, duration, cli.json).await
        }
        Command::Health { events } => health(&manager, events, cli.json),
        Command::Driver { id, action, force, check } => driver(&manager, id, action, force, check, cli.json),
        Command::Config { .. } => Ok(()),
    };

    manager.shutdown()?;
    outcome
}

fn build_manager(cli: &Cli, config: &AppConfig) -> Result<HardwareManager> {
    hwmgr_sources::initialize_probe();
    let source: SharedDetectionSource = if cli.synthetic {
        let inner = SysinfoSource::new();
        match cli.seed {
            Some(seed) => Arc::new(SyntheticTelemetry::with_seed(inner, seed)),
            None => Arc::new(SyntheticTelemetry::new(inner)),
        }
    } else {
        Arc::new(SysinfoSource::new())
    };
    Ok(HardwareManager::new(source, config.manager.clone())?)
}

fn show_config(cli: &Cli, config: &AppConfig, save: bool) -> Result<()> {
    println!("{}", report::to_json(config)?);
    if save {
        let path = match &cli.config {
            Some(path) => {
                config.save_to_path(path)?;
                path.clone()
            }
            None => config.save()?,
        };
        eprintln!("Settings written to {}", path.display());
    }
    Ok(())
}

fn list(
    manager: &HardwareManager,
    config: &AppConfig,
    kind: Option<ComponentKind>,
    max: Option<usize>,
    json: bool,
) -> Result<()> {
    let kind = kind.unwrap_or(ComponentKind::Unknown);
    let components = manager.list(kind, max.unwrap_or(config.display.max_components))?;
    if json || config.display.json {
        println!("{}", report::to_json(&components)?);
    } else {
        println!("{}", report::component_table(&components));
    }
    Ok(())
}

fn show(manager: &HardwareManager, id: ComponentId, json: bool) -> Result<()> {
    manager.update_status(id)?;
    let component = manager.get(id)?;
    if json {
        println!("{}", report::to_json(&component)?);
    } else {
        println!("{}", report::component_table(std::slice::from_ref(&component)));
        println!("{}", report::sample_line(ALL_MONITORS, &component));
    }
    Ok(())
}

async fn watch(
    manager: Arc<HardwareManager>,
    config: &AppConfig,
    target: Option<ComponentId>,
    interval: Option<u64>,
    duration: Option<u64>,
    json: bool,
) -> Result<()> {
    let target = MonitorTarget::from(target.unwrap_or(ALL_COMPONENTS));
    let interval = Duration::from_millis(interval.unwrap_or(config.display.watch_interval_ms));
    let json = json || config.display.json;
    let monitor = manager.start_monitor(target, interval, move |monitor: MonitorId, c: &HardwareComponent| {
        if json {
            match serde_json::to_string(c) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to encode sample of component {}: {}", c.id, e),
            }
        } else {
            println!("{}", report::sample_line(monitor, c));
        }
    })?;
    info!("Monitor {} watching {}", monitor, target);

    let hotplug = config.manager.enable_hotplug;
    let mut rescan = tokio::time::interval(config.manager.scan_period());
    // The first tick completes immediately
    rescan.tick().await;

    let deadline = async {
        match duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl+C")?;
                info!("Interrupted");
                break;
            }
            _ = &mut deadline => break,
            _ = rescan.tick(), if hotplug => {
                let scanner = manager.clone();
                let summary = tokio::task::spawn_blocking(move || scanner.scan()).await??;
                if !summary.added.is_empty() || !summary.removed.is_empty() {
                    info!(
                        "Rescan: {} added, {} removed",
                        summary.added.len(),
                        summary.removed.len()
                    );
                }
            }
        }
    }

    manager.stop_monitor(monitor)?;
    let health = manager.health()?;
    eprintln!("{}", report::health_report(&health, &[]));
    Ok(())
}

fn health(manager: &HardwareManager, events: usize, json: bool) -> Result<()> {
    let components = manager.list(ComponentKind::Unknown, usize::MAX)?;
    for component in &components {
        if let Err(e) = manager.update_status(component.id) {
            warn!("Failed to sample component {}: {}", component.id, e);
        }
    }
    let health = manager.health()?;
    let recent = if events == 0 { Vec::new() } else { manager.recent_events(events)? };
    if json {
        println!(
            "{}",
            report::to_json(&serde_json::json!({ "health": health, "events": recent }))?
        );
    } else {
        println!("{}", report::health_report(&health, &recent));
    }
    Ok(())
}

fn driver(
    manager: &HardwareManager,
    id: ComponentId,
    action: DriverAction,
    force: bool,
    check: bool,
    json: bool,
) -> Result<()> {
    let outcome = match action {
        DriverAction::Load => serde_json::to_value(manager.load_driver(id, force)?)?,
        DriverAction::Unload => serde_json::to_value(manager.unload_driver(id)?)?,
        DriverAction::Update => serde_json::to_value(manager.update_driver(id, check)?)?,
        DriverAction::Enable | DriverAction::Disable => {
            let enabled = matches!(action, DriverAction::Enable);
            manager.set_enabled(id, enabled)?;
            serde_json::json!({ "enabled": enabled })
        }
    };
    let component = manager.get(id)?;
    if json {
        println!(
            "{}",
            report::to_json(&serde_json::json!({ "outcome": outcome, "driver": component.driver }))?
        );
    } else {
        println!(
            "#{} {}: {} ({} {})",
            component.id,
            component.name(),
            outcome,
            component.driver.name,
            component.driver.state
        );
    }
    Ok(())
}
