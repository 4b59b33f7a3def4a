//! geoclock - location-verified time tracking
//!
//! Wires together:
//! - Configuration loading
//! - Store initialization
//! - The clock engine, fed by manual coordinates or a replayed track
//! - Site, employee, and attendance administration

mod admin;
mod employee;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use geoclock_config::{Settings, load_config_or_default};
use geoclock_core::ClockEngine;
use geoclock_store::{SqliteStore, StaticAuth, Store};
use geoclock_util::{DATABASE_FILENAME, default_config_path};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// geoclock - clock in only when you are on site
#[derive(Parser, Debug)]
#[command(name = "geoclock", version)]
#[command(about = "Location-verified time tracking", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/geoclock/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set GEOCLOCK_DATA_DIR env var)
    #[arg(short, long, env = "GEOCLOCK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Signed-in user (or set GEOCLOCK_USER env var)
    #[arg(short, long, env = "GEOCLOCK_USER")]
    user: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show clock state and the active session
    Status,

    /// Clock in at the given position
    ClockIn {
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Reported accuracy of the position, in meters
        #[arg(long, value_parser = parse_accuracy, allow_negative_numbers = true)]
        accuracy: Option<f64>,

        /// Treat the position as manually entered; without --lat/--lon the
        /// first active site's location is used
        #[arg(long)]
        manual: bool,
    },

    /// Clock out of the active session
    ClockOut,

    /// List your past sessions
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Follow a recorded track of positions (lat,lon[,accuracy] per line)
    Watch {
        #[arg(long)]
        samples: PathBuf,

        /// Milliseconds between samples (default from config)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: Option<u64>,

        /// Clock in as soon as a fix is in range
        #[arg(long)]
        clock_in: bool,
    },

    /// Manage job sites (admin)
    #[command(subcommand)]
    Sites(admin::SitesCommand),

    /// Manage employee profiles (admin)
    #[command(subcommand)]
    Employees(admin::EmployeesCommand),

    /// Attendance log, newest first (admin)
    Logs {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Recent audit events (admin)
    Audit {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Export the attendance log as CSV (admin)
    Export {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_accuracy(s: &str) -> Result<f64, String> {
    let accuracy: f64 = s.parse().map_err(|e| format!("{e}"))?;
    geoclock_api::validate_accuracy(accuracy).map_err(|e| e.to_string())?;
    Ok(accuracy)
}

/// Everything a command needs
pub struct App {
    pub settings: Settings,
    pub store: Arc<dyn Store>,
    pub auth: StaticAuth,
}

impl App {
    fn open(args: &Args) -> Result<Self> {
        let settings = load_config_or_default(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        debug!(
            config_path = %args.config.display(),
            site_seeds = settings.sites.len(),
            "Configuration loaded"
        );

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| settings.service.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join(DATABASE_FILENAME);
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        debug!(db_path = %db_path.display(), "Store initialized");

        Ok(Self {
            settings,
            store,
            auth: StaticAuth::from_optional(args.user.clone()),
        })
    }

    /// Load the clock engine for the signed-in user
    pub fn engine(&self) -> Result<ClockEngine> {
        ClockEngine::load(
            &self.auth,
            self.store.clone(),
            self.settings.location.max_sample_age,
        )
        .context("Failed to load clock state")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries command output and CSV
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if geoclock_util::is_mock_time_active() {
        info!(now = %geoclock_util::now(), "Mock time active");
    }

    let app = App::open(&args)?;

    match args.command {
        Command::Status => employee::status(&app),
        Command::ClockIn {
            lat,
            lon,
            accuracy,
            manual,
        } => employee::clock_in(&app, lat.zip(lon), accuracy, manual),
        Command::ClockOut => employee::clock_out(&app),
        Command::History { limit } => employee::history(&app, limit),
        Command::Watch {
            samples,
            interval_ms,
            clock_in,
        } => employee::watch(&app, &samples, interval_ms, clock_in).await,
        Command::Sites(cmd) => admin::sites(&app, cmd),
        Command::Employees(cmd) => admin::employees(&app, cmd),
        Command::Logs { limit } => admin::logs(&app, limit),
        Command::Audit { limit } => admin::audit_log(&app, limit),
        Command::Export { output } => admin::export(&app, output.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_negative_longitude() {
        let args = Args::try_parse_from([
            "geoclock", "--user", "dana", "clock-in", "--lat", "51.5007", "--lon", "-0.1246",
        ])
        .unwrap();

        match args.command {
            Command::ClockIn { lat, lon, manual, .. } => {
                assert_eq!(lat.zip(lon), Some((51.5007, -0.1246)));
                assert!(!manual);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_bad_accuracy() {
        let clock_in = |accuracy: &str| {
            Args::try_parse_from([
                "geoclock", "clock-in", "--lat", "51.5", "--lon", "0.1", "--accuracy", accuracy,
            ])
        };
        assert!(clock_in("12.5").is_ok());
        assert!(clock_in("0").is_ok());
        assert!(clock_in("-3").is_err());
        assert!(clock_in("NaN").is_err());
        assert!(clock_in("inf").is_err());
    }

    #[test]
    fn cli_rejects_zero_replay_interval() {
        let watch = |interval: &str| {
            Args::try_parse_from([
                "geoclock", "watch", "--samples", "track.csv", "--interval-ms", interval,
            ])
        };
        assert!(watch("0").is_err());
        assert!(matches!(
            watch("250").unwrap().command,
            Command::Watch { interval_ms: Some(250), .. }
        ));
    }

    #[test]
    fn cli_requires_both_coordinates() {
        assert!(Args::try_parse_from(["geoclock", "clock-in", "--lat", "51.5"]).is_err());
    }

    #[test]
    fn cli_site_subcommands() {
        let args = Args::try_parse_from([
            "geoclock", "sites", "add", "Depot", "--lat", "1.0", "--lon", "2.0", "--radius", "75",
        ])
        .unwrap();
        assert!(matches!(args.command, Command::Sites(admin::SitesCommand::Add { .. })));
    }
}
