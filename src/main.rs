//! CLI entry point for the fleet fuel report.
//!
//! Provides subcommands for generating the odometer/fuel report for a time
//! window and for listing the vehicles that would be included in it.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use fleet_fuel_report::config::{
    ClientConfig, Credential, DEFAULT_CONCURRENCY, ReportOptions, ReportWindow, ReportZone,
    WindowSide, default_window, parse_local_instant,
};
use fleet_fuel_report::infra::mapon::MaponClient;
use fleet_fuel_report::output::{Format, print_pretty, write_report};
use fleet_fuel_report::report::columns::normalize_selection;
use fleet_fuel_report::report::{Column, generate_report};
use fleet_fuel_report::services::telemetry_api::TelemetryApi;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "fleet_fuel_report")]
#[command(about = "Odometer and fuel report for a Mapon fleet", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ApiArgs {
    /// Mapon API key
    #[arg(long, env = "MAPON_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Also include units that report no mileage
    #[arg(long, default_value_t = false)]
    include_without_mileage: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the per-vehicle report for a time window
    Report {
        #[command(flatten)]
        api: ApiArgs,

        /// Window start: RFC 3339, or local "YYYY-MM-DD[ HH:MM:SS]" (default: start of yesterday)
        #[arg(long)]
        from: Option<String>,

        /// Window end: RFC 3339, or local "YYYY-MM-DD[ HH:MM:SS]" (default: end of today)
        #[arg(long)]
        till: Option<String>,

        /// Timezone for local times: an IANA name like "Europe/Kyiv" or an offset like "+03:00"
        #[arg(
            long,
            visible_alias = "utc-offset",
            default_value = "UTC",
            allow_hyphen_values = true
        )]
        timezone: ReportZone,

        /// Columns to include (comma separated, default: all)
        #[arg(short, long, value_enum, value_delimiter = ',')]
        columns: Vec<Column>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Csv)]
        format: Format,

        /// File to write to (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Gzip-compress CSV output
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Maximum number of vehicles processed concurrently
        #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
    },
    /// List the vehicles eligible for the report
    ListVehicles {
        #[command(flatten)]
        api: ApiArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/fleet_fuel_report.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("fleet_fuel_report.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let client_config = ClientConfig::from_env();

    match cli.command {
        Commands::Report {
            api,
            from,
            till,
            timezone,
            columns,
            format,
            output,
            gzip,
            concurrency,
        } => {
            let credential = Credential::new(api.api_key)?;
            let window = resolve_window(from.as_deref(), till.as_deref(), timezone)?;
            let columns = normalize_selection(&columns);
            let options = ReportOptions {
                concurrency,
                require_mileage: !api.include_without_mileage,
            };

            if gzip && format == Format::Json {
                warn!("--gzip only applies to CSV output, writing plain JSON");
            }

            let records = generate_report(&credential, window, &client_config, options).await?;
            if records.is_empty() {
                warn!("Report has no rows; check the window and the fleet's activity");
            }
            print_pretty(&records);

            write_report(output.as_deref(), format, gzip, &records, &columns)?;
        }
        Commands::ListVehicles { api } => {
            let credential = Credential::new(api.api_key)?;
            let client = MaponClient::connect(&credential, &client_config)?
                .with_mileage_requirement(!api.include_without_mileage);

            let vehicles = client.list_vehicles().await;
            for vehicle in &vehicles {
                info!(vehicle_id = vehicle.id, name = %vehicle.display_name, "Vehicle");
            }
            info!(total = vehicles.len(), "Vehicle list summary");
        }
    }

    Ok(())
}

/// Turns the optional CLI bounds into a UTC window, defaulting to yesterday
/// through today in `zone`.
fn resolve_window(from: Option<&str>, till: Option<&str>, zone: ReportZone) -> Result<ReportWindow> {
    let defaults = default_window(Utc::now(), zone)?;

    let start = match from {
        Some(raw) => parse_local_instant(raw, zone, WindowSide::Start).context("invalid --from")?,
        None => defaults.start,
    };
    let end = match till {
        Some(raw) => parse_local_instant(raw, zone, WindowSide::End).context("invalid --till")?,
        None => defaults.end,
    };

    let window = ReportWindow::new(start, end);
    if !window.is_ordered() {
        anyhow::bail!("--from must not be later than --till");
    }
    info!(start = %window.start, end = %window.end, %zone, "Report window");
    Ok(window)
}
