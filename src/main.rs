//! CLI entry point for the county growth-rate analysis.
//!
//! Provides subcommands for running the full correlation pipeline,
//! downloading the public source datasets, and listing the fastest-growing
//! counties.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use covid_county_rater::analyzers::analyzer::{AnalysisConfig, run_analysis};
use covid_county_rater::fetch::{BasicClient, DATASET_SOURCES, MANUAL_SOURCES, download_to};
use covid_county_rater::output::{append_results, print_json};
use covid_county_rater::plot;
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
#[command(name = "covid_county_rater")]
#[command(
    about = "Correlates US-county COVID-19 case growth with population density and temperature",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Which county attribute the scatter charts correlate against growth rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum View {
    Density,
    Temperature,
    Both,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write the report CSV and charts
    Analyze {
        /// Directory containing the source datasets and lookup tables
        #[arg(short, long, default_value = "data")]
        data_dir: String,

        /// Number of trailing days to fit per county
        #[arg(short = 'l', long, default_value_t = 10)]
        window_length: usize,

        /// Most-recent days to exclude before the window (0 = use the tail)
        #[arg(short = 'o', long, default_value_t = 10)]
        window_offset: usize,

        /// Which attribute to plot against the growth rate
        #[arg(short, long, value_enum, default_value = "both")]
        view: View,

        /// CSV file to append per-county results to
        #[arg(long, default_value = "growth_results.csv")]
        output: String,

        /// Directory for rendered charts
        #[arg(long, default_value = "charts")]
        chart_dir: String,

        /// Skip chart rendering
        #[arg(long, default_value_t = false)]
        no_plots: bool,

        /// Also log the results as pretty-printed JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Download the public source datasets
    Fetch {
        /// Directory to save datasets into
        #[arg(short, long, default_value = "data")]
        data_dir: String,
    },
    /// List the fastest-growing qualifying counties
    Top {
        /// Directory containing the source datasets and lookup tables
        #[arg(short, long, default_value = "data")]
        data_dir: String,

        /// How many counties to show
        #[arg(short = 'n', long, default_value_t = 20)]
        count: usize,

        /// Number of trailing days to fit per county
        #[arg(short = 'l', long, default_value_t = 10)]
        window_length: usize,

        /// Most-recent days to exclude before the window (0 = use the tail)
        #[arg(short = 'o', long, default_value_t = 10)]
        window_offset: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/covid_county_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("covid_county_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            data_dir,
            window_length,
            window_offset,
            view,
            output,
            chart_dir,
            no_plots,
            json,
        } => {
            let config = AnalysisConfig {
                data_dir: PathBuf::from(&data_dir),
                window_length,
                window_offset,
            };
            let results = run_analysis(&config)?;

            if results.is_empty() {
                warn!("No qualifying counties; nothing to report");
                return Ok(());
            }

            append_results(&output, &results)?;
            info!(counties = results.len(), output = %output, "Report written");

            if json {
                print_json(&results)?;
            }

            if !no_plots {
                let chart_dir = Path::new(&chart_dir);
                std::fs::create_dir_all(chart_dir)?;
                plot::render_r2_histogram(&results, chart_dir)?;
                if matches!(view, View::Density | View::Both) {
                    plot::render_density_scatter(&results, chart_dir)?;
                }
                if matches!(view, View::Temperature | View::Both) {
                    plot::render_temperature_scatter(&results, chart_dir)?;
                }
                info!(dir = %chart_dir.display(), "Charts rendered");
            }
        }
        Commands::Fetch { data_dir } => {
            std::fs::create_dir_all(&data_dir)?;
            let client = BasicClient::new();

            for &(name, url) in DATASET_SOURCES {
                download_to(&client, url, &Path::new(&data_dir).join(name)).await?;
            }
            for &(name, url) in MANUAL_SOURCES {
                info!(file = name, source = url, "Dataset must be prepared manually");
            }
        }
        Commands::Top {
            data_dir,
            count,
            window_length,
            window_offset,
        } => {
            let config = AnalysisConfig {
                data_dir: PathBuf::from(&data_dir),
                window_length,
                window_offset,
            };
            let mut results = run_analysis(&config)?;
            results.sort_by(|a, b| b.growth_rate.total_cmp(&a.growth_rate));

            for row in results.iter().take(count) {
                info!(
                    county = %row.county_state,
                    growth_rate = %format!("{:.4}", row.growth_rate),
                    daily_factor = %format!("{:.3}", row.growth_rate.exp()),
                    r_squared = %format!("{:.3}", row.r_squared),
                    "County"
                );
            }

            info!(
                shown = results.len().min(count),
                qualifying = results.len(),
                "Top counties by growth rate"
            );
        }
    }

    Ok(())
}
