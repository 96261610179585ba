//! Pension Projection CLI
//!
//! Runs the full projection from a data directory and writes the summary
//! (and optionally the full panel) as CSV.

use anyhow::{Context, Result};
use clap::Parser;
use pension_projection::assumptions::DEFAULT_DATA_PATH;
use pension_projection::formulae::ServiceMethod;
use pension_projection::projection::output::{write_panel_file, write_summary_file};
use pension_projection::{ProjectionConfig, ScenarioRunner};
use std::path::PathBuf;
use std::time::Instant;

/// Project pension benefits for all active members under one or more scenarios
#[derive(Parser)]
#[command(name = "pension_projection")]
#[command(version)]
struct Cli {
    /// Directory holding members, plans, claims, assumption and scenario CSV files
    #[arg(short, long, default_value = DEFAULT_DATA_PATH)]
    data_dir: PathBuf,

    /// JSON file with projection settings; flags below override it
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of simulations to project
    #[arg(short, long)]
    simulations: Option<u32>,

    /// Project at most this many years per member
    #[arg(long, value_name = "YEARS")]
    max_years: Option<u32>,

    /// Mortality and tariff tables carry a simulation column
    #[arg(long)]
    simulated_mortality: bool,

    /// Override the age adjustment of the assumption row
    #[arg(long, allow_hyphen_values = true)]
    age_adjustment: Option<i32>,

    /// Count past service in calendar months instead of days
    #[arg(long)]
    calendar_months: bool,

    /// Summary output file
    #[arg(long, default_value = "summary.csv")]
    summary_out: PathBuf,

    /// Also write the full panel to this file
    #[arg(long, value_name = "FILE")]
    panel_out: Option<PathBuf>,
}

impl Cli {
    fn projection_config(&self) -> Result<ProjectionConfig> {
        let mut config = match &self.config {
            Some(path) => ProjectionConfig::from_json_path(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?,
            None => ProjectionConfig::default(),
        };

        if let Some(simulations) = self.simulations {
            config.simulation_count = simulations;
        }
        if self.max_years.is_some() {
            config.horizon_cap = self.max_years;
        }
        if self.simulated_mortality {
            config.has_simulated_mortality = true;
        }
        if self.age_adjustment.is_some() {
            config.age_adjustment = self.age_adjustment;
        }
        if self.calendar_months {
            config.service_method = ServiceMethod::CalendarMonths;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = cli.projection_config()?;

    let start = Instant::now();
    println!("Loading source data from {}...", cli.data_dir.display());
    let runner = ScenarioRunner::from_csv_path(&cli.data_dir, config.has_simulated_mortality)
        .with_context(|| format!("Failed to load source data from {}", cli.data_dir.display()))?;
    println!(
        "Loaded {} members, {} plan claims in {:?}",
        runner.source().members.len(),
        runner.source().claims.len(),
        start.elapsed()
    );

    let proj_start = Instant::now();
    println!("Running projection ({} simulations)...", config.simulation_count);
    let output = runner.run(&config).context("Projection failed")?;
    println!(
        "Projected {} panel rows in {:?}",
        output.panel.len(),
        proj_start.elapsed()
    );

    write_summary_file(&cli.summary_out, &output.summary)
        .with_context(|| format!("Failed to write {}", cli.summary_out.display()))?;
    println!("Wrote {} summary rows to {}", output.summary.len(), cli.summary_out.display());

    if let Some(path) = &cli.panel_out {
        write_panel_file(path, &output.panel)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote panel to {}", path.display());
    }

    println!("Total time: {:?}", start.elapsed());
    Ok(())
}
