//! Airport checkpoint simulation application.
#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::default_trait_access,
    clippy::cast_precision_loss
)]

use std::convert::TryFrom;
use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use eyre::WrapErr;
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use serde::Serialize;

use checkpoint::replication::{self, ReplicationSummary};
use checkpoint::{theory, DurationDistribution, InFlightPolicy, SimulationConfig};

/// Runs the checkpoint simulation for several numbers of stations and compares them.
#[derive(Parser)]
#[clap(version, author)]
struct Opt {
    /// Path to a JSON file with the simulation configuration.
    /// The reference scenario is used for anything not given.
    #[clap(long)]
    config: Option<PathBuf>,

    /// Numbers of stations to compare, separated by commas.
    #[clap(short = 'n', long, value_delimiter = ',', default_value = "1,2,3,4,5")]
    stations: Vec<usize>,

    /// Number of independent replications for each number of stations.
    #[clap(short, long, default_value = "30")]
    replications: usize,

    /// Base seed; overrides the configuration.
    #[clap(long)]
    seed: Option<u64>,

    /// Simulated time; overrides the configuration.
    #[clap(long)]
    horizon: Option<f64>,

    /// Treatment of travelers still waiting at the horizon: `exclude` or `partial`.
    #[clap(long)]
    in_flight: Option<InFlightPolicy>,

    /// Write the summary to this CSV file.
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Verbosity.
    #[clap(short, long, parse(from_occurrences))]
    verbose: i32,

    /// Store the logs in this file.
    #[clap(long)]
    log_output: Option<PathBuf>,

    /// Do not log to the stderr.
    #[clap(long)]
    no_stderr: bool,
}

impl TryFrom<&Opt> for SimulationConfig {
    type Error = eyre::Error;
    fn try_from(opt: &Opt) -> eyre::Result<Self> {
        let mut config: SimulationConfig = match &opt.config {
            Some(path) => {
                let file = File::open(path).wrap_err_with(|| {
                    format!("unable to open configuration: {}", path.display())
                })?;
                serde_json::from_reader(file).wrap_err("unable to parse configuration")?
            }
            None => SimulationConfig::default(),
        };
        if let Some(seed) = opt.seed {
            config.seed = seed;
        }
        if let Some(horizon) = opt.horizon {
            config.horizon = horizon;
        }
        if let Some(policy) = opt.in_flight {
            config.in_flight = policy;
        }
        config.validate()?;
        Ok(config)
    }
}

/// A single line of the output table.
#[derive(Serialize)]
struct SummaryRow {
    num_stations: usize,
    replications: usize,
    mean_waiting_time: f64,
    mean_waiting_time_hw: f64,
    average_queue_length: f64,
    average_queue_length_hw: f64,
    max_queue_length: f64,
    max_queue_length_hw: f64,
    mean_secondary_waiting_time: f64,
    mean_secondary_waiting_time_hw: f64,
    /// Waiting time predicted for a random split into independent M/G/1 queues.
    split_mg1_waiting_time: Option<f64>,
}

impl SummaryRow {
    fn new(summary: &ReplicationSummary, config: &SimulationConfig) -> Self {
        let prediction = match config.arrival {
            DurationDistribution::Exponential { rate } => theory::split_mg1_waiting_time(
                rate,
                summary.num_stations,
                config.service.mean(),
                config.service.variance(),
            ),
            _ => None,
        };
        Self {
            num_stations: summary.num_stations,
            replications: summary.replications,
            mean_waiting_time: summary.mean_waiting_time.mean,
            mean_waiting_time_hw: summary.mean_waiting_time.half_width,
            average_queue_length: summary.average_queue_length.mean,
            average_queue_length_hw: summary.average_queue_length.half_width,
            max_queue_length: summary.max_queue_length.mean,
            max_queue_length_hw: summary.max_queue_length.half_width,
            mean_secondary_waiting_time: summary.mean_secondary_waiting_time.mean,
            mean_secondary_waiting_time_hw: summary.mean_secondary_waiting_time.half_width,
            split_mg1_waiting_time: prediction,
        }
    }
}

fn print_table(rows: &[SummaryRow]) {
    println!(
        "{:>8} {:>20} {:>20} {:>20} {:>12}",
        "stations", "waiting time", "avg queue", "max queue", "M/G/1 split"
    );
    for row in rows {
        println!(
            "{:>8} {:>11.3} ± {:<6.3} {:>11.3} ± {:<6.3} {:>11.3} ± {:<6.3} {:>12}",
            row.num_stations,
            row.mean_waiting_time,
            row.mean_waiting_time_hw,
            row.average_queue_length,
            row.average_queue_length_hw,
            row.max_queue_length,
            row.max_queue_length_hw,
            row.split_mg1_waiting_time
                .map_or_else(|| String::from("-"), |w| format!("{:.3}", w)),
        );
    }
}

fn run(opt: &Opt) -> eyre::Result<()> {
    let config = SimulationConfig::try_from(opt)?;
    log::info!(
        "Simulating {} replications for stations: {}",
        opt.replications,
        opt.stations.iter().format(", ")
    );
    let pb = ProgressBar::new(opt.stations.len() as u64)
        .with_style(ProgressStyle::default_bar().template("{msg} {wide_bar} {pos}/{len}"));
    let mut rows = Vec::with_capacity(opt.stations.len());
    for &num_stations in &opt.stations {
        pb.set_message(&format!("[N={}]", num_stations));
        let config = config.clone().with_stations(num_stations);
        let reports = replication::replicate(&config, opt.replications)
            .wrap_err_with(|| format!("simulation with {} stations failed", num_stations))?;
        let summary = replication::summarize(num_stations, &reports);
        rows.push(SummaryRow::new(&summary, &config));
        pb.inc(1);
    }
    pb.finish_and_clear();
    print_table(&rows);
    if let Some(path) = &opt.output {
        let mut writer = csv::Writer::from_path(path)
            .wrap_err_with(|| format!("unable to create output file: {}", path.display()))?;
        for row in &rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    Ok(())
}

/// Set up a logger based on the given user options.
fn set_up_logger(opt: &Opt) -> Result<(), fern::InitError> {
    let log_level = match opt.verbose {
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        3 => log::LevelFilter::Trace,
        _ => log::LevelFilter::Warn,
    };
    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("[{}] {}", record.level(), message)))
        .level(log_level);
    let dispatch = if let Some(path) = &opt.log_output {
        let _ = std::fs::remove_file(path);
        dispatch.chain(
            std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .append(false)
                .open(path)?,
        )
    } else {
        dispatch
    };
    let dispatch = if opt.no_stderr {
        dispatch
    } else {
        dispatch.chain(std::io::stderr())
    };
    dispatch.apply()?;
    Ok(())
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let opt = Opt::parse();
    set_up_logger(&opt)?;
    run(&opt)
}
