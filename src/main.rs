use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dr_metrics::{AnalysisConfig, CarrierMap};
use log::info;
use std::fs::File;
use std::path::{Path, PathBuf};

mod batch;
mod results_writer;
mod verify;

#[derive(Parser)]
#[command(name = "dr_results")]
#[command(about = "Batch extraction of demand response metrics from solved networks")]
struct Cli {
    /// Write log records to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// JSON file of extra carrier entries
    #[arg(long, global = true)]
    carriers: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract every metric of every network below INPUT
    Extract {
        input: PathBuf,

        /// Output root; per-network results mirror the input layout
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Analysis year (defaults to each network's first investment period)
        #[arg(short, long)]
        year: Option<i32>,

        /// JSON analysis configuration
        #[arg(long)]
        config: Option<PathBuf>,

        /// Skip chart rendering
        #[arg(long)]
        no_plots: bool,

        /// Worker threads (defaults to the number of CPUs)
        #[arg(short, long)]
        threads: Option<usize>,
    },
    /// Check network folders for structural problems
    Verify { input: PathBuf },
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(path) = log_file {
        let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let carriers = match &cli.carriers {
        Some(path) => CarrierMap::from_json_file(path)
            .with_context(|| format!("reading carrier map {}", path.display()))?,
        None => CarrierMap::default(),
    };

    match cli.command {
        Command::Extract {
            input,
            output,
            year,
            config,
            no_plots,
            threads,
        } => {
            let threads = threads.unwrap_or_else(num_cpus::get);
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build_global()
                .context("configuring the worker pool")?;
            info!("Extracting with {threads} threads");

            let config = match &config {
                Some(path) => AnalysisConfig::from_json_file(path)
                    .with_context(|| format!("reading analysis config {}", path.display()))?,
                None => AnalysisConfig::default(),
            };
            let options = batch::BatchOptions {
                year,
                carriers,
                config,
                charts: !no_plots,
            };
            let summary = batch::run_batch(&input, &output, &options)?;
            if summary.reports.is_empty() {
                anyhow::bail!("no network was extracted");
            }
        }
        Command::Verify { input } => {
            let issues = verify::verify_networks(&input, &carriers)?;
            if issues > 0 {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
