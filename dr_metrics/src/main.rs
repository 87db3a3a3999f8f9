use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dr_metrics::{
    AnalysisConfig, CarrierMap, Datapoint, Extractor, Metric, MetricExtractor, NetworkLoader,
    PeakComponent, ResultsAccessor,
};
use dr_metrics::frame::string_column;
use log::info;
use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dr_metrics")]
#[command(about = "Extract demand response metrics from one solved network")]
struct Args {
    /// Folder holding the exported network CSV tables
    network: PathBuf,

    /// Metric key, or "all"
    #[arg(short, long, default_value = "all")]
    metric: String,

    /// Analysis year (defaults to the first investment period)
    #[arg(short, long)]
    year: Option<i32>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    output: OutputFormat,

    /// Report datapoints as uniform (metric, value) tables
    #[arg(long)]
    table: bool,

    /// Scalar reported by peakiness and ramping (peak, routine or extreme)
    #[arg(long)]
    component: Option<PeakComponent>,

    /// JSON file of extra carrier entries
    #[arg(long)]
    carriers: Option<PathBuf>,

    /// JSON analysis configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory to render charts into (one <metric>.png per metric)
    #[arg(long)]
    charts: Option<PathBuf>,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
    Summary,
}

fn datapoint(extractor: Extractor, as_table: bool, component: Option<PeakComponent>) -> Result<Datapoint> {
    let datapoint = match (extractor, component) {
        (Extractor::Peakiness(e), Some(c)) if !as_table => e.with_component(c).extract_datapoint(false)?,
        (Extractor::Ramping(e), Some(c)) if !as_table => e.with_component(c).extract_datapoint(false)?,
        (e, _) => e.extract_datapoint(as_table)?,
    };
    Ok(datapoint)
}

/// One `(key, metric, value)` row per table row; other datapoints become a
/// single row holding their JSON.
fn results_frame(results: &BTreeMap<&'static str, Datapoint>) -> Result<DataFrame> {
    let mut keys = Vec::new();
    let mut metrics = Vec::new();
    let mut values = Vec::new();
    for (key, datapoint) in results {
        match datapoint {
            Datapoint::Table(table) => {
                for row in &table.rows {
                    keys.push(key.to_string());
                    metrics.push(row.metric.clone());
                    values.push(row.value.to_string());
                }
            }
            other => {
                keys.push(key.to_string());
                metrics.push(key.to_string());
                values.push(serde_json::to_string(other)?);
            }
        }
    }
    let df = DataFrame::new(vec![
        string_column("key", keys),
        string_column("metric", metrics),
        string_column("value", values),
    ])?;
    Ok(df)
}

fn write_results_csv<W: Write>(results: &BTreeMap<&'static str, Datapoint>, writer: W) -> Result<()> {
    let mut df = results_frame(results)?;
    CsvWriter::new(writer).finish(&mut df)?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let carriers = match &args.carriers {
        Some(path) => CarrierMap::from_json_file(path)
            .with_context(|| format!("reading carrier map {}", path.display()))?,
        None => CarrierMap::default(),
    };
    let config = match &args.config {
        Some(path) => AnalysisConfig::from_json_file(path)
            .with_context(|| format!("reading analysis config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    let network = NetworkLoader::load(&args.network)
        .with_context(|| format!("loading network {}", args.network.display()))?;
    let accessor = ResultsAccessor::new(&network, args.year, &carriers, config)?;

    let metrics: Vec<Metric> = if args.metric == "all" {
        accessor.metrics().collect()
    } else {
        vec![args.metric.parse()?]
    };

    if let Some(dir) = &args.charts {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let mut results: BTreeMap<&'static str, Datapoint> = BTreeMap::new();
    for metric in metrics {
        info!("Extracting {metric}");
        let extractor = accessor.extractor(metric)?;
        if let Some(dir) = &args.charts {
            let path = dir.join(format!("{metric}.png"));
            extractor.render(Some(&path), &accessor.config().chart)?;
        }
        results.insert(metric.as_str(), datapoint(extractor, args.table, args.component)?);
    }

    match args.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        OutputFormat::Csv => write_results_csv(&results, std::io::stdout().lock())?,
        OutputFormat::Summary => {
            println!("Demand Response Metrics");
            println!("=======================");
            println!("Network: {}", args.network.display());
            println!("Year: {}", accessor.year());
            println!();
            for (key, datapoint) in &results {
                match datapoint {
                    Datapoint::Scalar(v) => println!("  {key}: {v:.2}"),
                    Datapoint::Window(w) => println!("  {key}: {} to {}", w.start, w.end),
                    Datapoint::Days(days) => println!("  {key}: {} days", days.len()),
                    Datapoint::Table(table) => {
                        println!("  {key}:");
                        for row in &table.rows {
                            println!("    {}: {}", row.metric, row.value);
                        }
                    }
                    other => println!("  {key}: {}", serde_json::to_string(other)?),
                }
            }
        }
    }

    Ok(())
}
