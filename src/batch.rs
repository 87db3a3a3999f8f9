use crate::results_writer::{save_results, NetworkReport};
use anyhow::{Context, Result};
use dr_metrics::{AnalysisConfig, CarrierMap, NetworkLoader, ResultsAccessor};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const SUMMARY_FILE: &str = "summary.json";

/// Settings shared by every network of a batch run.
pub struct BatchOptions {
    pub year: Option<i32>,
    pub carriers: CarrierMap,
    pub config: AnalysisConfig,
    pub charts: bool,
}

#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub generated_at: String,
    pub input_root: PathBuf,
    pub reports: Vec<NetworkReport>,
    /// Networks that failed to load or validate, with the error
    pub failures: Vec<(PathBuf, String)>,
}

/// Every directory under `root` (including `root`) holding an exported
/// network, sorted by path.
pub fn discover_networks(root: &Path) -> Vec<PathBuf> {
    let mut networks: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir() && NetworkLoader::is_network_dir(e.path()))
        .map(|e| e.into_path())
        .collect();
    networks.sort();
    networks
}

/// Output directory of `network`, mirroring its path below `input_root`.
pub fn output_dir_for(network: &Path, input_root: &Path, output_root: &Path) -> PathBuf {
    match network.strip_prefix(input_root) {
        Ok(relative) => output_root.join(relative),
        Err(_) => output_root.join(network.file_name().unwrap_or_default()),
    }
}

fn process_network(network_dir: &Path, output_dir: &Path, options: &BatchOptions) -> Result<NetworkReport> {
    let network = NetworkLoader::load(network_dir)
        .with_context(|| format!("loading {}", network_dir.display()))?;
    let accessor = ResultsAccessor::new(&network, options.year, &options.carriers, options.config.clone())
        .with_context(|| format!("preparing {}", network_dir.display()))?;
    save_results(&accessor, network_dir, output_dir, options.charts)
}

/// Extracts every metric of every network below `input_root` in parallel
/// and writes `summary.json` to `output_root`.
pub fn run_batch(input_root: &Path, output_root: &Path, options: &BatchOptions) -> Result<BatchSummary> {
    let networks = discover_networks(input_root);
    println!("\n🔍 Found {} networks under {}", networks.len(), input_root.display());
    if networks.is_empty() {
        anyhow::bail!("no snapshots.csv found under {}", input_root.display());
    }

    let pb = ProgressBar::new(networks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?,
    );

    let results: Vec<(PathBuf, Result<NetworkReport>)> = networks
        .par_iter()
        .map(|network| {
            let output_dir = output_dir_for(network, input_root, output_root);
            let result = process_network(network, &output_dir, options);
            pb.inc(1);
            (network.clone(), result)
        })
        .collect();
    pb.finish_with_message("Networks processed");

    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for (network, result) in results {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!("{}: {e:#}", network.display());
                failures.push((network, format!("{e:#}")));
            }
        }
    }

    let summary = BatchSummary {
        generated_at: chrono::Local::now().to_rfc3339(),
        input_root: input_root.to_path_buf(),
        reports,
        failures,
    };

    fs::create_dir_all(output_root).with_context(|| format!("creating {}", output_root.display()))?;
    let summary_path = output_root.join(SUMMARY_FILE);
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)
        .with_context(|| format!("writing {}", summary_path.display()))?;
    info!("Wrote {}", summary_path.display());

    println!("\n{}", "=".repeat(60));
    println!("✅ {} networks extracted", summary.reports.len());
    if !summary.failures.is_empty() {
        println!("❌ {} networks failed", summary.failures.len());
        for (network, reason) in &summary.failures {
            println!("    {}: {reason}", network.display());
        }
    }
    let skipped: usize = summary.reports.iter().map(|r| r.skipped.len()).sum();
    if skipped > 0 {
        println!("⚠️  {skipped} metrics skipped, see {}", summary_path.display());
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results_writer::DATAPOINT_DIR;
    use std::fmt::Write as _;
    use tempfile::TempDir;

    /// Writes a 60-day single-zone network export into `dir`.
    fn write_network(dir: &Path) {
        fs::create_dir_all(dir).unwrap();
        let mut snapshots = String::from("snapshot,objective,stores\n");
        let mut links_p0 = String::from("snapshot,p1 res-elec\n");
        let mut generators_p = String::from("snapshot,p1 solar\n");
        let start = chrono::NaiveDate::from_ymd_opt(2019, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        for h in 0..24 * 60 {
            let ts = (start + chrono::Duration::hours(h)).format("%Y-%m-%d %H:%M:%S");
            writeln!(snapshots, "{ts},1,1").unwrap();
            writeln!(links_p0, "{ts},{}", 400 + (h % 24) * 5 + h / 24).unwrap();
            writeln!(generators_p, "{ts},{}", if h % 24 == 12 { 50 } else { 0 }).unwrap();
        }
        fs::write(dir.join("snapshots.csv"), snapshots).unwrap();
        fs::write(dir.join("links.csv"), "name,bus0,bus1,carrier,p_nom,p_nom_opt\np1 res-elec,p1,p1 res,res-elec,900,900\n").unwrap();
        fs::write(dir.join("generators.csv"), "name,bus,carrier,p_nom,p_nom_opt\np1 solar,p1,solar,60,60\n").unwrap();
        fs::write(dir.join("links-p0.csv"), links_p0).unwrap();
        fs::write(dir.join("generators-p.csv"), generators_p).unwrap();
        fs::write(dir.join("network.csv"), "name,objective\nzone,1000\n").unwrap();
    }

    #[test]
    fn test_discovery_and_output_mirroring() {
        let input = TempDir::new().unwrap();
        write_network(&input.path().join("scenario_a/2030"));
        write_network(&input.path().join("scenario_b"));
        fs::create_dir_all(input.path().join("notes")).unwrap();

        let networks = discover_networks(input.path());
        assert_eq!(networks.len(), 2);
        assert!(networks[0].ends_with("scenario_a/2030"));

        let out = Path::new("/out");
        assert_eq!(output_dir_for(&networks[0], input.path(), out), out.join("scenario_a/2030"));
    }

    #[test]
    fn test_batch_writes_every_network_and_records_failures() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_network(&input.path().join("good"));
        let broken = input.path().join("broken");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join("snapshots.csv"), "snapshot\nnot a date\n").unwrap();

        let options = BatchOptions {
            year: None,
            carriers: CarrierMap::default(),
            config: AnalysisConfig::default(),
            charts: false,
        };
        let summary = run_batch(input.path(), output.path(), &options).unwrap();

        assert_eq!(summary.reports.len(), 1);
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].0.ends_with("broken"));
        assert!(output.path().join("good").join(DATAPOINT_DIR).join("capacity.csv").exists());
        assert!(output.path().join(SUMMARY_FILE).exists());
    }
}
