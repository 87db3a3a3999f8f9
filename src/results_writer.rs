use anyhow::{Context, Result};
use dr_metrics::{Metric, MetricExtractor, ResultsAccessor};
use log::{debug, info, warn};
use polars::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DATAPOINT_DIR: &str = "datapoint";
pub const DATAFRAME_DIR: &str = "dataframe";
pub const PLOT_DIR: &str = "plot";

/// What was written for one network.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkReport {
    pub network: PathBuf,
    pub output_dir: PathBuf,
    pub year: i32,
    pub written: Vec<Metric>,
    /// Metrics that could not be computed, with the reason
    pub skipped: Vec<(Metric, String)>,
}

impl NetworkReport {
    fn new(network: &Path, output_dir: &Path, year: i32) -> Self {
        Self {
            network: network.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            year,
            written: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// Recreates `dir` empty.
fn fresh_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("removing {}", dir.display()))?;
    }
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    Ok(())
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    CsvWriter::new(fs::File::create(path).with_context(|| format!("creating {}", path.display()))?)
        .finish(df)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Writes every registered metric of one network under `output_dir`:
/// `datapoint/<metric>.csv`, `dataframe/<metric>.csv` and, when `charts`
/// is set, `plot/<metric>.png`.
///
/// A metric that cannot be computed for this network is reported and
/// skipped; I/O failures abort.
pub fn save_results(
    accessor: &ResultsAccessor<'_>,
    network: &Path,
    output_dir: &Path,
    charts: bool,
) -> Result<NetworkReport> {
    let datapoint_dir = output_dir.join(DATAPOINT_DIR);
    let dataframe_dir = output_dir.join(DATAFRAME_DIR);
    let plot_dir = output_dir.join(PLOT_DIR);
    fresh_dir(&datapoint_dir)?;
    fresh_dir(&dataframe_dir)?;
    if charts {
        fresh_dir(&plot_dir)?;
    }

    let mut report = NetworkReport::new(network, output_dir, accessor.year());
    for metric in accessor.metrics() {
        let extractor = match accessor.extractor(metric) {
            Ok(extractor) => extractor,
            Err(e) => {
                warn!("{}: skipping {metric}: {e}", network.display());
                report.skipped.push((metric, e.to_string()));
                continue;
            }
        };

        let datapoint = extractor.extract_datapoint(true)?;
        if let Some(table) = datapoint.as_table() {
            write_csv(&mut table.to_dataframe()?, &datapoint_dir.join(format!("{metric}.csv")))?;
        }

        let mut df = extractor.extract_dataframe()?;
        if df.width() > 0 {
            write_csv(&mut df, &dataframe_dir.join(format!("{metric}.csv")))?;
        } else {
            debug!("{}: {metric} has no dataframe", network.display());
        }

        if charts {
            let chart = extractor.chart()?;
            if chart.is_empty() {
                debug!("{}: {metric} has nothing to plot", network.display());
            } else {
                chart.save(&plot_dir.join(format!("{metric}.png")), &accessor.config().chart)?;
            }
        }
        report.written.push(metric);
    }

    info!(
        "{}: wrote {} metrics to {} ({} skipped)",
        network.display(),
        report.written.len(),
        output_dir.display(),
        report.skipped.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dr_metrics::{AnalysisConfig, CarrierMap, Component, NetworkBuilder};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn network(hours: usize) -> dr_metrics::Network {
        let start = NaiveDate::from_ymd_opt(2019, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let load: Vec<f64> = (0..hours).map(|h| 500.0 + (h % 24) as f64 * 3.0 + (h / 24) as f64).collect();
        NetworkBuilder::hourly(start, hours)
            .link(Component::new("p1 res-elec", "res-elec", "p1"), Some(load), None)
            .generator(Component::new("p1 solar", "solar", "p1"), Some(vec![20.0; hours]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_writes_layout_and_recreates_dirs() {
        let out = TempDir::new().unwrap();
        let stale = out.path().join(DATAPOINT_DIR).join("stale.csv");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, "old").unwrap();

        let network = network(24 * 60);
        let accessor =
            ResultsAccessor::new(&network, None, &CarrierMap::default(), AnalysisConfig::default()).unwrap();
        let report = save_results(&accessor, Path::new("net"), out.path(), false).unwrap();

        assert!(!stale.exists());
        assert_eq!(report.year, 2019);
        assert!(report.skipped.is_empty());
        assert_eq!(report.written.len(), Metric::ALL.len());
        for metric in Metric::ALL {
            assert!(out.path().join(DATAPOINT_DIR).join(format!("{metric}.csv")).exists());
        }
        assert!(out.path().join(DATAFRAME_DIR).join("shed_season.csv").exists());
        // no DR stores, so no dataframe
        assert!(!out.path().join(DATAFRAME_DIR).join("dr.csv").exists());
        assert!(!out.path().join(PLOT_DIR).exists());

        let peakiness = fs::read_to_string(out.path().join(DATAPOINT_DIR).join("peakiness.csv")).unwrap();
        assert!(peakiness.starts_with("metric,value"));
        assert!(peakiness.contains("peakiness"));
    }

    #[test]
    fn test_short_horizon_skips_season_metrics() {
        let out = TempDir::new().unwrap();
        // enough hours for the shed season, too few days for ramping and the shift season
        let network = network(24 * 10);
        let accessor =
            ResultsAccessor::new(&network, None, &CarrierMap::default(), AnalysisConfig::default()).unwrap();
        let report = save_results(&accessor, Path::new("net"), out.path(), false).unwrap();

        let skipped: Vec<Metric> = report.skipped.iter().map(|(m, _)| *m).collect();
        assert!(skipped.contains(&Metric::Ramping));
        assert!(skipped.contains(&Metric::ShiftSeason));
        assert!(report.written.contains(&Metric::Capacity));
        assert!(report.written.contains(&Metric::ShedSeason));
    }
}
