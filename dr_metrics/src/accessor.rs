//! Registry of metric names and the accessor callers go through.

use crate::carriers::{CarrierMap, ResolvedCarriers};
use crate::chart::Chart;
use crate::config::AnalysisConfig;
use crate::error::{MetricsError, Result};
use crate::extractor::{ExtractorContext, MetricExtractor};
use crate::metrics::{
    Capacity, Cost, DemandResponse, Emissions, Peakiness, Ramping, ShedDays, ShedSeason,
    ShiftSeason,
};
use crate::models::Datapoint;
use crate::network::NetworkSource;
use log::{debug, info};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Peakiness,
    Ramping,
    ShedSeason,
    ShedDays,
    ShiftSeason,
    Capacity,
    Cost,
    #[serde(rename = "dr")]
    DemandResponse,
    Emissions,
}

impl Metric {
    pub const ALL: [Metric; 9] = [
        Metric::Peakiness,
        Metric::Ramping,
        Metric::ShedSeason,
        Metric::ShedDays,
        Metric::ShiftSeason,
        Metric::Capacity,
        Metric::Cost,
        Metric::DemandResponse,
        Metric::Emissions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Peakiness => "peakiness",
            Metric::Ramping => "ramping",
            Metric::ShedSeason => "shed_season",
            Metric::ShedDays => "shed_days",
            Metric::ShiftSeason => "shift_season",
            Metric::Capacity => "capacity",
            Metric::Cost => "cost",
            Metric::DemandResponse => "dr",
            Metric::Emissions => "emissions",
        }
    }

    pub fn keys() -> Vec<&'static str> {
        Self::ALL.iter().map(|m| m.as_str()).collect()
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = MetricsError;

    fn from_str(key: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == key)
            .ok_or_else(|| MetricsError::InvalidMetricKey {
                key: key.to_string(),
                accepted: Self::keys(),
            })
    }
}

/// One constructed extractor of any registered metric.
#[derive(Debug, Clone)]
pub enum Extractor {
    Peakiness(Peakiness),
    Ramping(Ramping),
    ShedSeason(ShedSeason),
    ShedDays(ShedDays),
    ShiftSeason(ShiftSeason),
    Capacity(Capacity),
    Cost(Cost),
    DemandResponse(DemandResponse),
    Emissions(Emissions),
}

impl Extractor {
    pub fn build(metric: Metric, ctx: &ExtractorContext<'_>) -> Result<Self> {
        Ok(match metric {
            Metric::Peakiness => Extractor::Peakiness(Peakiness::new(ctx)?),
            Metric::Ramping => Extractor::Ramping(Ramping::new(ctx)?),
            Metric::ShedSeason => Extractor::ShedSeason(ShedSeason::new(ctx)?),
            Metric::ShedDays => Extractor::ShedDays(ShedDays::new(ctx)?),
            Metric::ShiftSeason => Extractor::ShiftSeason(ShiftSeason::new(ctx)?),
            Metric::Capacity => Extractor::Capacity(Capacity::new(ctx)?),
            Metric::Cost => Extractor::Cost(Cost::new(ctx)?),
            Metric::DemandResponse => Extractor::DemandResponse(DemandResponse::new(ctx)?),
            Metric::Emissions => Extractor::Emissions(Emissions::new(ctx)?),
        })
    }

    fn inner(&self) -> &dyn MetricExtractor {
        match self {
            Extractor::Peakiness(e) => e,
            Extractor::Ramping(e) => e,
            Extractor::ShedSeason(e) => e,
            Extractor::ShedDays(e) => e,
            Extractor::ShiftSeason(e) => e,
            Extractor::Capacity(e) => e,
            Extractor::Cost(e) => e,
            Extractor::DemandResponse(e) => e,
            Extractor::Emissions(e) => e,
        }
    }
}

impl MetricExtractor for Extractor {
    fn metric(&self) -> Metric {
        self.inner().metric()
    }

    fn extract_dataframe(&self) -> Result<DataFrame> {
        self.inner().extract_dataframe()
    }

    fn extract_datapoint(&self, as_table: bool) -> Result<Datapoint> {
        self.inner().extract_datapoint(as_table)
    }

    fn chart(&self) -> Result<Chart> {
        self.inner().chart()
    }
}

/// Entry point for metric queries against one solved network and year.
///
/// Carriers are resolved and the year validated up front, so every
/// extractor built from here works on a checked network.
pub struct ResultsAccessor<'a> {
    network: &'a dyn NetworkSource,
    carriers: ResolvedCarriers,
    year: i32,
    config: AnalysisConfig,
}

impl<'a> ResultsAccessor<'a> {
    /// `year` defaults to the first investment period.
    pub fn new(
        network: &'a dyn NetworkSource,
        year: Option<i32>,
        carriers: &CarrierMap,
        config: AnalysisConfig,
    ) -> Result<Self> {
        config.validate()?;
        let available = network.periods();
        let year = match year.or_else(|| network.default_year()) {
            Some(y) if available.contains(&y) => y,
            Some(y) => return Err(MetricsError::InvalidYear { year: y, available }),
            None => return Err(MetricsError::Config("network has no snapshots".to_string())),
        };
        let carriers = ResolvedCarriers::resolve(network, carriers)?;
        info!(
            "Initialized results accessor for {year} ({} snapshots, {} carriers)",
            network.snapshots().len(),
            carriers.map().len()
        );
        Ok(Self {
            network,
            carriers,
            year,
            config,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn context(&self) -> ExtractorContext<'_> {
        ExtractorContext::new(self.network, &self.carriers, self.year, &self.config)
    }

    /// Every registered metric, in registry order.
    pub fn metrics(&self) -> impl Iterator<Item = Metric> {
        Metric::ALL.into_iter()
    }

    pub fn extractor(&self, metric: Metric) -> Result<Extractor> {
        debug!("Building {metric} extractor for {}", self.year);
        Extractor::build(metric, &self.context())
    }

    /// Looks up `key` in the registry; unknown keys are rejected.
    pub fn get(&self, key: &str) -> Result<Extractor> {
        self.extractor(key.parse()?)
    }

    pub fn dataframe(&self, key: &str) -> Result<DataFrame> {
        self.get(key)?.extract_dataframe()
    }

    pub fn datapoint(&self, key: &str, as_table: bool) -> Result<Datapoint> {
        self.get(key)?.extract_datapoint(as_table)
    }

    pub fn render(&self, key: &str, destination: Option<&Path>) -> Result<Chart> {
        self.get(key)?.render(destination, &self.config.chart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::testing::*;
    use crate::network::{Component, NetworkBuilder, Snapshot};
    use chrono::Duration;

    #[test]
    fn test_metric_keys_round_trip() {
        for metric in Metric::ALL {
            assert_eq!(metric.as_str().parse::<Metric>().unwrap(), metric);
        }
        assert_eq!(Metric::keys().len(), 9);
    }

    #[test]
    fn test_zero_ranks_rejected_before_extraction() {
        let network = baseline_network(24);
        for config in [
            AnalysisConfig {
                peak_rank: 0,
                ..AnalysisConfig::default()
            },
            AnalysisConfig {
                ramp_rank: 0,
                ..AnalysisConfig::default()
            },
        ] {
            assert!(matches!(
                ResultsAccessor::new(&network, None, &CarrierMap::default(), config),
                Err(MetricsError::Config(_))
            ));
        }
    }

    #[test]
    fn test_invalid_key_fails_fast() {
        let network = baseline_network(24);
        let accessor =
            ResultsAccessor::new(&network, None, &CarrierMap::default(), AnalysisConfig::default()).unwrap();
        let err = accessor.datapoint("peak_load", false).unwrap_err();
        match err {
            MetricsError::InvalidMetricKey { key, accepted } => {
                assert_eq!(key, "peak_load");
                assert!(accepted.contains(&"shed_season"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_year_defaults_and_validation() {
        let network = baseline_network(24);
        let accessor =
            ResultsAccessor::new(&network, None, &CarrierMap::default(), AnalysisConfig::default()).unwrap();
        assert_eq!(accessor.year(), 2019);

        let err = ResultsAccessor::new(&network, Some(2050), &CarrierMap::default(), AnalysisConfig::default());
        assert!(matches!(err, Err(MetricsError::InvalidYear { year: 2050, .. })));
    }

    #[test]
    fn test_multi_period_defaults_to_first_investment_period() {
        let snapshots = vec![
            Snapshot::in_period(2030, jan1(2030)),
            Snapshot::in_period(2040, jan1(2040) + Duration::hours(1)),
        ];
        let network = NetworkBuilder::new(snapshots).build().unwrap();
        let accessor =
            ResultsAccessor::new(&network, None, &CarrierMap::default(), AnalysisConfig::default()).unwrap();
        assert_eq!(accessor.year(), 2030);
    }

    #[test]
    fn test_unknown_carrier_rejected() {
        let network = NetworkBuilder::hourly(jan1(2019), 2)
            .generator(Component::new("g", "fusion", "b"), None)
            .build()
            .unwrap();
        let result = ResultsAccessor::new(&network, None, &CarrierMap::default(), AnalysisConfig::default());
        assert!(matches!(result, Err(MetricsError::UnknownCarrier { .. })));
    }

    #[test]
    fn test_every_metric_over_a_year() {
        let network = network_with_load(8760, |h| 1000.0 + ((h % 24) as f64 - 12.0).abs() * 10.0 + (h / 24) as f64)
            .build()
            .unwrap();
        let accessor =
            ResultsAccessor::new(&network, None, &CarrierMap::default(), AnalysisConfig::default()).unwrap();
        let produced: Vec<Metric> = accessor.metrics().collect();
        assert_eq!(produced, Metric::ALL.to_vec());
        for metric in accessor.metrics() {
            let extractor = accessor.extractor(metric).unwrap();
            assert_eq!(extractor.metric(), metric);
            let table = extractor.extract_datapoint(true).unwrap();
            assert!(table.as_table().is_some(), "{metric} table");
            extractor.extract_dataframe().unwrap();
            extractor.chart().unwrap();
        }
    }
}
