//! The contract every metric implements and the derived series they share.

use crate::accessor::Metric;
use crate::carriers::{CarrierEntry, Renewable, ResolvedCarriers};
use crate::chart::Chart;
use crate::config::{AnalysisConfig, ChartOptions};
use crate::error::Result;
use crate::models::{round_to, Datapoint, NetLoadRow, NetLoadSeries, RampRow, WideColumn, WideSeries};
use crate::network::{ComponentKind, NetworkSource, SeriesKind};
use chrono::{NaiveDate, NaiveDateTime};
use log::debug;
use polars::prelude::DataFrame;
use std::collections::HashSet;
use std::path::Path;

/// Three views of one metric over one network and analysis year.
///
/// Implementors compute their derived series when constructed and hold
/// them immutably, so every view is a pure read.
pub trait MetricExtractor {
    fn metric(&self) -> Metric;

    /// Full derived time series or event table.
    fn extract_dataframe(&self) -> Result<DataFrame>;

    /// Compact summary. `as_table` yields the uniform `(metric, value)` table.
    fn extract_datapoint(&self, as_table: bool) -> Result<Datapoint>;

    /// Chart assembled from the extractor's own tables.
    fn chart(&self) -> Result<Chart>;

    /// Builds the chart and, when `destination` is given, draws it there.
    fn render(&self, destination: Option<&Path>, options: &ChartOptions) -> Result<Chart> {
        let chart = self.chart()?;
        if let Some(path) = destination {
            debug!("Rendering {} chart to {}", self.metric(), path.display());
            chart.save(path, options)?;
        }
        Ok(chart)
    }
}

/// How [`ExtractorContext::grouped_series`] folds components that share a
/// display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Mean,
}

/// Read-only handle on everything an extractor needs: the network, its
/// resolved carriers, the analysis year and the analysis settings.
#[derive(Clone, Copy)]
pub struct ExtractorContext<'a> {
    pub network: &'a dyn NetworkSource,
    pub carriers: &'a ResolvedCarriers,
    pub year: i32,
    pub config: &'a AnalysisConfig,
}

impl<'a> ExtractorContext<'a> {
    /// Unchecked; outside the crate a context comes from
    /// [`ResultsAccessor::context`](crate::ResultsAccessor::context), which
    /// validates the settings and the year first.
    pub(crate) fn new(
        network: &'a dyn NetworkSource,
        carriers: &'a ResolvedCarriers,
        year: i32,
        config: &'a AnalysisConfig,
    ) -> Self {
        Self {
            network,
            carriers,
            year,
            config,
        }
    }

    /// Snapshot positions that fall in the analysis year.
    pub fn year_rows(&self) -> Vec<usize> {
        self.network
            .snapshots()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.period == self.year)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn year_timestamps(&self) -> Vec<NaiveDateTime> {
        let snapshots = self.network.snapshots();
        self.year_rows().into_iter().map(|i| snapshots[i].timestamp).collect()
    }

    /// Total end-use electrical load at every snapshot.
    ///
    /// Load is the `p0` of end-use links drawing from a bus that also feeds
    /// a sector electricity delivery or electric vehicle link.
    pub fn electrical_load(&self) -> Vec<f64> {
        let links = self.network.components(ComponentKind::Link);
        let load_buses: HashSet<&str> = self
            .carriers
            .select(ComponentKind::Link, CarrierEntry::is_elec_load_marker)
            .into_iter()
            .map(|i| links[i].bus.as_str())
            .collect();

        let names: Vec<&str> = self
            .carriers
            .select(ComponentKind::Link, |entry| entry.sector.is_end_use())
            .into_iter()
            .filter(|&i| load_buses.contains(links[i].bus.as_str()))
            .map(|i| links[i].name.as_str())
            .collect();

        self.network.series(SeriesKind::LinkP0).sum_columns(names)
    }

    pub fn renewable_generation(&self, kind: Renewable) -> Vec<f64> {
        let generators = self.network.components(ComponentKind::Generator);
        let names: Vec<&str> = self
            .carriers
            .select(ComponentKind::Generator, |entry| entry.renewable() == Some(kind))
            .into_iter()
            .map(|i| generators[i].name.as_str())
            .collect();
        self.network.series(SeriesKind::GeneratorP).sum_columns(names)
    }

    /// Load, solar, wind and net load for the analysis year, in time order
    /// or ranked by descending net load.
    pub fn net_load(&self, sort_descending: bool) -> NetLoadSeries {
        let snapshots = self.network.snapshots();
        let load = self.electrical_load();
        let solar = self.renewable_generation(Renewable::Solar);
        let wind = self.renewable_generation(Renewable::Wind);

        let rows = self
            .year_rows()
            .into_iter()
            .map(|i| NetLoadRow {
                timestamp: snapshots[i].timestamp,
                load_mw: load[i],
                solar_mw: solar[i],
                wind_mw: wind[i],
                net_load_mw: round_to(load[i] - wind[i] - solar[i], 2),
            })
            .collect();

        let series = NetLoadSeries { rows };
        if sort_descending {
            series.ranked()
        } else {
            series
        }
    }

    /// Absolute net-load change over `ramp_lag` periods; the first
    /// `ramp_lag` rows have no predecessor and are dropped.
    pub fn ramping(&self) -> Vec<RampRow> {
        let lag = self.config.ramp_lag;
        let rows = self.net_load(false).rows;
        rows.iter()
            .enumerate()
            .skip(lag)
            .map(|(i, row)| RampRow {
                timestamp: row.timestamp,
                ramp_mw: (row.net_load_mw - rows[i - lag].net_load_mw).abs(),
                net_load_mw: row.net_load_mw,
            })
            .filter(|r| !r.ramp_mw.is_nan())
            .collect()
    }

    /// Largest ramp of each calendar day, ranked descending. Equal ramps keep
    /// time order, so a day's earliest maximum wins.
    pub fn daily_max_ramp(&self) -> Vec<RampRow> {
        let mut ranked = self.ramping();
        ranked.sort_by(|a, b| b.ramp_mw.total_cmp(&a.ramp_mw));

        let mut seen: HashSet<NaiveDate> = HashSet::new();
        ranked.retain(|row| seen.insert(row.day()));
        ranked
    }

    /// Year slice of one time series per display name, folding components
    /// that share a carrier name. Columns appear in first-seen order.
    pub fn grouped_series(
        &self,
        component: ComponentKind,
        series: SeriesKind,
        indices: &[usize],
        aggregate: Aggregate,
        absolute: bool,
    ) -> WideSeries {
        let rows = self.year_rows();
        let components = self.network.components(component);
        let table = self.network.series(series);

        let mut columns: Vec<WideColumn> = Vec::new();
        let mut counts: Vec<usize> = Vec::new();
        for &i in indices {
            let entry = self.carriers.entry(component, i);
            let values: Vec<f64> = rows
                .iter()
                .map(|&r| {
                    let v = table.value(&components[i].name, r);
                    if absolute {
                        v.abs()
                    } else {
                        v
                    }
                })
                .collect();

            match columns.iter().position(|c| c.name == entry.name) {
                Some(pos) => {
                    for (acc, v) in columns[pos].values.iter_mut().zip(values) {
                        *acc += v;
                    }
                    counts[pos] += 1;
                }
                None => {
                    columns.push(WideColumn {
                        name: entry.name.clone(),
                        sector: entry.sector,
                        values,
                    });
                    counts.push(1);
                }
            }
        }

        if aggregate == Aggregate::Mean {
            for (column, &n) in columns.iter_mut().zip(&counts) {
                for v in column.values.iter_mut() {
                    *v /= n as f64;
                }
            }
        }

        WideSeries {
            timestamps: rows.iter().map(|&r| self.network.snapshots()[r].timestamp).collect(),
            columns,
        }
    }
}

/// `(timestamp, value)` pairs in the given order, for season search.
pub fn ranked_net_load(series: &NetLoadSeries) -> Vec<(NaiveDateTime, f64)> {
    series.rows.iter().map(|r| (r.timestamp, r.net_load_mw)).collect()
}

pub fn ranked_ramps(rows: &[RampRow]) -> Vec<(NaiveDateTime, f64)> {
    rows.iter().map(|r| (r.timestamp, r.ramp_mw)).collect()
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::carriers::CarrierMap;
    use crate::network::{Component, NetworkBuilder, Snapshot};
    use chrono::Duration;

    fn context<'a>(
        network: &'a dyn NetworkSource,
        carriers: &'a ResolvedCarriers,
        config: &'a AnalysisConfig,
        year: i32,
    ) -> ExtractorContext<'a> {
        ExtractorContext::new(network, carriers, year, config)
    }

    #[test]
    fn test_net_load_identity() {
        let network = network_with_load(72, |h| 100.123 + h as f64 * 0.5).build().unwrap();
        let carriers = ResolvedCarriers::resolve(&network, &CarrierMap::default()).unwrap();
        let config = AnalysisConfig::default();
        let series = context(&network, &carriers, &config, 2019).net_load(false);

        assert_eq!(series.len(), 72);
        for row in &series.rows {
            assert_eq!(row.net_load_mw, round_to(row.load_mw - row.wind_mw - row.solar_mw, 2));
            assert_eq!(row.solar_mw, 10.0);
            assert_eq!(row.wind_mw, 5.0);
        }
    }

    #[test]
    fn test_load_excludes_links_off_the_load_bus() {
        let network = network_with_load(4, |_| 50.0)
            .link(
                Component::new("p2 res-gas-furnace", "res-gas-furnace", "p2 gas"),
                Some(vec![999.0; 4]),
                None,
            )
            .link(Component::new("p1-p2 AC", "AC", "p1"), Some(vec![7.0; 4]), None)
            .build()
            .unwrap();
        let carriers = ResolvedCarriers::resolve(&network, &CarrierMap::default()).unwrap();
        let config = AnalysisConfig::default();
        let load = context(&network, &carriers, &config, 2019).electrical_load();
        assert_eq!(load, vec![50.0; 4]);
    }

    #[test]
    fn test_ranked_net_load_breaks_ties_by_time() {
        let network = network_with_load(48, |h| if h == 5 || h == 30 { 500.0 } else { 100.0 })
            .build()
            .unwrap();
        let carriers = ResolvedCarriers::resolve(&network, &CarrierMap::default()).unwrap();
        let config = AnalysisConfig::default();
        let ranked = context(&network, &carriers, &config, 2019).net_load(true);
        assert_eq!(ranked.rows[0].timestamp, jan1(2019) + Duration::hours(5));
        assert_eq!(ranked.rows[1].timestamp, jan1(2019) + Duration::hours(30));
        assert_eq!(ranked.rows[0].net_load_mw, 485.0);
    }

    #[test]
    fn test_ramping_uses_configured_lag() {
        let network = network_with_load(10, |h| (h * h) as f64).build().unwrap();
        let carriers = ResolvedCarriers::resolve(&network, &CarrierMap::default()).unwrap();
        let config = AnalysisConfig::default();
        let ramps = context(&network, &carriers, &config, 2019).ramping();
        assert_eq!(ramps.len(), 7);
        // 9 - 0
        assert_eq!(ramps[0].ramp_mw, 9.0);
        assert_eq!(ramps[0].timestamp, jan1(2019) + Duration::hours(3));
        // 81 - 36
        assert_eq!(ramps[6].ramp_mw, 45.0);
    }

    #[test]
    fn test_daily_max_ramp_one_row_per_day() {
        let network = baseline_network(24 * 5);
        let carriers = ResolvedCarriers::resolve(&network, &CarrierMap::default()).unwrap();
        let config = AnalysisConfig::default();
        let ctx = context(&network, &carriers, &config, 2019);
        let ramps = ctx.ramping();
        let daily = ctx.daily_max_ramp();

        let days: HashSet<NaiveDate> = ramps.iter().map(|r| r.day()).collect();
        assert_eq!(daily.len(), days.len());
        for row in &daily {
            let day_max = ramps
                .iter()
                .filter(|r| r.day() == row.day())
                .map(|r| r.ramp_mw)
                .fold(f64::NEG_INFINITY, f64::max);
            assert_eq!(row.ramp_mw, day_max);
        }
        assert!(daily.windows(2).all(|w| w[0].ramp_mw >= w[1].ramp_mw));
    }

    #[test]
    fn test_daily_max_ramp_tie_keeps_earliest() {
        // a one-hour spike ramps up at its hour and back down `ramp_lag` hours later
        let network = network_with_load(48, |h| match h {
            4 => 100.0,
            34 => 200.0,
            _ => 0.0,
        })
        .build()
        .unwrap();
        let carriers = ResolvedCarriers::resolve(&network, &CarrierMap::default()).unwrap();
        let config = AnalysisConfig::default();
        let ctx = context(&network, &carriers, &config, 2019);

        let ramps = ctx.ramping();
        let ties: Vec<_> = ramps.iter().filter(|r| r.ramp_mw == 100.0).map(|r| r.timestamp).collect();
        assert_eq!(ties, vec![jan1(2019) + Duration::hours(4), jan1(2019) + Duration::hours(7)]);

        let daily = ctx.daily_max_ramp();
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].ramp_mw, 200.0);
        assert_eq!(daily[0].timestamp, jan1(2019) + Duration::hours(34));
        assert_eq!(daily[1].ramp_mw, 100.0);
        assert_eq!(daily[1].timestamp, jan1(2019) + Duration::hours(4));
    }

    #[test]
    fn test_net_load_restricted_to_period() {
        let snapshots: Vec<Snapshot> = (0..6)
            .map(|h| {
                let period = if h < 3 { 2030 } else { 2040 };
                Snapshot::in_period(period, jan1(2019) + Duration::hours(h))
            })
            .collect();
        let network = NetworkBuilder::new(snapshots)
            .link(Component::new("b res-elec", "res-elec", "b"), Some(vec![1.0; 6]), None)
            .build()
            .unwrap();
        let carriers = ResolvedCarriers::resolve(&network, &CarrierMap::default()).unwrap();
        let config = AnalysisConfig::default();
        let series = context(&network, &carriers, &config, 2040).net_load(false);
        assert_eq!(series.len(), 3);
        assert_eq!(series.rows[0].timestamp, jan1(2019) + Duration::hours(3));
        assert_eq!(series.rows[0].load_mw, 1.0);
    }

    #[test]
    fn test_grouped_series_mean_and_abs() {
        let network = NetworkBuilder::hourly(jan1(2019), 2)
            .store(Component::new("a res-elec-dr", "res-elec-dr", "a"), Some(vec![-2.0, 4.0]))
            .store(Component::new("b res-elec-dr", "res-elec-dr", "b"), Some(vec![6.0, -8.0]))
            .build()
            .unwrap();
        let carriers = ResolvedCarriers::resolve(&network, &CarrierMap::default()).unwrap();
        let config = AnalysisConfig::default();
        let ctx = context(&network, &carriers, &config, 2019);

        let summed = ctx.grouped_series(ComponentKind::Store, SeriesKind::StoreE, &[0, 1], Aggregate::Sum, true);
        assert_eq!(summed.columns.len(), 1);
        assert_eq!(summed.columns[0].name, "Residential Electricity DR");
        assert_eq!(summed.columns[0].values, vec![8.0, 12.0]);

        let mean = ctx.grouped_series(ComponentKind::Store, SeriesKind::StoreE, &[0, 1], Aggregate::Mean, false);
        assert_eq!(mean.columns[0].values, vec![2.0, -2.0]);
    }
}
