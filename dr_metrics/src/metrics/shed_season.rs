use super::{season_dataframe, season_table};
use crate::accessor::Metric;
use crate::chart::{Chart, ChartLine, Panel};
use crate::error::Result;
use crate::extractor::{ranked_net_load, ExtractorContext, MetricExtractor};
use crate::models::{Datapoint, EventWindow, NetLoadSeries, NET_LOAD};
use crate::season::{find_season, Season};
use log::debug;
use polars::prelude::DataFrame;

/// Shortest calendar span holding most of the year's top net-load hours.
#[derive(Debug, Clone)]
pub struct ShedSeason {
    chronological: NetLoadSeries,
    season: Season,
    top_events: usize,
}

impl ShedSeason {
    pub fn new(ctx: &ExtractorContext<'_>) -> Result<Self> {
        let ranked = ctx.net_load(true);
        let config = ctx.config.shed_season;
        let season = find_season(&ranked_net_load(&ranked), &config, "shed_season")?;
        debug!(
            "Shed season {} to {} from {} contracted hours",
            season.window.start,
            season.window.end,
            season.events.len()
        );
        Ok(Self {
            chronological: ctx.net_load(false),
            season,
            top_events: config.top_events,
        })
    }

    pub fn window(&self) -> EventWindow {
        self.season.window
    }

    pub fn season(&self) -> &Season {
        &self.season
    }

    pub fn threshold_label(&self) -> String {
        format!("Top {} Net-Load Hours", self.top_events)
    }

    /// Net load with the ranking threshold and the season span, shared with
    /// the shed days chart.
    pub(crate) fn season_panel(&self) -> Option<Panel> {
        let first = self.chronological.rows.first()?;
        let last = self.chronological.rows.last()?;
        let window = self.season.window;
        let points = self
            .chronological
            .rows
            .iter()
            .map(|r| (r.timestamp, r.net_load_mw))
            .collect();
        let panel = Panel::lines(
            "Net Load",
            "Net Load (MW)",
            vec![
                ChartLine::data("Net Load", points),
                ChartLine::reference(
                    &self.threshold_label(),
                    first.timestamp,
                    last.timestamp,
                    self.season.threshold,
                ),
            ],
        )
        .with_span("Demand Response Shed Season", window.start, window.end);
        Some(panel)
    }
}

impl MetricExtractor for ShedSeason {
    fn metric(&self) -> Metric {
        Metric::ShedSeason
    }

    fn extract_dataframe(&self) -> Result<DataFrame> {
        season_dataframe(&self.season, NET_LOAD, &self.threshold_label())
    }

    fn extract_datapoint(&self, as_table: bool) -> Result<Datapoint> {
        if as_table {
            debug!("Returning datapoint shed season table");
            return Ok(Datapoint::Table(season_table(&self.season)));
        }
        Ok(Datapoint::Window(self.season.window))
    }

    fn chart(&self) -> Result<Chart> {
        Ok(match self.season_panel() {
            Some(panel) => Chart::new("Shed Season", vec![panel]),
            None => Chart::empty("Shed Season"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carriers::{CarrierMap, ResolvedCarriers};
    use crate::config::AnalysisConfig;
    use crate::error::MetricsError;
    use crate::extractor::testing::*;
    use chrono::Duration;

    /// Baseline 1000 MW with a 100 hour spike starting on day 180.
    fn spike_extractor(config: &AnalysisConfig) -> ShedSeason {
        let spike = 180 * 24;
        let network = network_with_load(8760, |h| {
            if (spike..spike + 100).contains(&h) {
                2000.0
            } else {
                1000.0 + (h % 5) as f64
            }
        })
        .build()
        .unwrap();
        let carriers = ResolvedCarriers::resolve(&network, &CarrierMap::default()).unwrap();
        let ctx = ExtractorContext::new(&network, &carriers, 2019, config);
        ShedSeason::new(&ctx).unwrap()
    }

    #[test]
    fn test_spike_season_within_spike() {
        let config = AnalysisConfig::default();
        let metric = spike_extractor(&config);
        let window = metric.window();
        let spike_start = jan1(2019) + Duration::hours(180 * 24);

        assert_eq!(metric.season().events.len(), 81);
        // the lone baseline candidate goes first, then equal one-hour gaps
        // trim from the right
        assert_eq!(window.start, spike_start);
        assert_eq!(window.span(), Duration::hours(80));
        assert!(window.end < spike_start + Duration::hours(100));
    }

    #[test]
    fn test_datapoint_views() {
        let config = AnalysisConfig::default();
        let metric = spike_extractor(&config);
        match metric.extract_datapoint(false).unwrap() {
            Datapoint::Window(w) => assert_eq!(w, metric.window()),
            other => panic!("unexpected datapoint {other:?}"),
        }
        let table = metric.extract_datapoint(true).unwrap();
        let table = table.as_table().unwrap();
        assert_eq!(table.rows[0].metric, "first_day");
        assert_eq!(table.rows[1].metric, "last_day");

        let df = metric.extract_dataframe().unwrap();
        assert_eq!(df.height(), 81);
        assert!(df.column("Top 100 Net-Load Hours").is_ok());
    }

    #[test]
    fn test_insufficient_hours() {
        let network = baseline_network(100);
        let carriers = ResolvedCarriers::resolve(&network, &CarrierMap::default()).unwrap();
        let config = AnalysisConfig::default();
        let ctx = ExtractorContext::new(&network, &carriers, 2019, &config);
        assert!(matches!(
            ShedSeason::new(&ctx),
            Err(MetricsError::InsufficientEvents { needed: 101, .. })
        ));
    }
}
