use super::{season_dataframe, season_table};
use crate::accessor::Metric;
use crate::chart::{Chart, ChartLine, Panel};
use crate::error::Result;
use crate::extractor::{ranked_ramps, ExtractorContext, MetricExtractor};
use crate::models::{ramp_column, Datapoint, EventWindow, RampRow};
use crate::season::{find_season, Season};
use log::debug;
use polars::prelude::DataFrame;

/// Shortest calendar span holding most of the year's steepest ramping days.
#[derive(Debug, Clone)]
pub struct ShiftSeason {
    daily: Vec<RampRow>,
    season: Season,
    top_events: usize,
    ramp_lag: usize,
}

impl ShiftSeason {
    pub fn new(ctx: &ExtractorContext<'_>) -> Result<Self> {
        let daily = ctx.daily_max_ramp();
        let config = ctx.config.shift_season;
        let season = find_season(&ranked_ramps(&daily), &config, "shift_season")?;
        debug!(
            "Shift season {} to {} from {} contracted days",
            season.window.start,
            season.window.end,
            season.events.len()
        );
        Ok(Self {
            daily,
            season,
            top_events: config.top_events,
            ramp_lag: ctx.config.ramp_lag,
        })
    }

    pub fn window(&self) -> EventWindow {
        self.season.window
    }

    pub fn season(&self) -> &Season {
        &self.season
    }

    fn threshold_label(&self) -> String {
        format!("Top {} Ramping Days", self.top_events)
    }
}

impl MetricExtractor for ShiftSeason {
    fn metric(&self) -> Metric {
        Metric::ShiftSeason
    }

    fn extract_dataframe(&self) -> Result<DataFrame> {
        season_dataframe(&self.season, &ramp_column(self.ramp_lag), &self.threshold_label())
    }

    fn extract_datapoint(&self, as_table: bool) -> Result<Datapoint> {
        if as_table {
            debug!("Returning datapoint shift season table");
            return Ok(Datapoint::Table(season_table(&self.season)));
        }
        Ok(Datapoint::Window(self.season.window))
    }

    fn chart(&self) -> Result<Chart> {
        let mut by_day = self.daily.clone();
        by_day.sort_by_key(|r| r.timestamp);
        let (Some(first), Some(last)) = (by_day.first(), by_day.last()) else {
            return Ok(Chart::empty("Shift Season"));
        };
        let window = self.season.window;

        let mut panel = Panel::lines(
            "Daily Maximum Ramp",
            &format!("Daily {}hr Absolute Net Load Ramping (MW)", self.ramp_lag),
            vec![
                ChartLine::data(&ramp_column(self.ramp_lag), by_day.iter().map(|r| (r.timestamp, r.ramp_mw)).collect()),
                ChartLine::reference(
                    &self.threshold_label(),
                    first.timestamp,
                    last.timestamp,
                    self.season.threshold,
                ),
            ],
        )
        .with_span("Demand Response Shift Season", window.start, window.end);
        for day in self.daily.iter().take(self.top_events) {
            panel = panel.with_marker("", day.timestamp, day.ramp_mw);
        }
        Ok(Chart::new("Shift Season", vec![panel]))
    }
}
