use super::{PeakComponent, PeakPair};
use crate::accessor::Metric;
use crate::chart::{Chart, ChartLine, Panel};
use crate::error::{MetricsError, Result};
use crate::extractor::{ExtractorContext, MetricExtractor};
use crate::models::{ramp_column, ramps_to_dataframe, round_to, Datapoint, RampRow};
use log::debug;
use polars::prelude::DataFrame;

/// Daily maximum net-load ramps, compared between the steepest day and the
/// routine (`ramp_rank`-th steepest) day.
#[derive(Debug, Clone)]
pub struct Ramping {
    daily: Vec<RampRow>,
    peaks: PeakPair,
    ramp_rank: usize,
    ramp_lag: usize,
    component: PeakComponent,
}

impl Ramping {
    pub fn new(ctx: &ExtractorContext<'_>) -> Result<Self> {
        let daily = ctx.daily_max_ramp();
        let rank = ctx.config.ramp_rank;
        if daily.len() < rank {
            return Err(MetricsError::InsufficientEvents {
                metric: "ramping",
                needed: rank,
                available: daily.len(),
            });
        }
        let peaks = PeakPair {
            peak: round_to(daily[0].ramp_mw, 2),
            routine: round_to(daily[rank - 1].ramp_mw, 2),
        };
        Ok(Self {
            daily,
            peaks,
            ramp_rank: rank,
            ramp_lag: ctx.config.ramp_lag,
            component: PeakComponent::Extreme,
        })
    }

    pub fn with_component(mut self, component: PeakComponent) -> Self {
        self.component = component;
        self
    }

    /// Daily maxima ranked by descending ramp.
    pub fn daily_max(&self) -> &[RampRow] {
        &self.daily
    }

    pub fn value(&self, component: PeakComponent) -> f64 {
        self.peaks.select(component)
    }
}

impl MetricExtractor for Ramping {
    fn metric(&self) -> Metric {
        Metric::Ramping
    }

    fn extract_dataframe(&self) -> Result<DataFrame> {
        ramps_to_dataframe(&self.daily, self.ramp_lag)
    }

    fn extract_datapoint(&self, as_table: bool) -> Result<Datapoint> {
        if as_table {
            debug!("Returning datapoint ramping table");
            return Ok(Datapoint::Table(self.peaks.to_table("extreme")));
        }
        Ok(Datapoint::Scalar(self.peaks.select(self.component)))
    }

    fn chart(&self) -> Result<Chart> {
        let mut by_day = self.daily.clone();
        by_day.sort_by_key(|r| r.timestamp);
        let (Some(first), Some(last)) = (by_day.first(), by_day.last()) else {
            return Ok(Chart::empty("Ramping"));
        };
        let (start, end) = (first.timestamp, last.timestamp);
        let peak_day = &self.daily[0];
        let routine_day = &self.daily[self.ramp_rank - 1];

        let y_label = format!("Daily Maximum {}hr Absolute Net Load Ramping (MW)", self.ramp_lag);
        let panel = Panel::lines(
            "Daily Maximum Ramp",
            &y_label,
            vec![
                ChartLine::data(&ramp_column(self.ramp_lag), by_day.iter().map(|r| (r.timestamp, r.ramp_mw)).collect()),
                ChartLine::reference("Peak Ramping", start, end, self.peaks.peak),
                ChartLine::reference("Routine Ramping", start, end, self.peaks.routine),
            ],
        )
        .with_marker("Peak Daily Ramp", peak_day.timestamp, peak_day.ramp_mw)
        .with_marker("Routine Ramping", routine_day.timestamp, routine_day.ramp_mw)
        .with_note(
            &format!("Extreme Ramping {:.2} MW", self.peaks.extreme()),
            start,
            (self.peaks.peak + self.peaks.routine) / 2.0,
        );
        Ok(Chart::new("Ramping", vec![panel]))
    }
}
