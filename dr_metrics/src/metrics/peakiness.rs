use super::{PeakComponent, PeakPair};
use crate::accessor::Metric;
use crate::chart::{Chart, ChartLine, Panel};
use crate::error::{MetricsError, Result};
use crate::extractor::{ExtractorContext, MetricExtractor};
use crate::models::{round_to, Datapoint, NetLoadSeries};
use log::debug;
use polars::prelude::DataFrame;

/// Gap between the highest net-load hour and the routine peak (the
/// `peak_rank`-th highest hour).
#[derive(Debug, Clone)]
pub struct Peakiness {
    ranked: NetLoadSeries,
    chronological: NetLoadSeries,
    peaks: PeakPair,
    peak_rank: usize,
    component: PeakComponent,
}

impl Peakiness {
    pub fn new(ctx: &ExtractorContext<'_>) -> Result<Self> {
        let ranked = ctx.net_load(true);
        let rank = ctx.config.peak_rank;
        if ranked.len() < rank {
            return Err(MetricsError::InsufficientEvents {
                metric: "peakiness",
                needed: rank,
                available: ranked.len(),
            });
        }
        let peaks = PeakPair {
            peak: round_to(ranked.rows[0].net_load_mw, 2),
            routine: round_to(ranked.rows[rank - 1].net_load_mw, 2),
        };
        Ok(Self {
            chronological: ctx.net_load(false),
            ranked,
            peaks,
            peak_rank: rank,
            component: PeakComponent::Extreme,
        })
    }

    /// Selects what the scalar datapoint reports.
    pub fn with_component(mut self, component: PeakComponent) -> Self {
        self.component = component;
        self
    }

    pub fn peak(&self) -> f64 {
        self.peaks.peak
    }

    pub fn routine(&self) -> f64 {
        self.peaks.routine
    }

    pub fn peakiness(&self) -> f64 {
        self.peaks.extreme()
    }
}

impl MetricExtractor for Peakiness {
    fn metric(&self) -> Metric {
        Metric::Peakiness
    }

    fn extract_dataframe(&self) -> Result<DataFrame> {
        self.ranked.to_dataframe()
    }

    fn extract_datapoint(&self, as_table: bool) -> Result<Datapoint> {
        if as_table {
            debug!("Returning datapoint peakiness table");
            return Ok(Datapoint::Table(self.peaks.to_table("peakiness")));
        }
        debug!("Returning peakiness {:?}", self.component);
        Ok(Datapoint::Scalar(self.peaks.select(self.component)))
    }

    fn chart(&self) -> Result<Chart> {
        let (Some(first), Some(last)) = (self.chronological.rows.first(), self.chronological.rows.last()) else {
            return Ok(Chart::empty("Peakiness"));
        };
        let (start, end) = (first.timestamp, last.timestamp);
        let peak_at = self.ranked.rows[0].timestamp;

        let points = self
            .chronological
            .rows
            .iter()
            .map(|r| (r.timestamp, r.net_load_mw))
            .collect();
        let routine_label = format!("{}th Highest Peak Load", self.peak_rank);
        let panel = Panel::lines(
            "Net Load",
            "Net Load (MW)",
            vec![
                ChartLine::data("Net Load", points),
                ChartLine::reference("Peak Net Load", start, end, self.peak()),
                ChartLine::reference(&routine_label, start, end, self.routine()),
            ],
        )
        .with_marker("Peak", peak_at, self.peak())
        .with_note(
            &format!("Peakiness {:.2} MW", self.peakiness()),
            start,
            (self.peak() + self.routine()) / 2.0,
        );
        Ok(Chart::new("Peakiness", vec![panel]))
    }
}
