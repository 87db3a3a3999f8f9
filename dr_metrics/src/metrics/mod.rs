//! Concrete extractors, one per registered metric.

pub mod capacity;
pub mod cost;
pub mod demand_response;
pub mod emissions;
pub mod peakiness;
pub mod ramping;
pub mod shed_days;
pub mod shed_season;
pub mod shift_season;

pub use capacity::Capacity;
pub use cost::Cost;
pub use demand_response::DemandResponse;
pub use emissions::Emissions;
pub use peakiness::Peakiness;
pub use ramping::Ramping;
pub use shed_days::ShedDays;
pub use shed_season::ShedSeason;
pub use shift_season::ShiftSeason;

use crate::carriers::Sector;
use crate::chart::{ChartLine, Panel};
use crate::error::{MetricsError, Result};
use crate::frame::{datetime_column, float_column};
use crate::models::{MetricTable, MetricValue, WideSeries, TIMESTAMP};
use crate::season::Season;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which part of a peak/routine comparison a scalar datapoint reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakComponent {
    Peak,
    Routine,
    /// Peak minus routine
    #[default]
    Extreme,
}

impl FromStr for PeakComponent {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "peak" => Ok(PeakComponent::Peak),
            "routine" => Ok(PeakComponent::Routine),
            "extreme" | "peakiness" => Ok(PeakComponent::Extreme),
            other => Err(MetricsError::Config(format!(
                "unknown peak component '{other}' (expected peak, routine or extreme)"
            ))),
        }
    }
}

/// Peak and routine values of a ranked series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PeakPair {
    pub peak: f64,
    pub routine: f64,
}

impl PeakPair {
    pub fn extreme(&self) -> f64 {
        crate::models::round_to(self.peak - self.routine, 2)
    }

    pub fn select(&self, component: PeakComponent) -> f64 {
        match component {
            PeakComponent::Peak => self.peak,
            PeakComponent::Routine => self.routine,
            PeakComponent::Extreme => self.extreme(),
        }
    }

    pub fn to_table(&self, extreme_label: &str) -> MetricTable {
        MetricTable::new()
            .number("peak", self.peak)
            .number("routine", self.routine)
            .number(extreme_label, self.extreme())
    }
}

/// Contracted season events with their gap to the next event and the
/// ranking threshold.
pub(crate) fn season_dataframe(season: &Season, value_column: &str, threshold_column: &str) -> Result<DataFrame> {
    let timestamps: Vec<_> = season.events.iter().map(|e| e.timestamp).collect();
    let df = DataFrame::new(vec![
        datetime_column(TIMESTAMP, &timestamps)?,
        float_column(value_column, season.events.iter().map(|e| e.value).collect()),
        float_column(
            "gap_hours",
            season
                .events
                .iter()
                .map(|e| e.gap.num_minutes() as f64 / 60.0)
                .collect(),
        ),
        float_column(threshold_column, vec![season.threshold; season.events.len()]),
    ])?;
    Ok(df)
}

pub(crate) fn season_table(season: &Season) -> MetricTable {
    let mut table = MetricTable::new();
    table.push("first_day", MetricValue::Timestamp(season.window.start));
    table.push("last_day", MetricValue::Timestamp(season.window.end));
    table
}

/// One line panel per sector of the daily means of `series`, optionally
/// with the across-column average.
pub(crate) fn sector_panels(
    series: &WideSeries,
    sectors: &[Sector],
    y_label: &str,
    with_average: bool,
) -> Vec<Panel> {
    let daily = series.daily_mean();
    sectors
        .iter()
        .filter_map(|&sector| {
            let columns: Vec<_> = daily.columns.iter().filter(|c| c.sector == sector).collect();
            if columns.is_empty() {
                return None;
            }
            let mut lines: Vec<ChartLine> = columns
                .iter()
                .map(|c| ChartLine::data(&c.name, daily.timestamps.iter().copied().zip(c.values.iter().copied()).collect()))
                .collect();
            if with_average {
                let average = daily
                    .timestamps
                    .iter()
                    .enumerate()
                    .map(|(row, t)| {
                        let total: f64 = columns.iter().map(|c| c.values[row]).sum();
                        (*t, total / columns.len() as f64)
                    })
                    .collect();
                lines.push(ChartLine::data("Average", average));
            }
            Some(Panel::lines(sector.title(), y_label, lines))
        })
        .collect()
}
