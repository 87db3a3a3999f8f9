use super::shed_season::ShedSeason;
use crate::accessor::Metric;
use crate::chart::Chart;
use crate::error::Result;
use crate::extractor::{ExtractorContext, MetricExtractor};
use crate::frame::{date_column, datetime_column, float_column};
use crate::models::{Datapoint, MetricTable, MetricValue, NetLoadRow, NET_LOAD, TIMESTAMP};
use chrono::NaiveDate;
use log::debug;
use polars::prelude::DataFrame;

/// Calendar days inside the shed season that hold at least one of the top
/// ranked net-load hours.
#[derive(Debug, Clone)]
pub struct ShedDays {
    season: ShedSeason,
    top_hours: Vec<NetLoadRow>,
    in_season: Vec<NetLoadRow>,
    days: Vec<NaiveDate>,
}

impl ShedDays {
    pub fn new(ctx: &ExtractorContext<'_>) -> Result<Self> {
        let season = ShedSeason::new(ctx)?;
        let window = season.window();

        let mut top_hours = ctx.net_load(true).rows;
        top_hours.truncate(ctx.config.shed_day_rank);

        let in_season: Vec<NetLoadRow> = top_hours
            .iter()
            .filter(|r| window.contains_day(r.timestamp.date()))
            .copied()
            .collect();

        let mut days: Vec<NaiveDate> = in_season.iter().map(|r| r.timestamp.date()).collect();
        days.sort();
        days.dedup();

        Ok(Self {
            season,
            top_hours,
            in_season,
            days,
        })
    }

    /// Distinct shed days in calendar order.
    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }
}

impl MetricExtractor for ShedDays {
    fn metric(&self) -> Metric {
        Metric::ShedDays
    }

    /// Top ranked hours that fall inside the season, in rank order.
    fn extract_dataframe(&self) -> Result<DataFrame> {
        let timestamps: Vec<_> = self.in_season.iter().map(|r| r.timestamp).collect();
        let days: Vec<NaiveDate> = timestamps.iter().map(|t| t.date()).collect();
        let df = DataFrame::new(vec![
            datetime_column(TIMESTAMP, &timestamps)?,
            float_column(NET_LOAD, self.in_season.iter().map(|r| r.net_load_mw).collect()),
            date_column("day", &days)?,
        ])?;
        Ok(df)
    }

    fn extract_datapoint(&self, as_table: bool) -> Result<Datapoint> {
        if as_table {
            debug!("Returning datapoint shed days table");
            let mut table = MetricTable::new();
            for day in &self.days {
                table.push("shed_day", MetricValue::Date(*day));
            }
            return Ok(Datapoint::Table(table));
        }
        Ok(Datapoint::Days(self.days.clone()))
    }

    fn chart(&self) -> Result<Chart> {
        let Some(mut panel) = self.season.season_panel() else {
            return Ok(Chart::empty("Shed Days"));
        };
        for hour in &self.top_hours {
            panel = panel.with_marker("", hour.timestamp, hour.net_load_mw);
        }
        if let Some(peak) = self.top_hours.first() {
            let start = self.season.window().start;
            panel = panel.with_note(
                &format!("Shed Event Days = {}", self.days.len()),
                start,
                peak.net_load_mw,
            );
        }
        Ok(Chart::new("Shed Days", vec![panel]))
    }
}
