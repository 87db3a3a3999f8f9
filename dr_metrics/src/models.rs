use crate::error::Result;
use crate::frame::{datetime_column, float_column, string_column};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::Serialize;
use std::fmt;

pub const NET_LOAD: &str = "Net_Load_MW";
pub const LOAD: &str = "Load_MW";
pub const SOLAR: &str = "Solar_MW";
pub const WIND: &str = "Wind_MW";
pub const RAMP_NET_LOAD: &str = "Net Load";
pub const TIMESTAMP: &str = "timestamp";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NetLoadRow {
    pub timestamp: NaiveDateTime,
    pub load_mw: f64,
    pub solar_mw: f64,
    pub wind_mw: f64,
    pub net_load_mw: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetLoadSeries {
    pub rows: Vec<NetLoadRow>,
}

impl NetLoadSeries {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Stable descending sort by net load; equal values keep time order.
    pub fn ranked(&self) -> NetLoadSeries {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| b.net_load_mw.total_cmp(&a.net_load_mw));
        NetLoadSeries { rows }
    }

    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let timestamps: Vec<NaiveDateTime> = self.rows.iter().map(|r| r.timestamp).collect();
        let df = DataFrame::new(vec![
            datetime_column(TIMESTAMP, &timestamps)?,
            float_column(LOAD, self.rows.iter().map(|r| r.load_mw).collect()),
            float_column(SOLAR, self.rows.iter().map(|r| r.solar_mw).collect()),
            float_column(WIND, self.rows.iter().map(|r| r.wind_mw).collect()),
            float_column(NET_LOAD, self.rows.iter().map(|r| r.net_load_mw).collect()),
        ])?;
        Ok(df)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RampRow {
    pub timestamp: NaiveDateTime,
    /// Absolute net-load change over the ramp lag
    pub ramp_mw: f64,
    pub net_load_mw: f64,
}

impl RampRow {
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// Ramp column label for a ramp measured over `lag` hours.
pub fn ramp_column(lag: usize) -> String {
    format!("Absolute {lag}-hr Ramping")
}

pub fn ramps_to_dataframe(rows: &[RampRow], lag: usize) -> Result<DataFrame> {
    let timestamps: Vec<NaiveDateTime> = rows.iter().map(|r| r.timestamp).collect();
    let df = DataFrame::new(vec![
        datetime_column(TIMESTAMP, &timestamps)?,
        float_column(&ramp_column(lag), rows.iter().map(|r| r.ramp_mw).collect()),
        float_column(RAMP_NET_LOAD, rows.iter().map(|r| r.net_load_mw).collect()),
    ])?;
    Ok(df)
}

/// Shortest calendar span holding the targeted number of top events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl EventWindow {
    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    pub fn midpoint(&self) -> NaiveDateTime {
        self.start + self.span() / 2
    }

    /// Inclusive on both calendar days.
    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.start.date() <= day && day <= self.end.date()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Text(String),
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Number(v) => write!(f, "{v}"),
            MetricValue::Timestamp(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
            MetricValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            MetricValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub metric: String,
    pub value: MetricValue,
}

/// Uniform `(metric, value)` summary so datapoints of different metrics stack.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricTable {
    pub rows: Vec<MetricRow>,
}

impl MetricTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, metric: impl Into<String>, value: MetricValue) {
        self.rows.push(MetricRow {
            metric: metric.into(),
            value,
        });
    }

    pub fn number(mut self, metric: impl Into<String>, value: f64) -> Self {
        self.push(metric, MetricValue::Number(value));
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, metric: &str) -> Option<&MetricValue> {
        self.rows.iter().find(|r| r.metric == metric).map(|r| &r.value)
    }

    /// Two string columns, `metric` and `value`.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let df = DataFrame::new(vec![
            string_column("metric", self.rows.iter().map(|r| r.metric.clone()).collect()),
            string_column("value", self.rows.iter().map(|r| r.value.to_string()).collect()),
        ])?;
        Ok(df)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorCapacity {
    pub sector: String,
    pub p_nom: f64,
    pub p_nom_opt: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostSummary {
    pub objective: f64,
    pub objective_adj: f64,
    pub dr_cost: f64,
    /// Mean marginal price per sector carrier column over the analysis year
    pub marginal_costs: Vec<(String, f64)>,
    pub capex: f64,
    pub opex: f64,
}

/// Natural datapoint of a metric, or the uniform table when requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Datapoint {
    Scalar(f64),
    Window(EventWindow),
    Days(Vec<NaiveDate>),
    Sectors(Vec<SectorCapacity>),
    Cost(CostSummary),
    Totals(Vec<(String, f64)>),
    Table(MetricTable),
}

impl Datapoint {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Datapoint::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&MetricTable> {
        match self {
            Datapoint::Table(t) => Some(t),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WideColumn {
    pub name: String,
    pub sector: crate::carriers::Sector,
    pub values: Vec<f64>,
}

/// Timestamp-indexed table with one named column per carrier group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WideSeries {
    pub timestamps: Vec<NaiveDateTime>,
    pub columns: Vec<WideColumn>,
}

impl WideSeries {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&WideColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn to_dataframe(&self) -> Result<DataFrame> {
        if self.is_empty() {
            return Ok(DataFrame::empty());
        }
        let mut columns = vec![datetime_column(TIMESTAMP, &self.timestamps)?];
        for column in &self.columns {
            columns.push(float_column(&column.name, column.values.clone()));
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Per-day mean of every column.
    pub fn daily_mean(&self) -> WideSeries {
        let mut days: Vec<NaiveDate> = Vec::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for (row, ts) in self.timestamps.iter().enumerate() {
            let day = ts.date();
            if days.last() != Some(&day) {
                days.push(day);
                groups.push(Vec::new());
            }
            if let Some(group) = groups.last_mut() {
                group.push(row);
            }
        }

        let columns = self
            .columns
            .iter()
            .map(|c| WideColumn {
                name: c.name.clone(),
                sector: c.sector,
                values: groups
                    .iter()
                    .map(|rows| rows.iter().map(|&r| c.values[r]).sum::<f64>() / rows.len() as f64)
                    .collect(),
            })
            .collect();

        WideSeries {
            timestamps: days.iter().filter_map(|d| d.and_hms_opt(0, 0, 0)).collect(),
            columns,
        }
    }
}

/// Round to `decimals` places, ties to even.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}
