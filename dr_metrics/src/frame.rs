//! Column builders for the DataFrames handed back to callers.

use crate::error::Result;
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;

/// Millisecond `Datetime` column without time zone.
pub fn datetime_column(name: &str, values: &[NaiveDateTime]) -> Result<Series> {
    let millis: Vec<i64> = values
        .iter()
        .map(|t| t.and_utc().timestamp_millis())
        .collect();
    let series = Series::new(name.into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
    Ok(series)
}

pub fn date_column(name: &str, values: &[NaiveDate]) -> Result<Series> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    let days: Vec<i32> = values
        .iter()
        .map(|d| (*d - epoch).num_days() as i32)
        .collect();
    let series = Series::new(name.into(), days).cast(&DataType::Date)?;
    Ok(series)
}

pub fn float_column(name: &str, values: Vec<f64>) -> Series {
    Series::new(name.into(), values)
}

pub fn string_column(name: &str, values: Vec<String>) -> Series {
    Series::new(name.into(), values)
}
