//! Loads a solved network exported as a folder of CSV tables.

use crate::error::{MetricsError, Result};
use crate::network::{Component, ComponentKind, Network, NetworkSource, SeriesKind, Snapshot};
use chrono::{DateTime, Datelike, NaiveDateTime};
use log::{debug, info, warn};
use polars::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const SNAPSHOTS: &str = "snapshots.csv";
const INVESTMENT_PERIODS: &str = "investment_periods.csv";
const NETWORK: &str = "network.csv";

/// Candidate names of the timestamp column, in preference order.
const TIME_COLUMNS: [&str; 3] = ["timestep", "snapshot", "name"];
const PERIOD: &str = "period";

/// Reads one exported table. Every row is scanned for type inference and
/// date-like columns are parsed on read.
pub fn read_table(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_parse_options(CsvParseOptions::default().with_try_parse_dates(true))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// An exported table plus the path its errors are reported against.
struct Table {
    path: PathBuf,
    df: DataFrame,
}

impl Table {
    fn read(path: &Path) -> Result<Option<Table>> {
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(Table {
            path: path.to_path_buf(),
            df: read_table(path)?,
        }))
    }

    fn height(&self) -> usize {
        self.df.height()
    }

    fn column(&self, name: &str) -> Option<&Series> {
        self.df.column(name).ok()
    }

    /// The timestamp column, falling back to the first column.
    fn time_column(&self) -> Option<&Series> {
        TIME_COLUMNS
            .iter()
            .find_map(|n| self.column(n))
            .or_else(|| self.df.get_columns().first())
    }

    /// Error at a zero-based data row; line 1 is the header.
    fn parse_error(&self, row: usize, message: String) -> MetricsError {
        MetricsError::Parse {
            path: self.path.clone(),
            line: row + 2,
            message,
        }
    }

    /// First row where `cast` lost a value present in `raw`.
    fn check_cast(&self, raw: &Series, cast: &Series, expected: &str) -> Result<()> {
        let text = raw.cast(&DataType::String)?;
        let lost = text
            .str()?
            .into_iter()
            .zip(cast.is_null().into_iter())
            .enumerate()
            .find_map(|(row, (value, is_null))| match (value, is_null) {
                (Some(value), Some(true)) if !value.trim().is_empty() => Some((row, value.to_string())),
                _ => None,
            });
        match lost {
            Some((row, value)) => Err(self.parse_error(row, format!("'{value}' in column '{}' is not {expected}", raw.name()))),
            None => Ok(()),
        }
    }

    /// Float column; empty cells read as `missing`.
    fn floats(&self, series: &Series, missing: f64) -> Result<Vec<f64>> {
        let cast = series.cast(&DataType::Float64)?;
        self.check_cast(series, &cast, "a number")?;
        let values = cast.f64()?.into_iter().map(|v| v.unwrap_or(missing)).collect();
        Ok(values)
    }

    fn integers(&self, series: &Series) -> Result<Vec<i32>> {
        let cast = series.cast(&DataType::Int32)?;
        self.check_cast(series, &cast, "a period")?;
        let values = cast.i32()?;
        values
            .into_iter()
            .enumerate()
            .map(|(row, v)| v.ok_or_else(|| self.parse_error(row, format!("missing value in column '{}'", series.name()))))
            .collect()
    }

    /// Timestamps parsed through a millisecond `Datetime` cast; dates read as
    /// midnight.
    fn timestamps(&self, series: &Series) -> Result<Vec<NaiveDateTime>> {
        let cast = series.cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
        self.check_cast(series, &cast, "a timestamp")?;
        let as_int = cast.cast(&DataType::Int64)?;
        let values = as_int.i64()?;
        values
            .into_iter()
            .enumerate()
            .map(|(row, millis)| {
                millis
                    .and_then(DateTime::from_timestamp_millis)
                    .map(|t| t.naive_utc())
                    .ok_or_else(|| self.parse_error(row, format!("missing timestamp in column '{}'", series.name())))
            })
            .collect()
    }

    fn text(&self, series: Option<&Series>) -> Result<Vec<String>> {
        let Some(series) = series else {
            return Ok(vec![String::new(); self.height()]);
        };
        let text = series.cast(&DataType::String)?;
        let values = text
            .str()?
            .into_iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect();
        Ok(values)
    }
}

/// Reads networks exported as CSV folders.
///
/// `snapshots.csv` is required. Static tables, time series and
/// `network.csv` are optional; whatever is missing reads as empty or zero.
pub struct NetworkLoader {
    dir: PathBuf,
}

impl NetworkLoader {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn load(dir: &Path) -> Result<Network> {
        Self::new(dir).read()
    }

    /// Whether `dir` looks like an exported network.
    pub fn is_network_dir(dir: &Path) -> bool {
        dir.join(SNAPSHOTS).is_file()
    }

    pub fn read(&self) -> Result<Network> {
        let snapshots = self.read_snapshots()?;
        let periods = self.read_investment_periods()?;
        let mut network = Network::new(snapshots, periods);
        network.set_objective(self.read_objective()?);

        for kind in ComponentKind::ALL {
            for component in self.read_components(kind)? {
                network.add_component(kind, component);
            }
        }

        for kind in SeriesKind::ALL {
            self.read_series(&mut network, kind)?;
        }

        info!(
            "Loaded network from {} ({} snapshots, {} generators, {} links, {} stores, {} buses)",
            self.dir.display(),
            network.snapshots().len(),
            network.components(ComponentKind::Generator).len(),
            network.components(ComponentKind::Link).len(),
            network.components(ComponentKind::Store).len(),
            network.components(ComponentKind::Bus).len(),
        );
        Ok(network)
    }

    fn required(&self, file: &str) -> Result<Table> {
        let path = self.dir.join(file);
        Table::read(&path)?.ok_or(MetricsError::MissingTable { path })
    }

    fn optional(&self, file: &str) -> Result<Option<Table>> {
        let table = Table::read(&self.dir.join(file))?;
        if table.is_none() {
            debug!("{} has no {file}", self.dir.display());
        }
        Ok(table)
    }

    fn read_snapshots(&self) -> Result<Vec<Snapshot>> {
        let table = self.required(SNAPSHOTS)?;
        let Some(time) = table.time_column() else {
            return Err(table.parse_error(0, "no timestamp column".to_string()));
        };
        let timestamps = table.timestamps(time)?;
        let periods = match table.column(PERIOD) {
            Some(c) => table.integers(c)?,
            None => timestamps.iter().map(|t| t.year()).collect(),
        };
        let weights = |name: &str| -> Result<Vec<f64>> {
            match table.column(name) {
                Some(c) => table.floats(c, 1.0),
                None => Ok(vec![1.0; table.height()]),
            }
        };
        let store_weights = weights("stores")?;
        let objective_weights = weights("objective")?;

        Ok(timestamps
            .into_iter()
            .enumerate()
            .map(|(row, timestamp)| Snapshot {
                period: periods[row],
                timestamp,
                store_weight: store_weights[row],
                objective_weight: objective_weights[row],
            })
            .collect())
    }

    fn read_investment_periods(&self) -> Result<Vec<i32>> {
        let Some(table) = self.optional(INVESTMENT_PERIODS)? else {
            return Ok(Vec::new());
        };
        match table.column(PERIOD).or_else(|| table.df.get_columns().first()) {
            Some(c) => table.integers(c),
            None => Ok(Vec::new()),
        }
    }

    fn read_objective(&self) -> Result<f64> {
        let Some(table) = self.optional(NETWORK)? else {
            return Ok(0.0);
        };
        match table.column("objective") {
            Some(c) => Ok(table.floats(c, 0.0)?.first().copied().unwrap_or(0.0)),
            None => Ok(0.0),
        }
    }

    fn read_components(&self, kind: ComponentKind) -> Result<Vec<Component>> {
        let Some(table) = self.optional(&format!("{}.csv", kind.table_name()))? else {
            return Ok(Vec::new());
        };
        let names = table.text(table.column("name").or_else(|| table.df.get_columns().first()))?;
        let carriers = table.text(table.column("carrier"))?;
        let buses = table.text(table.column("bus").or_else(|| table.column("bus0")))?;
        let bus1 = match table.column("bus1") {
            Some(c) => Some(table.text(Some(c))?),
            None => None,
        };
        let number = |name: &str| -> Result<Vec<f64>> {
            match table.column(name) {
                Some(c) => table.floats(c, 0.0),
                None => Ok(vec![0.0; table.height()]),
            }
        };
        let p_nom = number("p_nom")?;
        let p_nom_opt = number("p_nom_opt")?;
        let capital_cost = number("capital_cost")?;
        let marginal_cost = number("marginal_cost")?;
        let marginal_cost_storage = number("marginal_cost_storage")?;

        Ok((0..table.height())
            .map(|row| {
                let component = Component::new(&names[row], &carriers[row], &buses[row])
                    .with_capacity(p_nom[row], p_nom_opt[row])
                    .with_costs(capital_cost[row], marginal_cost[row])
                    .with_storage_cost(marginal_cost_storage[row]);
                match &bus1 {
                    Some(bus1) => component.with_bus1(&bus1[row]),
                    None => component,
                }
            })
            .collect())
    }

    fn read_series(&self, network: &mut Network, kind: SeriesKind) -> Result<()> {
        let Some(table) = self.optional(&kind.file_name())? else {
            return Ok(());
        };
        let Some(time) = table.time_column() else {
            return Ok(());
        };
        let time_name = time.name().to_string();
        let timestamps = table.timestamps(time)?;
        let periods = match table.column(PERIOD) {
            Some(c) => Some(table.integers(c)?),
            None => None,
        };

        let positions: HashMap<(i32, NaiveDateTime), usize> = network
            .snapshots()
            .iter()
            .enumerate()
            .map(|(i, s)| ((s.period, s.timestamp), i))
            .collect();
        let by_time: HashMap<NaiveDateTime, usize> = network
            .snapshots()
            .iter()
            .enumerate()
            .rev()
            .map(|(i, s)| (s.timestamp, i))
            .collect();
        let rows: Vec<Option<usize>> = timestamps
            .iter()
            .enumerate()
            .map(|(row, t)| match &periods {
                Some(periods) => positions.get(&(periods[row], *t)).copied(),
                None => by_time.get(t).copied(),
            })
            .collect();
        let unmatched = rows.iter().filter(|r| r.is_none()).count();
        if unmatched > 0 {
            warn!("{}: {unmatched} rows match no snapshot", table.path.display());
        }

        let known: Vec<&str> = network
            .components(kind.component())
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        let n_rows = network.snapshots().len();
        let mut columns: Vec<(String, Vec<f64>)> = Vec::new();
        for series in table.df.get_columns() {
            let name = series.name().as_str();
            if name == time_name || name == PERIOD {
                continue;
            }
            if !known.contains(&name) {
                warn!("{}: column '{name}' names no {}", table.path.display(), kind.component().table_name());
                continue;
            }
            let mut aligned = vec![0.0; n_rows];
            for (row, value) in table.floats(series, f64::NAN)?.into_iter().enumerate() {
                if let Some(position) = rows[row] {
                    aligned[position] = value;
                }
            }
            columns.push((name.to_string(), aligned));
        }

        let target = network.series_mut(kind);
        for (name, values) in columns {
            target.insert(&name, values)?;
        }
        Ok(())
    }
}
