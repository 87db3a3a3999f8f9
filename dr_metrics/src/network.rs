//! Read-only query surface over a solved network model.
//!
//! Extractors only ever see a `&dyn NetworkSource`; how the model got into
//! memory (CSV export, programmatic construction in tests) is not their
//! concern.

use crate::error::{MetricsError, Result};
use chrono::{Datelike, Duration, NaiveDateTime};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    Generator,
    Link,
    Store,
    Bus,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 4] = [
        ComponentKind::Generator,
        ComponentKind::Link,
        ComponentKind::Store,
        ComponentKind::Bus,
    ];

    /// File stem of the static table in a CSV export
    pub fn table_name(&self) -> &'static str {
        match self {
            ComponentKind::Generator => "generators",
            ComponentKind::Link => "links",
            ComponentKind::Store => "stores",
            ComponentKind::Bus => "buses",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesKind {
    GeneratorP,
    LinkP0,
    LinkP1,
    StoreE,
    BusMarginalPrice,
}

impl SeriesKind {
    pub const ALL: [SeriesKind; 5] = [
        SeriesKind::GeneratorP,
        SeriesKind::LinkP0,
        SeriesKind::LinkP1,
        SeriesKind::StoreE,
        SeriesKind::BusMarginalPrice,
    ];

    pub fn component(&self) -> ComponentKind {
        match self {
            SeriesKind::GeneratorP => ComponentKind::Generator,
            SeriesKind::LinkP0 | SeriesKind::LinkP1 => ComponentKind::Link,
            SeriesKind::StoreE => ComponentKind::Store,
            SeriesKind::BusMarginalPrice => ComponentKind::Bus,
        }
    }

    pub fn attribute(&self) -> &'static str {
        match self {
            SeriesKind::GeneratorP => "p",
            SeriesKind::LinkP0 => "p0",
            SeriesKind::LinkP1 => "p1",
            SeriesKind::StoreE => "e",
            SeriesKind::BusMarginalPrice => "marginal_price",
        }
    }

    /// File name of the time-series table in a CSV export, e.g. `links-p0.csv`
    pub fn file_name(&self) -> String {
        format!("{}-{}.csv", self.component().table_name(), self.attribute())
    }

    fn slot(&self) -> usize {
        match self {
            SeriesKind::GeneratorP => 0,
            SeriesKind::LinkP0 => 1,
            SeriesKind::LinkP1 => 2,
            SeriesKind::StoreE => 3,
            SeriesKind::BusMarginalPrice => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub period: i32,
    pub timestamp: NaiveDateTime,
    pub store_weight: f64,
    pub objective_weight: f64,
}

impl Snapshot {
    /// Snapshot of a single-period model; the period is the calendar year.
    pub fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            period: timestamp.year(),
            timestamp,
            store_weight: 1.0,
            objective_weight: 1.0,
        }
    }

    pub fn in_period(period: i32, timestamp: NaiveDateTime) -> Self {
        Self {
            period,
            ..Self::new(timestamp)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: String,
    pub carrier: String,
    /// `bus` for generators, stores and buses; `bus0` for links
    pub bus: String,
    pub bus1: Option<String>,
    pub p_nom: f64,
    pub p_nom_opt: f64,
    pub capital_cost: f64,
    pub marginal_cost: f64,
    pub marginal_cost_storage: f64,
}

impl Component {
    pub fn new(name: &str, carrier: &str, bus: &str) -> Self {
        Self {
            name: name.to_string(),
            carrier: carrier.to_string(),
            bus: bus.to_string(),
            bus1: None,
            p_nom: 0.0,
            p_nom_opt: 0.0,
            capital_cost: 0.0,
            marginal_cost: 0.0,
            marginal_cost_storage: 0.0,
        }
    }

    pub fn with_bus1(mut self, bus1: &str) -> Self {
        self.bus1 = Some(bus1.to_string());
        self
    }

    pub fn with_capacity(mut self, p_nom: f64, p_nom_opt: f64) -> Self {
        self.p_nom = p_nom;
        self.p_nom_opt = p_nom_opt;
        self
    }

    pub fn with_costs(mut self, capital_cost: f64, marginal_cost: f64) -> Self {
        self.capital_cost = capital_cost;
        self.marginal_cost = marginal_cost;
        self
    }

    pub fn with_storage_cost(mut self, marginal_cost_storage: f64) -> Self {
        self.marginal_cost_storage = marginal_cost_storage;
        self
    }
}

/// Column-major time series table aligned to the snapshot order.
///
/// Columns are component names. A column that is absent reads as zero,
/// matching how solved-model exports omit static-only attributes.
#[derive(Debug, Clone, Default)]
pub struct SeriesTable {
    n_rows: usize,
    columns: Vec<String>,
    index: HashMap<String, usize>,
    values: Vec<Vec<f64>>,
}

impl SeriesTable {
    pub fn new(n_rows: usize) -> Self {
        Self {
            n_rows,
            ..Default::default()
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Inserts or replaces a column.
    pub fn insert(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        if values.len() != self.n_rows {
            return Err(MetricsError::Config(format!(
                "series '{name}' has {} rows, expected {}",
                values.len(),
                self.n_rows
            )));
        }
        match self.index.get(name) {
            Some(&idx) => self.values[idx] = values,
            None => {
                self.index.insert(name.to_string(), self.columns.len());
                self.columns.push(name.to_string());
                self.values.push(values);
            }
        }
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.index.get(name).map(|&idx| self.values[idx].as_slice())
    }

    pub fn value(&self, name: &str, row: usize) -> f64 {
        self.column(name).map_or(0.0, |c| c[row])
    }

    /// Row-wise sum over the named columns; NaN cells are skipped.
    pub fn sum_columns<'a, I>(&self, names: I) -> Vec<f64>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut totals = vec![0.0; self.n_rows];
        for name in names {
            if let Some(column) = self.column(name) {
                for (total, v) in totals.iter_mut().zip(column) {
                    if !v.is_nan() {
                        *total += v;
                    }
                }
            }
        }
        totals
    }
}

pub trait NetworkSource: Sync {
    fn snapshots(&self) -> &[Snapshot];

    /// Investment periods of a multi-period model; empty for single-period models
    fn investment_periods(&self) -> &[i32];

    fn components(&self, kind: ComponentKind) -> &[Component];

    fn series(&self, kind: SeriesKind) -> &SeriesTable;

    fn objective(&self) -> f64;

    /// First investment period, or the period of the first snapshot.
    fn default_year(&self) -> Option<i32> {
        self.investment_periods()
            .first()
            .copied()
            .or_else(|| self.snapshots().first().map(|s| s.period))
    }

    /// Distinct periods present in the snapshots, ascending.
    fn periods(&self) -> Vec<i32> {
        self.snapshots()
            .iter()
            .map(|s| s.period)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Network {
    snapshots: Vec<Snapshot>,
    investment_periods: Vec<i32>,
    generators: Vec<Component>,
    links: Vec<Component>,
    stores: Vec<Component>,
    buses: Vec<Component>,
    series: [SeriesTable; 5],
    objective: f64,
}

impl Network {
    pub fn new(snapshots: Vec<Snapshot>, investment_periods: Vec<i32>) -> Self {
        let n = snapshots.len();
        Self {
            snapshots,
            investment_periods,
            generators: Vec::new(),
            links: Vec::new(),
            stores: Vec::new(),
            buses: Vec::new(),
            series: std::array::from_fn(|_| SeriesTable::new(n)),
            objective: 0.0,
        }
    }

    pub fn set_objective(&mut self, objective: f64) {
        self.objective = objective;
    }

    pub fn add_component(&mut self, kind: ComponentKind, component: Component) {
        match kind {
            ComponentKind::Generator => self.generators.push(component),
            ComponentKind::Link => self.links.push(component),
            ComponentKind::Store => self.stores.push(component),
            ComponentKind::Bus => self.buses.push(component),
        }
    }

    pub fn series_mut(&mut self, kind: SeriesKind) -> &mut SeriesTable {
        &mut self.series[kind.slot()]
    }
}

impl NetworkSource for Network {
    fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    fn investment_periods(&self) -> &[i32] {
        &self.investment_periods
    }

    fn components(&self, kind: ComponentKind) -> &[Component] {
        match kind {
            ComponentKind::Generator => &self.generators,
            ComponentKind::Link => &self.links,
            ComponentKind::Store => &self.stores,
            ComponentKind::Bus => &self.buses,
        }
    }

    fn series(&self, kind: SeriesKind) -> &SeriesTable {
        &self.series[kind.slot()]
    }

    fn objective(&self) -> f64 {
        self.objective
    }
}

/// Programmatic construction of a [`Network`].
///
/// Length mismatches are remembered and reported by [`NetworkBuilder::build`]
/// so calls can be chained.
pub struct NetworkBuilder {
    network: Network,
    error: Option<MetricsError>,
}

impl NetworkBuilder {
    pub fn new(snapshots: Vec<Snapshot>) -> Self {
        let mut periods: Vec<i32> = snapshots.iter().map(|s| s.period).collect();
        periods.dedup();
        let multi_period = periods.len() > 1
            || snapshots
                .iter()
                .any(|s| s.period != s.timestamp.year());
        let investment_periods = if multi_period {
            snapshots
                .iter()
                .map(|s| s.period)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        } else {
            Vec::new()
        };
        Self {
            network: Network::new(snapshots, investment_periods),
            error: None,
        }
    }

    /// Single-period model with `hours` hourly snapshots from `start`.
    pub fn hourly(start: NaiveDateTime, hours: usize) -> Self {
        let snapshots = (0..hours)
            .map(|h| Snapshot::new(start + Duration::hours(h as i64)))
            .collect();
        Self::new(snapshots)
    }

    pub fn investment_periods(mut self, periods: Vec<i32>) -> Self {
        self.network.investment_periods = periods;
        self
    }

    pub fn objective(mut self, objective: f64) -> Self {
        self.network.objective = objective;
        self
    }

    pub fn store_weights(mut self, weights: Vec<f64>) -> Self {
        if weights.len() != self.network.snapshots.len() {
            self.fail(format!(
                "{} store weights for {} snapshots",
                weights.len(),
                self.network.snapshots.len()
            ));
        } else {
            for (snapshot, w) in self.network.snapshots.iter_mut().zip(weights) {
                snapshot.store_weight = w;
            }
        }
        self
    }

    pub fn generator(mut self, component: Component, p: Option<Vec<f64>>) -> Self {
        self.add_series(SeriesKind::GeneratorP, &component.name, p);
        self.network.add_component(ComponentKind::Generator, component);
        self
    }

    pub fn link(mut self, component: Component, p0: Option<Vec<f64>>, p1: Option<Vec<f64>>) -> Self {
        self.add_series(SeriesKind::LinkP0, &component.name, p0);
        self.add_series(SeriesKind::LinkP1, &component.name, p1);
        self.network.add_component(ComponentKind::Link, component);
        self
    }

    pub fn store(mut self, component: Component, e: Option<Vec<f64>>) -> Self {
        self.add_series(SeriesKind::StoreE, &component.name, e);
        self.network.add_component(ComponentKind::Store, component);
        self
    }

    pub fn bus(mut self, component: Component, marginal_price: Option<Vec<f64>>) -> Self {
        self.add_series(SeriesKind::BusMarginalPrice, &component.name, marginal_price);
        self.network.add_component(ComponentKind::Bus, component);
        self
    }

    pub fn build(self) -> Result<Network> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.network),
        }
    }

    fn add_series(&mut self, kind: SeriesKind, name: &str, values: Option<Vec<f64>>) {
        if let Some(values) = values {
            if let Err(e) = self.network.series_mut(kind).insert(name, values) {
                self.error.get_or_insert(e);
            }
        }
    }

    fn fail(&mut self, message: String) {
        self.error.get_or_insert(MetricsError::Config(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_series_sum_skips_missing_and_nan() {
        let mut table = SeriesTable::new(3);
        table.insert("a", vec![1.0, 2.0, 3.0]).unwrap();
        table.insert("b", vec![f64::NAN, 1.0, 1.0]).unwrap();
        let sum = table.sum_columns(["a", "b", "missing"]);
        assert_eq!(sum, vec![1.0, 3.0, 4.0]);
        assert!(table.insert("c", vec![1.0]).is_err());
    }

    #[test]
    fn test_single_period_default_year() {
        let network = NetworkBuilder::hourly(start(), 48).build().unwrap();
        assert!(network.investment_periods().is_empty());
        assert_eq!(network.default_year(), Some(2019));
        assert_eq!(network.periods(), vec![2019]);
    }

    #[test]
    fn test_multi_period_snapshots() {
        let snapshots = vec![
            Snapshot::in_period(2030, start()),
            Snapshot::in_period(2030, start() + Duration::hours(1)),
            Snapshot::in_period(2040, start()),
        ];
        let network = NetworkBuilder::new(snapshots).build().unwrap();
        assert_eq!(network.investment_periods(), &[2030, 2040]);
        assert_eq!(network.default_year(), Some(2030));
    }

    #[test]
    fn test_builder_reports_length_mismatch() {
        let result = NetworkBuilder::hourly(start(), 4)
            .generator(Component::new("g", "solar", "b"), Some(vec![1.0; 3]))
            .build();
        assert!(matches!(result, Err(MetricsError::Config(_))));
    }
}
