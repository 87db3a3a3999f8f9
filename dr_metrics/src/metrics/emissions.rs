use crate::accessor::Metric;
use crate::carriers::Sector;
use crate::chart::{BarGroup, Chart, Panel};
use crate::error::Result;
use crate::extractor::{ExtractorContext, MetricExtractor};
use crate::frame::{float_column, string_column};
use crate::models::{Datapoint, MetricTable};
use crate::network::{ComponentKind, SeriesKind};
use log::{debug, info};
use polars::prelude::DataFrame;
use std::collections::BTreeMap;

pub const EMISSIONS: &str = "Emissions_CO2_MT";

#[derive(Debug, Clone, PartialEq)]
pub struct StoreEmissions {
    pub store: String,
    pub carrier: String,
    pub sector: Sector,
    /// Peak cumulative CO2 held by the store over the analysis year
    pub emissions: f64,
}

/// CO2 tracked by the emission stores of each sector.
#[derive(Debug, Clone)]
pub struct Emissions {
    stores: Vec<StoreEmissions>,
}

impl Emissions {
    pub fn new(ctx: &ExtractorContext<'_>) -> Result<Self> {
        let rows = ctx.year_rows();
        let components = ctx.network.components(ComponentKind::Store);
        let energy = ctx.network.series(SeriesKind::StoreE);

        let stores: Vec<StoreEmissions> = ctx
            .carriers
            .select(ComponentKind::Store, |entry| entry.is_emissions())
            .into_iter()
            .map(|i| {
                let entry = ctx.carriers.entry(ComponentKind::Store, i);
                let name = &components[i].name;
                let peak = rows
                    .iter()
                    .map(|&r| energy.value(name, r))
                    .filter(|v| !v.is_nan())
                    .fold(f64::NEG_INFINITY, f64::max);
                StoreEmissions {
                    store: name.clone(),
                    carrier: entry.name.clone(),
                    sector: entry.sector,
                    emissions: if peak.is_finite() { peak } else { 0.0 },
                }
            })
            .collect();

        if stores.is_empty() {
            info!("No CO2 stores in the network");
        }
        Ok(Self { stores })
    }

    pub fn stores(&self) -> &[StoreEmissions] {
        &self.stores
    }

    /// Emissions summed per sector, in sector order.
    pub fn by_sector(&self) -> Vec<(Sector, f64)> {
        let mut sectors: BTreeMap<Sector, f64> = BTreeMap::new();
        for store in &self.stores {
            *sectors.entry(store.sector).or_insert(0.0) += store.emissions;
        }
        sectors.into_iter().collect()
    }

    pub fn total(&self) -> f64 {
        self.stores.iter().map(|s| s.emissions).sum()
    }
}

impl MetricExtractor for Emissions {
    fn metric(&self) -> Metric {
        Metric::Emissions
    }

    fn extract_dataframe(&self) -> Result<DataFrame> {
        let df = DataFrame::new(vec![
            string_column("store", self.stores.iter().map(|s| s.store.clone()).collect()),
            string_column("carrier", self.stores.iter().map(|s| s.carrier.clone()).collect()),
            string_column("sector", self.stores.iter().map(|s| s.sector.to_string()).collect()),
            float_column(EMISSIONS, self.stores.iter().map(|s| s.emissions).collect()),
        ])?;
        Ok(df)
    }

    fn extract_datapoint(&self, as_table: bool) -> Result<Datapoint> {
        if !as_table {
            return Ok(Datapoint::Scalar(self.total()));
        }
        debug!("Returning datapoint emissions table");
        let table = self
            .by_sector()
            .into_iter()
            .fold(MetricTable::new(), |table, (sector, value)| table.number(sector.as_str(), value));
        Ok(Datapoint::Table(table.number("total", self.total())))
    }

    fn chart(&self) -> Result<Chart> {
        let by_sector = self.by_sector();
        let panel = Panel::bars(
            "Emissions",
            "(T)",
            by_sector.iter().map(|(s, _)| s.title().to_string()).collect(),
            vec![BarGroup {
                label: EMISSIONS.to_string(),
                values: by_sector.iter().map(|(_, v)| *v).collect(),
            }],
        );
        Ok(Chart::new("Emissions", vec![panel]))
    }
}
