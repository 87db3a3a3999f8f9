use super::sector_panels;
use crate::accessor::Metric;
use crate::carriers::Sector;
use crate::chart::Chart;
use crate::error::Result;
use crate::extractor::{Aggregate, ExtractorContext, MetricExtractor};
use crate::models::{round_to, CostSummary, Datapoint, MetricTable, WideSeries};
use crate::network::{ComponentKind, NetworkSource, SeriesKind};
use log::debug;
use polars::prelude::DataFrame;

/// Sector marginal prices and the split of the system objective.
#[derive(Debug, Clone)]
pub struct Cost {
    prices: WideSeries,
    summary: CostSummary,
}

impl Cost {
    pub fn new(ctx: &ExtractorContext<'_>) -> Result<Self> {
        let prices = sector_prices(ctx);
        let marginal_costs = prices
            .columns
            .iter()
            .map(|c| {
                let mean = if c.values.is_empty() {
                    0.0
                } else {
                    c.values.iter().sum::<f64>() / c.values.len() as f64
                };
                (c.name.clone(), mean)
            })
            .collect();

        let objective = ctx.network.objective();
        let dr_cost = demand_response_cost(ctx);
        let summary = CostSummary {
            objective,
            objective_adj: objective - dr_cost,
            dr_cost,
            marginal_costs,
            capex: capital_expenditure(ctx.network),
            opex: operational_expenditure(ctx.network),
        };
        Ok(Self { prices, summary })
    }

    pub fn summary(&self) -> &CostSummary {
        &self.summary
    }
}

/// Bus marginal prices of every end-use sector, averaged per carrier.
fn sector_prices(ctx: &ExtractorContext<'_>) -> WideSeries {
    let mut prices = WideSeries {
        timestamps: ctx.year_timestamps(),
        columns: Vec::new(),
    };
    for sector in Sector::END_USE {
        let buses = ctx
            .carriers
            .select(ComponentKind::Bus, |entry| entry.in_price_slice(sector));
        let slice = ctx.grouped_series(
            ComponentKind::Bus,
            SeriesKind::BusMarginalPrice,
            &buses,
            Aggregate::Mean,
            false,
        );
        prices.columns.extend(slice.columns);
    }
    prices
}

/// Storage cost incurred by demand response stores over the whole horizon.
fn demand_response_cost(ctx: &ExtractorContext<'_>) -> f64 {
    let stores = ctx.network.components(ComponentKind::Store);
    let energy = ctx.network.series(SeriesKind::StoreE);
    let snapshots = ctx.network.snapshots();
    ctx.carriers
        .select(ComponentKind::Store, |entry| entry.is_demand_response())
        .into_iter()
        .map(|i| {
            let store = &stores[i];
            snapshots
                .iter()
                .enumerate()
                .map(|(row, s)| energy.value(&store.name, row) * store.marginal_cost_storage * s.store_weight)
                .sum::<f64>()
        })
        .sum()
}

/// Annualised capital cost of the optimised generator and link fleet.
pub fn capital_expenditure(network: &dyn NetworkSource) -> f64 {
    let total: f64 = [ComponentKind::Generator, ComponentKind::Link]
        .iter()
        .flat_map(|&kind| network.components(kind))
        .map(|c| c.capital_cost * c.p_nom_opt)
        .filter(|v| v.is_finite())
        .sum();
    round_to(total, 6)
}

/// Weighted dispatch cost of generators (`p`) and links (`p0`).
pub fn operational_expenditure(network: &dyn NetworkSource) -> f64 {
    let snapshots = network.snapshots();
    let mut total = 0.0;
    for (kind, series) in [
        (ComponentKind::Generator, SeriesKind::GeneratorP),
        (ComponentKind::Link, SeriesKind::LinkP0),
    ] {
        let dispatch = network.series(series);
        for component in network.components(kind) {
            if component.marginal_cost == 0.0 {
                continue;
            }
            let Some(values) = dispatch.column(&component.name) else {
                continue;
            };
            total += snapshots
                .iter()
                .zip(values)
                .filter(|(_, v)| !v.is_nan())
                .map(|(s, v)| s.objective_weight * component.marginal_cost * v)
                .sum::<f64>();
        }
    }
    round_to(total, 6)
}

impl MetricExtractor for Cost {
    fn metric(&self) -> Metric {
        Metric::Cost
    }

    fn extract_dataframe(&self) -> Result<DataFrame> {
        self.prices.to_dataframe()
    }

    fn extract_datapoint(&self, as_table: bool) -> Result<Datapoint> {
        if !as_table {
            return Ok(Datapoint::Cost(self.summary.clone()));
        }
        debug!("Returning datapoint cost table");
        let s = &self.summary;
        let mut table = MetricTable::new()
            .number("objective", s.objective)
            .number("objective_adj", s.objective_adj);
        for (name, value) in &s.marginal_costs {
            table = table.number(name.as_str(), *value);
        }
        Ok(Datapoint::Table(table.number("capex", s.capex).number("opex", s.opex)))
    }

    fn chart(&self) -> Result<Chart> {
        let panels = sector_panels(&self.prices, &Sector::END_USE, "($/MWh)", true);
        Ok(Chart::new("Marginal Cost", panels))
    }
}
