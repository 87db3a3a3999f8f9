use super::sector_panels;
use crate::accessor::Metric;
use crate::carriers::Sector;
use crate::chart::Chart;
use crate::error::Result;
use crate::extractor::{Aggregate, ExtractorContext, MetricExtractor};
use crate::models::{Datapoint, MetricTable, WideSeries};
use crate::network::{ComponentKind, SeriesKind};
use log::{debug, info};
use polars::prelude::DataFrame;

/// Absolute energy held by demand response stores, by carrier.
#[derive(Debug, Clone)]
pub struct DemandResponse {
    stored: WideSeries,
}

impl DemandResponse {
    pub fn new(ctx: &ExtractorContext<'_>) -> Result<Self> {
        let stores = ctx
            .carriers
            .select(ComponentKind::Store, |entry| entry.is_demand_response());
        if stores.is_empty() {
            info!("No demand response stores in the network");
        }
        let stored = ctx.grouped_series(
            ComponentKind::Store,
            SeriesKind::StoreE,
            &stores,
            Aggregate::Sum,
            true,
        );
        Ok(Self { stored })
    }

    pub fn is_empty(&self) -> bool {
        self.stored.is_empty()
    }

    /// Stored energy summed over the analysis year, per carrier.
    pub fn totals(&self) -> Vec<(String, f64)> {
        self.stored
            .columns
            .iter()
            .map(|c| (c.name.clone(), c.values.iter().sum()))
            .collect()
    }
}

impl MetricExtractor for DemandResponse {
    fn metric(&self) -> Metric {
        Metric::DemandResponse
    }

    fn extract_dataframe(&self) -> Result<DataFrame> {
        self.stored.to_dataframe()
    }

    fn extract_datapoint(&self, as_table: bool) -> Result<Datapoint> {
        if self.is_empty() {
            info!("No demand response data");
        }
        let totals = self.totals();
        if as_table {
            debug!("Returning datapoint demand response table");
            let table = totals
                .into_iter()
                .fold(MetricTable::new(), |table, (name, total)| table.number(name, total));
            return Ok(Datapoint::Table(table));
        }
        Ok(Datapoint::Totals(totals))
    }

    fn chart(&self) -> Result<Chart> {
        if self.is_empty() {
            return Ok(Chart::empty("Demand Response"));
        }
        let panels = sector_panels(&self.stored, &Sector::END_USE, "MWh", false);
        Ok(Chart::new("Demand Response", panels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carriers::{CarrierMap, ResolvedCarriers};
    use crate::config::AnalysisConfig;
    use crate::extractor::testing::*;
    use crate::network::{Component, Network, NetworkBuilder};

    fn extractor(network: &Network) -> DemandResponse {
        let carriers = ResolvedCarriers::resolve(network, &CarrierMap::default()).unwrap();
        let config = AnalysisConfig::default();
        let ctx = ExtractorContext::new(network, &carriers, 2019, &config);
        DemandResponse::new(&ctx).unwrap()
    }

    #[test]
    fn test_no_dr_stores_is_empty_not_error() {
        let network = NetworkBuilder::hourly(jan1(2019), 24)
            .store(Component::new("p1 battery", "battery", "p1"), Some(vec![3.0; 24]))
            .build()
            .unwrap();
        let metric = extractor(&network);
        assert!(metric.is_empty());

        let df = metric.extract_dataframe().unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 0);

        let table = metric.extract_datapoint(true).unwrap();
        assert!(table.as_table().unwrap().is_empty());
        assert!(metric.chart().unwrap().is_empty());
    }

    #[test]
    fn test_totals_by_carrier() {
        let network = NetworkBuilder::hourly(jan1(2019), 3)
            .store(Component::new("p1 res-elec-dr", "res-elec-dr", "p1"), Some(vec![-1.0, 2.0, -3.0]))
            .store(Component::new("p2 res-elec-dr", "res-elec-dr", "p2"), Some(vec![1.0, 1.0, 1.0]))
            .store(Component::new("p1 com-heat-dr", "com-heat-dr", "p1"), Some(vec![0.5, 0.5, 0.0]))
            .build()
            .unwrap();
        let metric = extractor(&network);
        assert_eq!(
            metric.totals(),
            vec![
                ("Residential Electricity DR".to_string(), 9.0),
                ("Commercial Heating DR".to_string(), 1.0)
            ]
        );
        assert_eq!(metric.extract_dataframe().unwrap().shape(), (3, 3));
        assert_eq!(metric.chart().unwrap().panels.len(), 2);
    }
}
