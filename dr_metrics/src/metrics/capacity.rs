use crate::accessor::Metric;
use crate::carriers::{CarrierEntry, Sector};
use crate::chart::{BarGroup, Chart, Panel};
use crate::error::Result;
use crate::extractor::{ExtractorContext, MetricExtractor};
use crate::frame::{float_column, string_column};
use crate::models::{round_to, Datapoint, MetricTable, SectorCapacity};
use crate::network::ComponentKind;
use log::debug;
use polars::prelude::DataFrame;
use std::collections::BTreeMap;

const SERVICE: &str = "service";

/// Sectors reported by the capacity datapoint, before the service roll-up.
const REPORTED: [Sector; 5] = [
    Sector::Power,
    Sector::Residential,
    Sector::Commercial,
    Sector::Transport,
    Sector::Industrial,
];

#[derive(Debug, Clone, PartialEq)]
pub struct CarrierCapacity {
    pub name: String,
    pub entry: CarrierEntry,
    pub p_nom: f64,
    pub p_nom_opt: f64,
}

/// Installed and optimised capacity of generators and links, by carrier.
#[derive(Debug, Clone)]
pub struct Capacity {
    carriers: Vec<CarrierCapacity>,
}

impl Capacity {
    pub fn new(ctx: &ExtractorContext<'_>) -> Result<Self> {
        let mut grouped: BTreeMap<String, CarrierCapacity> = BTreeMap::new();
        for kind in [ComponentKind::Generator, ComponentKind::Link] {
            for (i, component) in ctx.network.components(kind).iter().enumerate() {
                let entry = ctx.carriers.entry(kind, i);
                let row = grouped.entry(entry.name.clone()).or_insert_with(|| CarrierCapacity {
                    name: entry.name.clone(),
                    entry: entry.clone(),
                    p_nom: 0.0,
                    p_nom_opt: 0.0,
                });
                row.p_nom += component.p_nom;
                row.p_nom_opt += component.p_nom_opt;
            }
        }

        // demand response links carry unbounded capacity
        let carriers: Vec<CarrierCapacity> = grouped
            .into_values()
            .filter(|c| c.p_nom.is_finite() && c.p_nom_opt.is_finite())
            .collect();
        Ok(Self { carriers })
    }

    /// Carrier rows sorted by display name.
    pub fn carriers(&self) -> &[CarrierCapacity] {
        &self.carriers
    }

    fn in_sector(&self, sector: Sector) -> impl Iterator<Item = &CarrierCapacity> {
        self.carriers
            .iter()
            .filter(move |c| c.entry.in_capacity_rollup(sector))
    }

    pub fn sector_capacity(&self, sector: Sector) -> SectorCapacity {
        let (p_nom, p_nom_opt) = self
            .in_sector(sector)
            .fold((0.0, 0.0), |(a, b), c| (a + c.p_nom, b + c.p_nom_opt));
        SectorCapacity {
            sector: sector.as_str().to_string(),
            p_nom: round_to(p_nom, 1),
            p_nom_opt: round_to(p_nom_opt, 1),
        }
    }

    /// Reported sectors followed by the service (residential plus
    /// commercial) roll-up.
    pub fn sectors(&self) -> Vec<SectorCapacity> {
        let mut sectors: Vec<SectorCapacity> = REPORTED.iter().map(|s| self.sector_capacity(*s)).collect();
        let residential = self.sector_capacity(Sector::Residential);
        let commercial = self.sector_capacity(Sector::Commercial);
        sectors.push(SectorCapacity {
            sector: SERVICE.to_string(),
            p_nom: round_to(residential.p_nom + commercial.p_nom, 1),
            p_nom_opt: round_to(residential.p_nom_opt + commercial.p_nom_opt, 1),
        });
        sectors
    }
}

impl MetricExtractor for Capacity {
    fn metric(&self) -> Metric {
        Metric::Capacity
    }

    fn extract_dataframe(&self) -> Result<DataFrame> {
        let df = DataFrame::new(vec![
            string_column("carrier", self.carriers.iter().map(|c| c.name.clone()).collect()),
            string_column(
                "sector",
                self.carriers.iter().map(|c| c.entry.sector.to_string()).collect(),
            ),
            float_column("p_nom", self.carriers.iter().map(|c| c.p_nom).collect()),
            float_column("p_nom_opt", self.carriers.iter().map(|c| c.p_nom_opt).collect()),
        ])?;
        Ok(df)
    }

    fn extract_datapoint(&self, as_table: bool) -> Result<Datapoint> {
        let sectors = self.sectors();
        if as_table {
            debug!("Returning datapoint capacity table");
            let mut table = MetricTable::new();
            for s in &sectors {
                table = table
                    .number(format!("{}_p_nom", s.sector), s.p_nom)
                    .number(format!("{}_p_nom_opt", s.sector), s.p_nom_opt);
            }
            return Ok(Datapoint::Table(table));
        }
        Ok(Datapoint::Sectors(sectors))
    }

    fn chart(&self) -> Result<Chart> {
        let panel_sectors = [
            Sector::Power,
            Sector::Residential,
            Sector::Commercial,
            Sector::Industrial,
            Sector::Transport,
        ];
        let panels = panel_sectors
            .iter()
            .map(|&sector| {
                let rows: Vec<&CarrierCapacity> = self.in_sector(sector).collect();
                let prefix = format!("{} ", sector.title());
                Panel::bars(
                    &format!("{} (MW)", sector.title()),
                    "MW",
                    rows.iter()
                        .map(|c| c.name.strip_prefix(&prefix).unwrap_or(&c.name).to_string())
                        .collect(),
                    vec![
                        BarGroup {
                            label: "p_nom".to_string(),
                            values: rows.iter().map(|c| c.p_nom).collect(),
                        },
                        BarGroup {
                            label: "p_nom_opt".to_string(),
                            values: rows.iter().map(|c| c.p_nom_opt).collect(),
                        },
                    ],
                )
            })
            .collect();
        Ok(Chart::new("Capacity", panels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carriers::{CarrierMap, ResolvedCarriers};
    use crate::config::AnalysisConfig;
    use crate::extractor::testing::*;
    use crate::network::{Component, NetworkBuilder};

    fn extractor() -> Capacity {
        let network = NetworkBuilder::hourly(jan1(2019), 4)
            .generator(Component::new("a solar", "solar", "a").with_capacity(10.0, 12.5), None)
            .generator(Component::new("b solar", "solar", "b").with_capacity(5.0, 5.0), None)
            .generator(Component::new("a CCGT", "CCGT", "a").with_capacity(100.0, 80.04), None)
            .link(Component::new("a res-heat-pump", "res-heat-pump", "a").with_capacity(3.0, 4.0), None, None)
            .link(Component::new("a com-air-con", "com-air-con", "a").with_capacity(2.0, 2.0), None, None)
            .link(Component::new("a trn-elec-veh", "trn-elec-veh", "a").with_capacity(7.0, 9.0), None, None)
            .link(Component::new("a res-elec", "res-elec", "a").with_capacity(50.0, 50.0), None, None)
            .link(
                Component::new("a res-elec-dr", "res-elec-dr", "a").with_capacity(f64::INFINITY, f64::INFINITY),
                None,
                None,
            )
            .build()
            .unwrap();
        let carriers = ResolvedCarriers::resolve(&network, &CarrierMap::default()).unwrap();
        let config = AnalysisConfig::default();
        let ctx = ExtractorContext::new(&network, &carriers, 2019, &config);
        Capacity::new(&ctx).unwrap()
    }

    #[test]
    fn test_grouped_by_display_name_without_unbounded_rows() {
        let metric = extractor();
        let names: Vec<&str> = metric.carriers().iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"Solar"));
        assert!(!names.contains(&"Residential Electricity DR"));
        let solar = metric.carriers().iter().find(|c| c.name == "Solar").unwrap();
        assert_eq!(solar.p_nom, 15.0);
        assert_eq!(solar.p_nom_opt, 17.5);
        assert_eq!(metric.extract_dataframe().unwrap().height(), names.len());
    }

    #[test]
    fn test_sector_rollups() {
        let metric = extractor();
        let sectors = metric.sectors();
        let get = |name: &str| sectors.iter().find(|s| s.sector == name).unwrap().clone();

        assert_eq!(get("power").p_nom, 115.0);
        assert_eq!(get("power").p_nom_opt, 97.5);
        // delivery links stay out of the residential roll-up
        assert_eq!(get("residential").p_nom, 3.0);
        assert_eq!(get("commercial").p_nom_opt, 2.0);
        assert_eq!(get("transport").p_nom_opt, 9.0);
        assert_eq!(get("industrial").p_nom, 0.0);
        assert_eq!(get("service").p_nom, 5.0);
        assert_eq!(get("service").p_nom_opt, 6.0);
    }

    #[test]
    fn test_datapoint_table_names() {
        let metric = extractor();
        let table = metric.extract_datapoint(true).unwrap();
        let table = table.as_table().unwrap();
        assert_eq!(table.len(), 12);
        assert_eq!(table.rows[0].metric, "power_p_nom");
        assert_eq!(table.get("service_p_nom_opt").and_then(|v| v.as_f64()), Some(6.0));
    }

    #[test]
    fn test_chart_panel_per_sector() {
        let chart = extractor().chart().unwrap();
        assert_eq!(chart.panels.len(), 5);
        match &chart.panels[1].body {
            crate::chart::PanelBody::Bars { categories, .. } => {
                assert_eq!(categories, &vec!["Heat Pump".to_string()])
            }
            other => panic!("unexpected panel {other:?}"),
        }
    }
}
