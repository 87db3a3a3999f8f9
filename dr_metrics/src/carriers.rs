//! Carrier vocabulary: display names and sector classification.
//!
//! Every carrier a network uses is resolved against a [`CarrierMap`] once,
//! when a [`ResolvedCarriers`] is built. Extractors then filter components by
//! classification instead of by carrier-name patterns.

use crate::error::{MetricsError, Result};
use crate::network::{ComponentKind, NetworkSource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Power,
    Residential,
    Commercial,
    Industrial,
    Transport,
    System,
}

impl Sector {
    pub const END_USE: [Sector; 4] = [
        Sector::Residential,
        Sector::Commercial,
        Sector::Industrial,
        Sector::Transport,
    ];

    pub fn is_end_use(&self) -> bool {
        Self::END_USE.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::Power => "power",
            Sector::Residential => "residential",
            Sector::Commercial => "commercial",
            Sector::Industrial => "industrial",
            Sector::Transport => "transport",
            Sector::System => "system",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Sector::Power => "Power",
            Sector::Residential => "Residential",
            Sector::Commercial => "Commercial",
            Sector::Industrial => "Industrial",
            Sector::Transport => "Transport",
            Sector::System => "System",
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Renewable {
    Solar,
    Wind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarrierClass {
    Generation { renewable: Option<Renewable> },
    /// Electricity delivered into an end-use sector; `total` marks aggregates
    Delivery { total: bool },
    SpaceConditioning,
    WaterHeating,
    Vehicle { electric: bool },
    Process,
    DemandResponse,
    Emissions,
    Infrastructure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierEntry {
    pub id: String,
    pub name: String,
    pub sector: Sector,
    pub class: CarrierClass,
}

impl CarrierEntry {
    pub fn new(id: &str, name: &str, sector: Sector, class: CarrierClass) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            sector,
            class,
        }
    }

    /// Carriers whose links mark the buses that electrical load is drawn from
    pub fn is_elec_load_marker(&self) -> bool {
        matches!(
            self.class,
            CarrierClass::Delivery { total: false } | CarrierClass::Vehicle { electric: true }
        )
    }

    pub fn renewable(&self) -> Option<Renewable> {
        match self.class {
            CarrierClass::Generation { renewable } => renewable,
            _ => None,
        }
    }

    pub fn is_demand_response(&self) -> bool {
        self.class == CarrierClass::DemandResponse
    }

    pub fn is_emissions(&self) -> bool {
        self.class == CarrierClass::Emissions
    }

    /// Whether the carrier counts toward a sector's installed-capacity roll-up.
    pub fn in_capacity_rollup(&self, sector: Sector) -> bool {
        match sector {
            Sector::Power => matches!(self.class, CarrierClass::Generation { .. }),
            Sector::Transport => matches!(self.class, CarrierClass::Vehicle { .. }),
            Sector::System => false,
            _ => {
                self.sector == sector
                    && !matches!(
                        self.class,
                        CarrierClass::Delivery { .. }
                            | CarrierClass::DemandResponse
                            | CarrierClass::Emissions
                    )
            }
        }
    }

    /// Whether a bus with this carrier contributes a sector price column.
    pub fn in_price_slice(&self, sector: Sector) -> bool {
        if self.sector != sector || self.is_demand_response() {
            return false;
        }
        match sector {
            Sector::Residential | Sector::Commercial => self.class != CarrierClass::WaterHeating,
            Sector::Transport => matches!(self.class, CarrierClass::Vehicle { .. }),
            _ => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CarrierMap {
    entries: Vec<CarrierEntry>,
    index: HashMap<String, usize>,
}

impl CarrierMap {
    pub fn new(entries: Vec<CarrierEntry>) -> Self {
        let mut map = Self {
            entries: Vec::with_capacity(entries.len()),
            index: HashMap::new(),
        };
        map.extend(entries);
        map
    }

    /// Loads a JSON array of entries on top of the default vocabulary.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let entries: Vec<CarrierEntry> = serde_json::from_str(&text)?;
        let mut map = Self::default();
        map.extend(entries);
        Ok(map)
    }

    /// Adds entries, replacing any existing entry with the same id.
    pub fn extend<I: IntoIterator<Item = CarrierEntry>>(&mut self, entries: I) {
        for entry in entries {
            match self.index.get(&entry.id) {
                Some(&idx) => self.entries[idx] = entry,
                None => {
                    self.index.insert(entry.id.clone(), self.entries.len());
                    self.entries.push(entry);
                }
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&CarrierEntry> {
        self.index.get(id).map(|&idx| &self.entries[idx])
    }

    pub fn entries(&self) -> &[CarrierEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CarrierMap {
    fn default() -> Self {
        use CarrierClass::*;
        use Sector::*;

        let generation = |renewable| Generation { renewable };
        let rows: Vec<(&str, &str, Sector, CarrierClass)> = vec![
            // power
            ("biomass", "Biomass", Power, generation(None)),
            ("CCGT", "CCGT", Power, generation(None)),
            ("CCGT-95CCS", "CCGT 95% CCS", Power, generation(None)),
            ("coal", "Coal", Power, generation(None)),
            ("geothermal", "Geothermal", Power, generation(None)),
            ("hydro", "Hydro", Power, generation(None)),
            ("nuclear", "Nuclear", Power, generation(None)),
            ("offwind_floating", "Offshore Wind (Floating)", Power, generation(Some(Renewable::Wind))),
            ("OCGT", "OCGT", Power, generation(None)),
            ("onwind", "Onshore Wind", Power, generation(Some(Renewable::Wind))),
            ("solar", "Solar", Power, generation(Some(Renewable::Solar))),
            ("waste", "Waste", Power, generation(None)),
            ("oil", "Oil", Power, generation(None)),
            ("pwr-co2", "Power CO2", Power, Emissions),
            // system
            ("AC", "AC", System, Infrastructure),
            ("DC", "DC", System, Infrastructure),
            ("battery", "Battery", System, Infrastructure),
            ("gas", "Natural Gas", System, Infrastructure),
            ("gas storage", "Natural Gas Storage", System, Infrastructure),
            ("gas trade", "Natural Gas Trade", System, Infrastructure),
            ("gas pipeline", "Natural Gas Pipeline", System, Infrastructure),
            ("lpg", "LPG", System, Infrastructure),
            ("co2", "CO2", System, Emissions),
            // residential
            ("res-elec", "Residential Electricity", Residential, Delivery { total: false }),
            ("res-total-elec", "Residential Total Electricity", Residential, Delivery { total: true }),
            ("res-urban-space-heat", "Residential Urban Space Heat", Residential, SpaceConditioning),
            ("res-rural-space-heat", "Residential Rural Space Heat", Residential, SpaceConditioning),
            ("res-space-cool", "Residential Space Cooling", Residential, SpaceConditioning),
            ("res-urban-water-heat", "Residential Urban Water Heat", Residential, WaterHeating),
            ("res-rural-water-heat", "Residential Rural Water Heat", Residential, WaterHeating),
            ("res-elec-furnace", "Residential Electric Furnace", Residential, SpaceConditioning),
            ("res-gas-furnace", "Residential Gas Furnace", Residential, SpaceConditioning),
            ("res-heat-pump", "Residential Heat Pump", Residential, SpaceConditioning),
            ("res-air-con", "Residential Air Conditioner", Residential, SpaceConditioning),
            ("res-elec-water-tank", "Residential Electric Water Heater", Residential, WaterHeating),
            ("res-gas-water-tank", "Residential Gas Water Heater", Residential, WaterHeating),
            ("res-elec-dr", "Residential Electricity DR", Residential, DemandResponse),
            ("res-heat-dr", "Residential Heating DR", Residential, DemandResponse),
            ("res-cool-dr", "Residential Cooling DR", Residential, DemandResponse),
            ("res-co2", "Residential CO2", Residential, Emissions),
            // commercial
            ("com-elec", "Commercial Electricity", Commercial, Delivery { total: false }),
            ("com-total-elec", "Commercial Total Electricity", Commercial, Delivery { total: true }),
            ("com-urban-space-heat", "Commercial Urban Space Heat", Commercial, SpaceConditioning),
            ("com-rural-space-heat", "Commercial Rural Space Heat", Commercial, SpaceConditioning),
            ("com-space-cool", "Commercial Space Cooling", Commercial, SpaceConditioning),
            ("com-urban-water-heat", "Commercial Urban Water Heat", Commercial, WaterHeating),
            ("com-rural-water-heat", "Commercial Rural Water Heat", Commercial, WaterHeating),
            ("com-elec-furnace", "Commercial Electric Furnace", Commercial, SpaceConditioning),
            ("com-gas-furnace", "Commercial Gas Furnace", Commercial, SpaceConditioning),
            ("com-heat-pump", "Commercial Heat Pump", Commercial, SpaceConditioning),
            ("com-air-con", "Commercial Air Conditioner", Commercial, SpaceConditioning),
            ("com-elec-water-tank", "Commercial Electric Water Heater", Commercial, WaterHeating),
            ("com-gas-water-tank", "Commercial Gas Water Heater", Commercial, WaterHeating),
            ("com-elec-dr", "Commercial Electricity DR", Commercial, DemandResponse),
            ("com-heat-dr", "Commercial Heating DR", Commercial, DemandResponse),
            ("com-cool-dr", "Commercial Cooling DR", Commercial, DemandResponse),
            ("com-co2", "Commercial CO2", Commercial, Emissions),
            // industrial
            ("ind-elec", "Industrial Electricity", Industrial, Delivery { total: false }),
            ("ind-heat", "Industrial Heat", Industrial, Process),
            ("ind-elec-boiler", "Industrial Electric Boiler", Industrial, Process),
            ("ind-gas-boiler", "Industrial Gas Boiler", Industrial, Process),
            ("ind-heat-pump", "Industrial Heat Pump", Industrial, Process),
            ("ind-elec-dr", "Industrial Electricity DR", Industrial, DemandResponse),
            ("ind-heat-dr", "Industrial Heating DR", Industrial, DemandResponse),
            ("ind-co2", "Industrial CO2", Industrial, Emissions),
            // transport
            ("trn-elec-veh", "Transport Electric Vehicle", Transport, Vehicle { electric: true }),
            ("trn-lpg-veh", "Transport LPG Vehicle", Transport, Vehicle { electric: false }),
            ("trn-elec-dr", "Transport Electric Vehicle DR", Transport, DemandResponse),
            ("trn-co2", "Transport CO2", Transport, Emissions),
        ];

        Self::new(
            rows.into_iter()
                .map(|(id, name, sector, class)| CarrierEntry::new(id, name, sector, class))
                .collect(),
        )
    }
}

/// The carrier entry of every component of one network, aligned with the
/// component order of each [`ComponentKind`].
#[derive(Debug, Clone)]
pub struct ResolvedCarriers {
    map: CarrierMap,
    resolved: HashMap<ComponentKind, Vec<usize>>,
}

impl ResolvedCarriers {
    /// Fails on the first component whose carrier is not in `map`.
    pub fn resolve(network: &dyn NetworkSource, map: &CarrierMap) -> Result<Self> {
        let mut resolved = HashMap::new();
        for kind in ComponentKind::ALL {
            let mut indices = Vec::with_capacity(network.components(kind).len());
            for component in network.components(kind) {
                let idx = map.index.get(&component.carrier).copied().ok_or_else(|| {
                    MetricsError::UnknownCarrier {
                        component: component.name.clone(),
                        carrier: component.carrier.clone(),
                    }
                })?;
                indices.push(idx);
            }
            resolved.insert(kind, indices);
        }
        Ok(Self {
            map: map.clone(),
            resolved,
        })
    }

    pub fn map(&self) -> &CarrierMap {
        &self.map
    }

    pub fn entry(&self, kind: ComponentKind, component: usize) -> &CarrierEntry {
        &self.map.entries[self.resolved[&kind][component]]
    }

    /// Indices of the components of `kind` whose carrier satisfies `pred`.
    pub fn select<F>(&self, kind: ComponentKind, pred: F) -> Vec<usize>
    where
        F: Fn(&CarrierEntry) -> bool,
    {
        self.resolved[&kind]
            .iter()
            .enumerate()
            .filter(|(_, &idx)| pred(&self.map.entries[idx]))
            .map(|(component, _)| component)
            .collect()
    }
}
