use chrono::{NaiveDate, NaiveDateTime};
use dr_metrics::{
    AnalysisConfig, CarrierMap, Component, MetricExtractor, Network, NetworkBuilder,
    ResultsAccessor,
};

const HOURS: usize = 8760;

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2019, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid start date")
}

/// One year of a single-zone network with a summer evening peak, solar
/// and wind, a residential DR store and a CO2 store.
fn synthetic_network() -> dr_metrics::Result<Network> {
    let hour_of_day = |h: usize| (h % 24) as f64;
    let day_of_year = |h: usize| (h / 24) as f64;

    let load: Vec<f64> = (0..HOURS)
        .map(|h| {
            let seasonal = 400.0 * (-((day_of_year(h) - 200.0) / 30.0).powi(2)).exp();
            let evening = if (17.0..=20.0).contains(&hour_of_day(h)) { 150.0 } else { 0.0 };
            1000.0 + seasonal + evening
        })
        .collect();
    let solar: Vec<f64> = (0..HOURS)
        .map(|h| match h % 24 {
            8..=17 => 200.0,
            _ => 0.0,
        })
        .collect();
    let wind: Vec<f64> = (0..HOURS).map(|h| 50.0 + (h % 7) as f64 * 10.0).collect();
    let price: Vec<f64> = load.iter().map(|l| l / 20.0).collect();
    let dr: Vec<f64> = (0..HOURS).map(|h| if h % 24 == 18 { 25.0 } else { 0.0 }).collect();
    let co2: Vec<f64> = (0..HOURS).map(|h| h as f64 * 0.01).collect();

    NetworkBuilder::hourly(start(), HOURS)
        .objective(5.0e9)
        .link(
            Component::new("p1 res-elec", "res-elec", "p1").with_capacity(2000.0, 2000.0),
            Some(load),
            None,
        )
        .generator(
            Component::new("p1 solar", "solar", "p1").with_capacity(300.0, 450.0).with_costs(50.0, 0.0),
            Some(solar),
        )
        .generator(
            Component::new("p1 onwind", "onwind", "p1").with_capacity(200.0, 250.0).with_costs(80.0, 0.0),
            Some(wind),
        )
        .generator(
            Component::new("p1 CCGT", "CCGT", "p1").with_capacity(1500.0, 1400.0).with_costs(30.0, 25.0),
            Some(vec![700.0; HOURS]),
        )
        .bus(Component::new("p1 res-elec", "res-elec", ""), Some(price))
        .store(
            Component::new("p1 res-elec-dr", "res-elec-dr", "p1 res-elec").with_storage_cost(2.0),
            Some(dr),
        )
        .store(Component::new("p1 res-co2", "res-co2", "co2"), Some(co2))
        .build()
}

fn main() -> dr_metrics::Result<()> {
    env_logger::init();
    let network = synthetic_network()?;
    let accessor = ResultsAccessor::new(&network, None, &CarrierMap::default(), AnalysisConfig::default())?;

    println!("Demand Response Metrics ({})", accessor.year());
    println!("================================");
    for metric in accessor.metrics() {
        let extractor = accessor.extractor(metric)?;
        let datapoint = extractor.extract_datapoint(false)?;
        let table = extractor.extract_datapoint(true)?;
        println!("{metric}: {}", serde_json::to_string(&datapoint)?);
        if let Some(table) = table.as_table() {
            for row in &table.rows {
                println!("    {:<32} {}", row.metric, row.value);
            }
        }
    }
    Ok(())
}
