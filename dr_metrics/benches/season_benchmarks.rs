use chrono::{Duration, NaiveDate, NaiveDateTime};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dr_metrics::extractor::ranked_net_load;
use dr_metrics::season::find_season;
use dr_metrics::{AnalysisConfig, CarrierMap, Component, Network, NetworkBuilder, ResultsAccessor, SeasonConfig};

const HOURS: usize = 8760;

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2019, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap()
}

fn synthetic_network() -> Network {
    let load: Vec<f64> = (0..HOURS)
        .map(|h| {
            let day = (h / 24) as f64;
            let hour = (h % 24) as f64;
            1000.0 + 300.0 * (day / 365.0 * std::f64::consts::TAU).cos() + 80.0 * (hour / 24.0 * std::f64::consts::TAU).sin()
        })
        .collect();
    let solar: Vec<f64> = (0..HOURS)
        .map(|h| match h % 24 {
            7..=18 => 150.0,
            _ => 0.0,
        })
        .collect();

    NetworkBuilder::hourly(start(), HOURS)
        .link(Component::new("p1 res-elec", "res-elec", "p1"), Some(load), None)
        .generator(Component::new("p1 solar", "solar", "p1"), Some(solar))
        .generator(Component::new("p1 onwind", "onwind", "p1"), Some(vec![60.0; HOURS]))
        .build()
        .unwrap()
}

fn benchmark_net_load(c: &mut Criterion) {
    let network = synthetic_network();
    let accessor = ResultsAccessor::new(&network, Some(2019), &CarrierMap::default(), AnalysisConfig::default()).unwrap();
    let ctx = accessor.context();

    c.bench_function("net_load_8760h", |b| {
        b.iter(|| black_box(ctx.net_load(true)));
    });

    c.bench_function("daily_max_ramp_8760h", |b| {
        b.iter(|| black_box(ctx.daily_max_ramp()));
    });
}

fn benchmark_season_contraction(c: &mut Criterion) {
    let network = synthetic_network();
    let accessor = ResultsAccessor::new(&network, Some(2019), &CarrierMap::default(), AnalysisConfig::default()).unwrap();
    let ctx = accessor.context();
    let ranked = ranked_net_load(&ctx.net_load(true));

    c.bench_function("shed_season_contraction", |b| {
        b.iter(|| black_box(find_season(&ranked, &SeasonConfig::SHED, "shed_season").unwrap()));
    });

    let scattered: Vec<(NaiveDateTime, f64)> = (0..1000)
        .map(|i| (start() + Duration::hours((i * 7919 % HOURS) as i64), 5000.0 - i as f64))
        .collect();
    let wide = SeasonConfig {
        top_events: 900,
        target_span: 80,
        boundary: dr_metrics::SpanBoundary::PlusOne,
    };
    c.bench_function("wide_season_contraction", |b| {
        b.iter(|| black_box(find_season(&scattered, &wide, "bench").unwrap()));
    });
}

criterion_group!(benches, benchmark_net_load, benchmark_season_contraction);
criterion_main!(benches);
