use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tabled::settings::{Settings, Style};
use tabled::{Table, Tabled};
use unseen_formats::{accumulate, fit_accumulation, ExtensionSet, FitConfig, RegistryCollection};

/// Accumulation is benchmarked for registry counts from 1 to `DEFAULT_MAX_REGISTRIES` or
/// environment variable `N` (if defined), doubling with every iteration.
const DEFAULT_MAX_REGISTRIES: usize = 64;
/// Size of the synthetic extension population registries are sampled from
const POPULATION: usize = 20_000;

criterion_group!(benches, benchmark);
criterion_main!(benches);

fn benchmark(c: &mut Criterion) {
    let max_registries = std::env::var("N")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_REGISTRIES);

    let registry_counts: Vec<usize> = (0..)
        .map(|c| 1 << c)
        .take_while(|&c| c <= max_registries)
        .collect();

    let mut group = c.benchmark_group("accumulate");
    for &count in &registry_counts {
        let registries = synthetic_registries(count, 42);
        let total: usize = registries.iter().map(|(_, set)| set.len()).sum();
        group.throughput(Throughput::Elements(total as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &registries, |b, registries| {
            b.iter(|| accumulate(black_box(registries)).unwrap());
        });
    }
    group.finish();

    let mut group = c.benchmark_group("fit");
    let config = FitConfig::default();
    for &count in registry_counts.iter().filter(|&&c| c >= 2) {
        let table = accumulate(&synthetic_registries(count, 42)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(count), &table, |b, table| {
            b.iter(|| fit_accumulation(black_box(table), &config).unwrap());
        });
    }
    group.finish();

    // Recovery of the known population size, written out when a results path is given.
    if let Ok(bench_results_path) = std::env::var("BENCH_RESULTS_PATH") {
        let results: Vec<EstimateRecord> = registry_counts
            .iter()
            .filter(|&&c| c >= 2)
            .map(|&count| measure_estimate(count))
            .collect();
        let table_config = Settings::default().with(Style::markdown());
        std::fs::write(
            format!("{}/population_estimate.md", bench_results_path),
            Table::new(results).with(table_config).to_string(),
        )
        .unwrap();
    }
}

#[derive(Tabled)]
struct EstimateRecord {
    registries: usize,
    total_exts: usize,
    observed: usize,
    estimate_at_population: String,
    population: usize,
}

fn measure_estimate(count: usize) -> EstimateRecord {
    let table = accumulate(&synthetic_registries(count, 7)).unwrap();
    let config = FitConfig {
        lower_bound: Some(1),
        upper_bound: Some(POPULATION as u64),
        ..FitConfig::default()
    };
    let estimate = fit_accumulation(&table, &config)
        .ok()
        .and_then(|fit| fit.estimate().map(|p| format!("{:.0}", p.y_fit)))
        .unwrap_or_else(|| "-".to_string());

    EstimateRecord {
        registries: count,
        total_exts: table.total_exts().last().copied().unwrap_or(0),
        observed: table.union_cardinality(),
        estimate_at_population: estimate,
        population: POPULATION,
    }
}

/// Registries of varying size sampling a Zipf-like population, so common extensions
/// are shared between registries and rare ones tend to be unique.
fn synthetic_registries(count: usize, seed: u64) -> RegistryCollection {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let size = rng.gen_range(50..2_000);
            let set: ExtensionSet = (0..size)
                .map(|_| {
                    let u: f64 = rng.gen_range(0.0..1.0);
                    let rank = (POPULATION as f64).powf(u) as usize;
                    format!("x{rank}")
                })
                .collect();
            (format!("registry-{i:03}"), set)
        })
        .collect()
}
