//! Cost evaluation throughput: vectorized batch vs per-member loop

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sagin_env::config::URBAN_IOT;
use sagin_env::reference::loop_cost;
use sagin_env::{NetworkCostModel, SaginConfig};

const POPULATION: usize = 100;

fn bench_cost_eval(c: &mut Criterion) {
    let config = SaginConfig::default();
    let mut group = c.benchmark_group("compute_cost");
    group.sample_size(10);

    for num_devices in [100usize, 500, 1000, 2000] {
        let scenario = config
            .scenario(URBAN_IOT)
            .expect("built-in scenario")
            .with_num_devices(num_devices);
        let model = NetworkCostModel::for_scenario(&config, scenario, 42).expect("valid network");

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let decisions = Array2::from_shape_simple_fn((POPULATION, num_devices), || rng.gen_range(0..3u8));

        group.bench_with_input(
            BenchmarkId::new("vectorized", num_devices),
            &decisions,
            |b, d| b.iter(|| model.compute_cost(black_box(d.view()))),
        );
        group.bench_with_input(
            BenchmarkId::new("loop", num_devices),
            &decisions,
            |b, d| b.iter(|| loop_cost(&model, black_box(d.view()))),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_cost_eval);
criterion_main!(benches);
