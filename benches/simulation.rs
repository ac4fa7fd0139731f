use criterion::black_box;
use criterion::{criterion_group, criterion_main, Criterion};
use pdsim::prelude::*;

fn cyclic() {
    let simulation =
        SteppedSimulation::cyclic(&Patient::default(), &CyclicRegimen::default()).unwrap();
    black_box(simulation.run().unwrap());
}

fn continuous() {
    let simulation =
        SteppedSimulation::continuous(&Patient::default(), &ContinuousRegimen::default()).unwrap();
    black_box(simulation.run().unwrap());
}

fn periodic_exchange() {
    let model = PeriodicExchange::new(ExchangeParameters::default()).unwrap();
    black_box(model.run().unwrap());
}

fn sweep_cycles() {
    let scenarios = cycle_count_scenarios(&Patient::default(), &CyclicRegimen::default(), 1..=16);
    black_box(sweep(&scenarios));
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("cyclic", |b| b.iter(cyclic));
    c.bench_function("continuous", |b| b.iter(continuous));
    c.bench_function("periodic_exchange", |b| b.iter(periodic_exchange));
    c.bench_function("sweep_cycles", |b| b.iter(sweep_cycles));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
