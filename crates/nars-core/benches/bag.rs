use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use nars_core::{Bag, Budget, Entry, Memory, MemoryConfig, Sampling, Task, Term, Truth};

fn entry(i: usize) -> Entry<usize, ()> {
    let p = (i % 97) as f32 / 97.0;
    Entry::new(i, (), Budget::new(p, 0.5, 0.5))
}

fn bench_put_in(c: &mut Criterion) {
    let mut group = c.benchmark_group("bag_put_in");
    for capacity in [100usize, 1000, 10_000] {
        group.throughput(Throughput::Elements(capacity as u64));
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &cap| {
            b.iter(|| {
                let mut bag = Bag::seeded(cap, 42);
                // twice the capacity so the second half evicts
                for i in 0..cap * 2 {
                    let _ = bag.put_in(entry(i));
                }
                bag
            });
        });
    }
    group.finish();
}

fn bench_take_put_back(c: &mut Criterion) {
    let mut group = c.benchmark_group("bag_take_put_back");
    for sampling in [Sampling::Weighted, Sampling::Distributor] {
        let mut bag = Bag::seeded(1000, 42).with_sampling(sampling);
        for i in 0..1000 {
            let _ = bag.put_in(entry(i));
        }
        group.bench_function(format!("{sampling:?}"), |b| {
            b.iter(|| {
                if let Some(item) = bag.take_next() {
                    let _ = bag.put_back(item);
                }
            });
        });
    }
    group.finish();
}

fn bench_memory_cycle(c: &mut Criterion) {
    let config = MemoryConfig {
        seed: Some(42),
        ..MemoryConfig::default()
    };
    let mut memory = Memory::new(config).expect("default config is valid");
    for i in 0..500 {
        let term = Term::compound("-->", vec![Term::atom(format!("a{i}")), Term::atom("b")]);
        memory.input_task(Task::judgment(term, Truth::default()));
    }
    c.bench_function("memory_cycle", |b| {
        b.iter(|| memory.cycle());
    });
}

criterion_group!(benches, bench_put_in, bench_take_put_back, bench_memory_cycle);
criterion_main!(benches);
