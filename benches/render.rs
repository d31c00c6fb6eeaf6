#[macro_use]
extern crate criterion;
extern crate mandelrows;

use criterion::Criterion;
use mandelrows::{render, Config};

fn bench_render(c: &mut Criterion) {
    c.bench_function("render 128x128 on 1 worker", |b| {
        let config = Config::new(128, 128, 200).with_workers(1);
        b.iter(|| render(&config).unwrap())
    });
    c.bench_function("render 128x128 on 4 workers", |b| {
        let config = Config::new(128, 128, 200).with_workers(4);
        b.iter(|| render(&config).unwrap())
    });
}

criterion_group!(benches, bench_render);
criterion_main!(benches);
