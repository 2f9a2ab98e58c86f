//! Benchmarks for connectivity status classification.
//!
//! Every connectivity cycle classifies one status report, so classification
//! must stay cheap even for text that matches no known state.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench status_bench
//! ```

use cardlink_modem::ConnectivityStatus;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

const REPORTS: [(&str, &str); 5] = [
    ("exact", "STATE: IP INITIAL"),
    ("mixed_case", "state: Ip GprsAct"),
    ("embedded", "OK\r\nSTATE: CONNECT OK\r\n"),
    ("last_token", "STATE: PDP DEACT"),
    ("unrecognized", "+CME ERROR: SIM not inserted"),
];

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");
    group.throughput(Throughput::Elements(1));

    for (name, text) in REPORTS {
        group.bench_with_input(BenchmarkId::from_parameter(name), text, |b, text| {
            b.iter(|| black_box(ConnectivityStatus::classify(black_box(text))));
        });
    }

    group.finish();
}

fn bench_classify_and_dispatch(c: &mut Criterion) {
    c.bench_function("classify_and_dispatch_cycle", |b| {
        b.iter(|| {
            for (_, text) in REPORTS {
                let status = ConnectivityStatus::classify(black_box(text));
                black_box(status.recovery_action());
            }
        });
    });
}

criterion_group!(benches, bench_classify, bench_classify_and_dispatch);
criterion_main!(benches);
