use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use filemap::{allocation_granularity, FileMap, MapAdvice};
use std::fs::File;
use std::io::Write;

fn scratch(len: usize) -> File {
    let mut file = tempfile::tempfile().expect("tempfile");
    file.write_all(&vec![0x5A_u8; len]).expect("fill");
    file
}

fn bench_create_drop(c: &mut Criterion) {
    let page = allocation_granularity().expect("granularity");
    let file = scratch(4 * 1024 * 1024 + page);

    let mut group = c.benchmark_group("create_drop");
    for &size in &[4_usize * 1024, 64 * 1024, 1024 * 1024] {
        group.throughput(Throughput::Bytes(size as u64));
        // Aligned vs unaligned offsets exercise the adjustment path.
        for (label, offset) in [("aligned", page as u64), ("unaligned", page as u64 + 10)] {
            group.bench_with_input(BenchmarkId::new(label, size), &size, |b, &sz| {
                b.iter(|| {
                    let region = FileMap::options().offset(offset).len(sz).map(&file).expect("map");
                    criterion::black_box(region.as_ptr());
                })
            });
        }
    }
    group.finish();
}

fn bench_sequential_read(c: &mut Criterion) {
    let file = scratch(1024 * 1024);

    let mut group = c.benchmark_group("sequential_read");
    group.throughput(Throughput::Bytes(1024 * 1024 - 10));
    for advice in [MapAdvice::Normal, MapAdvice::Sequential, MapAdvice::WillNeed] {
        group.bench_function(format!("{advice:?}"), |b| {
            b.iter_batched(
                || {
                    let region = FileMap::options()
                        .offset(10)
                        .len(1024 * 1024 - 10)
                        .map(&file)
                        .expect("map");
                    let _ = region.advise(advice);
                    region
                },
                |region| {
                    let sum: u64 = region.as_slice().iter().map(|&b| u64::from(b)).sum();
                    criterion::black_box(sum)
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_create_drop, bench_sequential_read);
criterion_main!(benches);
