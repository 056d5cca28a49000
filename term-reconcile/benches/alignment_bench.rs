use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use term_reconcile::core::{AlignmentSpec, Row, RowAligner, Value};

fn rows(n: i64, reversed: bool) -> Vec<Row> {
    let mut rows: Vec<Row> = (0..n)
        .map(|i| {
            Row::from_pairs([
                ("id", Value::Int(i)),
                ("amt", Value::Float(i as f64 * 1.5)),
                ("name", Value::Text(format!("customer-{i}"))),
            ])
        })
        .collect();
    if reversed {
        rows.reverse();
    }
    rows
}

fn benchmark_keyed_alignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed_alignment");

    for n in [1_000, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*n as u64));
        let source = rows(*n, false);
        let target = rows(*n, true);

        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, _| {
            b.iter_batched(
                || (source.clone(), target.clone()),
                |(source, target)| {
                    let mut aligner = RowAligner::new(AlignmentSpec::keyed(["id"]));
                    aligner.align(source, target)
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn benchmark_carry_over(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed_carry_over");
    let n = 50_000;
    let source = rows(n, false);
    let target = rows(n, true);

    // a reversed target only meets its counterparts after several batches
    for batch_size in [1_000usize, 5_000, 25_000].iter() {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("batch{batch_size}")),
            batch_size,
            |b, &batch_size| {
                b.iter_batched(
                    || (source.clone(), target.clone()),
                    |(source, target)| {
                        let mut aligner =
                            RowAligner::new(AlignmentSpec::keyed(["id"])).with_carry_over(true);
                        let mut pairs = 0;
                        for (s, t) in source.chunks(batch_size).zip(target.chunks(batch_size)) {
                            pairs += aligner.align(s.to_vec(), t.to_vec()).pairs.len();
                        }
                        pairs + aligner.drain().len()
                    },
                    BatchSize::LargeInput,
                );
            },
        );
    }

    group.finish();
}

fn benchmark_positional_alignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("positional_alignment");

    for n in [1_000, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*n as u64));
        let source = rows(*n, false);
        let target = rows(*n, false);

        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, _| {
            b.iter_batched(
                || (source.clone(), target.clone()),
                |(source, target)| {
                    let mut aligner = RowAligner::new(AlignmentSpec::Positional);
                    aligner.align(source, target)
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_keyed_alignment,
    benchmark_carry_over,
    benchmark_positional_alignment
);
criterion_main!(benches);
