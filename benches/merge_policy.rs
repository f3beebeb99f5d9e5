//! Benchmarks for reference extraction and edge merging.
//!
//! Run with: `cargo bench --bench merge_policy`
//!
//! ## Scenarios
//!
//! | Benchmark | Input |
//! |-----------|-------|
//! | `extract` | Documents of N lines, one reference per line, every third line typed |
//! | `merge` | N candidates spread over 10 targets, mostly inline |
//! | `edge_diff` | N materialized edges against N fresh edges, 10% changed |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use linkgraph_sync::store::memory::scan_links;
use linkgraph_sync::{
    diff_edges, EdgeCandidate, EdgeMergePolicy, EntityId, ReferenceExtractor, INLINE_EDGE_TYPE,
};

fn make_document(lines: usize) -> String {
    (0..lines)
        .map(|i| {
            if i % 3 == 0 {
                format!("- supports [[Target {}]]", i % 10)
            } else {
                format!("line {i} mentions [[Target {}]] in passing", i % 10)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn make_candidates(n: usize) -> Vec<EdgeCandidate> {
    let source = EntityId::core("Source");
    (0..n)
        .map(|i| {
            let edge_type = if i % 5 == 0 { "supports" } else { INLINE_EDGE_TYPE };
            EdgeCandidate::new(
                source.clone(),
                EntityId::core(format!("Target {}", i % 10)),
                edge_type,
                format!("context {i}"),
            )
        })
        .collect()
}

/// Benchmark classifying references of a single document.
fn bench_extract(c: &mut Criterion) {
    let extractor = ReferenceExtractor::new("- ").unwrap();
    let mut group = c.benchmark_group("extract");

    for lines in [10, 100, 1_000] {
        let content = make_document(lines);
        let refs = scan_links(&content);

        group.throughput(Throughput::Elements(lines as u64));
        group.bench_with_input(
            BenchmarkId::new("lines", lines),
            &(content, refs),
            |b, (content, refs)| b.iter(|| extractor.extract(black_box(content), black_box(refs))),
        );
    }

    group.finish();
}

/// Benchmark merging candidates and assigning edge ids.
fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for n in [10, 100, 1_000] {
        let candidates = make_candidates(n);
        for (label, policy) in [
            ("merged", EdgeMergePolicy::new(true)),
            ("unmerged", EdgeMergePolicy::new(false)),
        ] {
            group.throughput(Throughput::Elements(n as u64));
            group.bench_with_input(BenchmarkId::new(label, n), &candidates, |b, candidates| {
                b.iter(|| policy.merge(black_box(candidates.clone())))
            });
        }
    }

    group.finish();
}

/// Benchmark diffing materialized against fresh edges.
fn bench_edge_diff(c: &mut Criterion) {
    let policy = EdgeMergePolicy::new(false);
    let mut group = c.benchmark_group("edge_diff");

    for n in [10, 100, 1_000] {
        let materialized = policy.merge(make_candidates(n));
        let mut changed = make_candidates(n);
        for candidate in changed.iter_mut().step_by(10) {
            candidate.context.push_str(" (edited)");
        }
        let fresh = policy.merge(changed);

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(
            BenchmarkId::new("edges", n),
            &(materialized, fresh),
            |b, (materialized, fresh)| b.iter(|| diff_edges(black_box(materialized), black_box(fresh))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_extract, bench_merge, bench_edge_diff);
criterion_main!(benches);
