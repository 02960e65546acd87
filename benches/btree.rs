//! Insert/search throughput for the disk-backed tree.
//!
//! Every operation here pays real (fsynced) file I/O, so the numbers
//! measure the engine as deployed, not an in-memory approximation.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use pagetree::BTree;
use tempfile::tempdir;

fn build(order: usize, n: i64) -> (BTree, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let mut tree = BTree::create(
        dir.path().join("index.db"),
        dir.path().join("heap.db"),
        order,
    )
    .unwrap();
    for i in 0..n {
        // Spread inserts across the key space.
        let key = (i * 7919) % n;
        tree.insert(key, &key.to_le_bytes()).unwrap();
    }
    (tree, dir)
}

fn bench_insert(c: &mut Criterion) {
    c.bench_function("insert_1000_order_16", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let tree = BTree::create(
                    dir.path().join("index.db"),
                    dir.path().join("heap.db"),
                    16,
                )
                .unwrap();
                (tree, dir)
            },
            |(mut tree, _dir)| {
                for i in 0..1000i64 {
                    tree.insert((i * 7919) % 1000, b"payload").unwrap();
                }
            },
            BatchSize::PerIteration,
        );
    });
}

fn bench_search(c: &mut Criterion) {
    let (mut tree, _dir) = build(16, 1000);
    c.bench_function("search_order_16", |b| {
        let mut key = 0i64;
        b.iter(|| {
            key = (key + 1) % 1000;
            tree.search(key).unwrap()
        });
    });
}

criterion_group!(benches, bench_insert, bench_search);
criterion_main!(benches);
