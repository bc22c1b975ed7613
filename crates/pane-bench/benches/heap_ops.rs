//! Criterion micro-benchmarks for the free-list heap.

use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use pane_pool::{HeapSlot, OrderedFreeHeap, SLOT_NONE};

struct Node {
    order: usize,
    slot: AtomicUsize,
}

impl Node {
    fn new(order: usize) -> Arc<Self> {
        Arc::new(Self {
            order,
            slot: AtomicUsize::new(SLOT_NONE),
        })
    }
}

impl HeapSlot for Node {
    fn order(&self) -> usize {
        self.order
    }

    fn slot(&self) -> usize {
        self.slot.load(Ordering::Relaxed)
    }

    fn set_slot(&self, slot: usize) {
        self.slot.store(slot, Ordering::Relaxed);
    }
}

/// 1024 nodes over 64 distinct orders, inserted in a scrambled sequence.
fn heap_1k() -> OrderedFreeHeap<Node> {
    let mut heap = OrderedFreeHeap::new();
    for i in 0..1024usize {
        heap.insert(Node::new((i * 37) % 64));
    }
    heap
}

fn bench_insert(c: &mut Criterion) {
    c.bench_function("heap_insert_1k", |b| {
        b.iter(|| black_box(heap_1k().len()));
    });
}

fn bench_find(c: &mut Criterion) {
    let heap = heap_1k();
    c.bench_function("heap_find_by_order", |b| {
        b.iter(|| {
            for order in 0..64 {
                black_box(heap.find_by_order(black_box(order), 0));
            }
        });
    });
}

fn bench_remove_reinsert(c: &mut Criterion) {
    let mut heap = heap_1k();
    c.bench_function("heap_remove_mid_and_reinsert", |b| {
        b.iter(|| {
            let node = heap.remove_at(black_box(511)).unwrap();
            heap.insert(node);
        });
    });
}

criterion_group!(benches, bench_insert, bench_find, bench_remove_reinsert);
criterion_main!(benches);
