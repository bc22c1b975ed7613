//! Integration test: concurrent acquire/release, reclamation, and reaping.
//!
//! Many threads lease and return buffers of a few orders while another
//! thread keeps reclaiming idle payloads. No buffer may be leased to two
//! holders at once, no lease may see a dead payload, and once everything
//! settles the free list must be consistent.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use pane_pool::{Pool, Reaper, SLOT_NONE};
use pane_test_utils::{assert_pool_consistent, CountingFactory};

const THREADS: usize = 8;
const ROUNDS: usize = 500;
const ORDERS: [usize; 4] = [16, 32, 48, 64];

#[test]
fn no_double_issuance() {
    let factory = CountingFactory::new();
    let pool = Arc::new(Pool::new(factory.clone()));
    let in_use = Arc::new(Mutex::new(HashSet::new()));
    let start = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let pool = Arc::clone(&pool);
            let in_use = Arc::clone(&in_use);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                for round in 0..ROUNDS {
                    let order = ORDERS[(t + round) % ORDERS.len()];
                    let mut lease = pool.acquire(order);
                    assert!(
                        in_use.lock().unwrap().insert(lease.serial()),
                        "entry {} leased twice",
                        lease.serial()
                    );
                    assert_eq!(lease.entry().slot(), SLOT_NONE);
                    assert!(lease.entry().ref_count() >= 1);
                    if round % 50 == 0 {
                        assert_pool_consistent(&pool);
                    }

                    let tag = t as u8;
                    let buf = lease.get_mut().expect("fresh lease is unique");
                    assert_eq!(buf.len(), order);
                    buf.fill(tag);
                    thread::yield_now();
                    assert!(lease.iter().all(|&b| b == tag));

                    in_use.lock().unwrap().remove(&lease.serial());
                    lease.release();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_pool_consistent(&pool);
    let stats = pool.stats();
    assert_eq!(stats.created + stats.reused, (THREADS * ROUNDS) as u64);
    assert_eq!(stats.created, factory.calls());
}

#[test]
fn reclamation_races_with_leasing() {
    let reaper = Reaper::spawn().unwrap();
    let pool = Arc::new(
        Pool::builder(CountingFactory::new())
            .reaper(reaper.handle())
            .build()
            .unwrap(),
    );
    let stop = Arc::new(AtomicBool::new(false));

    let reclaimer = {
        let pool = Arc::clone(&pool);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut total = 0;
            while !stop.load(Ordering::Relaxed) {
                total += pool.reclaim_idle(1);
                thread::yield_now();
            }
            total
        })
    };

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for round in 0..ROUNDS {
                    let order = ORDERS[(t * 3 + round) % ORDERS.len()];
                    let lease = pool.acquire(order);
                    assert_eq!(lease.len(), order);
                    let extra = lease.acquire_extra();
                    drop(lease);
                    assert_eq!(extra.len(), order);
                }
            })
        })
        .collect();

    for w in workers {
        w.join().unwrap();
    }
    stop.store(true, Ordering::Relaxed);
    let reclaimed = reclaimer.join().unwrap();

    reaper.handle().sync().unwrap();
    assert_pool_consistent(&pool);

    let stats = pool.stats();
    assert_eq!(stats.reclaimed, reclaimed as u64);
    // Every reclaimed entry left the free list exactly once.
    assert_eq!(stats.reaped + stats.stale_skipped, stats.reclaimed);
    assert_eq!(stats.created - stats.reclaimed, stats.pooled as u64);

    let report = reaper.shutdown().unwrap();
    assert_eq!(report.notices, stats.reclaimed);
    assert_eq!(report.excised, stats.reaped);
    assert!(report.batches <= report.notices);
}

#[test]
fn shutdown_races_with_reclamation() {
    let reaper = Reaper::spawn().unwrap();
    let pool = Arc::new(
        Pool::builder(CountingFactory::new())
            .reaper(reaper.handle())
            .build()
            .unwrap(),
    );
    let start = Arc::new(Barrier::new(THREADS + 1));

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let pool = Arc::clone(&pool);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                for round in 0..ROUNDS {
                    let order = ORDERS[(t + round) % ORDERS.len()];
                    drop(pool.acquire(order));
                    if round % 4 == t % 4 {
                        pool.reclaim_all();
                    }
                }
            })
        })
        .collect();

    start.wait();
    thread::yield_now();
    reaper.shutdown().unwrap();
    for w in workers {
        w.join().unwrap();
    }

    // Anything reclaimed but stranded in the free list would survive this:
    // reclaim_all skips payloads that are already gone.
    pool.reclaim_all();
    assert_eq!(pool.len(), 0);
    assert_pool_consistent(&pool);

    let stats = pool.stats();
    assert_eq!(stats.reaped + stats.stale_skipped, stats.reclaimed);
    assert_eq!(stats.created, stats.reclaimed);
}

#[test]
fn extra_lease_returns_once_both_holders_finish() {
    let pool = Pool::new(CountingFactory::new());
    let lease = pool.acquire(128);
    let serial = lease.serial();
    let extra = lease.acquire_extra();

    let handle = thread::spawn(move || {
        assert_eq!(extra.len(), 128);
        extra.release();
    });
    handle.join().unwrap();
    assert!(pool.is_empty());
    assert_eq!(lease.ref_count(), 1);

    lease.release();
    assert_eq!(pool.len(), 1);
    assert_eq!(pool.acquire(128).serial(), serial);
}
