use book_delta::{
    ArrayCache, Cache, Decimal, IndexedSide, PlainOrderBook, PlainSide, Precise, PriceLevel,
    RwLock, Side, Symbolic,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

fn populated_book(levels: i64) -> PlainOrderBook {
    let mut order_book = PlainOrderBook::new(None);
    for i in 0..levels {
        order_book
            .bids_mut()
            .store(Decimal::new(10_000 - i, 2), Decimal::from(100));
        order_book
            .asks_mut()
            .store(Decimal::new(10_100 + i, 2), Decimal::from(100));
    }
    order_book
}

/// Benchmark applying one delta near the top of a populated side.
fn benchmark_delta_application(criterion: &mut Criterion) {
    let mut benchmark_group = criterion.benchmark_group("delta_application");

    for book_size in [100, 1_000, 10_000] {
        benchmark_group.throughput(Throughput::Elements(1));
        let order_book = populated_book(book_size);

        benchmark_group.bench_with_input(
            BenchmarkId::new("plain_update_existing_level", book_size),
            &order_book,
            |bencher, order_book| {
                let mut bids = order_book.bids().clone();
                let mut size = 1;
                bencher.iter(|| {
                    bids.store(Decimal::new(9_995, 2), Decimal::from(size));
                    size = size % 50 + 1;
                });
                black_box(bids.len());
            },
        );

        benchmark_group.bench_with_input(
            BenchmarkId::new("plain_insert_then_delete", book_size),
            &order_book,
            |bencher, order_book| {
                let mut bids = order_book.bids().clone();
                let price = Decimal::new(99_955, 3);
                bencher.iter(|| {
                    bids.store(price, Decimal::ONE);
                    bids.store(price, Decimal::ZERO);
                });
                black_box(bids.len());
            },
        );
    }

    benchmark_group.finish();
}

/// Benchmark level-3 updates, including re-queueing on a price change.
fn benchmark_indexed_updates(criterion: &mut Criterion) {
    let mut benchmark_group = criterion.benchmark_group("indexed_updates");

    let mut asks = IndexedSide::new(Side::Ask, None);
    for i in 0..10_000i64 {
        asks.store(
            Some(Decimal::new(10_100 + i / 4, 2)),
            Decimal::from(10),
            format!("order-{i}"),
        );
    }

    benchmark_group.bench_function("amend_size_without_price", |bencher| {
        let mut asks = asks.clone();
        let mut size = 1;
        bencher.iter(|| {
            asks.store(None, Decimal::from(size), "order-42");
            size = size % 50 + 1;
        });
    });

    benchmark_group.bench_function("move_order_between_prices", |bencher| {
        let mut asks = asks.clone();
        let prices = [Decimal::new(10_105, 2), Decimal::new(10_106, 2)];
        let mut flip = 0;
        bencher.iter(|| {
            asks.store(Some(prices[flip]), Decimal::from(10), "order-42");
            flip ^= 1;
        });
    });

    benchmark_group.finish();
}

/// Benchmark snapshot resets followed by a depth cut.
fn benchmark_snapshot_and_limit(criterion: &mut Criterion) {
    let mut benchmark_group = criterion.benchmark_group("snapshot_and_limit");

    for depth in [10, 100, 1_000] {
        let deltas: Vec<PriceLevel> = (0..5_000i64)
            .map(|i| PriceLevel::new(Decimal::new(10_000 - i, 2), Decimal::from(1 + i % 7)))
            .collect();

        benchmark_group.bench_with_input(
            BenchmarkId::new("with_deltas_then_limit", depth),
            &deltas,
            |bencher, deltas| {
                bencher.iter(|| {
                    let mut bids = PlainSide::with_deltas(Side::Bid, deltas.iter().cloned(), Some(depth));
                    bids.limit();
                    black_box(bids.len());
                });
            },
        );
    }

    benchmark_group.finish();
}

/// Benchmark exact spread, mid-price and depth aggregation.
fn benchmark_book_metrics(criterion: &mut Criterion) {
    let mut benchmark_group = criterion.benchmark_group("book_metrics");
    let order_book = populated_book(10_000);

    benchmark_group.bench_function("spread", |bencher| {
        bencher.iter(|| black_box(order_book.spread()));
    });
    benchmark_group.bench_function("mid_price", |bencher| {
        bencher.iter(|| black_box(order_book.mid_price(18)));
    });
    for levels in [10, 100] {
        benchmark_group.bench_with_input(
            BenchmarkId::new("notional", levels),
            &levels,
            |bencher, &levels| {
                bencher.iter(|| black_box(order_book.bids().notional(levels)));
            },
        );
    }

    benchmark_group.finish();
}

/// Benchmark arbitrary-precision arithmetic on exchange-style strings.
fn benchmark_precise(criterion: &mut Criterion) {
    let mut benchmark_group = criterion.benchmark_group("precise");

    benchmark_group.bench_function("string_mul", |bencher| {
        bencher.iter(|| black_box(Precise::string_mul("27123.456789", "0.00012345")));
    });
    benchmark_group.bench_function("string_div", |bencher| {
        bencher.iter(|| black_box(Precise::string_div("1", "3")));
    });
    benchmark_group.bench_function("parse_and_render", |bencher| {
        bencher.iter(|| {
            let value: Precise = black_box("1.23456789e-5").parse().unwrap();
            black_box(value.to_string());
        });
    });

    benchmark_group.finish();
}

struct Trade(&'static str);

impl Symbolic for Trade {
    fn symbol(&self) -> &str {
        self.0
    }
}

/// Benchmark a full cache: every append evicts.
fn benchmark_cache_append(criterion: &mut Criterion) {
    let mut benchmark_group = criterion.benchmark_group("cache_append");

    benchmark_group.bench_function("append_at_capacity", |bencher| {
        let mut trades = ArrayCache::new(Some(1_000));
        for _ in 0..1_000 {
            trades.append(Trade("BTC/USDT"));
        }
        bencher.iter(|| {
            trades.append(Trade("BTC/USDT"));
            black_box(trades.get_limit(Some("BTC/USDT"), Some(100)));
        });
    });

    benchmark_group.finish();
}

/// Benchmark readers of a shared book.
fn benchmark_concurrent_spread_reads(criterion: &mut Criterion) {
    let mut benchmark_group = criterion.benchmark_group("concurrent_spread_reads");
    let order_book_arc = Arc::new(RwLock::new(populated_book(10_000)));

    for threads_count in [1, 2, 4, 8] {
        benchmark_group.bench_with_input(
            BenchmarkId::new("concurrent_reads", threads_count),
            &threads_count,
            |bencher, &thread_count| {
                bencher.iter(|| {
                    let thread_handles: Vec<_> = (0..thread_count)
                        .map(|_| {
                            let book_clone = Arc::clone(&order_book_arc);
                            std::thread::spawn(move || {
                                for _ in 0..100 {
                                    black_box(book_clone.read().spread());
                                }
                            })
                        })
                        .collect();

                    for handle in thread_handles {
                        handle.join().unwrap();
                    }
                });
            },
        );
    }

    benchmark_group.finish();
}

criterion_group!(
    benches,
    benchmark_delta_application,
    benchmark_indexed_updates,
    benchmark_snapshot_and_limit,
    benchmark_book_metrics,
    benchmark_precise,
    benchmark_cache_append,
    benchmark_concurrent_spread_reads
);
criterion_main!(benches);
