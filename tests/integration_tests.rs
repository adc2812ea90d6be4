use book_delta::{
    ArrayCache, ArrayCacheByTimestamp, Cache, Client, CountedOrderBook, Decimal, IncrementalSide,
    IndexedOrderBook, IndexedSide, Level, OrderDelta, PlainOrderBook, PlainSide, Precise,
    PriceLevel, RwLock, Side, Snapshot, StreamConfig, Symbolic, Timestamped,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

fn d(value: i64) -> Decimal {
    Decimal::from(value)
}

fn levels<L: Level>(side: impl IntoIterator<Item = L>) -> Vec<(Decimal, Decimal)> {
    side.into_iter().map(|level| (level.price(), level.size())).collect()
}

#[test]
/// Apply the bid-side workflow from a fresh side: insert, insert, delete, insert.
fn test_plain_bid_side_workflow() {
    let deltas = [(100, 5), (99, 3), (100, 0), (98, 7)]
        .map(|(price, size)| PriceLevel::new(d(price), d(size)));
    let mut bids = PlainSide::new(Side::Bid, None);
    for delta in deltas {
        bids.store_array(delta);
    }

    assert_eq!(
        levels(bids.iter().cloned()),
        vec![(d(99), d(3)), (d(98), d(7))],
        "100 was deleted and the remainder is sorted descending"
    );
}

#[test]
/// A level driven below zero by signed changes is removed.
fn test_incremental_side_removes_exhausted_level() {
    let mut asks = IncrementalSide::new(Side::Ask, None);
    for change in [5, 3, -9] {
        asks.store(d(10), d(change));
    }

    assert!(asks.is_empty(), "5 + 3 - 9 <= 0 so the level must be gone");
}

#[test]
/// An order that changes price moves to its new position without duplicating.
fn test_indexed_side_price_change() {
    let mut bids = IndexedSide::new(Side::Bid, None);
    bids.store(Some(d(10)), d(2), "1");
    assert_eq!(bids.len(), 1);

    bids.store(Some(d(12)), d(4), "1");
    assert_eq!(bids.len(), 1);
    assert_eq!(bids[0].price, d(12));
    assert_eq!(bids[0].size, d(4));
    assert_eq!(bids[0].order_id, "1");
}

#[test]
/// Parse exchange-style JSON deltas and apply them through one snapshot path.
fn test_json_snapshot_then_updates() {
    let payload = json!({
        "bids": [["99.5", "1.5"], ["99.0", "2"], [98.5, 3]],
        "asks": [["100.0", "1"], ["100.5", "0.25"]],
    });
    let parse = |key: &str| -> Vec<PriceLevel> {
        payload[key]
            .as_array()
            .unwrap()
            .iter()
            .map(|value| PriceLevel::from_value(value).unwrap())
            .collect()
    };

    let mut order_book = PlainOrderBook::from_snapshot(
        Snapshot::new(parse("bids"), parse("asks"))
            .with_symbol("BTC/USDT")
            .with_nonce(100)
            .with_timestamp(1_700_000_000_000),
        Some(2),
    );
    order_book.limit();

    assert_eq!(order_book.bids().len(), 2);
    assert_eq!(order_book.spread().unwrap().to_string(), "0.5");
    assert_eq!(
        order_book.datetime().as_deref(),
        Some("2023-11-14T22:13:20.000Z")
    );

    let update = PriceLevel::from_value(&json!(["100.0", null])).unwrap();
    order_book.asks_mut().store_array(update);
    assert_eq!(order_book.best_ask().map(|l| l.price), Some(Decimal::new(1005, 1)));
    assert_eq!(order_book.spread().unwrap().to_string(), "1");

    let config = StreamConfig::default();
    assert_eq!(config.mid_price(&order_book).unwrap().to_string(), "100");
}

#[test]
/// Counted books drop a level once its order count reaches zero.
fn test_counted_order_book() {
    let mut order_book = CountedOrderBook::new(Some(10));
    order_book.bids_mut().store(d(10), d(5), 3);
    order_book.bids_mut().store(d(11), d(1), 1);
    order_book.bids_mut().store(d(11), d(1), 0);

    assert_eq!(order_book.best_bid().map(|l| l.count), Some(3));
    assert_eq!(order_book.bids().volume(5).to_string(), "5");
}

#[test]
/// Level-3 snapshot, amendments without price, and a depth cut.
fn test_indexed_order_book_depth_cut() {
    let deltas = [("a", 100), ("b", 101), ("c", 102), ("d", 103)]
        .map(|(id, price)| OrderDelta::new(Some(d(price)), d(1), id))
        .to_vec();
    let mut order_book = IndexedOrderBook::from_snapshot(Snapshot::new(vec![], deltas), Some(2));

    order_book.asks_mut().store(None, d(9), "a");
    assert_eq!(order_book.best_ask().map(|l| l.size), Some(d(9)));

    order_book.limit();
    let asks = order_book.asks();
    assert_eq!(asks.len(), 2);
    assert!(asks.contains_order("a"));
    assert!(asks.contains_order("b"));
    assert!(!asks.contains_order("c"));
    assert!(!asks.contains_order("d"));
    assert_eq!(asks.order_count(), 2);
}

#[test]
/// A price-less JSON amend for an order the depth cut evicted leaves the book untouched.
fn test_indexed_amend_of_evicted_order_after_limit() {
    let mut order_book = IndexedOrderBook::new(Some(1));
    for delta in [json!(["10", "1", "a"]), json!(["11", "1", "b"])] {
        order_book
            .asks_mut()
            .store_array(OrderDelta::from_value(&delta).unwrap());
    }
    order_book.limit();
    assert!(!order_book.asks().contains_order("b"));

    let amend = OrderDelta::from_value(&json!([null, "2", "b"])).unwrap();
    order_book.asks_mut().store_array(amend);

    let asks = order_book.asks();
    assert_eq!(asks.len(), 1, "the evicted order must not reappear");
    assert_eq!(asks.order_count(), 1);
    assert_eq!(asks[0].order_id, "a");
    assert_eq!(asks[0].size, d(1));

    order_book
        .asks_mut()
        .store_array(OrderDelta::from_value(&json!([null, "3", "a"])).unwrap());
    assert_eq!(order_book.best_ask().map(|l| l.size), Some(d(3)));
}

#[test]
/// A price-less JSON amend for an order never seen is dropped.
fn test_indexed_amend_of_unknown_order() {
    let mut order_book = IndexedOrderBook::new(None);
    order_book
        .bids_mut()
        .store_array(OrderDelta::from_value(&json!([null, "5", 404])).unwrap());

    assert!(order_book.bids().is_empty());
    assert!(!order_book.bids().contains_order("404"));
    assert_eq!(order_book.bids().order_count(), 0);
}

#[test]
/// Exact decimal behaviour on values that trip binary floating point.
fn test_decimal_precision() {
    let sum = "0.1".parse::<Precise>().unwrap() + "0.2".parse::<Precise>().unwrap();
    assert_eq!(sum, "0.3".parse::<Precise>().unwrap());
    assert_ne!(0.1_f64 + 0.2_f64, 0.3_f64);

    assert_eq!(Precise::string_div("1", "3").unwrap(), "0.333333333333333333");
    assert_eq!(Precise::string_mul("19.99", "3").unwrap(), "59.97");
}

#[derive(Debug, Clone)]
struct Ticker {
    symbol: String,
    last: Decimal,
}

impl Symbolic for Ticker {
    fn symbol(&self) -> &str {
        &self.symbol
    }
}

#[derive(Debug, Clone)]
struct Candle([i64; 2]);

impl Timestamped for Candle {
    fn timestamp(&self) -> i64 {
        self.0[0]
    }
}

#[test]
/// A watcher only picks up what arrived since it last looked.
fn test_watch_loop_reads_only_new_entries() {
    let mut tickers = StreamConfig::default().trades_cache();
    let ticker = |symbol: &str, last: i64| Ticker {
        symbol: symbol.to_string(),
        last: d(last),
    };

    for last in 1..=3 {
        tickers.append(ticker("BTC/USDT", last));
    }
    let take = tickers.get_limit(Some("BTC/USDT"), Some(10)).unwrap();
    let seen: Vec<Decimal> = tickers.recent(take).map(|t| t.last).collect();
    assert_eq!(seen, vec![d(1), d(2), d(3)]);

    tickers.append(ticker("BTC/USDT", 4));
    let take = tickers.get_limit(Some("BTC/USDT"), Some(10)).unwrap();
    let seen: Vec<Decimal> = tickers.recent(take).map(|t| t.last).collect();
    assert_eq!(seen, vec![d(4)]);
}

#[test]
/// Bounded caches never grow past capacity.
fn test_cache_capacity() {
    let mut trades: ArrayCache<Ticker> = ArrayCache::new(Some(5));
    for last in 0..50 {
        trades.append(Ticker {
            symbol: "ETH/USDT".to_string(),
            last: d(last),
        });
        assert!(trades.len() <= 5);
    }
    assert_eq!(trades.get(0).map(|t| t.last), Some(d(45)));

    let mut candles = ArrayCacheByTimestamp::new(Some(3));
    for minute in 0..10 {
        candles.append(Candle([minute * 60_000, minute]));
        candles.append(Candle([minute * 60_000, minute + 100]));
    }
    assert_eq!(candles.len(), 3);
    assert_eq!(candles.get_by_timestamp(540_000).map(|c| c.0[1]), Some(109));
}

#[test]
/// Book shared between threads behind the re-exported lock.
fn test_shared_book_smoke_test() {
    use std::thread;

    let order_book = Arc::new(RwLock::new(PlainOrderBook::new(Some(100))));
    let writer = {
        let order_book = Arc::clone(&order_book);
        thread::spawn(move || {
            for price in 1..=1000 {
                let mut book = order_book.write();
                book.bids_mut().store(d(price), d(1));
                book.limit();
            }
        })
    };
    let reader = {
        let order_book = Arc::clone(&order_book);
        thread::spawn(move || {
            for _ in 0..1000 {
                let book = order_book.read();
                let prices: Vec<Decimal> = book.bids().iter().map(|l| l.price).collect();
                assert!(prices.windows(2).all(|pair| pair[0] > pair[1]));
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();

    let book = order_book.read();
    assert_eq!(book.bids().len(), 100);
    assert_eq!(book.best_bid().map(|l| l.price), Some(d(1000)));
}

#[tokio::test]
/// The read loop updates the book and wakes the watcher with a copy of it.
async fn test_client_dispatch_resolves_order_book_watchers() {
    let client: Client<PlainOrderBook> = Client::new();
    let (transport, messages) = mpsc::channel(16);
    let watcher = client.future("orderbook:BTC/USDT");

    transport
        .send(json!(["BTC/USDT", [["100", "1"], ["101", "2"]]]))
        .await
        .unwrap();
    drop(transport);

    let mut order_book = PlainOrderBook::new(None);
    client
        .run(messages, |client, message| {
            let symbol = message[0].as_str().unwrap();
            for delta in message[1].as_array().unwrap() {
                order_book
                    .bids_mut()
                    .store_array(PriceLevel::from_value(delta).unwrap());
            }
            client.resolve(order_book.clone(), &format!("orderbook:{symbol}"));
        })
        .await;

    let resolved = watcher.await.unwrap();
    assert_eq!(resolved.best_bid().map(|l| l.price), Some(d(101)));
}
