use crate::book_side::{BookSide, Counted, Incremental, Indexed, Merge, Plain};
use crate::precise::Precise;
use crate::types::{Level, Side};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

/// A full or partial book as delivered by a snapshot endpoint.
///
/// The levels are deltas of the book's merge policy and go through the same
/// store path as streamed updates.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<D> {
    pub bids: Vec<D>,
    pub asks: Vec<D>,
    pub symbol: Option<String>,
    /// Exchange timestamp in milliseconds since the Unix epoch
    pub timestamp: Option<i64>,
    /// Exchange sequence number of the snapshot
    pub nonce: Option<u64>,
}

impl<D> Default for Snapshot<D> {
    fn default() -> Self {
        Snapshot {
            bids: Vec::new(),
            asks: Vec::new(),
            symbol: None,
            timestamp: None,
            nonce: None,
        }
    }
}

impl<D> Snapshot<D> {
    pub fn new(bids: Vec<D>, asks: Vec<D>) -> Self {
        Snapshot {
            bids,
            asks,
            ..Self::default()
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }
}

/// A locally maintained limit order book: an ask side, a bid side and the
/// metadata of the last snapshot or update applied.
///
/// This structure is not internally synchronized. It is meant to be owned by
/// the task handling one subscription; hosts that share it between readers
/// wrap it in a `RwLock` and keep the write lock for the duration of one
/// message.
///
/// ## Examples
///
/// ```
/// use book_delta::{Decimal, PlainOrderBook, PriceLevel, Snapshot};
///
/// let snapshot = Snapshot::new(
///     vec![PriceLevel::new(Decimal::new(995, 1), Decimal::from(2))],
///     vec![PriceLevel::new(Decimal::new(1005, 1), Decimal::from(1))],
/// )
/// .with_nonce(7);
///
/// let mut order_book = PlainOrderBook::from_snapshot(snapshot, Some(10));
/// order_book.bids_mut().store(Decimal::from(100), Decimal::from(4));
///
/// assert_eq!(order_book.spread().unwrap().to_string(), "0.5");
/// assert_eq!(order_book.mid_price(2).unwrap().to_string(), "100.25");
/// ```
#[derive(Debug, Clone)]
pub struct OrderBook<M: Merge = Plain> {
    /// Ask side (sell orders): sorted by ascending price (lowest ask first)
    asks: BookSide<M>,
    /// Bid side (buy orders): sorted by descending price (highest bid first)
    bids: BookSide<M>,
    symbol: Option<String>,
    timestamp: Option<i64>,
    nonce: Option<u64>,
}

/// Aggregated book with absolute sizes.
pub type PlainOrderBook = OrderBook<Plain>;
/// Aggregated book with per-level order counts.
pub type CountedOrderBook = OrderBook<Counted>;
/// Order-by-order (level-3) book.
pub type IndexedOrderBook = OrderBook<Indexed>;
/// Aggregated book fed with signed size changes.
pub type IncrementalOrderBook = OrderBook<Incremental>;

impl<M: Merge> OrderBook<M> {
    /// Creates an empty order book whose sides are capped at `depth` levels
    /// by [`limit`](Self::limit).
    pub fn new(depth: Option<usize>) -> Self {
        OrderBook {
            asks: BookSide::new(Side::Ask, depth),
            bids: BookSide::new(Side::Bid, depth),
            symbol: None,
            timestamp: None,
            nonce: None,
        }
    }

    pub fn from_snapshot(snapshot: Snapshot<M::Delta>, depth: Option<usize>) -> Self {
        let mut order_book = Self::new(depth);
        order_book.reset(snapshot);
        order_book
    }

    /// Replaces the whole book with `snapshot`.
    pub fn reset(&mut self, snapshot: Snapshot<M::Delta>) -> &mut Self {
        self.asks.clear();
        self.bids.clear();

        for delta in snapshot.asks {
            self.asks.store_array(delta);
        }
        for delta in snapshot.bids {
            self.bids.store_array(delta);
        }

        self.symbol = snapshot.symbol;
        self.timestamp = snapshot.timestamp;
        self.nonce = snapshot.nonce;

        debug!(
            symbol = self.symbol.as_deref().unwrap_or(""),
            nonce = ?self.nonce,
            asks = self.asks.len(),
            bids = self.bids.len(),
            "order book reset"
        );
        self
    }

    /// Applies `snapshot` unless it is not newer than the book.
    ///
    /// A snapshot is stale when both it and the book carry a nonce and the
    /// snapshot's is lower or equal; stale snapshots leave the book untouched.
    pub fn update(&mut self, snapshot: Snapshot<M::Delta>) -> &mut Self {
        if let (Some(incoming), Some(current)) = (snapshot.nonce, self.nonce) {
            if incoming <= current {
                debug!(incoming, current, "ignoring stale order book snapshot");
                return self;
            }
        }
        self.reset(snapshot)
    }

    /// Truncates both sides to the configured depth.
    pub fn limit(&mut self) -> &mut Self {
        self.asks.limit();
        self.bids.limit();
        self
    }

    pub fn asks(&self) -> &BookSide<M> {
        &self.asks
    }

    pub fn bids(&self) -> &BookSide<M> {
        &self.bids
    }

    pub fn asks_mut(&mut self) -> &mut BookSide<M> {
        &mut self.asks
    }

    pub fn bids_mut(&mut self) -> &mut BookSide<M> {
        &mut self.bids
    }

    pub fn side(&self, side: Side) -> &BookSide<M> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut BookSide<M> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn set_symbol(&mut self, symbol: impl Into<String>) {
        self.symbol = Some(symbol.into());
    }

    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: i64) {
        self.timestamp = Some(timestamp);
    }

    /// The timestamp as an ISO-8601 string with millisecond precision.
    pub fn datetime(&self) -> Option<String> {
        let datetime = DateTime::<Utc>::from_timestamp_millis(self.timestamp?)?;
        Some(datetime.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn nonce(&self) -> Option<u64> {
        self.nonce
    }

    pub fn set_nonce(&mut self, nonce: u64) {
        self.nonce = Some(nonce);
    }

    pub fn best_bid(&self) -> Option<&M::Level> {
        self.bids.best()
    }

    pub fn best_ask(&self) -> Option<&M::Level> {
        self.asks.best()
    }

    /// Best ask minus best bid, if both sides have levels.
    pub fn spread(&self) -> Option<Precise> {
        let (bid, ask) = (self.best_bid()?, self.best_ask()?);
        Some(Precise::from(ask.price()) - Precise::from(bid.price()))
    }

    /// Midpoint of the best bid and ask, truncated to `precision` digits.
    pub fn mid_price(&self, precision: u32) -> Option<Precise> {
        let (bid, ask) = (self.best_bid()?, self.best_ask()?);
        let sum = Precise::from(ask.price()) + Precise::from(bid.price());
        sum.checked_div(&Precise::from(2i64), precision).ok()
    }
}

impl<M: Merge> Default for OrderBook<M> {
    fn default() -> Self {
        Self::new(None)
    }
}
