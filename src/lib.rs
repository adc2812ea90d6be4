//! A tested and benchmarked engine for maintaining local limit order books
//! from streaming exchange deltas.
//!
//! ## Architecture
//!
//! The crate is a set of synchronous, in-memory containers plus the exact
//! arithmetic they rely on:
//!
//! 1. [`Precise`]: arbitrary-precision decimals for spread, mid-price and
//!    notional math, free of binary floating-point error
//! 2. [`BookSide`]: one side of a book, kept sorted best-first while deltas
//!    are applied, with plain, counted, indexed (level-3) and incremental
//!    merge policies
//! 3. [`OrderBook`]: both sides plus nonce, timestamp and symbol, with
//!    snapshot reset and depth limiting
//! 4. [`ArrayCache`] and friends: bounded histories of tickers, trades,
//!    candles and orders that report how many entries are new since a
//!    watcher last looked
//! 5. [`Client`]: the dispatch layer resolving watchers from a socket read
//!    loop
//!
//! ## Example Usage
//!
//! ```rust
//! use book_delta::{Decimal, PlainSide, PriceLevel, Side};
//!
//! let deltas = [(100, 5), (99, 3), (100, 0), (98, 7)]
//!     .map(|(price, size)| PriceLevel::new(Decimal::from(price), Decimal::from(size)));
//! let bids = PlainSide::with_deltas(Side::Bid, deltas, None);
//!
//! let levels: Vec<(Decimal, Decimal)> = bids.iter().map(|l| (l.price, l.size)).collect();
//! assert_eq!(
//!     levels,
//!     vec![
//!         (Decimal::from(99), Decimal::from(3)),
//!         (Decimal::from(98), Decimal::from(7)),
//!     ]
//! );
//! ```
//!
//! ## Concurrency
//!
//! Books and caches are not internally synchronized: each one is owned by
//! the task handling its subscription and deltas must be applied in arrival
//! order. Gap detection and re-snapshotting belong to the protocol layer.
//! Hosts that share a book between readers wrap it in the re-exported
//! [`RwLock`], holding the write lock only while one message is applied:
//!
//! ```rust
//! use book_delta::{Decimal, PlainOrderBook, RwLock};
//! use std::sync::Arc;
//!
//! let order_book = Arc::new(RwLock::new(PlainOrderBook::new(Some(50))));
//! {
//!     let mut book = order_book.write();
//!     book.bids_mut().store(Decimal::from(100), Decimal::from(1));
//!     book.limit();
//! } // write lock released
//! assert_eq!(order_book.read().bids().len(), 1);
//! ```

mod book_side;
mod cache;
mod client;
mod config;
mod error;
pub mod logging;
mod order_book;
mod precise;
mod types;

// Re-export public API
pub use book_side::{
    BookSide, Counted, CountedSide, Incremental, IncrementalSide, Indexed, IndexedSide, Ladder,
    Merge, Plain, PlainSide,
};
pub use cache::{
    ArrayCache, ArrayCacheBySymbolById, ArrayCacheBySymbolByKey, ArrayCacheBySymbolBySide,
    ArrayCacheByTimestamp, Cache, Keyed, Symbolic, Timestamped,
};
pub use client::Client;
pub use config::StreamConfig;
pub use error::{Error, PreciseError, Result};
pub use order_book::{
    CountedOrderBook, IncrementalOrderBook, IndexedOrderBook, OrderBook, PlainOrderBook, Snapshot,
};
pub use precise::{Precise, DEFAULT_DIVISION_PRECISION};
pub use types::{CountedLevel, Level, OrderDelta, OrderLevel, PriceLevel, Side};

// Re-export commonly used external dependencies
pub use parking_lot::RwLock;
pub use rust_decimal::Decimal;
