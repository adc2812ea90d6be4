//! Stream configuration.
//!
//! Connectors size their books and watch caches from one [`StreamConfig`],
//! usually deserialized from the host application's settings.

use crate::book_side::Merge;
use crate::cache::{ArrayCache, ArrayCacheBySymbolByKey, ArrayCacheByTimestamp, Keyed, Symbolic, Timestamped};
use crate::error::{Error, Result};
use crate::order_book::OrderBook;
use crate::precise::{Precise, DEFAULT_DIVISION_PRECISION};
use serde::Deserialize;

/// Capacities and precision used when building books and caches.
///
/// Every field is optional in the serialized form:
///
/// ```
/// use book_delta::StreamConfig;
///
/// let config = StreamConfig::from_json(r#"{ "order_book_depth": 25 }"#).unwrap();
/// assert_eq!(config.order_book_depth, Some(25));
/// assert_eq!(config.trades_limit, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    /// Levels kept per side after `limit()`; `None` keeps everything
    pub order_book_depth: Option<usize>,
    pub trades_limit: usize,
    pub ohlcv_limit: usize,
    pub orders_limit: usize,
    /// Fractional digits kept by decimal division
    pub division_precision: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            order_book_depth: None,
            trades_limit: 1000,
            ohlcv_limit: 1000,
            orders_limit: 1000,
            division_precision: DEFAULT_DIVISION_PRECISION,
        }
    }
}

impl StreamConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: StreamConfig =
            serde_json::from_str(json).map_err(|error| Error::Config(error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would build unusable containers.
    pub fn validate(&self) -> Result<()> {
        if self.order_book_depth == Some(0) {
            return Err(Error::Config("order_book_depth must be positive".into()));
        }
        if self.division_precision > i32::MAX as u32 {
            return Err(Error::Config(format!(
                "division_precision {} is too large",
                self.division_precision
            )));
        }
        Ok(())
    }

    pub fn order_book<M: Merge>(&self) -> OrderBook<M> {
        OrderBook::new(self.order_book_depth)
    }

    pub fn trades_cache<T: Symbolic>(&self) -> ArrayCache<T> {
        ArrayCache::new(Some(self.trades_limit))
    }

    pub fn ohlcv_cache<T: Timestamped>(&self) -> ArrayCacheByTimestamp<T> {
        ArrayCacheByTimestamp::new(Some(self.ohlcv_limit))
    }

    pub fn orders_cache<T: Keyed>(&self) -> ArrayCacheBySymbolByKey<T> {
        ArrayCacheBySymbolByKey::new(Some(self.orders_limit))
    }

    /// Mid-price of `order_book` at the configured division precision.
    pub fn mid_price<M: Merge>(&self, order_book: &OrderBook<M>) -> Option<Precise> {
        order_book.mid_price(self.division_precision)
    }
}
