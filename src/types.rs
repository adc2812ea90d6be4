use crate::error::{Error, Result};
use rust_decimal::Decimal;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Represents the side of an order book.
///
/// - `Bid` represents buy orders (demand side), best price is the highest
/// - `Ask` represents sell orders (supply side), best price is the lowest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Buy side: sorted by descending price
    Bid,
    /// Sell side: sorted by ascending price
    Ask,
}

impl Side {
    /// Maps a price to the key a side is sorted by in ascending order.
    ///
    /// Bids negate the price so that a single ascending search serves both
    /// sides.
    ///
    /// ## Examples
    ///
    /// ```
    /// use book_delta::{Decimal, Side};
    ///
    /// let price = Decimal::new(10025, 2);
    /// assert_eq!(Side::Ask.sort_key(price), price);
    /// assert_eq!(Side::Bid.sort_key(price), -price);
    /// ```
    pub fn sort_key(self, price: Decimal) -> Decimal {
        match self {
            Side::Bid => -price,
            Side::Ask => price,
        }
    }
}

/// Read access shared by every level type stored in a book side.
pub trait Level: Clone + fmt::Debug {
    /// The price this level rests at
    fn price(&self) -> Decimal;
    /// The quantity resting at this level
    fn size(&self) -> Decimal;
}

/// An aggregated depth level: `(price, size)`.
///
/// Also the delta shape for plain and incremental sides, where `size` is the
/// new absolute size or the signed change respectively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceLevel {
    /// The price of the level
    pub price: Decimal,
    /// The aggregated resting quantity at that price
    pub size: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }

    /// Parses a `[price, size]` JSON tuple. Numbers and numeric strings are
    /// both accepted; a `null` size reads as zero, which removes the level
    /// on a plain side and leaves it unchanged on an incremental one.
    ///
    /// ## Examples
    ///
    /// ```
    /// use book_delta::{Decimal, PriceLevel};
    ///
    /// let delta = PriceLevel::from_value(&serde_json::json!(["100.5", 2])).unwrap();
    /// assert_eq!(delta, PriceLevel::new(Decimal::new(1005, 1), Decimal::new(2, 0)));
    /// ```
    pub fn from_value(value: &Value) -> Result<Self> {
        let fields = tuple(value, 2)?;
        Ok(Self {
            price: required_decimal(&fields[0], "price")?,
            size: optional_decimal(&fields[1], "size")?.unwrap_or(Decimal::ZERO),
        })
    }
}

impl Level for PriceLevel {
    fn price(&self) -> Decimal {
        self.price
    }

    fn size(&self) -> Decimal {
        self.size
    }
}

/// A depth level that also carries the number of orders aggregated at it:
/// `(price, size, count)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountedLevel {
    pub price: Decimal,
    pub size: Decimal,
    /// Number of discrete resting orders at this price
    pub count: u64,
}

impl CountedLevel {
    pub fn new(price: Decimal, size: Decimal, count: u64) -> Self {
        Self { price, size, count }
    }

    /// Parses a `[price, size, count]` JSON tuple.
    pub fn from_value(value: &Value) -> Result<Self> {
        let fields = tuple(value, 3)?;
        Ok(Self {
            price: required_decimal(&fields[0], "price")?,
            size: optional_decimal(&fields[1], "size")?.unwrap_or(Decimal::ZERO),
            count: count(&fields[2])?,
        })
    }
}

impl Level for CountedLevel {
    fn price(&self) -> Decimal {
        self.price
    }

    fn size(&self) -> Decimal {
        self.size
    }
}

/// An individual resting order in a level-3 book: `(price, size, order_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLevel {
    pub price: Decimal,
    pub size: Decimal,
    pub order_id: String,
}

impl Level for OrderLevel {
    fn price(&self) -> Decimal {
        self.price
    }

    fn size(&self) -> Decimal {
        self.size
    }
}

/// A level-3 update. Exchanges may omit the price on size-only amendments,
/// in which case the last known price of the order is reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDelta {
    pub price: Option<Decimal>,
    pub size: Decimal,
    pub order_id: String,
}

impl OrderDelta {
    pub fn new(price: Option<Decimal>, size: Decimal, order_id: impl Into<String>) -> Self {
        Self {
            price,
            size,
            order_id: order_id.into(),
        }
    }

    /// Parses a `[price, size, order_id]` JSON tuple; `price` may be `null`.
    ///
    /// A `null` price is well-formed here: it amends an order the side
    /// already holds, and is dropped by the side when the order is unknown.
    pub fn from_value(value: &Value) -> Result<Self> {
        let fields = tuple(value, 3)?;
        let order_id = match &fields[2] {
            Value::String(id) => id.clone(),
            Value::Number(id) => id.to_string(),
            other => {
                return Err(Error::MalformedDelta(format!(
                    "order id must be a string or number, got {other}"
                )))
            }
        };

        Ok(Self {
            price: optional_decimal(&fields[0], "price")?,
            size: optional_decimal(&fields[1], "size")?.unwrap_or(Decimal::ZERO),
            order_id,
        })
    }
}

fn tuple(value: &Value, arity: usize) -> Result<&[Value]> {
    match value {
        Value::Array(fields) if fields.len() == arity => Ok(fields),
        other => Err(Error::MalformedDelta(format!(
            "expected a {arity}-element array, got {other}"
        ))),
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    if text.contains(['e', 'E']) {
        Decimal::from_scientific(text).ok()
    } else {
        Decimal::from_str(text).ok()
    }
}

fn optional_decimal(value: &Value, field: &str) -> Result<Option<Decimal>> {
    let parsed = match value {
        Value::Null => return Ok(None),
        Value::String(text) => parse_decimal(text),
        Value::Number(number) => parse_decimal(&number.to_string()),
        _ => None,
    };

    parsed
        .map(Some)
        .ok_or_else(|| Error::MalformedDelta(format!("{field} is not numeric: {value}")))
}

fn required_decimal(value: &Value, field: &str) -> Result<Decimal> {
    optional_decimal(value, field)?
        .ok_or_else(|| Error::MalformedDelta(format!("{field} is missing")))
}

fn count(value: &Value) -> Result<u64> {
    let parsed = match value {
        Value::Null => Some(0),
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.parse().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| Error::MalformedDelta(format!("count is not an integer: {value}")))
}
