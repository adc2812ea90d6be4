//! One side of a limit order book, maintained from streaming deltas.
//!
//! A [`BookSide`] keeps its levels sorted best-first: descending price for
//! bids, ascending for asks. Both sides share one ascending binary search by
//! storing the negated price as the sort key on the bid side.
//!
//! How a delta is merged into the side is decided by a [`Merge`] policy:
//!
//! - [`Plain`]: `(price, size)`, zero size removes the level
//! - [`Counted`]: `(price, size, count)`, zero size or zero count removes
//! - [`Indexed`]: `(price?, size, order_id)`, one entry per resting order
//! - [`Incremental`]: `(price, signed change)`, removed once the size drops
//!   to zero or below
//!
//! Lookups are $O(\log{N})$; inserts and removals shift the backing vectors,
//! which is cheap in practice because updates cluster near the best price.

use crate::precise::Precise;
use crate::types::{CountedLevel, Level, OrderDelta, OrderLevel, PriceLevel, Side};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::ops::Index;
use tracing::{debug, trace};

/// Sort keys and levels of one side, kept in lock-step.
///
/// Every mutating method updates both vectors together and derives the key
/// from the level's own price, so the two can never disagree.
#[derive(Debug, Clone)]
pub struct Ladder<L> {
    side: Side,
    keys: Vec<Decimal>,
    levels: Vec<L>,
}

impl<L: Level> Ladder<L> {
    fn new(side: Side) -> Self {
        Ladder {
            side,
            keys: Vec::new(),
            levels: Vec::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn levels(&self) -> &[L] {
        &self.levels
    }

    /// First position whose price is not better than `price`.
    pub fn lower_bound(&self, price: Decimal) -> usize {
        let key = self.side.sort_key(price);
        self.keys.partition_point(|probe| *probe < key)
    }

    /// First position whose price is strictly worse than `price`, i.e. just
    /// after every existing entry at that price.
    pub fn upper_bound(&self, price: Decimal) -> usize {
        let key = self.side.sort_key(price);
        self.keys.partition_point(|probe| *probe <= key)
    }

    /// Locates `price`: `Ok(position)` on an exact match, otherwise
    /// `Err(position)` where a level at that price would be inserted.
    pub fn find(&self, price: Decimal) -> Result<usize, usize> {
        let position = self.lower_bound(price);
        match self.keys.get(position) {
            Some(key) if *key == self.side.sort_key(price) => Ok(position),
            _ => Err(position),
        }
    }

    pub fn insert(&mut self, position: usize, level: L) {
        let key = self.side.sort_key(level.price());
        debug_assert!(position == 0 || self.keys[position - 1] <= key);
        debug_assert!(position == self.keys.len() || key <= self.keys[position]);
        self.keys.insert(position, key);
        self.levels.insert(position, level);
    }

    /// Overwrites the level at `position`; the price must not change.
    pub fn replace(&mut self, position: usize, level: L) {
        debug_assert_eq!(self.keys[position], self.side.sort_key(level.price()));
        self.levels[position] = level;
    }

    pub fn remove(&mut self, position: usize) -> L {
        self.keys.remove(position);
        self.levels.remove(position)
    }

    /// Keeps the first `len` levels and returns the discarded tail.
    fn truncate(&mut self, len: usize) -> Vec<L> {
        if len >= self.levels.len() {
            return Vec::new();
        }
        self.keys.truncate(len);
        self.levels.split_off(len)
    }

    fn clear(&mut self) {
        self.keys.clear();
        self.levels.clear();
    }
}

/// Strategy deciding how a delta changes a [`Ladder`].
pub trait Merge: Clone + Default + fmt::Debug {
    /// The update tuple this policy consumes
    type Delta: fmt::Debug;
    /// The entry this policy stores
    type Level: Level;

    fn store(&mut self, ladder: &mut Ladder<Self::Level>, delta: Self::Delta);

    /// Called for every level discarded by a depth limit.
    fn evicted(&mut self, _level: &Self::Level) {}

    /// Drops any state kept next to the ladder.
    fn clear(&mut self) {}
}

/// Level-2 side keyed by price; a delta carries the new absolute size.
#[derive(Debug, Clone, Default)]
pub struct Plain;

impl Merge for Plain {
    type Delta = PriceLevel;
    type Level = PriceLevel;

    fn store(&mut self, ladder: &mut Ladder<PriceLevel>, delta: PriceLevel) {
        match ladder.find(delta.price) {
            Ok(position) if delta.size.is_zero() => {
                ladder.remove(position);
            }
            Ok(position) => ladder.replace(position, delta),
            Err(position) if !delta.size.is_zero() => ladder.insert(position, delta),
            Err(_) => {}
        }
    }
}

/// Level-2 side that also tracks how many orders make up each level.
#[derive(Debug, Clone, Default)]
pub struct Counted;

impl Merge for Counted {
    type Delta = CountedLevel;
    type Level = CountedLevel;

    fn store(&mut self, ladder: &mut Ladder<CountedLevel>, delta: CountedLevel) {
        let removal = delta.size.is_zero() || delta.count == 0;
        match ladder.find(delta.price) {
            Ok(position) if removal => {
                ladder.remove(position);
            }
            Ok(position) => ladder.replace(position, delta),
            Err(position) if !removal => ladder.insert(position, delta),
            Err(_) => {}
        }
    }
}

/// Level-2 side whose deltas are signed changes to the resting size.
///
/// A zero change is a no-op, not a removal.
#[derive(Debug, Clone, Default)]
pub struct Incremental;

impl Merge for Incremental {
    type Delta = PriceLevel;
    type Level = PriceLevel;

    fn store(&mut self, ladder: &mut Ladder<PriceLevel>, delta: PriceLevel) {
        match ladder.find(delta.price) {
            Ok(position) => {
                let size = ladder.levels()[position].size + delta.size;
                if size > Decimal::ZERO {
                    ladder.replace(position, PriceLevel::new(delta.price, size));
                } else {
                    ladder.remove(position);
                }
            }
            Err(position) if delta.size > Decimal::ZERO => ladder.insert(position, delta),
            Err(_) => {}
        }
    }
}

/// Level-3 side with one entry per order, indexed by order id.
///
/// Orders at the same price keep their arrival order. An order whose price
/// changes loses its place and is re-queued at the new price.
#[derive(Debug, Clone, Default)]
pub struct Indexed {
    prices: HashMap<String, Decimal>,
}

impl Indexed {
    fn locate(ladder: &Ladder<OrderLevel>, price: Decimal, order_id: &str) -> Option<usize> {
        let start = ladder.lower_bound(price);
        ladder.levels()[start..]
            .iter()
            .take_while(|level| level.price == price)
            .position(|level| level.order_id == order_id)
            .map(|offset| start + offset)
    }
}

impl Merge for Indexed {
    type Delta = OrderDelta;
    type Level = OrderLevel;

    /// A delta without a price for an order the side does not hold (never
    /// seen, or evicted by a depth limit) cannot be placed and is dropped.
    fn store(&mut self, ladder: &mut Ladder<OrderLevel>, delta: OrderDelta) {
        let OrderDelta {
            price,
            size,
            order_id,
        } = delta;
        let known = self.prices.get(&order_id).copied();

        if size.is_zero() {
            if let Some(position) = known.and_then(|known| Self::locate(ladder, known, &order_id)) {
                ladder.remove(position);
            }
            self.prices.remove(&order_id);
            return;
        }

        let Some(price) = price.or(known) else {
            debug!(
                side = ?ladder.side(),
                order_id = %order_id,
                "dropping price-less delta for unknown order"
            );
            return;
        };

        let existing = known.and_then(|known| Self::locate(ladder, known, &order_id));
        if let Some(position) = existing {
            if known == Some(price) {
                ladder.replace(position, OrderLevel { price, size, order_id });
                return;
            }
            ladder.remove(position);
        }

        self.prices.insert(order_id.clone(), price);
        let position = ladder.upper_bound(price);
        ladder.insert(position, OrderLevel { price, size, order_id });
    }

    fn evicted(&mut self, level: &OrderLevel) {
        self.prices.remove(&level.order_id);
    }

    fn clear(&mut self) {
        self.prices.clear();
    }
}

/// One side of an order book, sorted best price first.
///
/// ## Examples
///
/// ```
/// use book_delta::{Decimal, PlainSide, Side};
///
/// let mut bids = PlainSide::new(Side::Bid, None);
/// bids.store(Decimal::from(100), Decimal::from(5));
/// bids.store(Decimal::from(99), Decimal::from(3));
/// bids.store(Decimal::from(100), Decimal::ZERO);
///
/// assert_eq!(bids.len(), 1);
/// assert_eq!(bids[0].price, Decimal::from(99));
/// ```
#[derive(Debug, Clone)]
pub struct BookSide<M: Merge> {
    ladder: Ladder<M::Level>,
    merge: M,
    depth: Option<usize>,
}

/// Price-keyed side storing absolute sizes.
pub type PlainSide = BookSide<Plain>;
/// Price-keyed side storing sizes and order counts.
pub type CountedSide = BookSide<Counted>;
/// Order-keyed side for level-3 books.
pub type IndexedSide = BookSide<Indexed>;
/// Price-keyed side applying signed size changes.
pub type IncrementalSide = BookSide<Incremental>;

impl<M: Merge> BookSide<M> {
    /// Creates an empty side. `depth` caps the number of levels kept by
    /// [`limit`](Self::limit); `None` means unbounded.
    pub fn new(side: Side, depth: Option<usize>) -> Self {
        BookSide {
            ladder: Ladder::new(side),
            merge: M::default(),
            depth,
        }
    }

    /// Creates a side from an initial run of deltas, applied exactly as
    /// streamed deltas would be.
    pub fn with_deltas(
        side: Side,
        deltas: impl IntoIterator<Item = M::Delta>,
        depth: Option<usize>,
    ) -> Self {
        let mut book_side = Self::new(side, depth);
        for delta in deltas {
            book_side.store_array(delta);
        }
        book_side
    }

    /// Applies one delta.
    pub fn store_array(&mut self, delta: M::Delta) {
        trace!(side = ?self.ladder.side(), ?delta, "storing delta");
        self.merge.store(&mut self.ladder, delta);
    }

    /// Truncates to the configured depth, if any.
    pub fn limit(&mut self) {
        if let Some(depth) = self.depth {
            self.limit_to(depth);
        }
    }

    /// Keeps only the `len` best levels.
    pub fn limit_to(&mut self, len: usize) {
        let evicted = self.ladder.truncate(len);
        if evicted.is_empty() {
            return;
        }

        for level in &evicted {
            self.merge.evicted(level);
        }
        debug!(
            side = ?self.ladder.side(),
            evicted = evicted.len(),
            kept = len,
            "truncated book side"
        );
    }

    pub fn clear(&mut self) {
        self.ladder.clear();
        self.merge.clear();
    }

    pub fn side(&self) -> Side {
        self.ladder.side()
    }

    pub fn depth(&self) -> Option<usize> {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.ladder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ladder.is_empty()
    }

    /// Levels in best-first order.
    pub fn levels(&self) -> &[M::Level] {
        self.ladder.levels()
    }

    pub fn get(&self, position: usize) -> Option<&M::Level> {
        self.ladder.levels().get(position)
    }

    /// The best level: highest bid or lowest ask.
    pub fn best(&self) -> Option<&M::Level> {
        self.get(0)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, M::Level> {
        self.ladder.levels().iter()
    }

    /// Total size resting in the best `levels` levels.
    pub fn volume(&self, levels: usize) -> Precise {
        self.iter()
            .take(levels)
            .map(|level| Precise::from(level.size()))
            .sum()
    }

    /// Total `price × size` of the best `levels` levels.
    pub fn notional(&self, levels: usize) -> Precise {
        self.iter()
            .take(levels)
            .map(|level| Precise::from(level.price()) * Precise::from(level.size()))
            .sum()
    }
}

impl<M: Merge> Index<usize> for BookSide<M> {
    type Output = M::Level;

    fn index(&self, position: usize) -> &M::Level {
        &self.ladder.levels()[position]
    }
}

impl<'a, M: Merge> IntoIterator for &'a BookSide<M> {
    type Item = &'a M::Level;
    type IntoIter = std::slice::Iter<'a, M::Level>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl BookSide<Plain> {
    /// Sets the size at `price`; zero removes the level.
    pub fn store(&mut self, price: Decimal, size: Decimal) {
        self.store_array(PriceLevel::new(price, size));
    }
}

impl BookSide<Counted> {
    /// Sets size and order count at `price`; zero in either removes the level.
    pub fn store(&mut self, price: Decimal, size: Decimal, count: u64) {
        self.store_array(CountedLevel::new(price, size, count));
    }
}

impl BookSide<Incremental> {
    /// Adds the signed `change` to the size resting at `price`.
    pub fn store(&mut self, price: Decimal, change: Decimal) {
        self.store_array(PriceLevel::new(price, change));
    }
}

impl BookSide<Indexed> {
    /// Inserts, amends, moves or (with zero size) removes an order.
    ///
    /// A `None` price amends a resting order in place; for an order the side
    /// does not hold it is a no-op.
    pub fn store(&mut self, price: Option<Decimal>, size: Decimal, order_id: impl Into<String>) {
        self.store_array(OrderDelta::new(price, size, order_id));
    }

    pub fn contains_order(&self, order_id: &str) -> bool {
        self.merge.prices.contains_key(order_id)
    }

    /// Number of orders tracked by the id index.
    pub fn order_count(&self) -> usize {
        self.merge.prices.len()
    }
}
