//! Bounded history buffers for watch loops.
//!
//! A watch loop polls a shared stream of tickers, trades, candles or orders
//! and wants only what arrived since it last looked. Each cache here is a
//! FIFO with an optional capacity that also counts, per symbol, how many
//! entries are new.
//!
//! ## Lazy reset
//!
//! [`Cache::get_limit`] does not reset the new-entry counter it reads. It only
//! marks it; the counter restarts on the next append for that symbol (or on
//! any append, for the symbol-less global counter). Reading twice without an
//! append in between therefore returns the same count, and the entries the
//! caller is about to consume are never discounted early:
//!
//! ```
//! use book_delta::{ArrayCache, Cache, Symbolic};
//!
//! struct Trade(&'static str);
//! impl Symbolic for Trade {
//!     fn symbol(&self) -> &str { self.0 }
//! }
//!
//! let mut trades = ArrayCache::new(Some(100));
//! trades.append(Trade("BTC/USDT"));
//! trades.append(Trade("BTC/USDT"));
//! assert_eq!(trades.get_limit(Some("BTC/USDT"), None), Some(2));
//! assert_eq!(trades.get_limit(Some("BTC/USDT"), None), Some(2));
//!
//! trades.append(Trade("BTC/USDT"));
//! assert_eq!(trades.get_limit(Some("BTC/USDT"), None), Some(1));
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;
use tracing::trace;

/// Entries that belong to a market symbol.
pub trait Symbolic {
    fn symbol(&self) -> &str;
}

/// Entries keyed by a leading timestamp, such as OHLCV candles.
pub trait Timestamped {
    fn timestamp(&self) -> i64;
}

/// Entries with an identity within their symbol, such as orders (by id) or
/// positions (by side).
pub trait Keyed: Symbolic {
    type Key: Eq + Hash + Clone + fmt::Debug;

    fn key(&self) -> Self::Key;

    /// Folds a newer version of the same entry into this one.
    fn merge(&mut self, update: Self)
    where
        Self: Sized,
    {
        *self = update;
    }
}

/// Operations shared by every watch cache.
pub trait Cache {
    type Item;

    fn append(&mut self, item: Self::Item);

    /// How many entries a watcher should take: the number of new entries for
    /// `symbol` (or across all symbols when `None`), capped by `limit`.
    ///
    /// Returns `limit` unchanged when nothing is known about `symbol`, and
    /// marks the counter for a lazy reset.
    fn get_limit(&mut self, symbol: Option<&str>, limit: Option<usize>) -> Option<usize>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn resolve_limit(new_updates: Option<usize>, limit: Option<usize>) -> Option<usize> {
    match (new_updates, limit) {
        (None, limit) => limit,
        (Some(new_updates), Some(limit)) => Some(new_updates.min(limit)),
        (Some(new_updates), None) => Some(new_updates),
    }
}

fn normalize_capacity(max_size: Option<usize>) -> Option<usize> {
    max_size.filter(|max_size| *max_size > 0)
}

/// Something that counts new entries for one symbol.
trait Tally: Default {
    fn count(&self) -> usize;
}

impl Tally for usize {
    fn count(&self) -> usize {
        *self
    }
}

impl<K: Eq + Hash> Tally for HashSet<K> {
    fn count(&self) -> usize {
        self.len()
    }
}

/// Per-symbol and global new-entry counters with lazy reset.
#[derive(Debug, Clone)]
struct UpdateTracker<V> {
    by_symbol: HashMap<String, V>,
    pending_clear: HashSet<String>,
    all: usize,
    clear_all: bool,
}

impl<V> Default for UpdateTracker<V> {
    fn default() -> Self {
        UpdateTracker {
            by_symbol: HashMap::new(),
            pending_clear: HashSet::new(),
            all: 0,
            clear_all: false,
        }
    }
}

impl<V: Tally> UpdateTracker<V> {
    fn mark_read(&mut self, symbol: Option<&str>) -> Option<usize> {
        match symbol {
            None => {
                self.clear_all = true;
                Some(self.all)
            }
            Some(symbol) => {
                self.pending_clear.insert(symbol.to_string());
                self.by_symbol.get(symbol).map(Tally::count)
            }
        }
    }

    /// `tally` updates the symbol's counter and returns how much the global
    /// counter grows.
    fn record(&mut self, symbol: &str, tally: impl FnOnce(&mut V) -> usize) {
        if self.clear_all {
            self.clear_all = false;
            self.pending_clear.clear();
            self.by_symbol.clear();
            self.all = 0;
        }

        let counter = self.by_symbol.entry(symbol.to_string()).or_default();
        if self.pending_clear.remove(symbol) {
            *counter = V::default();
        }
        self.all += tally(counter);
    }
}

/// FIFO of symbol-tagged entries (tickers, trades) with per-symbol
/// new-entry counters.
#[derive(Debug, Clone)]
pub struct ArrayCache<T> {
    items: VecDeque<T>,
    max_size: Option<usize>,
    updates: UpdateTracker<usize>,
}

impl<T: Symbolic> ArrayCache<T> {
    /// `max_size` of `None` (or zero) means unbounded.
    pub fn new(max_size: Option<usize>) -> Self {
        ArrayCache {
            items: VecDeque::new(),
            max_size: normalize_capacity(max_size),
            updates: UpdateTracker::default(),
        }
    }

    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.items.iter()
    }

    pub fn get(&self, position: usize) -> Option<&T> {
        self.items.get(position)
    }

    /// The newest `count` entries, oldest first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &T> + '_ {
        self.items.iter().skip(self.items.len().saturating_sub(count))
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.updates = UpdateTracker::default();
    }
}

impl<T: Symbolic> Cache for ArrayCache<T> {
    type Item = T;

    fn append(&mut self, item: T) {
        if self.max_size.is_some_and(|max_size| self.items.len() >= max_size) {
            if let Some(evicted) = self.items.pop_front() {
                trace!(symbol = evicted.symbol(), "evicted oldest cache entry");
            }
        }

        let symbol = item.symbol().to_string();
        self.items.push_back(item);
        self.updates.record(&symbol, |count| {
            *count += 1;
            1
        });
    }

    fn get_limit(&mut self, symbol: Option<&str>, limit: Option<usize>) -> Option<usize> {
        resolve_limit(self.updates.mark_read(symbol), limit)
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// FIFO of timestamp-keyed entries (OHLCV candles).
///
/// Appending an entry whose timestamp is already buffered replaces it in
/// place; the new-entry count is the number of distinct timestamps touched
/// since the last read. Symbols are not tracked.
#[derive(Debug, Clone)]
pub struct ArrayCacheByTimestamp<T> {
    items: VecDeque<T>,
    max_size: Option<usize>,
    // timestamp -> absolute sequence number; position = sequence - evicted
    sequences: HashMap<i64, u64>,
    evicted: u64,
    touched: HashSet<i64>,
    clear_updates: bool,
}

impl<T: Timestamped> ArrayCacheByTimestamp<T> {
    pub fn new(max_size: Option<usize>) -> Self {
        ArrayCacheByTimestamp {
            items: VecDeque::new(),
            max_size: normalize_capacity(max_size),
            sequences: HashMap::new(),
            evicted: 0,
            touched: HashSet::new(),
            clear_updates: false,
        }
    }

    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.items.iter()
    }

    pub fn get(&self, position: usize) -> Option<&T> {
        self.items.get(position)
    }

    /// The buffered entry for `timestamp`, in $O(1)$.
    pub fn get_by_timestamp(&self, timestamp: i64) -> Option<&T> {
        let sequence = *self.sequences.get(&timestamp)?;
        self.items.get((sequence - self.evicted) as usize)
    }

    pub fn recent(&self, count: usize) -> impl Iterator<Item = &T> + '_ {
        self.items.iter().skip(self.items.len().saturating_sub(count))
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.sequences.clear();
        self.evicted = 0;
        self.touched.clear();
        self.clear_updates = false;
    }
}

impl<T: Timestamped> Cache for ArrayCacheByTimestamp<T> {
    type Item = T;

    fn append(&mut self, item: T) {
        let timestamp = item.timestamp();

        match self.sequences.get(&timestamp) {
            Some(&sequence) => {
                let position = (sequence - self.evicted) as usize;
                self.items[position] = item;
            }
            None => {
                if self.max_size.is_some_and(|max_size| self.items.len() >= max_size) {
                    if let Some(evicted) = self.items.pop_front() {
                        self.sequences.remove(&evicted.timestamp());
                        self.evicted += 1;
                        trace!(timestamp = evicted.timestamp(), "evicted oldest candle");
                    }
                }
                self.sequences
                    .insert(timestamp, self.evicted + self.items.len() as u64);
                self.items.push_back(item);
            }
        }

        if self.clear_updates {
            self.clear_updates = false;
            self.touched.clear();
        }
        self.touched.insert(timestamp);
    }

    fn get_limit(&mut self, _symbol: Option<&str>, limit: Option<usize>) -> Option<usize> {
        self.clear_updates = true;
        resolve_limit(Some(self.touched.len()), limit)
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// FIFO of entries with an identity inside their symbol.
///
/// An update to a buffered `(symbol, key)` is merged into the existing entry,
/// which moves to the tail without evicting anything. New-entry counters
/// count distinct keys, so repeated updates to one order count once.
#[derive(Debug, Clone)]
pub struct ArrayCacheBySymbolByKey<T: Keyed> {
    items: VecDeque<T>,
    max_size: Option<usize>,
    index: HashSet<(String, T::Key)>,
    updates: UpdateTracker<HashSet<T::Key>>,
}

/// Orders, keyed by exchange order id.
pub type ArrayCacheBySymbolById<T> = ArrayCacheBySymbolByKey<T>;
/// Positions, keyed by position side.
pub type ArrayCacheBySymbolBySide<T> = ArrayCacheBySymbolByKey<T>;

impl<T: Keyed> ArrayCacheBySymbolByKey<T> {
    pub fn new(max_size: Option<usize>) -> Self {
        ArrayCacheBySymbolByKey {
            items: VecDeque::new(),
            max_size: normalize_capacity(max_size),
            index: HashSet::new(),
            updates: UpdateTracker::default(),
        }
    }

    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    pub fn contains(&self, symbol: &str, key: &T::Key) -> bool {
        self.index.contains(&(symbol.to_string(), key.clone()))
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.items.iter()
    }

    pub fn get(&self, position: usize) -> Option<&T> {
        self.items.get(position)
    }

    pub fn recent(&self, count: usize) -> impl Iterator<Item = &T> + '_ {
        self.items.iter().skip(self.items.len().saturating_sub(count))
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
        self.updates = UpdateTracker::default();
    }
}

impl<T: Keyed> Cache for ArrayCacheBySymbolByKey<T> {
    type Item = T;

    fn append(&mut self, item: T) {
        let symbol = item.symbol().to_string();
        let key = item.key();
        let entry = (symbol, key);

        let existing = if self.index.contains(&entry) {
            self.items
                .iter()
                .position(|stored| stored.symbol() == entry.0 && stored.key() == entry.1)
                .and_then(|position| self.items.remove(position))
        } else {
            None
        };

        let item = match existing {
            Some(mut stored) => {
                stored.merge(item);
                stored
            }
            None => {
                if self.max_size.is_some_and(|max_size| self.items.len() >= max_size) {
                    if let Some(evicted) = self.items.pop_front() {
                        trace!(symbol = evicted.symbol(), key = ?evicted.key(), "evicted oldest entry");
                        self.index.remove(&(evicted.symbol().to_string(), evicted.key()));
                    }
                }
                self.index.insert(entry.clone());
                item
            }
        };

        self.items.push_back(item);
        let (symbol, key) = entry;
        self.updates
            .record(&symbol, |keys| usize::from(keys.insert(key)));
    }

    fn get_limit(&mut self, symbol: Option<&str>, limit: Option<usize>) -> Option<usize> {
        resolve_limit(self.updates.mark_read(symbol), limit)
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
