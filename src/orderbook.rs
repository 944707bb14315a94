//! The matching engine (C1-C5): twin price-indexed books, the order index,
//! the per-price level aggregator, and the crossing loop. This is the
//! hardest part of the system and the whole reason it exists — everything
//! else in the crate exists to drive or observe this file.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Local;
use indexmap::IndexMap;

use crate::config::EngineConfig;
use crate::level::LevelAggregator;
use crate::orders::{Order, OrderId, OrderKind, OrderModify, Price, Quantity, Side};
use crate::pruner;
use crate::snapshot::{BookSnapshot, LevelInfo};
use crate::trade::{Trade, TradeInfo, Trades};

/// A FIFO of live orders at one price, on one side.
///
/// Backed by an `IndexMap` rather than a `VecDeque<OrderId>` plus a
/// separate lookup table: insertion order is preserved (it's what makes
/// iteration FIFO), and removing an order from the middle of the level —
/// the common case for a cancel — shifts the remaining orders down without
/// disturbing their relative order, which is the property §9 calls
/// "sibling cursor stability". The cost is an O(level depth) shift on
/// interior removal rather than the O(1) a doubly-linked list would give;
/// price levels are rarely deep enough for that to matter, and avoiding
/// unsafe/intrusive list code for it is a deliberate trade (see DESIGN.md).
#[derive(Debug, Default)]
struct PriceLevel {
    orders: IndexMap<OrderId, Order>,
}

impl PriceLevel {
    fn push_back(&mut self, order: Order) {
        self.orders.insert(order.id(), order);
    }

    fn front(&self) -> Option<&Order> {
        self.orders.get_index(0).map(|(_, order)| order)
    }

    fn front_mut(&mut self) -> Option<&mut Order> {
        self.orders.get_index_mut(0).map(|(_, order)| order)
    }

    fn pop_front(&mut self) -> Option<Order> {
        self.orders.shift_remove_index(0).map(|(_, order)| order)
    }

    fn remove(&mut self, id: OrderId) -> Option<Order> {
        self.orders.shift_remove(&id)
    }

    fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    fn total_quantity(&self) -> Quantity {
        self.orders.values().map(Order::remaining_quantity).sum()
    }
}

/// Data shared between the engine and the pruner thread.
struct Shared {
    inner: Mutex<Inner>,
    cv: Condvar,
    shutdown: AtomicBool,
}

/// Everything protected by the single engine-wide mutex (§5): the two
/// books, the order index, and the per-side level aggregators.
struct Inner {
    /// Keyed ascending by `Price` (BTreeMap's native order); the *best*
    /// bid is therefore the highest key, i.e. `.iter().next_back()`.
    bids: BTreeMap<Price, PriceLevel>,
    /// Keyed ascending by `Price`; the best ask is the lowest key, i.e.
    /// `.iter().next()`.
    asks: BTreeMap<Price, PriceLevel>,
    /// OrderId -> (side, price) so a cancel/modify can find an order's
    /// level without scanning either book.
    order_index: HashMap<OrderId, (Side, Price)>,
    bid_levels: LevelAggregator,
    ask_levels: LevelAggregator,
}

impl Inner {
    fn new() -> Self {
        Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            order_index: HashMap::new(),
            bid_levels: LevelAggregator::new(),
            ask_levels: LevelAggregator::new(),
        }
    }

    fn get_order(&self, id: OrderId) -> Option<&Order> {
        let &(side, price) = self.order_index.get(&id)?;
        match side {
            Side::Buy => self.bids.get(&price)?.orders.get(&id),
            Side::Sell => self.asks.get(&price)?.orders.get(&id),
        }
    }

    /// True iff the opposite book is non-empty and `price` crosses it.
    fn can_match(&self, side: Side, price: Price) -> bool {
        match side {
            Side::Buy => self.asks.iter().next().is_some_and(|(&ask, _)| price >= ask),
            Side::Sell => self.bids.iter().next_back().is_some_and(|(&bid, _)| price <= bid),
        }
    }

    /// True iff `quantity` can be matched in full against the opposite
    /// book's resting liquidity, walking best price outward and summing
    /// the level aggregator's quantities (not the per-order FIFOs — this
    /// is a scan of distinct prices, per §4.4).
    fn can_fully_fill(&self, side: Side, price: Price, quantity: Quantity) -> bool {
        if !self.can_match(side, price) {
            return false;
        }

        let mut remaining = quantity;
        match side {
            Side::Buy => {
                for &ask_price in self.asks.keys() {
                    if ask_price > price {
                        break;
                    }
                    let available = self.ask_levels.get(ask_price).map_or(0, |lvl| lvl.quantity);
                    if remaining <= available {
                        return true;
                    }
                    remaining -= available;
                }
            }
            Side::Sell => {
                for &bid_price in self.bids.keys().rev() {
                    if bid_price < price {
                        break;
                    }
                    let available = self.bid_levels.get(bid_price).map_or(0, |lvl| lvl.quantity);
                    if remaining <= available {
                        return true;
                    }
                    remaining -= available;
                }
            }
        }
        false
    }

    /// The crossing loop (§4.4). Repeatedly matches the best bid against
    /// the best ask while they cross, then tail-cleans a resting
    /// FillAndKill left at the top of either book.
    fn match_orders(&mut self) -> Trades {
        let mut trades = Trades::new();

        loop {
            let Some((&bid_price, _)) = self.bids.iter().next_back() else {
                break;
            };
            let Some((&ask_price, _)) = self.asks.iter().next() else {
                break;
            };
            if bid_price < ask_price {
                break;
            }

            loop {
                let bid_empty = self.bids.get(&bid_price).is_none_or(PriceLevel::is_empty);
                let ask_empty = self.asks.get(&ask_price).is_none_or(PriceLevel::is_empty);
                if bid_empty || ask_empty {
                    break;
                }

                let (bid_id, ask_id, quantity) = {
                    let bid = self.bids[&bid_price].front().unwrap();
                    let ask = self.asks[&ask_price].front().unwrap();
                    (bid.id(), ask.id(), bid.remaining_quantity().min(ask.remaining_quantity()))
                };

                let bid_filled = {
                    let level = self.bids.get_mut(&bid_price).unwrap();
                    let order = level.front_mut().unwrap();
                    order.fill(quantity);
                    order.is_filled()
                };
                let ask_filled = {
                    let level = self.asks.get_mut(&ask_price).unwrap();
                    let order = level.front_mut().unwrap();
                    order.fill(quantity);
                    order.is_filled()
                };

                trades.push(Trade {
                    bid: TradeInfo { order_id: bid_id, price: bid_price, quantity },
                    ask: TradeInfo { order_id: ask_id, price: ask_price, quantity },
                });

                if bid_filled {
                    self.bids.get_mut(&bid_price).unwrap().pop_front();
                    self.order_index.remove(&bid_id);
                }
                if ask_filled {
                    self.asks.get_mut(&ask_price).unwrap().pop_front();
                    self.order_index.remove(&ask_id);
                }

                self.bid_levels.on_match(bid_price, quantity, bid_filled);
                self.ask_levels.on_match(ask_price, quantity, ask_filled);

                tracing::debug!(bid_id, ask_id, price = ask_price, quantity, "trade executed");
            }

            if self.bids.get(&bid_price).is_some_and(PriceLevel::is_empty) {
                self.bids.remove(&bid_price);
            }
            if self.asks.get(&ask_price).is_some_and(PriceLevel::is_empty) {
                self.asks.remove(&ask_price);
            }
        }

        // A FillAndKill left resting at the very top of either book after
        // the sweep must never survive. It can only ever be at the head —
        // a FillAndKill is never admitted past the first non-crossing
        // level (§9).
        if let Some(id) = self
            .bids
            .iter()
            .next_back()
            .and_then(|(_, level)| level.front())
            .filter(|order| order.kind() == OrderKind::FillAndKill)
            .map(Order::id)
        {
            self.cancel_order_internal(id);
        }
        if let Some(id) = self
            .asks
            .iter()
            .next()
            .and_then(|(_, level)| level.front())
            .filter(|order| order.kind() == OrderKind::FillAndKill)
            .map(Order::id)
        {
            self.cancel_order_internal(id);
        }

        trades
    }

    fn add_order(&mut self, mut order: Order) -> Trades {
        if self.order_index.contains_key(&order.id()) {
            return Trades::new();
        }

        if order.kind() == OrderKind::Market {
            match order.side() {
                Side::Buy => match self.asks.keys().next_back().copied() {
                    Some(worst_ask) => order.to_good_till_cancel(worst_ask),
                    None => return Trades::new(),
                },
                Side::Sell => match self.bids.keys().next().copied() {
                    Some(worst_bid) => order.to_good_till_cancel(worst_bid),
                    None => return Trades::new(),
                },
            }
        }

        if order.kind() == OrderKind::FillAndKill && !self.can_match(order.side(), order.price()) {
            return Trades::new();
        }

        if order.kind() == OrderKind::FillOrKill
            && !self.can_fully_fill(order.side(), order.price(), order.initial_quantity())
        {
            return Trades::new();
        }

        let (id, side, price, initial_quantity) =
            (order.id(), order.side(), order.price(), order.initial_quantity());

        match side {
            Side::Buy => self.bids.entry(price).or_default().push_back(order),
            Side::Sell => self.asks.entry(price).or_default().push_back(order),
        }
        self.order_index.insert(id, (side, price));
        match side {
            Side::Buy => self.bid_levels.on_add(price, initial_quantity),
            Side::Sell => self.ask_levels.on_add(price, initial_quantity),
        }

        tracing::info!(id, ?side, price, initial_quantity, "order admitted");

        self.match_orders()
    }

    fn cancel_order_internal(&mut self, id: OrderId) {
        let Some((side, price)) = self.order_index.remove(&id) else {
            return;
        };

        match side {
            Side::Buy => {
                if let Some(level) = self.bids.get_mut(&price) {
                    if let Some(order) = level.remove(id) {
                        self.bid_levels.on_cancel(price, order.remaining_quantity());
                    }
                    if level.is_empty() {
                        self.bids.remove(&price);
                    }
                }
            }
            Side::Sell => {
                if let Some(level) = self.asks.get_mut(&price) {
                    if let Some(order) = level.remove(id) {
                        self.ask_levels.on_cancel(price, order.remaining_quantity());
                    }
                    if level.is_empty() {
                        self.asks.remove(&price);
                    }
                }
            }
        }

        tracing::info!(id, "order cancelled");
    }

    fn cancel_orders_internal(&mut self, ids: &[OrderId]) {
        for &id in ids {
            self.cancel_order_internal(id);
        }
    }

    fn modify_order(&mut self, modify: OrderModify) -> Trades {
        let Some(existing_kind) = self.get_order(modify.id()).map(Order::kind) else {
            return Trades::new();
        };
        self.cancel_order_internal(modify.id());
        self.add_order(modify.to_order(existing_kind))
    }

    fn good_for_day_ids(&self) -> Vec<OrderId> {
        self.bids
            .values()
            .chain(self.asks.values())
            .flat_map(|level| level.orders.values())
            .filter(|order| order.kind() == OrderKind::GoodForDay)
            .map(Order::id)
            .collect()
    }

    fn snapshot(&self) -> BookSnapshot {
        let bids = self
            .bids
            .keys()
            .rev()
            .filter_map(|&price| {
                self.bid_levels.get(price).map(|agg| LevelInfo { price, quantity: agg.quantity })
            })
            .collect();
        let asks = self
            .asks
            .keys()
            .filter_map(|&price| {
                self.ask_levels.get(price).map(|agg| LevelInfo { price, quantity: agg.quantity })
            })
            .collect();
        BookSnapshot { bids, asks }
    }
}

/// The price-time priority limit order book for a single instrument.
///
/// All mutating and reading operations are serialized by one internal
/// mutex (§5); there is no finer-grained locking. Construction spawns a
/// background thread that prunes `GoodForDay` orders at the configured
/// daily cutoff (§4.6); dropping the `OrderBook` signals and joins that
/// thread before any other state is torn down.
pub struct OrderBook {
    shared: Arc<Shared>,
    pruner: Option<JoinHandle<()>>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner::new()),
            cv: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });

        let pruner = config.prune_enabled.then(|| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || run_pruner(shared, config))
        });

        Self { shared, pruner }
    }

    /// Admits `order`, matches whatever it crosses, and returns the trades
    /// produced. Returns an empty list, with no booking, for every expected
    /// rejection in §4.4/§6 (duplicate id, unfillable FillOrKill,
    /// non-crossing FillAndKill, priceless Market).
    pub fn add_order(&self, order: Order) -> Trades {
        self.lock().add_order(order)
    }

    /// Removes a live order. Unknown ids are a silent no-op (§6).
    pub fn cancel_order(&self, id: OrderId) {
        self.lock().cancel_order_internal(id);
    }

    /// Cancel-then-add, preserving the target order's kind (§4.4). Unknown
    /// ids are a silent no-op that produces no trades.
    pub fn modify_order(&self, modify: OrderModify) -> Trades {
        self.lock().modify_order(modify)
    }

    /// Count of currently live orders across both books.
    pub fn len(&self) -> usize {
        self.lock().order_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A point-in-time depth snapshot (§4.7).
    pub fn snapshot(&self) -> BookSnapshot {
        self.lock().snapshot()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.shared.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for OrderBook {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.cv.notify_one();
        if let Some(handle) = self.pruner.take() {
            let _ = handle.join();
        }
    }
}

/// Body of the day-end pruner thread (§4.6). Runs until `shared.shutdown`
/// is observed, either right after waking or because the condvar wait was
/// interrupted by the shutdown notification rather than timing out.
fn run_pruner(shared: Arc<Shared>, config: EngineConfig) {
    loop {
        let wait_for = pruner::wait_duration(Local::now(), &config);

        {
            let guard = shared
                .inner
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if shared.shutdown.load(Ordering::Acquire) {
                return;
            }
            let (_guard, wait_result) = shared
                .cv
                .wait_timeout(guard, wait_for)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if !wait_result.timed_out() {
                // Woken before the timeout elapsed: that only happens via
                // the shutdown notification.
                return;
            }
        }

        let order_ids = {
            let inner = shared
                .inner
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            inner.good_for_day_ids()
        };

        if !order_ids.is_empty() {
            let mut inner = shared
                .inner
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            inner.cancel_orders_internal(&order_ids);
        }

        tracing::debug!(count = order_ids.len(), "day-end prune sweep");
    }
}
