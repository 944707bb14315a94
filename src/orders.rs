use serde::{Deserialize, Serialize};

/// A signed 32-bit price tick. Negative ticks are legal (they just mean
/// "below zero on whatever scale the caller picked"); there is no notion
/// of fractional prices.
pub type Price = i32;

/// An order quantity, or the remaining/filled portion of one.
pub type Quantity = u32;

/// Unique for the lifetime of the process; the engine never reuses one.
pub type OrderId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

/// The lifetime/admission policy attached to an order.
///
/// `Market` is transient: [`Order::new_market`] constructs one with no
/// meaningful price, and the engine converts it to a priced
/// `GoodTillCancel` the moment it is admitted (see `OrderBook::add_order`).
/// A `Market` order that somehow survives admission unconverted is a bug,
/// not a state callers ever observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    GoodTillCancel,
    FillAndKill,
    FillOrKill,
    GoodForDay,
    Market,
}

/// A resting or in-flight order.
///
/// Invariant: `remaining_quantity <= initial_quantity`, and
/// `remaining_quantity == 0` iff the order is fully filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    side: Side,
    kind: OrderKind,
    price: Price,
    initial_quantity: Quantity,
    remaining_quantity: Quantity,
}

impl Order {
    pub fn new(kind: OrderKind, id: OrderId, side: Side, price: Price, quantity: Quantity) -> Self {
        Self {
            id,
            side,
            kind,
            price,
            initial_quantity: quantity,
            remaining_quantity: quantity,
        }
    }

    /// A market order carries no meaningful price until the engine re-pegs
    /// it against the opposite book's worst price on admission.
    pub fn new_market(id: OrderId, side: Side, quantity: Quantity) -> Self {
        Self::new(OrderKind::Market, id, side, 0, quantity)
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn kind(&self) -> OrderKind {
        self.kind
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn initial_quantity(&self) -> Quantity {
        self.initial_quantity
    }

    pub fn remaining_quantity(&self) -> Quantity {
        self.remaining_quantity
    }

    pub fn filled_quantity(&self) -> Quantity {
        self.initial_quantity - self.remaining_quantity
    }

    pub fn is_filled(&self) -> bool {
        self.remaining_quantity == 0
    }

    /// Fills `quantity` units of this order.
    ///
    /// # Panics
    /// Panics if `quantity` exceeds the order's remaining quantity. That can
    /// only happen if the matching loop has a bug; it is not a condition a
    /// caller can trigger.
    pub fn fill(&mut self, quantity: Quantity) {
        if quantity > self.remaining_quantity {
            panic!(
                "order {} cannot be filled for {} units, only {} remain",
                self.id, quantity, self.remaining_quantity
            );
        }
        self.remaining_quantity -= quantity;
    }

    /// Converts a `Market` order into a priced `GoodTillCancel`, pegged to
    /// `price` (the worst price on the opposite book — see §4.5).
    ///
    /// # Panics
    /// Panics if called on anything but a `Market` order: only a market
    /// order's price is ever adjusted after construction.
    pub fn to_good_till_cancel(&mut self, price: Price) {
        if self.kind != OrderKind::Market {
            panic!(
                "order {} cannot have its price adjusted, only Market orders can",
                self.id
            );
        }
        self.price = price;
        self.kind = OrderKind::GoodTillCancel;
    }
}

/// A cancel-then-add request that preserves the target order's kind.
///
/// `OrderBook::modify_order` captures the existing order's [`OrderKind`]
/// and rebuilds an [`Order`] from this plus that captured kind; the new
/// order therefore loses time priority (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderModify {
    id: OrderId,
    side: Side,
    price: Price,
    quantity: Quantity,
}

impl OrderModify {
    pub fn new(id: OrderId, side: Side, price: Price, quantity: Quantity) -> Self {
        Self {
            id,
            side,
            price,
            quantity,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn to_order(&self, kind: OrderKind) -> Order {
        Order::new(kind, self.id, self.side, self.price, self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_tracks_remaining_and_filled() {
        let mut order = Order::new(OrderKind::GoodTillCancel, 1, Side::Buy, 100, 10);
        order.fill(4);
        assert_eq!(order.remaining_quantity(), 6);
        assert_eq!(order.filled_quantity(), 4);
        assert!(!order.is_filled());
        order.fill(6);
        assert!(order.is_filled());
    }

    #[test]
    #[should_panic(expected = "cannot be filled for")]
    fn fill_past_remaining_panics() {
        let mut order = Order::new(OrderKind::GoodTillCancel, 1, Side::Buy, 100, 5);
        order.fill(6);
    }

    #[test]
    fn market_order_converts_to_good_till_cancel() {
        let mut order = Order::new_market(1, Side::Buy, 10);
        order.to_good_till_cancel(150);
        assert_eq!(order.kind(), OrderKind::GoodTillCancel);
        assert_eq!(order.price(), 150);
    }

    #[test]
    #[should_panic(expected = "only Market orders can")]
    fn repricing_a_non_market_order_panics() {
        let mut order = Order::new(OrderKind::GoodTillCancel, 1, Side::Buy, 100, 5);
        order.to_good_till_cancel(150);
    }

    #[test]
    fn modify_preserves_side_price_and_quantity() {
        let modify = OrderModify::new(7, Side::Sell, 200, 3);
        let order = modify.to_order(OrderKind::FillAndKill);
        assert_eq!(order.id(), 7);
        assert_eq!(order.side(), Side::Sell);
        assert_eq!(order.price(), 200);
        assert_eq!(order.initial_quantity(), 3);
        assert_eq!(order.kind(), OrderKind::FillAndKill);
    }
}
