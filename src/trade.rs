use serde::{Deserialize, Serialize};

use crate::orders::{OrderId, Price, Quantity};

/// One side's view of a match: which order was involved, at what price,
/// and for how much.
///
/// `price` is always the resting order's own price at that side — for a
/// converted Market taker that is the pegged worst-opposite price it was
/// re-priced to on admission (§4.5), not the original order's (nonexistent)
/// limit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeInfo {
    pub order_id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
}

/// A single match between a resting bid and a resting ask.
///
/// `bid.quantity == ask.quantity`, both equal to
/// `min(bid.remaining, ask.remaining)` at the moment of the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub bid: TradeInfo,
    pub ask: TradeInfo,
}

pub type Trades = Vec<Trade>;
