//! The scenario-file text format (§6): a line-oriented external caller
//! protocol that is explicitly out of scope as a network surface but is
//! still the way this crate's own CLI and integration tests drive the
//! engine, so it gets a proper parser rather than being left as a demo.
//!
//! Each non-blank line is one record:
//!
//! ```text
//! A side kind price quantity id   -- add
//! M id side price quantity        -- modify
//! C id                            -- cancel
//! R total bid_levels ask_levels   -- assert final book shape
//! ```

use crate::errors::ScenarioError;
use crate::orderbook::OrderBook;
use crate::orders::{Order, OrderId, OrderKind, OrderModify, Price, Quantity, Side};
use crate::trade::Trades;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Add { id: OrderId, side: Side, kind: OrderKind, price: Price, quantity: Quantity },
    Modify { id: OrderId, side: Side, price: Price, quantity: Quantity },
    Cancel { id: OrderId },
    Result { total: usize, bid_levels: usize, ask_levels: usize },
}

fn field<'a>(
    fields: &mut impl Iterator<Item = &'a str>,
    line: usize,
    name: &'static str,
) -> Result<&'a str, ScenarioError> {
    fields.next().ok_or(ScenarioError::MissingField { line, field: name })
}

fn parse_side(line: usize, value: &str) -> Result<Side, ScenarioError> {
    match value {
        "B" => Ok(Side::Buy),
        "S" => Ok(Side::Sell),
        _ => Err(ScenarioError::InvalidSide { line, value: value.to_string() }),
    }
}

fn parse_kind(line: usize, value: &str) -> Result<OrderKind, ScenarioError> {
    match value {
        "GoodTillCancel" => Ok(OrderKind::GoodTillCancel),
        "FillAndKill" => Ok(OrderKind::FillAndKill),
        "FillOrKill" => Ok(OrderKind::FillOrKill),
        "GoodForDay" => Ok(OrderKind::GoodForDay),
        "Market" => Ok(OrderKind::Market),
        _ => Err(ScenarioError::InvalidKind { line, value: value.to_string() }),
    }
}

fn parse_u64(line: usize, value: &str) -> Result<u64, ScenarioError> {
    value
        .parse()
        .map_err(|source| ScenarioError::InvalidInteger { line, value: value.to_string(), source })
}

fn parse_u32(line: usize, value: &str) -> Result<u32, ScenarioError> {
    value
        .parse()
        .map_err(|source| ScenarioError::InvalidInteger { line, value: value.to_string(), source })
}

fn parse_price(line: usize, value: &str) -> Result<Price, ScenarioError> {
    value
        .parse()
        .map_err(|source| ScenarioError::InvalidInteger { line, value: value.to_string(), source })
}

fn parse_usize(line: usize, value: &str) -> Result<usize, ScenarioError> {
    value
        .parse::<i64>()
        .map_err(|source| ScenarioError::InvalidInteger { line, value: value.to_string(), source })
        .and_then(|n| {
            usize::try_from(n).map_err(|_| ScenarioError::NegativeValue { line, value: value.to_string() })
        })
}

/// Parses one non-blank scenario line. `line` is the 1-based line number,
/// used only to make error messages locatable.
pub fn parse_line(line: usize, raw: &str) -> Result<Record, ScenarioError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ScenarioError::EmptyLine { line });
    }

    let mut fields = trimmed.split_whitespace();
    let kind_field = field(&mut fields, line, "record kind")?;

    match kind_field {
        "A" => {
            let side = parse_side(line, field(&mut fields, line, "side")?)?;
            let kind = parse_kind(line, field(&mut fields, line, "kind")?)?;
            let price = parse_price(line, field(&mut fields, line, "price")?)?;
            let quantity = parse_u32(line, field(&mut fields, line, "quantity")?)?;
            let id = parse_u64(line, field(&mut fields, line, "id")?)?;
            Ok(Record::Add { id, side, kind, price, quantity })
        }
        "M" => {
            let id = parse_u64(line, field(&mut fields, line, "id")?)?;
            let side = parse_side(line, field(&mut fields, line, "side")?)?;
            let price = parse_price(line, field(&mut fields, line, "price")?)?;
            let quantity = parse_u32(line, field(&mut fields, line, "quantity")?)?;
            Ok(Record::Modify { id, side, price, quantity })
        }
        "C" => {
            let id = parse_u64(line, field(&mut fields, line, "id")?)?;
            Ok(Record::Cancel { id })
        }
        "R" => {
            let total = parse_usize(line, field(&mut fields, line, "total")?)?;
            let bid_levels = parse_usize(line, field(&mut fields, line, "bid_levels")?)?;
            let ask_levels = parse_usize(line, field(&mut fields, line, "ask_levels")?)?;
            Ok(Record::Result { total, bid_levels, ask_levels })
        }
        other => Err(ScenarioError::UnknownKind { line, kind: other.to_string() }),
    }
}

/// The outcome of running a whole scenario: every trade produced, in
/// order, plus the terminal `R` assertion if the scenario ended with one.
#[derive(Debug, Clone, Default)]
pub struct ScenarioOutcome {
    pub trades: Trades,
    pub expected: Option<(usize, usize, usize)>,
}

/// Runs every record in `text` against `book` in order, skipping blank
/// lines. Stops and returns the first parse error encountered; a
/// scenario's engine-level rejections (duplicate id, unfillable
/// FillOrKill, ...) are not errors and simply contribute no trades.
pub fn run_scenario(book: &OrderBook, text: &str) -> Result<ScenarioOutcome, ScenarioError> {
    let mut outcome = ScenarioOutcome::default();

    for (offset, raw) in text.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        let line = offset + 1;
        match parse_line(line, raw)? {
            Record::Add { id, side, kind, price, quantity } => {
                let order = if kind == OrderKind::Market {
                    Order::new_market(id, side, quantity)
                } else {
                    Order::new(kind, id, side, price, quantity)
                };
                outcome.trades.extend(book.add_order(order));
            }
            Record::Modify { id, side, price, quantity } => {
                outcome.trades.extend(book.modify_order(OrderModify::new(id, side, price, quantity)));
            }
            Record::Cancel { id } => book.cancel_order(id),
            Record::Result { total, bid_levels, ask_levels } => {
                outcome.expected = Some((total, bid_levels, ask_levels));
            }
        }
    }

    Ok(outcome)
}
