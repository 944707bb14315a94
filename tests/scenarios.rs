//! End-to-end scenario tests, one per named case.
//!
//! The input lines and expected `R` assertions mirror the scenario file
//! grammar directly; trade contents are additionally checked wherever a
//! scenario's whole point is which orders traded at what price and
//! quantity, not just the final book shape.

use order_book_engine::config::EngineConfig;
use order_book_engine::orderbook::OrderBook;
use order_book_engine::scenario::run_scenario;

fn fresh_book() -> OrderBook {
    OrderBook::with_config(EngineConfig { prune_enabled: false, ..EngineConfig::default() })
}

fn assert_final_shape(book: &OrderBook, expected: Option<(usize, usize, usize)>) {
    let snapshot = book.snapshot();
    assert_eq!(
        expected,
        Some((book.len(), snapshot.bid_levels(), snapshot.ask_levels())),
        "final book shape did not match the scenario's R line"
    );
}

#[test]
fn match_good_till_cancel() {
    let book = fresh_book();
    let text = "\
        A B GoodTillCancel 100 10 1\n\
        A S GoodTillCancel 100 10 2\n\
        R 0 0 0\n";
    let outcome = run_scenario(&book, text).unwrap();
    assert_eq!(outcome.trades.len(), 1);
    assert_eq!(outcome.trades[0].bid.order_id, 1);
    assert_eq!(outcome.trades[0].ask.order_id, 2);
    assert_eq!(outcome.trades[0].bid.quantity, 10);
    assert_final_shape(&book, outcome.expected);
}

#[test]
fn match_fill_and_kill() {
    let book = fresh_book();
    let text = "\
        A B GoodTillCancel 100 10 1\n\
        A S FillAndKill 100 5 2\n\
        R 1 1 0\n";
    let outcome = run_scenario(&book, text).unwrap();
    assert_eq!(outcome.trades.len(), 1);
    assert_eq!(outcome.trades[0].bid.quantity, 5);
    assert_final_shape(&book, outcome.expected);
    assert_eq!(book.snapshot().bids[0].quantity, 5);
}

#[test]
fn match_fill_or_kill_hit() {
    let book = fresh_book();
    let text = "\
        A B GoodTillCancel 100 10 1\n\
        A S FillOrKill 100 10 2\n\
        R 0 0 0\n";
    let outcome = run_scenario(&book, text).unwrap();
    assert_eq!(outcome.trades.len(), 1);
    assert_final_shape(&book, outcome.expected);
}

#[test]
fn match_fill_or_kill_miss() {
    let book = fresh_book();
    let text = "\
        A B GoodTillCancel 100 5 1\n\
        A S FillOrKill 100 10 2\n\
        R 1 1 0\n";
    let outcome = run_scenario(&book, text).unwrap();
    assert!(outcome.trades.is_empty());
    assert_final_shape(&book, outcome.expected);
    assert_eq!(book.snapshot().bids[0].quantity, 5);
}

#[test]
fn cancel_success() {
    let book = fresh_book();
    let text = "\
        A B GoodTillCancel 100 10 1\n\
        C 1\n\
        R 0 0 0\n";
    let outcome = run_scenario(&book, text).unwrap();
    assert_final_shape(&book, outcome.expected);
}

#[test]
fn modify_side() {
    let book = fresh_book();
    // the modify preserves order 1's kind (GoodTillCancel) but flips it to
    // the sell side, where it then matches the new bid admitted after it.
    let text = "\
        A B GoodTillCancel 100 10 1\n\
        M 1 S 100 10\n\
        A B GoodTillCancel 100 10 3\n\
        R 0 0 0\n";
    let outcome = run_scenario(&book, text).unwrap();
    assert_eq!(outcome.trades.len(), 1);
    assert_eq!(outcome.trades[0].bid.order_id, 3);
    assert_eq!(outcome.trades[0].ask.order_id, 1);
    assert_final_shape(&book, outcome.expected);
}

#[test]
fn match_market() {
    let book = fresh_book();
    let text = "\
        A S GoodTillCancel 100 10 1\n\
        A B Market 0 10 2\n\
        R 0 0 0\n";
    let outcome = run_scenario(&book, text).unwrap();
    assert_eq!(outcome.trades.len(), 1);
    assert_eq!(outcome.trades[0].bid.order_id, 2);
    assert_eq!(outcome.trades[0].bid.price, 100);
    assert_eq!(outcome.trades[0].ask.order_id, 1);
    assert_final_shape(&book, outcome.expected);
}

#[test]
fn fill_or_kill_feasibility_tight_to_the_unit() {
    let book = fresh_book();
    let text = "\
        A S GoodTillCancel 99 3 1\n\
        A S GoodTillCancel 100 7 2\n\
        A B FillOrKill 100 10 3\n\
        R 0 0 0\n";
    let outcome = run_scenario(&book, text).unwrap();
    assert_eq!(outcome.trades.len(), 2);
    assert_final_shape(&book, outcome.expected);
}

#[test]
fn market_into_empty_book_is_rejected_without_error() {
    let book = fresh_book();
    let text = "A B Market 0 10 1\nR 0 0 0\n";
    let outcome = run_scenario(&book, text).unwrap();
    assert!(outcome.trades.is_empty());
    assert_final_shape(&book, outcome.expected);
}

#[test]
fn malformed_line_aborts_the_scenario() {
    let book = fresh_book();
    let text = "A B GoodTillCancel 100 10 1\nA Z GoodTillCancel 100 10 2\n";
    assert!(run_scenario(&book, text).is_err());
}
