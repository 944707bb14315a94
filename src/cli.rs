use std::fs;
use std::process::ExitCode;

use clap::{Parser, Subcommand, builder::PossibleValuesParser};

use crate::orderbook::OrderBook;
use crate::orders::{Order, OrderKind, Side};
use crate::scenario;
use crate::snapshot::BookSnapshot;

/// CLI driver for the limit order book engine.
#[derive(Parser)]
#[command(name = "order-book-engine")]
#[command(version, about = "A price-time priority limit order book engine")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs a scenario file end to end against a fresh book and prints the
    /// resulting trades and final depth.
    Run {
        /// Path to a scenario file (see the module docs on `scenario`).
        path: String,
    },
    /// Adds a single order to a fresh book and prints any resulting trades.
    Add {
        #[arg(value_parser = PossibleValuesParser::new(["buy", "sell"]))]
        side: String,
        #[arg(value_parser = PossibleValuesParser::new([
            "good-till-cancel", "fill-and-kill", "fill-or-kill", "good-for-day", "market",
        ]))]
        kind: String,
        /// Limit price; ignored (and may be omitted as 0) for a market order.
        price: i32,
        quantity: u32,
        id: u64,
    },
    /// Prints the (empty) book snapshot format used by `run`.
    Book,
}

fn parse_side(side: &str) -> Side {
    match side {
        "buy" => Side::Buy,
        "sell" => Side::Sell,
        other => unreachable!("clap already restricted this value: {other}"),
    }
}

fn parse_kind(kind: &str) -> OrderKind {
    match kind {
        "good-till-cancel" => OrderKind::GoodTillCancel,
        "fill-and-kill" => OrderKind::FillAndKill,
        "fill-or-kill" => OrderKind::FillOrKill,
        "good-for-day" => OrderKind::GoodForDay,
        "market" => OrderKind::Market,
        other => unreachable!("clap already restricted this value: {other}"),
    }
}

fn print_snapshot(snapshot: &BookSnapshot) {
    println!("------ order book ------");
    println!("bids (best first):");
    for level in &snapshot.bids {
        println!("  {} @ {}", level.quantity, level.price);
    }
    println!("asks (best first):");
    for level in &snapshot.asks {
        println!("  {} @ {}", level.quantity, level.price);
    }
    println!("-------------------------");
}

fn handle_run(path: &str) -> ExitCode {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("could not read {path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let book = OrderBook::new();
    let outcome = match scenario::run_scenario(&book, &text) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("{path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    println!("{} trade(s) executed:", outcome.trades.len());
    for trade in &outcome.trades {
        println!(
            "  bid #{} x {} <-> ask #{} x {} @ {}",
            trade.bid.order_id, trade.bid.quantity, trade.ask.order_id, trade.ask.quantity, trade.ask.price
        );
    }

    let snapshot = book.snapshot();
    print_snapshot(&snapshot);

    if let Some((total, bid_levels, ask_levels)) = outcome.expected {
        let actual = (book.len(), snapshot.bid_levels(), snapshot.ask_levels());
        if actual != (total, bid_levels, ask_levels) {
            eprintln!(
                "expected total={total} bid_levels={bid_levels} ask_levels={ask_levels}, got {actual:?}"
            );
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}

fn handle_add(side: String, kind: String, price: i32, quantity: u32, id: u64) {
    let side = parse_side(&side);
    let kind = parse_kind(&kind);
    let order =
        if kind == OrderKind::Market { Order::new_market(id, side, quantity) } else { Order::new(kind, id, side, price, quantity) };

    let book = OrderBook::new();
    let trades = book.add_order(order);
    if trades.is_empty() {
        println!("no trades; order admitted as-is");
    } else {
        for trade in &trades {
            println!(
                "bid #{} x {} <-> ask #{} x {} @ {}",
                trade.bid.order_id, trade.bid.quantity, trade.ask.order_id, trade.ask.quantity, trade.ask.price
            );
        }
    }
    print_snapshot(&book.snapshot());
}

pub fn run_cli() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run { path } => handle_run(&path),
        Commands::Add { side, kind, price, quantity, id } => {
            handle_add(side, kind, price, quantity, id);
            ExitCode::SUCCESS
        }
        Commands::Book => {
            print_snapshot(&OrderBook::new().snapshot());
            ExitCode::SUCCESS
        }
    }
}
