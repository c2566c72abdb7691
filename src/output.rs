use backtester::BacktestResult;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use core_types::Direction;
use engine::Decision;
use screener::ScreenResult;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn direction_cell(direction: Direction) -> Cell {
    let color = match direction {
        Direction::Buy => Color::Green,
        Direction::Sell => Color::Red,
        Direction::Hold => Color::Yellow,
    };
    Cell::new(direction).fg(color)
}

fn percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

pub fn decisions_table(decisions: &[Decision]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Symbol", "Action", "Shares", "Price", "Confidence", "Failed Analyzers"]);
    for d in decisions {
        table.add_row(vec![
            Cell::new(&d.symbol),
            direction_cell(d.direction),
            Cell::new(d.metadata.order_size.unsigned_abs()),
            Cell::new(format!("{:.2}", d.metadata.current_price)),
            Cell::new(percent(d.confidence)),
            Cell::new(d.metadata.failures.len()),
        ]);
    }
    table
}

/// One row per analyzer that contributed to `decision`.
pub fn signals_table(decision: &Decision) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Analyzer", "Signal", "Confidence", "Weight"]);
    for s in &decision.metadata.signals {
        table.add_row(vec![
            Cell::new(&s.analyzer),
            direction_cell(s.signal.direction),
            Cell::new(percent(s.signal.confidence)),
            Cell::new(format!("{:.2}", s.normalized_weight)),
        ]);
    }
    for f in &decision.metadata.failures {
        table.add_row(vec![
            Cell::new(&f.analyzer),
            Cell::new("FAILED").fg(Color::DarkGrey),
            Cell::new(&f.error),
            Cell::new("-"),
        ]);
    }
    table
}

pub fn backtest_table(result: &BacktestResult) -> Table {
    let report = &result.report;
    let optional = |value: Option<f64>| value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"));

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Run ID".to_string(), result.run_id.to_string()]);
    table.add_row(vec!["Symbols".to_string(), result.symbols.join(", ")]);
    if !result.skipped_symbols.is_empty() {
        table.add_row(vec!["Skipped".to_string(), result.skipped_symbols.join(", ")]);
    }
    table.add_row(vec!["Trading Days".to_string(), report.trading_days.to_string()]);
    table.add_row(vec!["Initial Value".to_string(), format!("{:.2}", report.initial_value)]);
    table.add_row(vec!["Final Value".to_string(), format!("{:.2}", report.final_value)]);
    table.add_row(vec!["Net Profit".to_string(), format!("{:.2}", report.total_net_profit)]);
    table.add_row(vec!["Total Return".to_string(), percent(report.total_return)]);
    table.add_row(vec!["Sharpe Ratio".to_string(), optional(report.sharpe_ratio)]);
    table.add_row(vec![
        "Annualized Volatility".to_string(),
        report
            .annualized_volatility
            .map_or_else(|| "n/a".to_string(), percent),
    ]);
    table.add_row(vec!["Max Drawdown".to_string(), percent(report.max_drawdown)]);
    table.add_row(vec!["Trades".to_string(), result.trades.len().to_string()]);
    table.add_row(vec!["Rejected Orders".to_string(), result.rejected_orders.to_string()]);
    table
}

pub fn screen_table(results: &[ScreenResult]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Symbol",
        "Price",
        "Target",
        "Upside",
        "Signal",
        "Confidence",
        "Avg Volume",
    ]);
    for r in results {
        let upside = Cell::new(format!("{:.1}%", r.potential_upside)).fg(if r.potential_upside >= 0.0 {
            Color::Green
        } else {
            Color::Red
        });
        table.add_row(vec![
            Cell::new(&r.symbol),
            Cell::new(format!("{:.2}", r.current_price)),
            Cell::new(format!("{:.2}", r.target_price)),
            upside,
            Cell::new(format!("{:+.2}", r.aggregate_signal)),
            Cell::new(percent(r.confidence)),
            Cell::new(format!("{:.0}", r.average_volume)),
        ]);
    }
    table
}
