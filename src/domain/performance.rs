//! Performance history and the derived analysis report.
//!
//! Each successful cycle appends one [`PerformanceSnapshot`]. The report is a
//! read-only view computed from that history and the trade log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::position::Trade;

const PERIODS_PER_YEAR: f64 = 252.0;
const WEEK_PERIODS: usize = 7;
const MONTH_PERIODS: usize = 30;

/// One row of the performance log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub timestamp: DateTime<Utc>,
    pub portfolio_value: f64,
    pub cash: f64,
    pub total_return: f64,
    pub active_positions: usize,
    pub total_trades: usize,
    pub win_rate: f64,
    pub total_profit: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub initial_value: f64,
    pub current_value: f64,
    pub total_return: f64,
    pub total_profit: f64,
    pub current_cash: f64,
    pub active_positions: usize,
    pub total_trades: usize,
    pub win_rate: f64,
    pub periods_recorded: usize,
}

/// Statistics over period-to-period changes in portfolio value.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStats {
    pub mean_return: f64,
    pub volatility: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub best_period: f64,
    pub worst_period: f64,
    pub positive_periods: usize,
    pub negative_periods: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawdownStats {
    /// Deepest fall from a running peak, as a non-positive fraction.
    pub max_drawdown: f64,
    pub current_drawdown: f64,
    pub max_drawdown_start: Option<DateTime<Utc>>,
    pub max_drawdown_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeStats {
    pub total_trades: usize,
    /// Sells and covers; the remaining trades are openings.
    pub closed_trades: usize,
    pub profitable_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub average_profit: f64,
    pub average_loss: f64,
    pub profit_factor: f64,
    pub largest_profit: f64,
    pub largest_loss: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecentReturns {
    pub week_return: f64,
    /// Present once a month of snapshots has been recorded.
    pub month_return: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    pub summary: SummaryStats,
    pub returns: Option<ReturnStats>,
    pub drawdown: DrawdownStats,
    pub trading: Option<TradeStats>,
    pub recent: Option<RecentReturns>,
}

impl PerformanceReport {
    /// `None` when no snapshot has been recorded yet.
    pub fn compute(
        history: &[PerformanceSnapshot],
        trades: &[Trade],
        initial_budget: f64,
    ) -> Option<Self> {
        let latest = history.last()?;

        let summary = SummaryStats {
            initial_value: initial_budget,
            current_value: latest.portfolio_value,
            total_return: latest.total_return,
            total_profit: latest.total_profit,
            current_cash: latest.cash,
            active_positions: latest.active_positions,
            total_trades: latest.total_trades,
            win_rate: latest.win_rate,
            periods_recorded: history.len(),
        };

        Some(PerformanceReport {
            summary,
            returns: compute_returns(history),
            drawdown: compute_drawdown(history),
            trading: compute_trade_stats(trades),
            recent: compute_recent(history),
        })
    }

    pub fn render_text(&self, generated_at: DateTime<Utc>) -> String {
        let rule = "=".repeat(60);
        let mut output = format!("{rule}\nTRADING SIMULATOR PERFORMANCE REPORT\n{rule}\n");
        output.push_str(&format!(
            "Generated: {}\n\n",
            generated_at.format("%Y-%m-%d %H:%M:%S")
        ));
        output.push_str(&render_summary(&self.summary));
        if let Some(returns) = &self.returns {
            output.push_str(&render_returns(returns));
        }
        output.push_str(&render_drawdown(&self.drawdown));
        if let Some(trading) = &self.trading {
            output.push_str(&render_trading(trading));
        }
        if let Some(recent) = &self.recent {
            output.push_str(&render_recent(recent));
        }
        output.push_str(&format!("{rule}\n"));
        output
    }
}

fn section(title: &str) -> String {
    format!("{}\n{}\n", title, "-".repeat(title.len()))
}

fn render_summary(s: &SummaryStats) -> String {
    let mut output = section("PORTFOLIO SUMMARY");
    output.push_str(&format!("Initial Value:    ${:.2}\n", s.initial_value));
    output.push_str(&format!("Current Value:    ${:.2}\n", s.current_value));
    output.push_str(&format!("Total Return:     {}\n", pct(s.total_return)));
    output.push_str(&format!("Total P&L:        ${:.2}\n", s.total_profit));
    output.push_str(&format!("Current Cash:     ${:.2}\n", s.current_cash));
    output.push_str(&format!("Active Positions: {}\n", s.active_positions));
    output.push_str(&format!("Cycles Recorded:  {}\n\n", s.periods_recorded));
    output
}

fn render_returns(r: &ReturnStats) -> String {
    let mut output = section("RETURN METRICS");
    output.push_str(&format!(
        "Annualized Return:     {}\n",
        pct(r.annualized_return)
    ));
    output.push_str(&format!(
        "Annualized Volatility: {}\n",
        pct(r.annualized_volatility)
    ));
    output.push_str(&format!("Sharpe Ratio:          {:.2}\n", r.sharpe_ratio));
    output.push_str(&format!("Best Period:           {}\n", pct(r.best_period)));
    output.push_str(&format!("Worst Period:          {}\n", pct(r.worst_period)));
    output.push_str(&format!(
        "Up/Down Periods:       {}/{}\n\n",
        r.positive_periods, r.negative_periods
    ));
    output
}

fn render_drawdown(d: &DrawdownStats) -> String {
    let mut output = section("DRAWDOWN ANALYSIS");
    output.push_str(&format!("Max Drawdown:     {}\n", pct(d.max_drawdown)));
    output.push_str(&format!("Current Drawdown: {}\n\n", pct(d.current_drawdown)));
    output
}

fn render_trading(t: &TradeStats) -> String {
    let mut output = section("TRADING STATISTICS");
    output.push_str(&format!("Total Trades:     {}\n", t.total_trades));
    output.push_str(&format!("Closed Trades:    {}\n", t.closed_trades));
    output.push_str(&format!("Profitable:       {}\n", t.profitable_trades));
    output.push_str(&format!("Losing:           {}\n", t.losing_trades));
    output.push_str(&format!("Win Rate:         {}\n", pct(t.win_rate)));
    output.push_str(&format!("Average Profit:   ${:.2}\n", t.average_profit));
    output.push_str(&format!("Average Loss:     ${:.2}\n", t.average_loss));
    output.push_str(&format!("Profit Factor:    {:.2}\n", t.profit_factor));
    output.push_str(&format!("Largest Profit:   ${:.2}\n", t.largest_profit));
    output.push_str(&format!("Largest Loss:     ${:.2}\n\n", t.largest_loss));
    output
}

fn render_recent(recent: &RecentReturns) -> String {
    let mut output = section("RECENT PERFORMANCE");
    output.push_str(&format!("Last 7 Cycles:    {}\n", pct(recent.week_return)));
    if let Some(month) = recent.month_return {
        output.push_str(&format!("Last 30 Cycles:   {}\n", pct(month)));
    }
    output.push('\n');
    output
}

fn pct(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

fn period_returns(history: &[PerformanceSnapshot]) -> Vec<f64> {
    history
        .windows(2)
        .filter(|w| w[0].portfolio_value > 0.0)
        .map(|w| (w[1].portfolio_value - w[0].portfolio_value) / w[0].portfolio_value)
        .collect()
}

fn compute_returns(history: &[PerformanceSnapshot]) -> Option<ReturnStats> {
    let returns = period_returns(history);
    if returns.is_empty() {
        return None;
    }

    let n = returns.len() as f64;
    let mean_return = returns.iter().sum::<f64>() / n;
    let volatility = if returns.len() > 1 {
        let var = returns
            .iter()
            .map(|r| (r - mean_return).powi(2))
            .sum::<f64>()
            / (n - 1.0);
        var.sqrt()
    } else {
        0.0
    };

    let annualized_return = mean_return * PERIODS_PER_YEAR;
    let annualized_volatility = volatility * PERIODS_PER_YEAR.sqrt();
    let sharpe_ratio = if annualized_volatility > 0.0 {
        annualized_return / annualized_volatility
    } else {
        0.0
    };

    Some(ReturnStats {
        mean_return,
        volatility,
        annualized_return,
        annualized_volatility,
        sharpe_ratio,
        best_period: returns.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        worst_period: returns.iter().copied().fold(f64::INFINITY, f64::min),
        positive_periods: returns.iter().filter(|&&r| r > 0.0).count(),
        negative_periods: returns.iter().filter(|&&r| r < 0.0).count(),
    })
}

fn compute_drawdown(history: &[PerformanceSnapshot]) -> DrawdownStats {
    let mut peak = f64::NEG_INFINITY;
    let mut max_drawdown = 0.0_f64;
    let mut current_drawdown = 0.0_f64;
    let mut run_start: Option<DateTime<Utc>> = None;
    let mut max_start = None;
    let mut max_end = None;

    for point in history {
        if point.portfolio_value >= peak {
            peak = point.portfolio_value;
            current_drawdown = 0.0;
            run_start = None;
            continue;
        }
        current_drawdown = if peak > 0.0 {
            (point.portfolio_value - peak) / peak
        } else {
            0.0
        };
        if run_start.is_none() {
            run_start = Some(point.timestamp);
        }
        if current_drawdown < max_drawdown {
            max_drawdown = current_drawdown;
            max_start = run_start;
            max_end = Some(point.timestamp);
        }
    }

    DrawdownStats {
        max_drawdown,
        current_drawdown,
        max_drawdown_start: max_start,
        max_drawdown_end: max_end,
    }
}

fn compute_trade_stats(trades: &[Trade]) -> Option<TradeStats> {
    if trades.is_empty() {
        return None;
    }

    let wins: Vec<f64> = trades
        .iter()
        .filter(|t| t.is_profitable())
        .map(|t| t.profit_loss)
        .collect();
    let losses: Vec<f64> = trades
        .iter()
        .filter(|t| t.is_losing())
        .map(|t| t.profit_loss)
        .collect();

    let gross_profit: f64 = wins.iter().sum();
    let gross_loss: f64 = losses.iter().sum::<f64>().abs();

    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    let average = |v: &[f64]| {
        if v.is_empty() {
            0.0
        } else {
            v.iter().sum::<f64>() / v.len() as f64
        }
    };

    Some(TradeStats {
        total_trades: trades.len(),
        closed_trades: trades.iter().filter(|t| !t.action.is_opening()).count(),
        profitable_trades: wins.len(),
        losing_trades: losses.len(),
        win_rate: wins.len() as f64 / trades.len() as f64,
        average_profit: average(&wins),
        average_loss: average(&losses),
        profit_factor,
        largest_profit: wins.iter().copied().fold(0.0, f64::max),
        largest_loss: losses.iter().copied().fold(0.0, f64::min),
    })
}

fn window_return(window: &[PerformanceSnapshot]) -> f64 {
    match (window.first(), window.last()) {
        (Some(first), Some(last)) if first.portfolio_value > 0.0 => {
            (last.portfolio_value - first.portfolio_value) / first.portfolio_value
        }
        _ => 0.0,
    }
}

fn compute_recent(history: &[PerformanceSnapshot]) -> Option<RecentReturns> {
    if history.len() < WEEK_PERIODS {
        return None;
    }
    let week_return = window_return(&history[history.len() - WEEK_PERIODS..]);
    let month_return = (history.len() >= MONTH_PERIODS)
        .then(|| window_return(&history[history.len() - MONTH_PERIODS..]));
    Some(RecentReturns {
        week_return,
        month_return,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::TradeAction;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap()
    }

    fn history(values: &[f64]) -> Vec<PerformanceSnapshot> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| PerformanceSnapshot {
                timestamp: start() + Duration::days(i as i64),
                portfolio_value: v,
                cash: v,
                total_return: (v - 1000.0) / 1000.0,
                active_positions: 0,
                total_trades: i,
                win_rate: 0.0,
                total_profit: v - 1000.0,
            })
            .collect()
    }

    fn trade(pl: f64) -> Trade {
        Trade {
            ticker: "X".into(),
            action: if pl == 0.0 {
                TradeAction::Buy
            } else {
                TradeAction::Sell
            },
            price: 100.0,
            quantity: 0.1,
            timestamp: start(),
            profit_loss: pl,
            reason: String::new(),
        }
    }

    #[test]
    fn empty_history_yields_no_report() {
        assert!(PerformanceReport::compute(&[], &[], 1000.0).is_none());
    }

    #[test]
    fn summary_reflects_latest_snapshot() {
        let h = history(&[1000.0, 1010.0]);
        let report = PerformanceReport::compute(&h, &[], 1000.0).unwrap();
        assert_eq!(report.summary.current_value, 1010.0);
        assert_eq!(report.summary.periods_recorded, 2);
        assert_relative_eq!(report.summary.total_return, 0.01);
        assert!(report.trading.is_none());
        assert!(report.recent.is_none());
    }

    #[test]
    fn single_snapshot_has_no_return_stats() {
        let report = PerformanceReport::compute(&history(&[1000.0]), &[], 1000.0).unwrap();
        assert!(report.returns.is_none());
        assert_eq!(report.drawdown.max_drawdown, 0.0);
    }

    #[test]
    fn return_stats_over_periods() {
        let report =
            PerformanceReport::compute(&history(&[100.0, 110.0, 99.0]), &[], 100.0).unwrap();
        let r = report.returns.unwrap();
        assert_relative_eq!(r.best_period, 0.1, epsilon = 1e-12);
        assert_relative_eq!(r.worst_period, -0.1, epsilon = 1e-12);
        assert_relative_eq!(r.mean_return, 0.0, epsilon = 1e-12);
        assert_eq!(r.positive_periods, 1);
        assert_eq!(r.negative_periods, 1);
        assert_relative_eq!(r.sharpe_ratio, 0.0, epsilon = 1e-9);
        assert!(r.annualized_volatility > 0.0);
    }

    #[test]
    fn flat_history_has_zero_sharpe() {
        let report =
            PerformanceReport::compute(&history(&[100.0, 100.0, 100.0]), &[], 100.0).unwrap();
        assert_eq!(report.returns.unwrap().sharpe_ratio, 0.0);
    }

    #[test]
    fn drawdown_tracks_running_peak() {
        let h = history(&[100.0, 120.0, 90.0, 110.0, 130.0, 117.0]);
        let report = PerformanceReport::compute(&h, &[], 100.0).unwrap();
        let d = report.drawdown;
        assert_relative_eq!(d.max_drawdown, -0.25, epsilon = 1e-12);
        assert_relative_eq!(d.current_drawdown, -0.1, epsilon = 1e-12);
        assert_eq!(d.max_drawdown_start, Some(h[2].timestamp));
        assert_eq!(d.max_drawdown_end, Some(h[2].timestamp));
    }

    #[test]
    fn trade_stats_buckets_and_profit_factor() {
        let trades = vec![trade(0.0), trade(2.0), trade(1.0), trade(-1.5), trade(0.0)];
        let report =
            PerformanceReport::compute(&history(&[1000.0]), &trades, 1000.0).unwrap();
        let t = report.trading.unwrap();
        assert_eq!(t.total_trades, 5);
        assert_eq!(t.closed_trades, 3);
        assert_eq!(t.profitable_trades, 2);
        assert_eq!(t.losing_trades, 1);
        assert_relative_eq!(t.win_rate, 0.4);
        assert_relative_eq!(t.average_profit, 1.5);
        assert_relative_eq!(t.average_loss, -1.5);
        assert_relative_eq!(t.profit_factor, 2.0);
        assert_relative_eq!(t.largest_profit, 2.0);
        assert_relative_eq!(t.largest_loss, -1.5);
    }

    #[test]
    fn profit_factor_infinite_without_losses() {
        let report =
            PerformanceReport::compute(&history(&[1000.0]), &[trade(1.0)], 1000.0).unwrap();
        assert!(report.trading.unwrap().profit_factor.is_infinite());
    }

    #[test]
    fn recent_returns_need_a_week_of_snapshots() {
        let values: Vec<f64> = (0..7).map(|i| 100.0 + i as f64).collect();
        let report = PerformanceReport::compute(&history(&values), &[], 100.0).unwrap();
        let recent = report.recent.unwrap();
        assert_relative_eq!(recent.week_return, 0.06, epsilon = 1e-12);
        assert!(recent.month_return.is_none());

        let values: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let report = PerformanceReport::compute(&history(&values), &[], 100.0).unwrap();
        assert_relative_eq!(
            report.recent.unwrap().month_return.unwrap(),
            0.29,
            epsilon = 1e-12
        );
    }

    #[test]
    fn rendered_report_contains_sections() {
        let values: Vec<f64> = (0..8).map(|i| 1000.0 + i as f64).collect();
        let report =
            PerformanceReport::compute(&history(&values), &[trade(1.0), trade(-0.5)], 1000.0)
                .unwrap();
        let text = report.render_text(start());
        assert!(text.contains("TRADING SIMULATOR PERFORMANCE REPORT"));
        assert!(text.contains("Generated: 2024-01-01 15:00:00"));
        assert!(text.contains("PORTFOLIO SUMMARY"));
        assert!(text.contains("RETURN METRICS"));
        assert!(text.contains("DRAWDOWN ANALYSIS"));
        assert!(text.contains("TRADING STATISTICS"));
        assert!(text.contains("RECENT PERFORMANCE"));
        assert!(text.contains("Current Value:    $1007.00"));
        assert!(text.contains("Closed Trades:    2\n"));
        assert!(text.contains("PORTFOLIO SUMMARY\n-----------------\n"));
        assert!(text.ends_with(&format!("{}\n", "=".repeat(60))));
    }

    #[test]
    fn rendered_report_omits_sections_without_data() {
        let report = PerformanceReport::compute(&history(&[1000.0]), &[], 1000.0).unwrap();
        let text = report.render_text(start());
        assert!(text.contains("PORTFOLIO SUMMARY"));
        assert!(text.contains("DRAWDOWN ANALYSIS"));
        assert!(!text.contains("RETURN METRICS"));
        assert!(!text.contains("TRADING STATISTICS"));
        assert!(!text.contains("RECENT PERFORMANCE"));
    }
}
