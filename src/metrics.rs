use crate::config::ExtractionConfig;
use crate::schema::{SemanticCategory, WorkbookVariant};
use crate::utils::{
    average, first_present, last_present, max_value, min_value, percent_of, present_values,
    sum_present,
};
use crate::{MonthlySeries, MonthlySeriesSet};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KpiSet {
    pub starting_value: f64,
    pub ending_value: f64,
    pub growth: f64,
    #[schemars(description = "Growth as a percentage of the starting value; 0 when it is 0")]
    pub growth_percent: f64,

    #[schemars(description = "Sum of the monthly 'Total profit' series, blanks counted as 0")]
    pub total_profit: f64,
    pub profit_percent: f64,
    pub total_dividends: f64,
    #[schemars(description = "Total profit minus dividends")]
    pub total_gains: f64,

    pub best_month_profit: f64,
    pub worst_month_profit: f64,
    pub average_month_profit: f64,
    pub positive_month_count: usize,
    pub total_months: usize,
    #[schemars(description = "Share of months with a positive profit, between 0 and 1")]
    pub win_rate: f64,

    pub trading: TradingActivity,

    #[schemars(description = "Only present for consolidated net-worth workbooks")]
    pub benchmark: Option<BenchmarkComparison>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TradingActivity {
    pub total_trades: f64,
    pub buy_trades: f64,
    pub sell_trades: f64,
    pub average_monthly_trades: f64,
    pub average_monthly_buys: f64,
    pub average_monthly_sells: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BenchmarkComparison {
    #[schemars(description = "Label of the benchmark series, if one was found")]
    pub benchmark_label: Option<String>,
    pub portfolio_gain: f64,
    pub portfolio_gain_percent: f64,
    pub benchmark_gain: f64,
    pub benchmark_gain_percent: f64,
    #[schemars(description = "Portfolio gain minus benchmark gain")]
    pub outperformance: f64,
}

/// Computes the KPI set from extracted series. Pure; nothing is cached.
pub fn compute_kpis(
    set: &MonthlySeriesSet,
    variant: WorkbookVariant,
    config: &ExtractionConfig,
) -> KpiSet {
    let labels = &config.series_labels;
    let total_months = set.months.len();

    let portfolio = portfolio_value_series(set, config);
    let first_portfolio = portfolio.and_then(|s| first_present(&s.values));
    let last_portfolio = portfolio.and_then(|s| last_present(&s.values));

    let starting_value = set
        .find_first(&labels.period_start)
        .and_then(|s| first_present(&s.values))
        .or(first_portfolio)
        .unwrap_or(0.0);
    let ending_value = last_portfolio.unwrap_or(0.0);
    let growth = ending_value - starting_value;

    let profit_values = set
        .find_first(&labels.total_profit)
        .map(|s| s.values.as_slice())
        .unwrap_or_default();
    let present_profit = present_values(profit_values);
    let total_profit = sum_present(profit_values);
    let total_dividends = set
        .find_first(&labels.dividends)
        .map(|s| sum_present(&s.values))
        .unwrap_or(0.0);

    let positive_month_count = present_profit.iter().filter(|v| **v > 0.0).count();
    let win_rate = if total_months == 0 {
        0.0
    } else {
        positive_month_count as f64 / total_months as f64
    };

    let benchmark = (variant == WorkbookVariant::ConsolidatedNetWorth).then(|| {
        compare_benchmark(
            set,
            first_portfolio.unwrap_or(0.0),
            last_portfolio.unwrap_or(0.0),
        )
    });

    KpiSet {
        starting_value,
        ending_value,
        growth,
        growth_percent: percent_of(growth, starting_value),
        total_profit,
        profit_percent: percent_of(total_profit, starting_value),
        total_dividends,
        total_gains: total_profit - total_dividends,
        best_month_profit: max_value(&present_profit),
        worst_month_profit: min_value(&present_profit),
        average_month_profit: average(&present_profit),
        positive_month_count,
        total_months,
        win_rate,
        trading: trading_activity(set, config, total_months),
        benchmark,
    }
}

/// First configured portfolio-value label present, else the first series
/// classified as a portfolio value.
fn portfolio_value_series<'s>(
    set: &'s MonthlySeriesSet,
    config: &ExtractionConfig,
) -> Option<&'s MonthlySeries> {
    set.find_first(&config.series_labels.portfolio_value)
        .or_else(|| set.by_category(SemanticCategory::PortfolioValue).next())
}

fn trading_activity(
    set: &MonthlySeriesSet,
    config: &ExtractionConfig,
    total_months: usize,
) -> TradingActivity {
    let labels = &config.series_labels;
    let sum_of = |candidates: &[String]| {
        set.find_first(candidates)
            .map(|s| sum_present(&s.values))
            .unwrap_or(0.0)
    };
    let per_month = |total: f64| {
        if total_months == 0 {
            0.0
        } else {
            total / total_months as f64
        }
    };

    let total_trades = sum_of(labels.total_trades.as_slice());
    let buy_trades = sum_of(labels.buy_trades.as_slice());
    let sell_trades = sum_of(labels.sell_trades.as_slice());

    TradingActivity {
        total_trades,
        buy_trades,
        sell_trades,
        average_monthly_trades: per_month(total_trades),
        average_monthly_buys: per_month(buy_trades),
        average_monthly_sells: per_month(sell_trades),
    }
}

fn compare_benchmark(
    set: &MonthlySeriesSet,
    portfolio_start: f64,
    portfolio_end: f64,
) -> BenchmarkComparison {
    let portfolio_gain = portfolio_end - portfolio_start;

    let benchmark = set.by_category(SemanticCategory::Benchmark).next();
    if benchmark.is_none() {
        debug!("No benchmark series in '{}'; benchmark gain is 0", set.sheet);
    }
    let benchmark_start = benchmark
        .and_then(|s| first_present(&s.values))
        .unwrap_or(0.0);
    let benchmark_end = benchmark
        .and_then(|s| last_present(&s.values))
        .unwrap_or(0.0);
    let benchmark_gain = benchmark_end - benchmark_start;

    BenchmarkComparison {
        benchmark_label: benchmark.map(|s| s.label.clone()),
        portfolio_gain,
        portfolio_gain_percent: percent_of(portfolio_gain, portfolio_start),
        benchmark_gain,
        benchmark_gain_percent: percent_of(benchmark_gain, benchmark_start),
        outperformance: portfolio_gain - benchmark_gain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MonthColumn;

    fn series(label: &str, category: SemanticCategory, values: &[Option<f64>]) -> MonthlySeries {
        MonthlySeries {
            label: label.to_string(),
            category,
            row: 0,
            values: values.to_vec(),
        }
    }

    fn set_of(months: usize, series: Vec<MonthlySeries>) -> MonthlySeriesSet {
        MonthlySeriesSet {
            sheet: "Data".to_string(),
            header_row: 0,
            months: (0..months)
                .map(|i| MonthColumn {
                    label: format!("M{}", i + 1),
                    column: i + 1,
                })
                .collect(),
            series,
            banners: Vec::new(),
        }
    }

    #[test]
    fn test_monthly_profit_statistics() {
        let set = set_of(
            5,
            vec![series(
                "Total profit",
                SemanticCategory::Profit,
                &[Some(1000.0), Some(-200.0), Some(500.0), Some(0.0), Some(300.0)],
            )],
        );
        let kpis = compute_kpis(&set, WorkbookVariant::RawMonthlyData, &ExtractionConfig::default());

        assert_eq!(kpis.total_profit, 1600.0);
        assert_eq!(kpis.best_month_profit, 1000.0);
        assert_eq!(kpis.worst_month_profit, -200.0);
        assert_eq!(kpis.average_month_profit, 320.0);
        assert_eq!(kpis.positive_month_count, 3);
        assert_eq!(kpis.total_months, 5);
        assert!((kpis.win_rate - 0.6).abs() < 1e-12);
        assert!(kpis.benchmark.is_none());
    }

    #[test]
    fn test_blank_month_excluded_from_average() {
        let set = set_of(
            3,
            vec![series(
                "Total profit",
                SemanticCategory::Profit,
                &[Some(1000.0), None, Some(-200.0)],
            )],
        );
        let kpis = compute_kpis(&set, WorkbookVariant::RawMonthlyData, &ExtractionConfig::default());

        assert_eq!(kpis.total_profit, 800.0);
        assert_eq!(kpis.average_month_profit, 400.0);
        assert_eq!(kpis.positive_month_count, 1);
    }

    #[test]
    fn test_zero_starting_value_gives_zero_growth_percent() {
        let set = set_of(
            2,
            vec![series(
                "Portfolio value",
                SemanticCategory::PortfolioValue,
                &[Some(0.0), Some(500.0)],
            )],
        );
        let kpis = compute_kpis(&set, WorkbookVariant::RawMonthlyData, &ExtractionConfig::default());

        assert_eq!(kpis.starting_value, 0.0);
        assert_eq!(kpis.growth, 500.0);
        assert_eq!(kpis.growth_percent, 0.0);
        assert_eq!(kpis.profit_percent, 0.0);
    }

    #[test]
    fn test_period_start_series_takes_precedence() {
        let set = set_of(
            3,
            vec![
                series(
                    "At the beginning of the period",
                    SemanticCategory::PortfolioValue,
                    &[None, Some(1000.0), Some(1100.0)],
                ),
                series(
                    "Portfolio value",
                    SemanticCategory::PortfolioValue,
                    &[Some(1050.0), Some(1100.0), Some(1250.0)],
                ),
                series("Total profit", SemanticCategory::Profit, &[Some(50.0), Some(100.0), Some(100.0)]),
                series("Dividends", SemanticCategory::Profit, &[Some(10.0), None, Some(15.0)]),
            ],
        );
        let kpis = compute_kpis(&set, WorkbookVariant::StructuredReport, &ExtractionConfig::default());

        assert_eq!(kpis.starting_value, 1000.0);
        assert_eq!(kpis.ending_value, 1250.0);
        assert_eq!(kpis.growth, 250.0);
        assert_eq!(kpis.growth_percent, 25.0);
        assert_eq!(kpis.total_profit, 250.0);
        assert_eq!(kpis.profit_percent, 25.0);
        assert_eq!(kpis.total_dividends, 25.0);
        assert_eq!(kpis.total_gains, 225.0);
    }

    #[test]
    fn test_restructured_start_and_end_rows() {
        let set = set_of(
            3,
            vec![
                series(
                    "Portfolio Value (Start)",
                    SemanticCategory::PortfolioValue,
                    &[Some(1000.0), Some(1100.0), Some(1200.0)],
                ),
                series(
                    "Portfolio Value (End)",
                    SemanticCategory::PortfolioValue,
                    &[Some(1100.0), Some(1200.0), Some(1500.0)],
                ),
            ],
        );
        let kpis = compute_kpis(&set, WorkbookVariant::StructuredReport, &ExtractionConfig::default());

        assert_eq!(kpis.starting_value, 1000.0);
        assert_eq!(kpis.ending_value, 1500.0);
        assert_eq!(kpis.growth, 500.0);
        assert_eq!(kpis.growth_percent, 50.0);
    }

    #[test]
    fn test_portfolio_value_falls_back_to_category() {
        let set = set_of(
            2,
            vec![series(
                "Value change",
                SemanticCategory::PortfolioValue,
                &[Some(10.0), Some(30.0)],
            )],
        );
        let kpis = compute_kpis(&set, WorkbookVariant::RawMonthlyData, &ExtractionConfig::default());
        assert_eq!(kpis.starting_value, 10.0);
        assert_eq!(kpis.ending_value, 30.0);
    }

    #[test]
    fn test_trading_averages_use_month_count() {
        let set = set_of(
            4,
            vec![
                series("Total trades", SemanticCategory::Trading, &[Some(4.0), Some(2.0), None, Some(6.0)]),
                series("Buy trades", SemanticCategory::Trading, &[Some(3.0), Some(1.0), None, Some(4.0)]),
                series("Sell trades", SemanticCategory::Trading, &[Some(1.0), Some(1.0), None, Some(2.0)]),
            ],
        );
        let kpis = compute_kpis(&set, WorkbookVariant::RawMonthlyData, &ExtractionConfig::default());

        assert_eq!(kpis.trading.total_trades, 12.0);
        assert_eq!(kpis.trading.average_monthly_trades, 3.0);
        assert_eq!(kpis.trading.average_monthly_buys, 2.0);
        assert_eq!(kpis.trading.average_monthly_sells, 1.0);
    }

    #[test]
    fn test_empty_set_is_all_zero() {
        let kpis = compute_kpis(&set_of(0, Vec::new()), WorkbookVariant::RawMonthlyData, &ExtractionConfig::default());
        assert_eq!(kpis.win_rate, 0.0);
        assert_eq!(kpis.average_month_profit, 0.0);
        assert_eq!(kpis.trading, TradingActivity::default());
    }

    #[test]
    fn test_benchmark_comparison_for_net_worth() {
        let set = set_of(
            3,
            vec![
                series("Net worth", SemanticCategory::PortfolioValue, &[Some(200_000.0), Some(210_000.0), Some(250_000.0)]),
                series("Market value of S&P 500", SemanticCategory::Benchmark, &[Some(100_000.0), None, Some(120_000.0)]),
            ],
        );
        let kpis = compute_kpis(&set, WorkbookVariant::ConsolidatedNetWorth, &ExtractionConfig::default());
        let benchmark = kpis.benchmark.unwrap();

        assert_eq!(benchmark.portfolio_gain, 50_000.0);
        assert_eq!(benchmark.portfolio_gain_percent, 25.0);
        assert_eq!(benchmark.benchmark_gain, 20_000.0);
        assert_eq!(benchmark.benchmark_gain_percent, 20.0);
        assert_eq!(benchmark.outperformance, 30_000.0);
        assert_eq!(benchmark.benchmark_label.as_deref(), Some("Market value of S&P 500"));
    }
}
