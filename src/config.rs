use crate::error::{ReportError, Result};
use crate::schema::{RowWindow, SemanticCategory};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything the classifier and extractor would otherwise hard-code.
///
/// Every field has a default, so a JSON config file only needs the keys it
/// wants to change.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ExtractionConfig {
    #[schemars(description = "Names of the sheets the classifier looks for")]
    pub sheets: SheetNames,

    #[schemars(
        description = "How many leading rows of the raw data sheet are searched for the net-worth signature"
    )]
    pub net_worth_scan_rows: usize,

    #[schemars(description = "Per-variant position of the month header and label columns")]
    pub layouts: VariantLayouts,

    #[schemars(description = "Minimum month-like cells for a row to count as the month header")]
    pub min_month_labels: usize,

    #[schemars(description = "Keyword lists used to classify row labels, matched upper-cased")]
    pub keywords: CategoryKeywords,

    #[schemars(description = "Labels treated as blank (e.g. '-')")]
    pub placeholder_labels: Vec<String>,

    #[schemars(description = "Exact row labels the KPI computation reads")]
    pub series_labels: KpiSeriesLabels,

    #[schemars(
        description = "Labels of a single cumulative total-profit cell, used to cross-check the summed monthly series"
    )]
    pub cumulative_profit_labels: Vec<String>,

    #[schemars(
        description = "Absolute difference above which the cumulative profit cell and the summed series are reported as disagreeing"
    )]
    pub reconciliation_tolerance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SheetNames {
    pub raw_data: String,
    pub summary: String,
    pub monthly_detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct HeaderLayout {
    #[schemars(description = "0-based inclusive rows searched for the month header")]
    pub header_scan: RowWindow,
    pub label_column: usize,
    pub first_value_column: usize,
    pub max_month_columns: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct VariantLayouts {
    pub consolidated_net_worth: HeaderLayout,
    pub structured_report: HeaderLayout,
    pub raw_monthly_data: HeaderLayout,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CategoryKeywords {
    pub portfolio_value: Vec<String>,
    pub profit: Vec<String>,
    pub turnover: Vec<String>,
    pub trading: Vec<String>,
    pub cash: Vec<String>,
    pub benchmark: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct KpiSeriesLabels {
    pub portfolio_value: Vec<String>,
    pub period_start: Vec<String>,
    pub total_profit: Vec<String>,
    pub dividends: Vec<String>,
    pub total_trades: Vec<String>,
    pub buy_trades: Vec<String>,
    pub sell_trades: Vec<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            raw_data: "Data".to_string(),
            summary: "Executive Summary".to_string(),
            monthly_detail: "Monthly Performance".to_string(),
        }
    }
}

impl Default for HeaderLayout {
    fn default() -> Self {
        Self {
            header_scan: RowWindow::new(0, 9),
            label_column: 0,
            first_value_column: 1,
            max_month_columns: 13,
        }
    }
}

impl Default for VariantLayouts {
    fn default() -> Self {
        Self {
            // Net-worth files carry the month header on row 4, Type A on row 3,
            // Type B anywhere in the first nine rows.
            consolidated_net_worth: HeaderLayout {
                header_scan: RowWindow::new(2, 9),
                ..HeaderLayout::default()
            },
            structured_report: HeaderLayout {
                header_scan: RowWindow::new(1, 9),
                ..HeaderLayout::default()
            },
            raw_monthly_data: HeaderLayout {
                header_scan: RowWindow::new(0, 8),
                ..HeaderLayout::default()
            },
        }
    }
}

impl Default for CategoryKeywords {
    fn default() -> Self {
        Self {
            portfolio_value: strings(&["PORTFOLIO VALUE", "AT THE", "NET WORTH", "VALUE CHANGE"]),
            profit: strings(&[
                "PROFIT",
                "DIVIDEND",
                "TAX",
                "COMMISSION",
                "PRICE CHANGE",
                "NET SALES",
            ]),
            turnover: strings(&["TURNOVER", "PURCHASE", "SALE"]),
            trading: strings(&["TRADE", "TRADING", "BUY", "SELL"]),
            cash: strings(&["CASH", "DEPOSIT", "WITHDRAW"]),
            benchmark: strings(&["S&P", "MARKET", "BENCHMARK"]),
        }
    }
}

impl Default for KpiSeriesLabels {
    fn default() -> Self {
        Self {
            portfolio_value: strings(&[
                "Portfolio value",
                "Portfolio Value (End)",
                "Net worth",
                "Total net worth",
            ]),
            period_start: strings(&["At the beginning of the period", "Portfolio Value (Start)"]),
            total_profit: strings(&["Total profit"]),
            dividends: strings(&["Dividends"]),
            total_trades: strings(&["Total trades"]),
            buy_trades: strings(&["Buy trades"]),
            sell_trades: strings(&["Sell trades"]),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            sheets: SheetNames::default(),
            net_worth_scan_rows: 35,
            layouts: VariantLayouts::default(),
            min_month_labels: 2,
            keywords: CategoryKeywords::default(),
            placeholder_labels: strings(&["-", "–", "—", "n/a"]),
            series_labels: KpiSeriesLabels::default(),
            cumulative_profit_labels: strings(&[
                "Total Profit",
                "Total Profit (12 Months)",
                "Total YTD Profit",
            ]),
            reconciliation_tolerance: 0.05,
        }
    }
}

impl CategoryKeywords {
    pub fn for_category(&self, category: SemanticCategory) -> &[String] {
        match category {
            SemanticCategory::PortfolioValue => &self.portfolio_value,
            SemanticCategory::Profit => &self.profit,
            SemanticCategory::Turnover => &self.turnover,
            SemanticCategory::Trading => &self.trading,
            SemanticCategory::Cash => &self.cash,
            SemanticCategory::Benchmark => &self.benchmark,
            SemanticCategory::Unclassified => &[],
        }
    }
}

impl ExtractionConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ExtractionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        let layouts = [
            ("consolidated_net_worth", &self.layouts.consolidated_net_worth),
            ("structured_report", &self.layouts.structured_report),
            ("raw_monthly_data", &self.layouts.raw_monthly_data),
        ];

        for (name, layout) in layouts {
            if layout.header_scan.last_row < layout.header_scan.first_row {
                return Err(ReportError::InvalidConfig(format!(
                    "layouts.{}: header_scan.last_row {} is before first_row {}",
                    name, layout.header_scan.last_row, layout.header_scan.first_row
                )));
            }
            if layout.max_month_columns == 0 {
                return Err(ReportError::InvalidConfig(format!(
                    "layouts.{}: max_month_columns must be at least 1",
                    name
                )));
            }
            if layout.first_value_column == layout.label_column {
                return Err(ReportError::InvalidConfig(format!(
                    "layouts.{}: first_value_column and label_column are both {}",
                    name, layout.label_column
                )));
            }
        }

        if self.min_month_labels == 0 {
            return Err(ReportError::InvalidConfig(
                "min_month_labels must be at least 1".to_string(),
            ));
        }

        if self.reconciliation_tolerance.is_nan() || self.reconciliation_tolerance < 0.0 {
            return Err(ReportError::InvalidConfig(format!(
                "reconciliation_tolerance must be non-negative, got {}",
                self.reconciliation_tolerance
            )));
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ExtractionConfig)
    }
}
