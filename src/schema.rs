use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum WorkbookVariant {
    #[schemars(
        description = "Consolidated net-worth file: a raw data sheet whose label column mentions NET WORTH (or S&P together with MARKET), or a summary sheet titled as a net-worth consolidation."
    )]
    ConsolidatedNetWorth,

    #[schemars(
        description = "Type A report: a summary sheet and a monthly-detail sheet as two distinct named regions."
    )]
    StructuredReport,

    #[schemars(description = "Type B report: a single sheet of monthly rows with no summary region.")]
    RawMonthlyData,

    #[schemars(description = "No recognised layout; only the sheet inventory is reported.")]
    Unknown,
}

impl WorkbookVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkbookVariant::ConsolidatedNetWorth => "ConsolidatedNetWorth",
            WorkbookVariant::StructuredReport => "StructuredReport",
            WorkbookVariant::RawMonthlyData => "RawMonthlyData",
            WorkbookVariant::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for WorkbookVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse bucket a labelled row falls into.
///
/// Declaration order is the keyword matching order: the first category whose
/// keyword is contained in the label wins.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema,
)]
#[serde(rename_all = "PascalCase")]
pub enum SemanticCategory {
    #[schemars(description = "Portfolio or net-worth value rows, including period start/end values.")]
    PortfolioValue,

    #[schemars(
        description = "Profit rows: total profit, dividends, tax, commission, price change, net sales profit."
    )]
    Profit,

    #[schemars(description = "Turnover rows: purchases and sales volume.")]
    Turnover,

    #[schemars(description = "Trading activity rows: trade, buy and sell counts.")]
    Trading,

    #[schemars(description = "Cash rows: deposits, withdrawals, cash balance.")]
    Cash,

    #[schemars(description = "Benchmark comparison rows (S&P / market).")]
    Benchmark,

    #[schemars(description = "Labelled rows seen before any section became active.")]
    Unclassified,
}

impl SemanticCategory {
    /// Categories that take part in keyword matching, in matching order.
    pub const MATCH_ORDER: [SemanticCategory; 6] = [
        SemanticCategory::PortfolioValue,
        SemanticCategory::Profit,
        SemanticCategory::Turnover,
        SemanticCategory::Trading,
        SemanticCategory::Cash,
        SemanticCategory::Benchmark,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticCategory::PortfolioValue => "PortfolioValue",
            SemanticCategory::Profit => "Profit",
            SemanticCategory::Turnover => "Turnover",
            SemanticCategory::Trading => "Trading",
            SemanticCategory::Cash => "Cash",
            SemanticCategory::Benchmark => "Benchmark",
            SemanticCategory::Unclassified => "Unclassified",
        }
    }
}

impl fmt::Display for SemanticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive 0-based row window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct RowWindow {
    pub first_row: usize,
    pub last_row: usize,
}

impl RowWindow {
    pub fn new(first_row: usize, last_row: usize) -> Self {
        Self {
            first_row,
            last_row,
        }
    }

    /// Rows of the window that exist in a sheet with `used_rows` rows.
    pub fn clamp(&self, used_rows: usize) -> std::ops::Range<usize> {
        let end = (self.last_row + 1).min(used_rows);
        self.first_row.min(end)..end
    }
}

/// Where a variant keeps its data, resolved once by the classifier and passed
/// explicitly to the extractor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct LayoutDescriptor {
    #[schemars(description = "The detected workbook variant")]
    pub variant: WorkbookVariant,

    #[schemars(description = "Sheet holding the monthly rows")]
    pub data_sheet: Option<String>,

    #[schemars(description = "Sheet holding the summary region, when the variant has one")]
    pub summary_sheet: Option<String>,

    #[schemars(description = "0-based inclusive row window searched for the month header row")]
    pub header_scan: RowWindow,

    #[schemars(description = "0-based column holding row labels")]
    pub label_column: usize,

    #[schemars(description = "0-based column of the first month")]
    pub first_value_column: usize,

    #[schemars(description = "Maximum number of month columns read to the right of the labels")]
    pub max_month_columns: usize,
}
