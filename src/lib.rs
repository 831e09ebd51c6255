//! # Portfolio Report Metrics
//!
//! Reads investment-portfolio workbooks, works out which of a few known layouts
//! a workbook uses, and pulls month-aligned metric series and a fixed KPI set
//! out of it.
//!
//! ## Core Concepts
//!
//! - **Variant**: the recognised workbook shape (consolidated net worth,
//!   structured report, raw monthly data, or unknown)
//! - **Layout Descriptor**: where that shape keeps its month header and labels
//! - **Monthly Series**: one labelled row with one value per month column
//! - **Semantic Category**: the section a row belongs to, found by keyword and
//!   carried forward to unlabelled-section rows
//! - **KPI Set**: growth, profit statistics, win rate, trading activity and,
//!   for net-worth files, a benchmark comparison
//!
//! ## Example
//!
//! ```rust,ignore
//! use portfolio_report_metrics::*;
//!
//! let config = ExtractionConfig::default();
//! let report = process_file("reports/roth_2025.xlsx", &config)?;
//!
//! println!("{}", report.status_line());
//! if let Some(kpis) = &report.kpis {
//!     println!("Win rate: {:.0}%", kpis.win_rate * 100.0);
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod layout;
pub mod metrics;
pub mod reconciliation;
pub mod report;
pub mod schema;
pub mod sections;
pub mod utils;
pub mod workbook;

pub use config::ExtractionConfig;
pub use engine::{Extractor, MonthHeader};
pub use error::{ReportError, Result};
pub use ingestion::{expand_patterns, load_workbook};
pub use layout::{classify, classify_variant, Classification};
pub use metrics::{compute_kpis, BenchmarkComparison, KpiSet, TradingActivity};
pub use reconciliation::{ProfitReconciler, ProfitReconciliation, ReportWarning};
pub use report::{BatchSummary, FileFailure, FileOutcome, SheetInventory, WorkbookReport};
pub use schema::*;
pub use workbook::{CellValue, Sheet, Workbook};

use log::{debug, info, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MonthColumn {
    pub label: String,
    /// 0-based source column
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MonthlySeries {
    pub label: String,
    pub category: SemanticCategory,
    /// 0-based source row
    pub row: usize,
    /// One entry per month column; `None` for blank or non-numeric cells
    pub values: Vec<Option<f64>>,
}

/// A labelled row without values that opened or continued a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SectionBanner {
    pub label: String,
    pub category: SemanticCategory,
    pub row: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySeriesSet {
    pub sheet: String,
    pub header_row: usize,
    pub months: Vec<MonthColumn>,
    pub series: Vec<MonthlySeries>,
    pub banners: Vec<SectionBanner>,
}

impl MonthlySeriesSet {
    pub fn month_labels(&self) -> Vec<&str> {
        self.months.iter().map(|m| m.label.as_str()).collect()
    }

    /// Lookup by label, ignoring case and surrounding whitespace.
    pub fn get(&self, label: &str) -> Option<&MonthlySeries> {
        self.series
            .iter()
            .find(|s| utils::labels_match(&s.label, label))
    }

    /// First series matching any of the candidate labels, in candidate order.
    pub fn find_first<S: AsRef<str>>(&self, candidates: &[S]) -> Option<&MonthlySeries> {
        candidates.iter().find_map(|label| self.get(label.as_ref()))
    }

    pub fn by_category(
        &self,
        category: SemanticCategory,
    ) -> impl Iterator<Item = &MonthlySeries> + '_ {
        self.series.iter().filter(move |s| s.category == category)
    }
}

/// Series and KPIs of one classified workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub series: MonthlySeriesSet,
    pub kpis: KpiSet,
}

pub struct PortfolioProcessor;

impl PortfolioProcessor {
    pub fn extract(
        workbook: &Workbook,
        classification: &Classification,
        config: &ExtractionConfig,
    ) -> Result<Extraction> {
        let series = Extractor::new(config).extract_series(workbook, classification)?;
        let kpis = compute_kpis(&series, classification.variant(), config);

        debug!(
            "Extracted {} series and {} banner(s) from '{}'",
            series.series.len(),
            series.banners.len(),
            series.sheet
        );

        Ok(Extraction { series, kpis })
    }

    /// Classifies and extracts an already-loaded workbook. `path` is only used
    /// to label the report.
    pub fn process_workbook(
        path: &str,
        workbook: &Workbook,
        config: &ExtractionConfig,
    ) -> Result<WorkbookReport> {
        let classification = Self::classify_logged(path, workbook, config);
        Self::process_classified(path, workbook, &classification, config)
    }

    fn classify_logged(path: &str, workbook: &Workbook, config: &ExtractionConfig) -> Classification {
        let classification = classify(workbook, config);
        info!(
            "Classified {} as {} ({})",
            path,
            classification.variant(),
            classification.evidence
        );
        classification
    }

    /// Extraction, KPIs and reconciliation for a workbook that is already classified.
    pub fn process_classified(
        path: &str,
        workbook: &Workbook,
        classification: &Classification,
        config: &ExtractionConfig,
    ) -> Result<WorkbookReport> {
        if classification.variant() == WorkbookVariant::Unknown {
            warn!(
                "Unrecognised layout in {}; sheets: {}",
                path,
                workbook.sheet_names().join(", ")
            );
            return Ok(WorkbookReport::unknown(path, workbook, classification));
        }

        let extraction = Self::extract(workbook, classification, config)?;
        let (reconciliation, warnings) = ProfitReconciler::new(config).verify(
            workbook,
            classification,
            &extraction.series,
        )?;

        Ok(WorkbookReport::extracted(
            path,
            workbook,
            classification,
            extraction.series,
            extraction.kpis,
            reconciliation,
            warnings,
        ))
    }

    pub fn process_file(path: impl AsRef<Path>, config: &ExtractionConfig) -> Result<WorkbookReport> {
        let path = path.as_ref();
        let workbook = load_workbook(path)?;
        Self::process_workbook(&path.display().to_string(), &workbook, config)
    }

    /// Processes every path independently; one failing file never stops the rest.
    pub fn process_files<P: AsRef<Path>>(paths: &[P], config: &ExtractionConfig) -> BatchSummary {
        let mut batch = BatchSummary::default();

        for path in paths {
            let path = path.as_ref();
            let display = path.display().to_string();
            let outcome = match load_workbook(path) {
                Ok(workbook) => Self::outcome_for_workbook(&display, &workbook, config),
                Err(err) => {
                    warn!("Failed to read {}: {}", display, err);
                    FileOutcome::failed(&display, None, &err)
                }
            };
            batch.push(outcome);
        }

        info!("{}", batch.summary_line());
        batch
    }

    /// Like `process_workbook`, but a failure keeps the variant detected before it.
    pub fn outcome_for_workbook(
        path: &str,
        workbook: &Workbook,
        config: &ExtractionConfig,
    ) -> FileOutcome {
        let classification = Self::classify_logged(path, workbook, config);
        match Self::process_classified(path, workbook, &classification, config) {
            Ok(report) => FileOutcome::succeeded(report),
            Err(err) => {
                warn!(
                    "Failed to process {} as {}: {}",
                    path,
                    classification.variant(),
                    err
                );
                FileOutcome::failed(path, Some(classification.variant()), &err)
            }
        }
    }
}

pub fn extract(
    workbook: &Workbook,
    classification: &Classification,
    config: &ExtractionConfig,
) -> Result<Extraction> {
    PortfolioProcessor::extract(workbook, classification, config)
}

pub fn process_workbook(
    path: &str,
    workbook: &Workbook,
    config: &ExtractionConfig,
) -> Result<WorkbookReport> {
    PortfolioProcessor::process_workbook(path, workbook, config)
}

pub fn process_file(path: impl AsRef<Path>, config: &ExtractionConfig) -> Result<WorkbookReport> {
    PortfolioProcessor::process_file(path, config)
}

pub fn process_files<P: AsRef<Path>>(paths: &[P], config: &ExtractionConfig) -> BatchSummary {
    PortfolioProcessor::process_files(paths, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> MonthlySeriesSet {
        let series = |label: &str, category| MonthlySeries {
            label: label.to_string(),
            category,
            row: 0,
            values: vec![Some(1.0)],
        };
        MonthlySeriesSet {
            sheet: "Data".to_string(),
            header_row: 0,
            months: vec![MonthColumn {
                label: "Jan 25".to_string(),
                column: 1,
            }],
            series: vec![
                series("Total profit", SemanticCategory::Profit),
                series("Total profit, %", SemanticCategory::Profit),
                series("Net worth", SemanticCategory::PortfolioValue),
            ],
            banners: Vec::new(),
        }
    }

    #[test]
    fn test_series_lookup() {
        let set = set();
        assert_eq!(set.get(" total PROFIT ").unwrap().label, "Total profit");
        assert_eq!(set.get("Total profit, %").unwrap().label, "Total profit, %");
        assert!(set.get("Dividends").is_none());

        let found = set.find_first(&["Portfolio value", "Net worth"]).unwrap();
        assert_eq!(found.label, "Net worth");

        assert_eq!(set.by_category(SemanticCategory::Profit).count(), 2);
        assert_eq!(set.by_category(SemanticCategory::Cash).count(), 0);
    }

    #[test]
    fn test_unknown_workbook_is_soft_success() {
        let workbook = Workbook::new()
            .with_sheet(Sheet::from_rows("Notes", vec![vec![CellValue::from("a")]]))
            .with_sheet(Sheet::from_rows("Other", vec![vec![CellValue::from("b")]]));

        let report = process_workbook("two.xlsx", &workbook, &ExtractionConfig::default()).unwrap();
        assert_eq!(report.variant, WorkbookVariant::Unknown);
        assert!(report.kpis.is_none());
        assert_eq!(report.sheets.len(), 2);
    }

    #[test]
    fn test_failed_outcome_keeps_detected_variant() {
        let rows = vec![
            vec![CellValue::from("Household Net Worth")],
            vec![],
            vec![CellValue::from("NET WORTH")],
            vec![CellValue::from("Net worth"), CellValue::from(100.0)],
        ];
        let workbook = Workbook::new().with_sheet(Sheet::from_rows("Data", rows));

        let outcome =
            PortfolioProcessor::outcome_for_workbook("nw.xlsx", &workbook, &ExtractionConfig::default());
        assert!(outcome.is_failure());
        assert_eq!(outcome.variant, Some(WorkbookVariant::ConsolidatedNetWorth));
        assert!(outcome
            .status_line()
            .starts_with("FAIL nw.xlsx [ConsolidatedNetWorth] HeaderNotFound: "));
    }
}
