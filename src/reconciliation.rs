//! Cross-check of the summed monthly profit against a cumulative profit cell.
//!
//! The summed series is the reported figure. A disagreeing cumulative cell is
//! surfaced as a warning and never replaces it.

use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::layout::Classification;
use crate::utils::{coerce_number, first_present, labels_match, sum_present};
use crate::workbook::{Sheet, Workbook};
use crate::MonthlySeriesSet;
use log::{debug, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProfitReconciliation {
    #[schemars(description = "Sheet the cumulative cell was read from")]
    pub sheet: String,
    pub label: String,
    #[schemars(description = "0-based row of the cumulative cell")]
    pub row: usize,
    pub cumulative_profit: f64,
    pub summed_profit: f64,
    pub difference: f64,
    pub within_tolerance: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind")]
pub enum ReportWarning {
    #[schemars(
        description = "A cumulative total-profit cell disagrees with the sum of the monthly profit series"
    )]
    ProfitDiscrepancy {
        sheet: String,
        label: String,
        cumulative_profit: f64,
        summed_profit: f64,
        difference: f64,
    },
}

impl std::fmt::Display for ReportWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportWarning::ProfitDiscrepancy {
                sheet,
                label,
                cumulative_profit,
                summed_profit,
                difference,
            } => write!(
                f,
                "ProfitDiscrepancy: '{}' in '{}' is {:.2}, monthly series sum to {:.2} (difference {:.2})",
                label, sheet, cumulative_profit, summed_profit, difference
            ),
        }
    }
}

pub struct ProfitReconciler<'a> {
    config: &'a ExtractionConfig,
}

impl<'a> ProfitReconciler<'a> {
    pub fn new(config: &'a ExtractionConfig) -> Self {
        Self { config }
    }

    /// Compares the cumulative profit cell, if the workbook has one, with the
    /// summed "Total profit" series. `None` when either side is missing.
    pub fn reconcile(
        &self,
        workbook: &Workbook,
        classification: &Classification,
        set: &MonthlySeriesSet,
    ) -> Result<Option<ProfitReconciliation>> {
        let Some(profit) = set.find_first(&self.config.series_labels.total_profit) else {
            return Ok(None);
        };
        let summed_profit = sum_present(&profit.values);

        let cumulative = match classification.summary_sheet(workbook)? {
            Some(summary) => self.find_in_summary(summary),
            None => None,
        }
        .or_else(|| self.find_in_series(set));

        let Some(cell) = cumulative else {
            debug!("No cumulative profit cell to reconcile in '{}'", set.sheet);
            return Ok(None);
        };

        let difference = cell.value - summed_profit;
        let within_tolerance = difference.abs() <= self.config.reconciliation_tolerance;

        Ok(Some(ProfitReconciliation {
            sheet: cell.sheet,
            label: cell.label,
            row: cell.row,
            cumulative_profit: cell.value,
            summed_profit,
            difference,
            within_tolerance,
        }))
    }

    pub fn verify(
        &self,
        workbook: &Workbook,
        classification: &Classification,
        set: &MonthlySeriesSet,
    ) -> Result<(Option<ProfitReconciliation>, Vec<ReportWarning>)> {
        let reconciliation = self.reconcile(workbook, classification, set)?;
        let mut warnings = Vec::new();

        if let Some(r) = reconciliation.as_ref().filter(|r| !r.within_tolerance) {
            let warning = ReportWarning::ProfitDiscrepancy {
                sheet: r.sheet.clone(),
                label: r.label.clone(),
                cumulative_profit: r.cumulative_profit,
                summed_profit: r.summed_profit,
                difference: r.difference,
            };
            warn!("{}", warning);
            warnings.push(warning);
        }

        Ok((reconciliation, warnings))
    }

    /// Label in column A, value in the first numeric cell to its right.
    fn find_in_summary(&self, sheet: &Sheet) -> Option<CumulativeCell> {
        (0..sheet.used_rows()).find_map(|row| {
            let label = sheet.cell(row, 0).as_text();
            if !self.is_cumulative_label(&label) {
                return None;
            }
            let value = (1..sheet.used_columns()).find_map(|col| coerce_number(sheet.cell(row, col)))?;
            Some(CumulativeCell {
                sheet: sheet.name.clone(),
                label,
                row,
                value,
            })
        })
    }

    fn find_in_series(&self, set: &MonthlySeriesSet) -> Option<CumulativeCell> {
        let profit_labels = &self.config.series_labels.total_profit;
        set.series
            .iter()
            .filter(|s| !profit_labels.iter().any(|l| labels_match(l, &s.label)))
            .filter(|s| self.is_cumulative_label(&s.label))
            .find_map(|s| {
                Some(CumulativeCell {
                    sheet: set.sheet.clone(),
                    label: s.label.clone(),
                    row: s.row,
                    value: first_present(&s.values)?,
                })
            })
    }

    fn is_cumulative_label(&self, label: &str) -> bool {
        self.config
            .cumulative_profit_labels
            .iter()
            .any(|l| labels_match(l, label))
    }
}

struct CumulativeCell {
    sheet: String,
    label: String,
    row: usize,
    value: f64,
}
