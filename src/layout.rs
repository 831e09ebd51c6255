//! Workbook layout classification.
//!
//! The checks run in a fixed order: the net-worth signature first (it wins
//! even when a summary sheet exists), then the summary + monthly-detail pair,
//! then a lone data sheet.

use crate::config::{ExtractionConfig, HeaderLayout};
use crate::error::{ReportError, Result};
use crate::schema::{LayoutDescriptor, RowWindow, WorkbookVariant};
use crate::workbook::{Sheet, Workbook};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub layout: LayoutDescriptor,
    /// Human readable reason for the decision.
    pub evidence: String,
}

impl Classification {
    pub fn variant(&self) -> WorkbookVariant {
        self.layout.variant
    }

    /// The sheet holding monthly rows.
    pub fn data_sheet<'w>(&self, workbook: &'w Workbook) -> Result<&'w Sheet> {
        let name = self.layout.data_sheet.as_deref().ok_or_else(|| {
            ReportError::StructuralMismatch {
                sheet: String::new(),
                details: format!("{} layout has no data sheet", self.layout.variant),
            }
        })?;
        resolve_sheet(workbook, name)
    }

    pub fn summary_sheet<'w>(&self, workbook: &'w Workbook) -> Result<Option<&'w Sheet>> {
        self.layout
            .summary_sheet
            .as_deref()
            .map(|name| resolve_sheet(workbook, name))
            .transpose()
    }
}

fn resolve_sheet<'w>(workbook: &'w Workbook, name: &str) -> Result<&'w Sheet> {
    workbook
        .sheet(name)
        .ok_or_else(|| ReportError::StructuralMismatch {
            sheet: name.to_string(),
            details: format!(
                "sheet selected by the classifier is missing (sheets: {})",
                workbook.sheet_names().join(", ")
            ),
        })
}

pub fn classify(workbook: &Workbook, config: &ExtractionConfig) -> Classification {
    let sheets = &config.sheets;

    if let Some(data) = workbook.sheet(&sheets.raw_data) {
        let label_column = config.layouts.consolidated_net_worth.label_column;
        if let Some(row) = find_net_worth_row(data, label_column, config.net_worth_scan_rows) {
            return Classification {
                layout: descriptor(
                    WorkbookVariant::ConsolidatedNetWorth,
                    Some(data.name.as_str()),
                    workbook
                        .sheet(&sheets.summary)
                        .map(|s| s.name.as_str()),
                    &config.layouts.consolidated_net_worth,
                ),
                evidence: format!(
                    "net-worth signature in '{}' row {}",
                    data.name,
                    row + 1
                ),
            };
        }
    }

    if let (Some(summary), Some(monthly)) = (
        workbook.sheet(&sheets.summary),
        workbook.sheet(&sheets.monthly_detail),
    ) {
        let title = summary.cell(0, 0).as_text();
        if title.to_uppercase().contains("NET WORTH") {
            debug!("Summary title '{}' reclassifies the workbook as net worth", title);
            return Classification {
                layout: descriptor(
                    WorkbookVariant::ConsolidatedNetWorth,
                    Some(monthly.name.as_str()),
                    Some(summary.name.as_str()),
                    &config.layouts.consolidated_net_worth,
                ),
                evidence: format!("summary title '{}' mentions net worth", title),
            };
        }

        return Classification {
            layout: descriptor(
                WorkbookVariant::StructuredReport,
                Some(monthly.name.as_str()),
                Some(summary.name.as_str()),
                &config.layouts.structured_report,
            ),
            evidence: format!("sheets '{}' and '{}' present", summary.name, monthly.name),
        };
    }

    let data_sheets: Vec<&Sheet> = workbook.sheets().iter().filter(|s| !s.is_empty()).collect();
    if let [only] = data_sheets.as_slice() {
        return Classification {
            layout: descriptor(
                WorkbookVariant::RawMonthlyData,
                Some(only.name.as_str()),
                None,
                &config.layouts.raw_monthly_data,
            ),
            evidence: format!("single data sheet '{}'", only.name),
        };
    }

    Classification {
        layout: LayoutDescriptor {
            variant: WorkbookVariant::Unknown,
            data_sheet: None,
            summary_sheet: None,
            header_scan: RowWindow::new(0, 0),
            label_column: 0,
            first_value_column: 1,
            max_month_columns: 0,
        },
        evidence: format!(
            "no known layout among {} non-empty sheet(s)",
            data_sheets.len()
        ),
    }
}

/// Convenience for callers that only need the variant.
pub fn classify_variant(workbook: &Workbook, config: &ExtractionConfig) -> WorkbookVariant {
    classify(workbook, config).variant()
}

fn descriptor(
    variant: WorkbookVariant,
    data_sheet: Option<&str>,
    summary_sheet: Option<&str>,
    layout: &HeaderLayout,
) -> LayoutDescriptor {
    LayoutDescriptor {
        variant,
        data_sheet: data_sheet.map(str::to_string),
        summary_sheet: summary_sheet.map(str::to_string),
        header_scan: layout.header_scan,
        label_column: layout.label_column,
        first_value_column: layout.first_value_column,
        max_month_columns: layout.max_month_columns,
    }
}

/// `NET WORTH`, or `S&P` together with `MARKET`, in the label column.
fn find_net_worth_row(sheet: &Sheet, label_column: usize, scan_rows: usize) -> Option<usize> {
    (0..scan_rows.min(sheet.used_rows())).find(|&row| {
        let label = sheet.cell(row, label_column).as_text().to_uppercase();
        label.contains("NET WORTH") || (label.contains("S&P") && label.contains("MARKET"))
    })
}
