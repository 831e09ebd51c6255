use crate::config::ExtractionConfig;
use crate::error::{ReportError, Result};
use crate::layout::Classification;
use crate::schema::LayoutDescriptor;
use crate::sections::{RowKind, SectionState};
use crate::utils::{coerce_number, is_month_label, labels_match, normalize_label};
use crate::workbook::{Sheet, Workbook};
use crate::{MonthColumn, MonthlySeries, MonthlySeriesSet, SectionBanner};
use log::{debug, warn};

/// The located month-header row and its month columns.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthHeader {
    pub row: usize,
    pub months: Vec<MonthColumn>,
}

/// Walks a classified workbook's label column and builds its monthly series.
pub struct Extractor<'a> {
    config: &'a ExtractionConfig,
}

impl<'a> Extractor<'a> {
    pub fn new(config: &'a ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn extract_series(
        &self,
        workbook: &Workbook,
        classification: &Classification,
    ) -> Result<MonthlySeriesSet> {
        let sheet = classification.data_sheet(workbook)?;
        let layout = &classification.layout;

        let header = self.locate_header(sheet, layout)?;
        debug!(
            "Month header in '{}' row {}: {} month(s)",
            sheet.name,
            header.row + 1,
            header.months.len()
        );

        Ok(self.walk_rows(sheet, layout, header))
    }

    /// Finds the first row in the layout's scan window holding enough
    /// month-like cells to the right of the label column.
    pub fn locate_header(&self, sheet: &Sheet, layout: &LayoutDescriptor) -> Result<MonthHeader> {
        let last_column = self.last_month_column(sheet, layout);

        for row in layout.header_scan.clamp(sheet.used_rows()) {
            let month_like = (layout.first_value_column..last_column)
                .filter(|&col| is_month_label(sheet.cell(row, col)))
                .count();

            if month_like < self.config.min_month_labels {
                continue;
            }

            let months = (layout.first_value_column..last_column)
                .filter_map(|col| {
                    let cell = sheet.cell(row, col);
                    (!cell.is_blank()).then(|| MonthColumn {
                        label: cell.as_text(),
                        column: col,
                    })
                })
                .collect();

            return Ok(MonthHeader { row, months });
        }

        Err(ReportError::HeaderNotFound {
            sheet: sheet.name.clone(),
            first_row: layout.header_scan.first_row + 1,
            last_row: layout.header_scan.last_row + 1,
        })
    }

    fn last_month_column(&self, sheet: &Sheet, layout: &LayoutDescriptor) -> usize {
        let bound = layout.first_value_column + layout.max_month_columns;
        bound.min(sheet.used_columns().max(layout.first_value_column))
    }

    fn walk_rows(
        &self,
        sheet: &Sheet,
        layout: &LayoutDescriptor,
        header: MonthHeader,
    ) -> MonthlySeriesSet {
        let mut set = MonthlySeriesSet {
            sheet: sheet.name.clone(),
            header_row: header.row,
            months: header.months,
            series: Vec::new(),
            banners: Vec::new(),
        };
        let mut state = SectionState::default();

        for row in (set.header_row + 1)..sheet.used_rows() {
            let label = normalize_label(&sheet.cell(row, layout.label_column).as_text());
            if label.is_empty() || self.is_placeholder(&label) {
                continue;
            }

            let values: Vec<Option<f64>> = set
                .months
                .iter()
                .map(|month| {
                    let cell = sheet.cell(row, month.column);
                    let value = coerce_number(cell);
                    if value.is_none() && !cell.is_blank() {
                        debug!(
                            "ValueCoercionSkipped: '{}' row {} month '{}' holds {:?}",
                            label,
                            row + 1,
                            month.label,
                            cell
                        );
                    }
                    value
                })
                .collect();

            let kind = if values.iter().all(Option::is_none) {
                RowKind::Banner
            } else {
                RowKind::Metric
            };

            let (next, category) = state.step(&label, kind, &self.config.keywords);
            state = next;

            match kind {
                RowKind::Banner => set.banners.push(SectionBanner {
                    label,
                    category,
                    row,
                }),
                RowKind::Metric => {
                    if set.series.iter().any(|s| labels_match(&s.label, &label)) {
                        warn!(
                            "Duplicate row label '{}' in '{}' row {}; keeping the first occurrence",
                            label,
                            sheet.name,
                            row + 1
                        );
                        continue;
                    }
                    set.series.push(MonthlySeries {
                        label,
                        category,
                        row,
                        values,
                    });
                }
            }
        }

        set
    }

    fn is_placeholder(&self, label: &str) -> bool {
        self.config
            .placeholder_labels
            .iter()
            .any(|p| labels_match(p, label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::classify;
    use crate::schema::{SemanticCategory, WorkbookVariant};
    use crate::workbook::CellValue;

    fn raw_sheet() -> Sheet {
        let mut sheet = Sheet::new("Data");
        sheet.push_row(["Portfolio report"]);
        sheet.push_row([""]);
        sheet.push_row(["Metric", "Mar 25", "Apr 25", "May 25"]);
        sheet.push_row([
            CellValue::from("Portfolio value"),
            CellValue::from(100.0),
            CellValue::from(110.0),
            CellValue::from(120.0),
        ]);
        sheet.push_row(["PROFIT"]);
        sheet.push_row([
            CellValue::from("Total profit"),
            CellValue::from("$1,000"),
            CellValue::Empty,
            CellValue::from(-200.0),
        ]);
        sheet.push_row([
            CellValue::from("Total profit, %"),
            CellValue::from("1.5%"),
            CellValue::from("0.2%"),
            CellValue::from("-0.4%"),
        ]);
        sheet.push_row(["-", "1", "2", "3"]);
        sheet.push_row([
            CellValue::from("Fees"),
            CellValue::from("n/a"),
            CellValue::from(5.0),
            CellValue::Empty,
        ]);
        sheet
    }

    fn extract(sheet: Sheet) -> Result<MonthlySeriesSet> {
        let config = ExtractionConfig::default();
        let workbook = Workbook::new().with_sheet(sheet);
        let classification = classify(&workbook, &config);
        assert_eq!(classification.variant(), WorkbookVariant::RawMonthlyData);
        Extractor::new(&config).extract_series(&workbook, &classification)
    }

    #[test]
    fn test_header_and_rows() {
        let set = extract(raw_sheet()).unwrap();

        assert_eq!(set.header_row, 2);
        assert_eq!(set.month_labels(), vec!["Mar 25", "Apr 25", "May 25"]);

        let profit = set.get("Total profit").unwrap();
        assert_eq!(profit.values, vec![Some(1000.0), None, Some(-200.0)]);
        assert_eq!(profit.category, SemanticCategory::Profit);

        let percent = set.get("Total profit, %").unwrap();
        assert_eq!(percent.values, vec![Some(1.5), Some(0.2), Some(-0.4)]);
        assert_eq!(percent.category, SemanticCategory::Profit);

        // Placeholder row skipped; unmatched label inherits the PROFIT section.
        assert!(set.get("-").is_none());
        let fees = set.get("Fees").unwrap();
        assert_eq!(fees.category, SemanticCategory::Profit);
        assert_eq!(fees.values, vec![None, Some(5.0), None]);

        assert_eq!(set.banners.len(), 1);
        assert_eq!(set.banners[0].label, "PROFIT");
    }

    #[test]
    fn test_header_not_found_outside_window() {
        let mut sheet = Sheet::new("Data");
        for row in 0..12 {
            sheet.set(row, 0, format!("row {row}"));
        }
        sheet.set(11, 1, "Jan 25");
        sheet.set(11, 2, "Feb 25");

        let err = extract(sheet).unwrap_err();
        assert!(matches!(
            err,
            ReportError::HeaderNotFound { first_row: 1, last_row: 9, .. }
        ));
    }

    #[test]
    fn test_single_month_cell_is_not_a_header() {
        let mut sheet = Sheet::new("Data");
        sheet.push_row(["Report", "March"]);
        sheet.push_row(["Metric", "Mar 25", "Apr 25"]);
        sheet.push_row([CellValue::from("Total profit"), 1.0.into(), 2.0.into()]);

        let set = extract(sheet).unwrap();
        assert_eq!(set.header_row, 1);
    }

    #[test]
    fn test_month_columns_are_capped() {
        let config = ExtractionConfig::default();
        let mut sheet = Sheet::new("Data");
        sheet.set(0, 0, "Metric");
        for col in 1..=20 {
            sheet.set(0, col, format!("M{col:02}'25"));
            sheet.set(1, col, col as f64);
        }
        sheet.set(1, 0, "Total profit");
        let workbook = Workbook::new().with_sheet(sheet);
        let classification = classify(&workbook, &config);

        let set = Extractor::new(&config)
            .extract_series(&workbook, &classification)
            .unwrap();
        assert_eq!(set.months.len(), 13);
        assert_eq!(set.get("Total profit").unwrap().values.len(), 13);
    }

    #[test]
    fn test_duplicate_label_keeps_first() {
        let mut sheet = raw_sheet();
        sheet.push_row([
            CellValue::from("Total profit"),
            CellValue::from(9.0),
            CellValue::from(9.0),
            CellValue::from(9.0),
        ]);
        let set = extract(sheet).unwrap();
        assert_eq!(
            set.get("Total profit").unwrap().values,
            vec![Some(1000.0), None, Some(-200.0)]
        );
    }
}
