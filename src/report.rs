use crate::error::{ReportError, Result};
use crate::layout::Classification;
use crate::metrics::KpiSet;
use crate::reconciliation::{ProfitReconciliation, ReportWarning};
use crate::schema::{LayoutDescriptor, WorkbookVariant};
use crate::workbook::Workbook;
use crate::{MonthlySeries, MonthlySeriesSet, SectionBanner};
use num_format::{Locale, ToFormattedString};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use log::warn;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SheetInventory {
    pub name: String,
    pub used_rows: usize,
    pub used_columns: usize,
}

/// Everything extracted from one workbook, handed to whatever renders it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkbookReport {
    pub path: String,
    pub variant: WorkbookVariant,
    #[schemars(description = "Why the classifier chose this variant")]
    pub evidence: String,
    pub layout: LayoutDescriptor,
    pub sheets: Vec<SheetInventory>,

    #[schemars(description = "Month labels in column order; every series has one value per label")]
    pub months: Vec<String>,
    pub series: Vec<MonthlySeries>,
    pub banners: Vec<SectionBanner>,

    #[schemars(description = "Absent for Unknown layouts")]
    pub kpis: Option<KpiSet>,
    pub reconciliation: Option<ProfitReconciliation>,
    pub warnings: Vec<ReportWarning>,
}

impl WorkbookReport {
    /// Report for a workbook with no recognised layout: the sheet inventory only.
    pub fn unknown(path: &str, workbook: &Workbook, classification: &Classification) -> Self {
        Self {
            path: path.to_string(),
            variant: classification.variant(),
            evidence: classification.evidence.clone(),
            layout: classification.layout.clone(),
            sheets: inventory(workbook),
            months: Vec::new(),
            series: Vec::new(),
            banners: Vec::new(),
            kpis: None,
            reconciliation: None,
            warnings: Vec::new(),
        }
    }

    pub fn extracted(
        path: &str,
        workbook: &Workbook,
        classification: &Classification,
        set: MonthlySeriesSet,
        kpis: KpiSet,
        reconciliation: Option<ProfitReconciliation>,
        warnings: Vec<ReportWarning>,
    ) -> Self {
        Self {
            path: path.to_string(),
            variant: classification.variant(),
            evidence: classification.evidence.clone(),
            layout: classification.layout.clone(),
            sheets: inventory(workbook),
            months: set.month_labels().into_iter().map(str::to_string).collect(),
            series: set.series,
            banners: set.banners,
            kpis: Some(kpis),
            reconciliation,
            warnings,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// One console line: variant, month and series counts, and the headline KPIs.
    pub fn status_line(&self) -> String {
        let mut line = format!("OK   {} [{}]", self.path, self.variant);
        match &self.kpis {
            Some(kpis) => {
                line.push_str(&format!(
                    " {} month(s), {} series, total profit {}, growth {:.2}%, win rate {:.0}%",
                    self.months.len(),
                    self.series.len(),
                    format_money(kpis.total_profit),
                    kpis.growth_percent,
                    kpis.win_rate * 100.0
                ));
            }
            None => {
                let names: Vec<&str> = self.sheets.iter().map(|s| s.name.as_str()).collect();
                line.push_str(&format!(" sheets: {}", names.join(", ")));
            }
        }
        if !self.warnings.is_empty() {
            line.push_str(&format!(" ({} warning(s))", self.warnings.len()));
        }
        line
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("# {}\n\n", self.path));
        output.push_str(&format!("**Layout:** {} ({})\n\n", self.variant, self.evidence));

        output.push_str("## Sheets\n\n");
        output.push_str("| Sheet | Rows | Columns |\n|---|---:|---:|\n");
        for sheet in &self.sheets {
            output.push_str(&format!(
                "| {} | {} | {} |\n",
                sheet.name, sheet.used_rows, sheet.used_columns
            ));
        }
        output.push('\n');

        if let Some(kpis) = &self.kpis {
            output.push_str("## Key Metrics\n\n");
            output.push_str("| Metric | Value |\n|---|---:|\n");
            let rows = [
                ("Starting value", format_money(kpis.starting_value)),
                ("Ending value", format_money(kpis.ending_value)),
                ("Growth", format_money(kpis.growth)),
                ("Growth %", format!("{:.2}%", kpis.growth_percent)),
                ("Total profit", format_money(kpis.total_profit)),
                ("Profit %", format!("{:.2}%", kpis.profit_percent)),
                ("Total dividends", format_money(kpis.total_dividends)),
                ("Total gains", format_money(kpis.total_gains)),
                ("Best month", format_money(kpis.best_month_profit)),
                ("Worst month", format_money(kpis.worst_month_profit)),
                ("Average month", format_money(kpis.average_month_profit)),
                (
                    "Positive months",
                    format!("{} of {}", kpis.positive_month_count, kpis.total_months),
                ),
                ("Win rate", format!("{:.1}%", kpis.win_rate * 100.0)),
                ("Total trades", format!("{:.0}", kpis.trading.total_trades)),
                (
                    "Average monthly trades",
                    format!("{:.1}", kpis.trading.average_monthly_trades),
                ),
            ];
            for (name, value) in rows {
                output.push_str(&format!("| {} | {} |\n", name, value));
            }
            output.push('\n');

            if let Some(benchmark) = &kpis.benchmark {
                output.push_str("## Benchmark\n\n");
                output.push_str(&format!(
                    "- Portfolio gain: {} ({:.2}%)\n",
                    format_money(benchmark.portfolio_gain),
                    benchmark.portfolio_gain_percent
                ));
                output.push_str(&format!(
                    "- {} gain: {} ({:.2}%)\n",
                    benchmark.benchmark_label.as_deref().unwrap_or("Benchmark"),
                    format_money(benchmark.benchmark_gain),
                    benchmark.benchmark_gain_percent
                ));
                output.push_str(&format!(
                    "- Outperformance: {}\n\n",
                    format_money(benchmark.outperformance)
                ));
            }
        }

        if !self.warnings.is_empty() {
            output.push_str("## Warnings\n\n");
            for warning in &self.warnings {
                output.push_str(&format!("- {}\n", warning));
            }
            output.push('\n');
        }

        output
    }

    /// Writes the monthly series as CSV: one row per series, one column per month.
    pub fn write_series_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = vec!["Label".to_string(), "Category".to_string()];
        header.extend(self.months.iter().cloned());
        writer.write_record(&header)?;

        for series in &self.series {
            let mut record = vec![series.label.clone(), series.category.to_string()];
            record.extend(
                series
                    .values
                    .iter()
                    .map(|v| v.map(|n| n.to_string()).unwrap_or_default()),
            );
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(WorkbookReport)
    }
}

fn inventory(workbook: &Workbook) -> Vec<SheetInventory> {
    workbook
        .sheets()
        .iter()
        .map(|sheet| SheetInventory {
            name: sheet.name.clone(),
            used_rows: sheet.used_rows(),
            used_columns: sheet.used_columns(),
        })
        .collect()
}

/// `$1,234.56`, `-$200.00`. Rounds to the cent before grouping.
pub fn format_money(value: f64) -> String {
    let total_cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && total_cents > 0 { "-" } else { "" };
    format!(
        "{}${}.{:02}",
        sign,
        (total_cents / 100).to_formatted_string(&Locale::en),
        total_cents % 100
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FileFailure {
    pub kind: String,
    pub message: String,
}

impl From<&ReportError> for FileFailure {
    fn from(err: &ReportError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Result of processing one input path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FileOutcome {
    pub path: String,
    #[schemars(description = "Detected layout; absent when the file could not be read")]
    pub variant: Option<WorkbookVariant>,
    pub report: Option<WorkbookReport>,
    pub failure: Option<FileFailure>,
}

impl FileOutcome {
    pub fn succeeded(report: WorkbookReport) -> Self {
        Self {
            path: report.path.clone(),
            variant: Some(report.variant),
            report: Some(report),
            failure: None,
        }
    }

    /// `variant` is the classification reached before the failure, if any.
    pub fn failed(path: &str, variant: Option<WorkbookVariant>, err: &ReportError) -> Self {
        Self {
            path: path.to_string(),
            variant,
            report: None,
            failure: Some(FileFailure::from(err)),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }

    pub fn status_line(&self) -> String {
        match (&self.report, &self.failure) {
            (Some(report), _) => report.status_line(),
            (None, Some(failure)) => match self.variant {
                Some(variant) => format!(
                    "FAIL {} [{}] {}: {}",
                    self.path, variant, failure.kind, failure.message
                ),
                None => format!("FAIL {} {}: {}", self.path, failure.kind, failure.message),
            },
            (None, None) => format!("FAIL {} no result", self.path),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatchSummary {
    pub files: Vec<FileOutcome>,
    pub succeeded: usize,
    pub failed: usize,
    #[schemars(description = "Successful files whose layout was not recognised")]
    pub unknown: usize,
}

impl BatchSummary {
    pub fn push(&mut self, outcome: FileOutcome) {
        match &outcome.report {
            Some(report) => {
                self.succeeded += 1;
                if report.variant == WorkbookVariant::Unknown {
                    self.unknown += 1;
                }
            }
            None => self.failed += 1,
        }
        self.files.push(outcome);
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn reports(&self) -> impl Iterator<Item = &WorkbookReport> {
        self.files.iter().filter_map(|f| f.report.as_ref())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "# Portfolio Metrics\n\n{} file(s): {} succeeded, {} failed, {} unrecognised\n\n",
            self.files.len(),
            self.succeeded,
            self.failed,
            self.unknown
        ));
        for file in &self.files {
            match (&file.report, &file.failure) {
                (Some(report), _) => output.push_str(&report.to_markdown()),
                (None, Some(failure)) => output.push_str(&format!(
                    "# {}\n\n**Failed:** {} ({})\n\n",
                    file.path, failure.message, failure.kind
                )),
                (None, None) => {}
            }
        }
        output
    }

    /// Writes `<stem>.series.csv` into `dir` for every report with KPIs.
    ///
    /// Reports whose file stems collide (same name in different directories)
    /// get a numeric suffix, `<stem>-2.series.csv`, instead of overwriting the
    /// earlier export. Returns the written paths in batch order.
    pub fn write_series_csvs(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let mut used = HashSet::new();
        let mut written = Vec::new();
        for report in self.reports().filter(|r| r.kpis.is_some()) {
            let stem = Path::new(&report.path)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "workbook".to_string());

            let mut name = stem.clone();
            let mut suffix = 1;
            while !used.insert(name.to_lowercase()) {
                suffix += 1;
                name = format!("{stem}-{suffix}");
            }
            if suffix > 1 {
                warn!(
                    "CSV name '{}' already used in this batch; writing {} as '{}.series.csv'",
                    stem, report.path, name
                );
            }

            let target = dir.join(format!("{name}.series.csv"));
            report.write_series_csv(&target)?;
            written.push(target);
        }

        Ok(written)
    }

    pub fn summary_line(&self) -> String {
        format!(
            "{} file(s): {} ok, {} failed, {} unknown layout",
            self.files.len(),
            self.succeeded,
            self.failed,
            self.unknown
        )
    }
}
