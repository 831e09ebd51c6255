use crate::error::{ReportError, Result};
use crate::workbook::{CellValue, Sheet, Workbook};
use calamine::{open_workbook_auto, Data, Reader};
use globset::GlobBuilder;
use log::debug;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Loads every worksheet of an `.xlsx`, `.xlsm`, `.xlsb`, `.xls` or `.ods`
/// file into the in-memory workbook model.
pub fn load_workbook(path: impl AsRef<Path>) -> Result<Workbook> {
    let path = path.as_ref();
    let mut source = open_workbook_auto(path)?;

    let mut workbook = Workbook::new();
    for sheet_name in source.sheet_names() {
        let range = source.worksheet_range(&sheet_name)?;
        let (start_row, start_col) = range.start().unwrap_or((0, 0));

        let mut sheet = Sheet::new(sheet_name.as_str());
        for (row, col, value) in range.used_cells() {
            let cell = convert_cell(value);
            if cell.is_blank() {
                continue;
            }
            sheet.set(start_row as usize + row, start_col as usize + col, cell);
        }

        debug!(
            "Loaded sheet '{}' ({} rows x {} columns) from {}",
            sheet.name,
            sheet.used_rows(),
            sheet.used_columns(),
            path.display()
        );
        workbook.add_sheet(sheet);
    }

    Ok(workbook)
}

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Expands command-line inputs into workbook paths.
///
/// A plain path is passed through untouched, even if it does not exist, so the
/// batch reports it as a failed file. A glob is matched against every workbook
/// found under its literal directory prefix.
pub fn expand_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        let pattern = pattern.as_ref().trim();
        if pattern.is_empty() {
            continue;
        }
        if !is_glob(pattern) {
            paths.push(PathBuf::from(pattern));
            continue;
        }

        let matcher = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| ReportError::InvalidPattern {
                pattern: pattern.to_string(),
                details: e.to_string(),
            })?
            .compile_matcher();
        let root = literal_prefix(pattern);
        let implicit_root = root == Path::new(".") && !pattern.starts_with("./");

        let mut matched: Vec<PathBuf> = WalkDir::new(&root)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                let candidate = if implicit_root {
                    path.strip_prefix(".").unwrap_or(path.as_path())
                } else {
                    path.as_path()
                };
                is_workbook_path(path) && matcher.is_match(candidate)
            })
            .collect();
        matched.sort();

        debug!(
            "Pattern '{}' matched {} workbook(s) under {}",
            pattern,
            matched.len(),
            root.display()
        );
        paths.extend(matched);
    }

    let mut seen = HashSet::new();
    paths.retain(|path| seen.insert(path.clone()));
    Ok(paths)
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Directory part of a pattern before the first component holding a glob
/// metacharacter.
fn literal_prefix(pattern: &str) -> PathBuf {
    let mut root = PathBuf::new();
    for component in Path::new(pattern).components() {
        if is_glob(&component.as_os_str().to_string_lossy()) {
            break;
        }
        root.push(component);
    }
    if root.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        root
    }
}

fn is_workbook_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Maps a reader cell onto the scalar model. Date cells become month-label
/// text (`Mar 2025`) so a date-typed header row reads like a typed one.
pub fn convert_cell(value: &Data) -> CellValue {
    match value {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::Int(v) => CellValue::Number(*v as f64),
        Data::Float(v) => CellValue::Number(*v),
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => CellValue::Text(datetime.format("%b %Y").to_string()),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::from(s.as_str()),
    }
}
