//! Sheet loading
//!
//! This module reads named sheets from a workbook into [`RawMatrix`] values.
//! The first row of a sheet is the header (one subject id per column); every
//! following row is one time step.

use crate::error::{ComputeError, Stage};
use crate::types::{Cell, RawMatrix};
use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Trait for anything that can hand out sheets by name
pub trait SheetSource {
    /// Read a sheet into a time-by-subject matrix
    fn read_sheet(&mut self, name: &str) -> Result<RawMatrix, ComputeError>;
}

/// Workbook on disk (xlsx, xlsm, xls, xlsb or ods, detected from the extension)
pub struct XlsxWorkbook {
    path: String,
    sheets: Sheets<BufReader<File>>,
}

impl XlsxWorkbook {
    /// Open a workbook file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ComputeError> {
        let path = path.as_ref();
        let shown = path.display().to_string();

        if !path.exists() {
            return Err(ComputeError::InputNotFound(format!(
                "workbook {shown} does not exist"
            )));
        }

        let sheets = open_workbook_auto(path).map_err(|e| {
            ComputeError::data_format(Stage::Load, format!("cannot open workbook {shown}: {e}"))
        })?;

        tracing::debug!(path = %shown, "opened workbook");

        Ok(Self {
            path: shown,
            sheets,
        })
    }

    /// Names of all sheets in the workbook
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names()
    }
}

impl SheetSource for XlsxWorkbook {
    fn read_sheet(&mut self, name: &str) -> Result<RawMatrix, ComputeError> {
        if !self.sheet_names().iter().any(|sheet| sheet == name) {
            return Err(ComputeError::InputNotFound(format!(
                "sheet '{name}' in workbook {}",
                self.path
            )));
        }

        let range = self.sheets.worksheet_range(name).map_err(|e| {
            ComputeError::data_format(Stage::Load, format!("cannot read sheet '{name}': {e}"))
        })?;

        matrix_from_range(name, &range)
    }
}

/// Sheets held in memory, keyed by name
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkbook {
    sheets: HashMap<String, RawMatrix>,
}

impl InMemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet, replacing any sheet with the same name
    pub fn with_sheet(mut self, name: impl Into<String>, matrix: RawMatrix) -> Self {
        self.insert(name, matrix);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, matrix: RawMatrix) {
        self.sheets.insert(name.into(), matrix);
    }
}

impl SheetSource for InMemoryWorkbook {
    fn read_sheet(&mut self, name: &str) -> Result<RawMatrix, ComputeError> {
        self.sheets
            .get(name)
            .cloned()
            .ok_or_else(|| ComputeError::InputNotFound(format!("sheet '{name}'")))
    }
}

/// Convert a calamine cell range into a matrix.
///
/// An empty range yields an empty matrix.
pub fn matrix_from_range(sheet: &str, range: &Range<Data>) -> Result<RawMatrix, ComputeError> {
    let mut rows = range.rows();

    let Some(header) = rows.next() else {
        return Ok(RawMatrix::empty());
    };

    // Trailing empty header cells are formatting leftovers, not subjects
    let width = header
        .iter()
        .rposition(|cell| !matches!(cell, Data::Empty))
        .map_or(0, |last| last + 1);

    let subjects = header[..width]
        .iter()
        .enumerate()
        .map(|(column, cell)| subject_id(sheet, column, cell))
        .collect::<Result<Vec<_>, _>>()?;

    let body: Vec<Vec<Cell>> = rows
        .map(|row| {
            let mut cells: Vec<Cell> = row.iter().map(to_cell).collect();
            // Trailing empty cells past the header are dropped, anything else is kept
            while cells.len() > width && cells.last() == Some(&Cell::Empty) {
                cells.pop();
            }
            cells
        })
        .collect();

    RawMatrix::new(subjects, body).map_err(|row| {
        ComputeError::data_format(
            Stage::Load,
            format!("sheet '{sheet}' row {row} has values outside the header columns"),
        )
    })
}

fn subject_id(sheet: &str, column: usize, cell: &Data) -> Result<String, ComputeError> {
    let id = match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.is_finite() => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        other => {
            return Err(ComputeError::data_format(
                Stage::Load,
                format!("sheet '{sheet}' header column {column} is not a subject id: {other:?}"),
            ))
        }
    };

    if id.is_empty() {
        return Err(ComputeError::data_format(
            Stage::Load,
            format!("sheet '{sheet}' header column {column} has an empty subject id"),
        ));
    }

    Ok(id)
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::String(s) => Cell::Text(s.clone()),
        Data::Empty => Cell::Empty,
        other => Cell::Invalid(format!("{other:?}")),
    }
}
