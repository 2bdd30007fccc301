//! Core data model shared by every pipeline stage.
//!
//! A [`RawTable`] is what ingestion produces: header names plus untyped cell
//! strings. The classifier turns it into a typed [`Table`], whose rows are
//! stored positionally and aligned to the column list.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{CleansingError, Result};

// ============================================================================
// Cells and columns
// ============================================================================

/// One value in a typed table.
///
/// Serialized untagged: `null`, a JSON number, or a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Missing,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Numeric value of the cell, if it holds one.
    #[inline]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => Ok(()),
            Cell::Number(v) => write!(f, "{}", v),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// Role of a column in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Every non-empty observed cell parses as a finite number.
    Numeric,
    /// Anything else that is not the label.
    Categorical,
    /// Target column; excluded from imputation, outliers and normalization.
    Label,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::Label => "label",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

fn check_unique<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(CleansingError::DuplicateColumn(name.to_string()));
        }
    }
    Ok(())
}

fn check_rectangular<T>(width: usize, rows: &[Vec<T>]) -> Result<()> {
    for (i, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(CleansingError::RaggedRow {
                row: i,
                expected: width,
                found: row.len(),
            });
        }
    }
    Ok(())
}

// ============================================================================
// Raw (untyped) table
// ============================================================================

/// Header names plus rows of untyped cell strings, as produced by ingestion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Build a raw table, rejecting duplicate headers and ragged rows.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        check_unique(headers.iter().map(String::as_str))?;
        check_rectangular(headers.len(), &rows)?;
        Ok(Self { headers, rows })
    }

    /// Convenience constructor from string slices, mostly for tests and demos.
    pub fn from_rows<H, R, C>(headers: H, rows: R) -> Result<Self>
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let headers = headers.into_iter().map(Into::into).collect();
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        Self::new(headers, rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    /// Iterate over the raw cells of one column.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(move |row| row[idx].as_str())
    }
}

// ============================================================================
// Typed table
// ============================================================================

/// Typed table with ordered, unique columns and positional rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<ColumnSpec>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Build a table, rejecting duplicate column names and ragged rows.
    pub fn new(columns: Vec<ColumnSpec>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        check_unique(columns.iter().map(|c| c.name.as_str()))?;
        check_rectangular(columns.len(), &rows)?;
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Position of a column by name, as an error if absent.
    pub fn require_index(&self, name: &str) -> Result<usize> {
        self.index_of(name)
            .ok_or_else(|| CleansingError::ColumnNotFound(name.to_string()))
    }

    pub fn kind(&self, idx: usize) -> ColumnKind {
        self.columns[idx].kind
    }

    /// Index of the label column, if the table has one.
    pub fn label_index(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.kind == ColumnKind::Label)
    }

    /// Indices of Numeric (non-label) columns, in column order.
    pub fn numeric_indices(&self) -> Vec<usize> {
        self.indices_of(ColumnKind::Numeric)
    }

    /// Indices of Categorical columns, in column order.
    pub fn categorical_indices(&self) -> Vec<usize> {
        self.indices_of(ColumnKind::Categorical)
    }

    fn indices_of(&self, kind: ColumnKind) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == kind)
            .map(|(i, _)| i)
            .collect()
    }

    /// Cell by row and column position.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        &self.rows[row][col]
    }

    /// Iterate over the cells of one column.
    pub fn column_cells(&self, idx: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().map(move |row| &row[idx])
    }

    /// Non-missing numeric values of one column, in row order.
    pub fn numeric_values(&self, idx: usize) -> Vec<f64> {
        self.column_cells(idx).filter_map(Cell::as_number).collect()
    }

    /// Number of Missing cells in one column.
    pub fn missing_count(&self, idx: usize) -> usize {
        self.column_cells(idx).filter(|c| c.is_missing()).count()
    }

    /// Number of Numeric feature columns.
    pub fn feature_count(&self) -> usize {
        self.numeric_indices().len()
    }

    /// Apply `f` to every cell of one column.
    pub(crate) fn map_column(&mut self, idx: usize, mut f: impl FnMut(&Cell) -> Cell) {
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
    }

    /// Keep rows for which `keep` returns true. Returns the number removed.
    pub(crate) fn retain_rows(&mut self, mut keep: impl FnMut(&[Cell]) -> bool) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| keep(row));
        before - self.rows.len()
    }

    /// Consume the table and return its rows.
    pub fn into_rows(self) -> Vec<Vec<Cell>> {
        self.rows
    }

    /// Convert to a polars `DataFrame`.
    ///
    /// Columns holding only numbers (or missing cells) become `Float64`;
    /// everything else becomes `String`. Missing cells become nulls.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.width());

        for (idx, spec) in self.columns.iter().enumerate() {
            let all_numeric = self
                .column_cells(idx)
                .all(|c| matches!(c, Cell::Missing | Cell::Number(_)));

            let series = if all_numeric {
                let values: Vec<Option<f64>> = self.column_cells(idx).map(Cell::as_number).collect();
                Series::new(spec.name.as_str().into(), values)
            } else {
                let values: Vec<Option<String>> = self
                    .column_cells(idx)
                    .map(|c| match c {
                        Cell::Missing => None,
                        other => Some(other.to_string()),
                    })
                    .collect();
                Series::new(spec.name.as_str().into(), values)
            };

            columns.push(series.into_column());
        }

        Ok(DataFrame::new(columns)?)
    }
}
