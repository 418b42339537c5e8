//! Tabular projection of merged records.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::{FinancialPeriodRecord, Granularity};

/// Period-indexed table. Missing metrics are `None`, never a numeric placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    granularity: Granularity,
    index: Vec<String>,
    columns: Vec<String>,
    /// `cells[row][column]`.
    cells: Vec<Vec<Option<f64>>>,
}

impl Frame {
    /// Projects an ordered sequence of records of one granularity.
    pub fn from_records(granularity: Granularity, records: &[FinancialPeriodRecord]) -> Self {
        let columns: Vec<String> = records
            .iter()
            .flat_map(|record| record.metrics().keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let index = records.iter().map(|record| record.period.label()).collect();
        let cells = records
            .iter()
            .map(|record| columns.iter().map(|column| record.get(column)).collect())
            .collect();

        Self {
            granularity,
            index,
            columns,
            cells,
        }
    }

    pub const fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Period labels, `"{year}Q{quarter}"` or `"{year}"`, in record order.
    pub fn index(&self) -> &[String] {
        &self.index
    }

    /// Union of metric names across all records, sorted.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.index.len(), self.columns.len())
    }

    pub fn value(&self, label: &str, column: &str) -> Option<f64> {
        let row = self.index.iter().position(|candidate| candidate == label)?;
        let column = self.columns.iter().position(|candidate| candidate == column)?;
        self.cells.get(row)?.get(column).copied().flatten()
    }

    /// Values of one column, one per row.
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let column = self.columns.iter().position(|candidate| candidate == name)?;
        Some(
            self.cells
                .iter()
                .map(|row| row.get(column).copied().flatten())
                .collect(),
        )
    }

    /// `(column, value)` pairs of one row.
    pub fn row(&self, label: &str) -> Option<Vec<(&str, Option<f64>)>> {
        let row = self.index.iter().position(|candidate| candidate == label)?;
        let cells = self.cells.get(row)?;
        Some(
            self.columns
                .iter()
                .enumerate()
                .map(|(column, name)| (name.as_str(), cells.get(column).copied().flatten()))
                .collect(),
        )
    }
}
