//! A [`RowCursor`] is the thin seam between "a tabular dataset" and the
//! training/inference code: it never assumes ROOT, CSV, or any particular
//! backing store. [`InMemoryRows`] is a simple column-major fixture used by
//! tests and the CLI binaries.

use std::collections::HashMap;
use std::path::Path;

use crate::error::DataError;

pub trait RowCursor {
    fn row_count(&self) -> usize;
    fn get_row(&mut self, i: usize) -> Result<(), DataError>;
    fn value(&self, variable: &str) -> Result<f64, DataError>;
    fn event_weight(&self) -> Result<f64, DataError>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRows {
    event_weight_name: String,
    columns: HashMap<String, Vec<f64>>,
    n_rows: usize,
    current: Option<usize>,
}

impl InMemoryRows {
    pub fn new(event_weight_name: impl Into<String>) -> Self {
        Self {
            event_weight_name: event_weight_name.into(),
            columns: HashMap::new(),
            n_rows: 0,
            current: None,
        }
    }

    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.n_rows = self.n_rows.max(values.len());
        self.columns.insert(name.into(), values);
        self
    }

    /// Parses a comma-delimited file with a header row; every non-weight
    /// column becomes a variable of the same name.
    pub fn from_csv(path: &Path, event_weight_name: &str) -> Result<Self, DataError> {
        let text = std::fs::read_to_string(path)
            .map_err(|_| DataError::UnknownVariable(path.display().to_string()))?;
        let mut lines = text.lines();
        let header = lines.next().ok_or(DataError::NoCurrentRow)?;
        let headers: Vec<&str> = header.split(',').map(|h| h.trim()).collect();
        let mut columns: HashMap<String, Vec<f64>> = headers
            .iter()
            .map(|h| (h.to_string(), Vec::new()))
            .collect();
        let mut n_rows = 0;
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            for (h, v) in headers.iter().zip(line.split(',')) {
                let parsed: f64 = v.trim().parse().map_err(|_| {
                    DataError::RowOutOfRange {
                        index: n_rows,
                        row_count: n_rows,
                    }
                })?;
                columns.get_mut(*h).unwrap().push(parsed);
            }
            n_rows += 1;
        }
        Ok(Self {
            event_weight_name: event_weight_name.to_string(),
            columns,
            n_rows,
            current: None,
        })
    }
}

impl RowCursor for InMemoryRows {
    fn row_count(&self) -> usize {
        self.n_rows
    }

    fn get_row(&mut self, i: usize) -> Result<(), DataError> {
        if i >= self.n_rows {
            return Err(DataError::RowOutOfRange {
                index: i,
                row_count: self.n_rows,
            });
        }
        self.current = Some(i);
        Ok(())
    }

    fn value(&self, variable: &str) -> Result<f64, DataError> {
        let i = self.current.ok_or(DataError::NoCurrentRow)?;
        let column = self
            .columns
            .get(variable)
            .ok_or_else(|| DataError::UnknownVariable(variable.to_string()))?;
        column.get(i).copied().ok_or(DataError::RowOutOfRange {
            index: i,
            row_count: self.n_rows,
        })
    }

    fn event_weight(&self) -> Result<f64, DataError> {
        self.value(&self.event_weight_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_back_column_values_by_row() {
        let mut rows = InMemoryRows::new("w")
            .with_column("pt", vec![1.0, 2.0, 3.0])
            .with_column("w", vec![1.0, 1.0, 1.0]);
        rows.get_row(1).unwrap();
        assert_eq!(rows.value("pt").unwrap(), 2.0);
        assert_eq!(rows.event_weight().unwrap(), 1.0);
    }

    #[test]
    fn out_of_range_row_is_an_error() {
        let mut rows = InMemoryRows::new("w").with_column("pt", vec![1.0]);
        assert!(matches!(
            rows.get_row(5),
            Err(DataError::RowOutOfRange { .. })
        ));
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let mut rows = InMemoryRows::new("w").with_column("pt", vec![1.0]);
        rows.get_row(0).unwrap();
        assert!(matches!(
            rows.value("missing"),
            Err(DataError::UnknownVariable(_))
        ));
    }
}
