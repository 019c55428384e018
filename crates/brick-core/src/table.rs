//! Whitespace-delimited numeric tables as read and written by the solver.

use crate::serialization::{format_scientific_f64, write_table_text};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Digits after the decimal point used when tables are written back to disk.
pub const TABLE_WRITE_PRECISION: usize = 18;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("line {line}: {reason}")]
pub struct TableParseError {
    pub line: usize,
    pub reason: String,
}

/// Row-major table of `f64` values with a fixed column count.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NumericTable {
    columns: usize,
    values: Vec<f64>,
}

impl NumericTable {
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, TableParseError> {
        let columns = rows.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(rows.len() * columns);
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != columns {
                return Err(TableParseError {
                    line: index + 1,
                    reason: format!("expected {} columns, found {}", columns, row.len()),
                });
            }
            values.extend(row);
        }
        Ok(Self { columns, values })
    }

    /// Parses text the way the solver's own tables are laid out: one row per
    /// line, blank lines and `#` comments skipped.
    pub fn parse(source: &str) -> Result<Self, TableParseError> {
        let mut columns = None;
        let mut values = Vec::new();

        for (index, line) in source.lines().enumerate() {
            let content = line.split('#').next().unwrap_or_default().trim();
            if content.is_empty() {
                continue;
            }

            let mut width = 0;
            for token in content.split_whitespace() {
                let value = token.parse::<f64>().map_err(|_| TableParseError {
                    line: index + 1,
                    reason: format!("'{token}' is not a number"),
                })?;
                values.push(value);
                width += 1;
            }

            match columns {
                None => columns = Some(width),
                Some(expected) if expected != width => {
                    return Err(TableParseError {
                        line: index + 1,
                        reason: format!("expected {expected} columns, found {width}"),
                    });
                }
                Some(_) => {}
            }
        }

        Ok(Self {
            columns: columns.unwrap_or(0),
            values,
        })
    }

    pub fn read(path: &Path) -> Result<Self, TableParseError> {
        let source = fs::read_to_string(path).map_err(|source| TableParseError {
            line: 0,
            reason: source.to_string(),
        })?;
        Self::parse(&source)
    }

    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        write_table_text(path, &self.to_text())
    }

    pub fn to_text(&self) -> String {
        self.rows()
            .map(|row| {
                row.iter()
                    .map(|value| format_scientific_f64(*value, TABLE_WRITE_PRECISION))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn column_count(&self) -> usize {
        self.columns
    }

    pub fn row_count(&self) -> usize {
        if self.columns == 0 {
            0
        } else {
            self.values.len() / self.columns
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        let start = index.checked_mul(self.columns)?;
        self.values.get(start..start + self.columns)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks(self.columns.max(1))
    }

    pub fn column(&self, index: usize) -> Option<Vec<f64>> {
        (index < self.columns).then(|| self.rows().map(|row| row[index]).collect())
    }

    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        if column >= self.columns {
            return None;
        }
        self.values.get(row * self.columns + column).copied()
    }

    /// Copy with `delta` added to every entry of `column`.
    pub fn with_column_shifted(&self, column: usize, delta: f64) -> Self {
        let mut shifted = self.clone();
        if column < self.columns {
            for row in shifted.values.chunks_mut(self.columns) {
                row[column] += delta;
            }
        }
        shifted
    }

    /// Stacks the rows of several tables with identical widths.
    pub fn vstack(tables: &[NumericTable]) -> Result<Self, TableParseError> {
        let rows = tables
            .iter()
            .flat_map(|table| table.rows().map(<[f64]>::to_vec))
            .collect();
        Self::from_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::NumericTable;
    use tempfile::TempDir;

    #[test]
    fn parse_skips_blank_lines_and_comments() {
        let table = NumericTable::parse("# E  xs  err\n0.5 1.0 0.1\n\n0.6 2.0 0.2 # tail\n")
            .expect("table should parse");
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.row(1), Some(&[0.6, 2.0, 0.2][..]));
        assert_eq!(table.column(0), Some(vec![0.5, 0.6]));
    }

    #[test]
    fn ragged_rows_are_rejected_with_line_number() {
        let error = NumericTable::parse("1 2 3\n4 5\n").expect_err("ragged table");
        assert_eq!(error.line, 2);
        assert!(error.reason.contains("expected 3 columns"));
    }

    #[test]
    fn non_numeric_token_is_rejected() {
        let error = NumericTable::parse("1 2\n3 x\n").expect_err("bad token");
        assert_eq!(error.line, 2);
        assert!(error.reason.contains("'x'"));
    }

    #[test]
    fn shifting_a_column_leaves_original_untouched() {
        let table = NumericTable::from_rows(vec![vec![1.0, 5.0], vec![2.0, 6.0]]).expect("rows");
        let shifted = table.with_column_shifted(0, 0.25);
        assert_eq!(shifted.column(0), Some(vec![1.25, 2.25]));
        assert_eq!(shifted.column(1), Some(vec![5.0, 6.0]));
        assert_eq!(table.column(0), Some(vec![1.0, 2.0]));
    }

    #[test]
    fn written_tables_read_back_exactly() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("segment.dat");
        let table = NumericTable::from_rows(vec![
            vec![0.1 + 0.2, 1.0 / 3.0, 1.0e-30],
            vec![2.5, -7.125, 6.0e23],
        ])
        .expect("rows");

        table.write(&path).expect("table should be written");
        let read = NumericTable::read(&path).expect("table should be read");
        assert_eq!(read, table);
    }

    #[test]
    fn vstack_concatenates_rows() {
        let first = NumericTable::from_rows(vec![vec![1.0, 2.0]]).expect("rows");
        let second = NumericTable::from_rows(vec![vec![3.0, 4.0], vec![5.0, 6.0]]).expect("rows");
        let stacked = NumericTable::vstack(&[first, second]).expect("same width");
        assert_eq!(stacked.row_count(), 3);
        assert_eq!(stacked.get(2, 1), Some(6.0));
        assert_eq!(stacked.get(0, 2), None);
    }
}
