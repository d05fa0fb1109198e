//! Tolerant TAB-separated record reader.
//!
//! Each row is converted independently. A row that fails conversion is
//! dropped and reported as a [`RowDiagnostic`]; reading carries on with the
//! next line. Only I/O failures abort.
//!
//! Format rules:
//! - one record per line, columns separated by TAB, no quoting or escaping
//! - blank lines are ignored
//! - a blank cell is an absent value
//! - numeric cells are trimmed before conversion; text cells are kept verbatim

use serde::Serialize;
use std::io::{self, Read};

/// A record type with a fixed column layout.
pub trait TabRecord: Sized {
    /// Column names, in file order.
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &Row<'_>) -> Result<Self, RowError>;
}

/// Why a row was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum RowError {
    #[error("expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },
    #[error("required column `{column}` is blank")]
    Missing { column: &'static str },
    #[error("column `{column}`: cannot read {value:?} as {kind}")]
    Malformed {
        column: &'static str,
        value: String,
        kind: &'static str,
    },
    #[error("unreadable line: {0}")]
    Unreadable(String),
}

/// A dropped row: its 1-based line number and the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowDiagnostic {
    pub line: u64,
    pub error: RowError,
}

/// Records that converted cleanly, in input order, plus the rows that did not.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub diagnostics: Vec<RowDiagnostic>,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            diagnostics: Vec::new(),
        }
    }
}

/// Typed access to the cells of one row.
pub struct Row<'r> {
    record: &'r csv::StringRecord,
    columns: &'static [&'static str],
}

impl<'r> Row<'r> {
    /// Raw cell, `None` when blank.
    fn cell(&self, column: &'static str) -> Option<&'r str> {
        let pos = self.columns.iter().position(|c| *c == column)?;
        self.record.get(pos).filter(|v| !v.is_empty())
    }

    /// Trimmed cell for numeric conversion, `None` when blank.
    fn numeric_cell(&self, column: &'static str) -> Option<&'r str> {
        self.cell(column).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn required_int(&self, column: &'static str) -> Result<i64, RowError> {
        let raw = self
            .numeric_cell(column)
            .ok_or(RowError::Missing { column })?;
        raw.parse().map_err(|_| RowError::Malformed {
            column,
            value: raw.to_string(),
            kind: "integer",
        })
    }

    pub fn required_float(&self, column: &'static str) -> Result<f64, RowError> {
        let raw = self
            .numeric_cell(column)
            .ok_or(RowError::Missing { column })?;
        raw.parse().map_err(|_| RowError::Malformed {
            column,
            value: raw.to_string(),
            kind: "decimal",
        })
    }

    pub fn required_text(&self, column: &'static str) -> Result<String, RowError> {
        self.cell(column)
            .map(str::to_string)
            .ok_or(RowError::Missing { column })
    }

    pub fn text(&self, column: &'static str) -> Option<String> {
        self.cell(column).map(str::to_string)
    }

    /// Blank or unparsable cells read as `None`.
    pub fn float(&self, column: &'static str) -> Option<f64> {
        self.numeric_cell(column)?.parse().ok()
    }

    /// Blank or unparsable cells read as 0.
    pub fn int_or_zero(&self, column: &'static str) -> i64 {
        self.numeric_cell(column)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    /// Blank or unparsable cells read as 0.0.
    pub fn float_or_zero(&self, column: &'static str) -> f64 {
        self.float(column).unwrap_or(0.0)
    }
}

/// Read every row of `reader` as a `T`.
///
/// With `has_header` the first line is treated as a header and never
/// converted.
pub fn read_records<T: TabRecord, R: Read>(reader: R, has_header: bool) -> io::Result<Parsed<T>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(has_header)
        .quoting(false)
        .flexible(true)
        .from_reader(reader);

    let mut parsed = Parsed::default();
    let mut record = csv::StringRecord::new();
    loop {
        let line = match rdr.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => record.position().map_or(0, |p| p.line()),
            Err(err) if err.is_io_error() => {
                return Err(match err.into_kind() {
                    csv::ErrorKind::Io(e) => e,
                    other => io::Error::new(io::ErrorKind::Other, format!("{other:?}")),
                });
            }
            Err(err) => {
                let line = err.position().map_or(0, |p| p.line());
                reject(&mut parsed, line, RowError::Unreadable(err.to_string()));
                continue;
            }
        };

        match convert::<T>(&record) {
            Ok(value) => parsed.records.push(value),
            Err(error) => reject(&mut parsed, line, error),
        }
    }
    Ok(parsed)
}

fn convert<T: TabRecord>(record: &csv::StringRecord) -> Result<T, RowError> {
    if record.len() != T::COLUMNS.len() {
        return Err(RowError::ColumnCount {
            expected: T::COLUMNS.len(),
            found: record.len(),
        });
    }
    T::from_row(&Row {
        record,
        columns: T::COLUMNS,
    })
}

fn reject<T>(parsed: &mut Parsed<T>, line: u64, error: RowError) {
    tracing::warn!(line, %error, "ignoring data error");
    parsed.diagnostics.push(RowDiagnostic { line, error });
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, PartialEq)]
    struct Pair {
        id: i64,
        label: Option<String>,
        weight: f64,
    }

    impl TabRecord for Pair {
        const COLUMNS: &'static [&'static str] = &["id", "label", "weight"];

        fn from_row(row: &Row<'_>) -> Result<Self, RowError> {
            Ok(Self {
                id: row.required_int("id")?,
                label: row.text("label"),
                weight: row.float_or_zero("weight"),
            })
        }
    }

    fn read(input: &str, has_header: bool) -> Parsed<Pair> {
        read_records(input.as_bytes(), has_header).unwrap()
    }

    #[test]
    fn header_flag_controls_first_line() {
        let input = "1\ta\t1.5\n2\tb\t2.5\n";
        assert_eq!(read(input, false).records.len(), 2);
        let with_header = read(input, true);
        assert_eq!(with_header.records.len(), 1);
        assert_eq!(with_header.records[0].id, 2);
    }

    #[test]
    fn numeric_cells_are_trimmed() {
        let parsed = read(" 7 \t x \t 0.25 \n", false);
        assert_eq!(
            parsed.records,
            vec![Pair {
                id: 7,
                label: Some(" x ".to_string()),
                weight: 0.25
            }]
        );
    }

    #[test]
    fn blank_optional_cells_default() {
        let parsed = read("3\t\t\n", false);
        assert_eq!(
            parsed.records,
            vec![Pair {
                id: 3,
                label: None,
                weight: 0.0
            }]
        );
    }

    #[test]
    fn malformed_optional_cell_defaults() {
        let parsed = read("3\tx\tabc\n", false);
        assert_eq!(parsed.records[0].weight, 0.0);
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn bad_rows_are_reported_with_line_numbers() {
        let input = "1\ta\t1\nX\tb\t2\n3\tc\n\t\t\n5\te\t5\n";
        let parsed = read(input, false);
        assert_eq!(
            parsed.records.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![1, 5]
        );
        assert_eq!(
            parsed.diagnostics,
            vec![
                RowDiagnostic {
                    line: 2,
                    error: RowError::Malformed {
                        column: "id",
                        value: "X".to_string(),
                        kind: "integer"
                    }
                },
                RowDiagnostic {
                    line: 3,
                    error: RowError::ColumnCount {
                        expected: 3,
                        found: 2
                    }
                },
                RowDiagnostic {
                    line: 4,
                    error: RowError::Missing { column: "id" }
                },
            ]
        );
    }

    #[test]
    fn invalid_utf8_skips_only_that_row() {
        let mut input = b"1\ta\t1\n2\t".to_vec();
        input.extend_from_slice(&[0xff, 0xfe]);
        input.extend_from_slice(b"\t2\n3\tc\t3\n");
        let parsed: Parsed<Pair> = read_records(input.as_slice(), false).unwrap();
        assert_eq!(
            parsed.records.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert!(matches!(
            parsed.diagnostics[0].error,
            RowError::Unreadable(_)
        ));
    }

    #[test]
    fn quotes_are_plain_text() {
        let parsed = read("1\t\"Am \"Berg\t1\n2\tb\t2\n", false);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].label.as_deref(), Some("\"Am \"Berg"));
    }

    proptest! {
        #[test]
        fn one_record_per_good_row(
            rows in proptest::collection::vec((any::<i32>(), any::<bool>()), 0..40)
        ) {
            let mut input = String::new();
            for (id, good) in &rows {
                if *good {
                    input.push_str(&format!("{id}\tname\t1.0\n"));
                } else {
                    input.push_str(&format!("id{id}\tname\t1.0\n"));
                }
            }
            let parsed = read(&input, false);
            let expected: Vec<i64> = rows
                .iter()
                .filter(|(_, good)| *good)
                .map(|(id, _)| i64::from(*id))
                .collect();
            prop_assert_eq!(parsed.records.iter().map(|p| p.id).collect::<Vec<_>>(), expected);
            prop_assert_eq!(parsed.diagnostics.len(), rows.iter().filter(|(_, g)| !*g).count());
        }
    }
}
