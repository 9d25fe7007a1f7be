//! Records flattened to rows of text cells.
//!
//! The file engines compare records by the text of their cells. Cells are
//! brought to the textual form of their typed value when a table is loaded,
//! so `"030"` and `"30"` in an integer column are the same identifier.

use crate::error::{DaoError, DaoResult};
use crate::value::{FieldType, Value};

/// One record as text cells, in the column order of its table.
pub type Row = Vec<String>;

/// An in-memory table of rows loaded from a text format.
///
/// Columns are the declared field names in the order the format stores
/// them. Mutations only touch memory; the owning format writes the table
/// back as a whole.
pub trait RowTable {
    /// Column names in cell order.
    fn columns(&self) -> &[&'static str];

    /// Rows in storage order.
    fn rows(&self) -> &[Row];

    /// Appends a row.
    fn push_row(&mut self, row: Row);

    /// Removes the row at `index`.
    fn remove_row(&mut self, index: usize);

    /// Replaces the row at `index`.
    fn replace_row(&mut self, index: usize, row: Row);

    /// Rows for in-place cell rewriting. Changes are not stored unless a
    /// later mutation stores the table.
    fn rows_mut(&mut self) -> &mut [Row];
}

/// Fails with [`DaoError::DuplicateRecord`] if two rows are identical.
pub(crate) fn ensure_unique_rows(rows: &[Row]) -> DaoResult<()> {
    for (i, row) in rows.iter().enumerate() {
        if rows[..i].contains(row) {
            return Err(DaoError::DuplicateRecord);
        }
    }
    Ok(())
}

/// Fails with [`DaoError::DuplicateIdentifier`] if two rows share an
/// identifier cell.
pub(crate) fn ensure_unique_ids(rows: &[Row], id_col: usize) -> DaoResult<()> {
    for (i, row) in rows.iter().enumerate() {
        if rows[..i].iter().any(|r| r[id_col] == row[id_col]) {
            return Err(DaoError::duplicate_identifier(&row[id_col]));
        }
    }
    Ok(())
}

/// Checks that `candidate` may be added to `rows`.
pub(crate) fn check_candidate(
    rows: &[Row],
    candidate: &Row,
    id_col: Option<usize>,
) -> DaoResult<()> {
    if rows.contains(candidate) {
        return Err(DaoError::RecordAlreadyExists);
    }
    if let Some(col) = id_col {
        if rows.iter().any(|r| r[col] == candidate[col]) {
            return Err(DaoError::identifier_conflict(&candidate[col]));
        }
    }
    Ok(())
}

/// Returns true if a cell holds `value`.
///
/// A cell matches when its text equals the value's text, or when it parses
/// to the same typed value (so ` 30` matches `30` in an integer column).
pub(crate) fn cell_matches(field_type: FieldType, cell: &str, value: &Value) -> bool {
    if cell == value.to_string() {
        return true;
    }
    match (
        Value::parse(field_type, cell),
        value.clone().coerce(field_type),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| (*c).to_owned()).collect()
    }

    #[test]
    fn duplicate_rows_detected() {
        let rows = vec![row(&["1", "a"]), row(&["2", "b"]), row(&["1", "a"])];
        assert!(matches!(ensure_unique_rows(&rows), Err(DaoError::DuplicateRecord)));
        assert!(ensure_unique_rows(&rows[..2]).is_ok());
    }

    #[test]
    fn duplicate_ids_detected_textually() {
        let rows = vec![row(&["1", "a"]), row(&["01", "b"])];
        assert!(ensure_unique_ids(&rows, 0).is_ok());
        let rows = vec![row(&["1", "a"]), row(&["1", "b"])];
        assert!(matches!(
            ensure_unique_ids(&rows, 0),
            Err(DaoError::DuplicateIdentifier { ref id }) if id == "1"
        ));
    }

    #[test]
    fn candidate_checks() {
        let rows = vec![row(&["1", "a"]), row(&["2", "b"])];
        assert!(matches!(
            check_candidate(&rows, &row(&["2", "b"]), Some(0)),
            Err(DaoError::RecordAlreadyExists)
        ));
        assert!(matches!(
            check_candidate(&rows, &row(&["2", "z"]), Some(0)),
            Err(DaoError::IdentifierConflict { .. })
        ));
        assert!(check_candidate(&rows, &row(&["3", "z"]), Some(0)).is_ok());
        assert!(check_candidate(&rows, &row(&["2", "z"]), None).is_ok());
    }

    #[test]
    fn cells_match_typed_values() {
        assert!(cell_matches(FieldType::Integer, "30", &Value::Integer(30)));
        assert!(cell_matches(FieldType::Integer, " 30", &Value::Integer(30)));
        assert!(cell_matches(FieldType::Integer, "30", &Value::from("30")));
        assert!(!cell_matches(FieldType::Integer, "31", &Value::Integer(30)));
        assert!(cell_matches(FieldType::Text, "Ann", &Value::from("Ann")));
        assert!(!cell_matches(FieldType::Text, "Ann ", &Value::from("Ann")));
    }
}
