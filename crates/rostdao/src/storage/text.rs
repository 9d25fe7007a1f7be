//! Generic engine for whole-file text formats.
//!
//! Every operation loads the table from its format, works on the rows in
//! memory and, for mutations that changed something, stores the whole
//! table back. A failing operation never reaches the store step, so the
//! file keeps its previous contents.

use crate::dao::{check_set_arguments, Dao, Predicate};
use crate::error::{DaoError, DaoResult};
use crate::record::{FieldDescriptor, Record};
use crate::result_set::ResultSet;
use crate::schema::{compile_full_match, RecordSchema};
use crate::storage::rows::{
    cell_matches, check_candidate, ensure_unique_ids, ensure_unique_rows, Row, RowTable,
};
use crate::value::Value;

/// A text representation that stores a table of rows as one file.
pub trait TextFormat {
    /// In-memory table type.
    type Table: RowTable;

    /// Reads and validates the current table.
    fn load<R: Record>(&self, schema: &RecordSchema<R>) -> DaoResult<Self::Table>;

    /// Writes a table back as a whole.
    fn store<R: Record>(&mut self, schema: &RecordSchema<R>, table: Self::Table) -> DaoResult<()>;
}

/// Maps records to rows in the column order of one loaded table.
struct RowCodec<'a, R> {
    schema: &'a RecordSchema<R>,
    columns: Vec<&'static FieldDescriptor>,
    id_col: Option<usize>,
}

impl<'a, R: Record> RowCodec<'a, R> {
    fn new(schema: &'a RecordSchema<R>, names: &[&'static str]) -> DaoResult<Self> {
        let columns = names
            .iter()
            .map(|name| {
                schema
                    .field(name)
                    .ok_or_else(|| DaoError::invalid_property(*name, "not a declared field"))
            })
            .collect::<DaoResult<Vec<_>>>()?;
        let id_col = schema
            .identifier()
            .and_then(|id| columns.iter().position(|f| f.name == id.name));
        Ok(Self {
            schema,
            columns,
            id_col,
        })
    }

    /// Rewrites every cell that parses as its column type in the textual
    /// form of the parsed value, so stored rows compare equal to encoded
    /// records. Cells that do not parse are left for decoding to report.
    fn canonicalize<T: RowTable>(&self, table: &mut T) {
        for row in table.rows_mut() {
            for (field, cell) in self.columns.iter().zip(row.iter_mut()) {
                if let Ok(value) = Value::parse(field.field_type, cell) {
                    let text = value.to_string();
                    if *cell != text {
                        *cell = text;
                    }
                }
            }
        }
    }

    fn encode(&self, record: &R) -> DaoResult<Row> {
        self.columns
            .iter()
            .map(|f| self.schema.value_of(record, f.name).map(|v| v.to_string()))
            .collect()
    }

    fn decode(&self, row: &Row) -> DaoResult<R> {
        let mut record = R::default();
        for (field, cell) in self.columns.iter().zip(row) {
            let value = Value::parse(field.field_type, cell).map_err(|e| e.for_field(field.name))?;
            record.set(field.name, value)?;
        }
        Ok(record)
    }

    fn decode_all<'r>(&self, rows: impl IntoIterator<Item = &'r Row>) -> DaoResult<ResultSet<R>> {
        let rows: Vec<Row> = rows.into_iter().cloned().collect();
        ensure_unique_rows(&rows)?;
        rows.iter().map(|row| self.decode(row)).collect::<DaoResult<Vec<_>>>().map(ResultSet::new)
    }

    fn column(&self, name: &str) -> DaoResult<usize> {
        self.schema.validate(&[name])?;
        self.columns
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| DaoError::invalid_property(name, "not a stored column"))
    }

    fn require_id_col(&self) -> DaoResult<usize> {
        self.schema.require_identifier()?;
        self.id_col
            .ok_or_else(|| DaoError::missing_identifier(self.schema.type_name()))
    }

    /// Textual form of `value` converted to the type of a column.
    fn cell(&self, col: usize, value: &Value) -> DaoResult<String> {
        let field = self.columns[col];
        let typed = value
            .clone()
            .coerce(field.field_type)
            .map_err(|e| e.for_field(field.name))?;
        Ok(typed.to_string())
    }

    fn parse_cell(&self, col: usize, cell: &str) -> DaoResult<Value> {
        let field = self.columns[col];
        Value::parse(field.field_type, cell).map_err(|e| e.for_field(field.name))
    }

    /// Finds the row holding an identifier.
    ///
    /// An identifier that does not convert to the column type is held by no
    /// row.
    fn position_of_id(&self, rows: &[Row], id: &Value) -> DaoResult<Option<usize>> {
        let col = self.require_id_col()?;
        let text = match self.cell(col, id) {
            Ok(text) => text,
            Err(DaoError::ValueConversion { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut found = rows.iter().enumerate().filter(|(_, r)| r[col] == text).map(|(i, _)| i);
        let first = found.next();
        if found.next().is_some() {
            return Err(DaoError::duplicate_identifier(&text));
        }
        Ok(first)
    }

    /// Checks replacing `old_row` with `new_row` and returns the position of
    /// `old_row`, or `None` when it is not stored.
    ///
    /// A changed identifier must be free before anything else is looked at.
    fn check_replacement(
        &self,
        rows: &[Row],
        old_row: &Row,
        new_row: &Row,
    ) -> DaoResult<Option<usize>> {
        if old_row == new_row {
            return Err(DaoError::NoOpUpdate);
        }
        if let Some(col) = self.id_col {
            if old_row[col] != new_row[col] && rows.iter().any(|r| r[col] == new_row[col]) {
                return Err(DaoError::identifier_conflict(&new_row[col]));
            }
        }
        let Some(at) = rows.iter().position(|r| r == old_row) else {
            return Ok(None);
        };
        if rows.contains(new_row) {
            return Err(DaoError::RecordAlreadyExists);
        }
        Ok(Some(at))
    }

    /// Replaces `rows[at]` after checking the replacement.
    fn replace<T: RowTable>(&self, table: &mut T, at: usize, new_row: Row) -> DaoResult<()> {
        let old_row = table.rows()[at].clone();
        self.check_replacement(table.rows(), &old_row, &new_row)?;
        table.replace_row(at, new_row);
        Ok(())
    }
}

/// Removes every row matching `pred` and returns the count.
fn remove_rows<T: RowTable>(table: &mut T, pred: impl Fn(&Row) -> bool) -> usize {
    let doomed: Vec<usize> = table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| pred(row))
        .map(|(i, _)| i)
        .collect();
    for &i in doomed.iter().rev() {
        table.remove_row(i);
    }
    doomed.len()
}

/// A DAO over a whole-file text format.
///
/// See [`CsvDao`](crate::CsvDao) and [`XmlDao`](crate::XmlDao).
#[derive(Debug)]
pub struct TextDao<R: Record, F> {
    schema: RecordSchema<R>,
    format: F,
}

impl<R: Record, F: TextFormat> TextDao<R, F> {
    pub(crate) fn from_parts(schema: RecordSchema<R>, format: F) -> Self {
        Self { schema, format }
    }

    /// Returns the underlying format.
    pub fn format(&self) -> &F {
        &self.format
    }

    fn read<T>(&self, op: impl FnOnce(&RowCodec<'_, R>, &F::Table) -> DaoResult<T>) -> DaoResult<T> {
        let mut table = self.format.load(&self.schema)?;
        let codec = RowCodec::new(&self.schema, table.columns())?;
        codec.canonicalize(&mut table);
        op(&codec, &table)
    }

    fn write(
        &mut self,
        name: &'static str,
        op: impl FnOnce(&RowCodec<'_, R>, &mut F::Table) -> DaoResult<usize>,
    ) -> DaoResult<usize> {
        let schema = &self.schema;
        let mut table = self.format.load(schema)?;
        let codec = RowCodec::new(schema, table.columns())?;
        codec.canonicalize(&mut table);
        let changed = op(&codec, &mut table)?;
        if changed > 0 {
            self.format.store(schema, table)?;
        }
        tracing::debug!(type_name = R::TYPE_NAME, op = name, changed, "text table operation");
        Ok(changed)
    }
}

impl<R: Record, F: TextFormat> Dao<R> for TextDao<R, F> {
    fn schema(&self) -> &RecordSchema<R> {
        &self.schema
    }

    fn get_all(&self) -> DaoResult<ResultSet<R>> {
        self.read(|codec, table| codec.decode_all(table.rows()))
    }

    fn add_all(&mut self, records: &[R]) -> DaoResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        self.write("add", |codec, table| {
            for record in records {
                let row = codec.encode(record)?;
                check_candidate(table.rows(), &row, codec.id_col)?;
                table.push_row(row);
            }
            Ok(records.len())
        })
    }

    fn delete_all(&mut self, records: &[R]) -> DaoResult<usize> {
        self.write("delete", |codec, table| {
            let targets = records
                .iter()
                .map(|r| codec.encode(r))
                .collect::<DaoResult<Vec<_>>>()?;
            Ok(remove_rows(table, |row| targets.contains(row)))
        })
    }

    fn find(&self, record: &R) -> DaoResult<bool> {
        self.read(|codec, table| Ok(table.rows().contains(&codec.encode(record)?)))
    }

    fn get_by_property(&self, name: &str, value: &Value) -> DaoResult<ResultSet<R>> {
        self.read(|codec, table| {
            let col = codec.column(name)?;
            let field_type = codec.columns[col].field_type;
            codec.decode_all(
                table
                    .rows()
                    .iter()
                    .filter(|row| cell_matches(field_type, &row[col], value)),
            )
        })
    }

    fn get_by_pattern(&self, name: &str, pattern: &str) -> DaoResult<ResultSet<R>> {
        self.read(|codec, table| {
            let col = codec.column(name)?;
            let regex = compile_full_match(pattern)?;
            codec.decode_all(table.rows().iter().filter(|row| regex.is_match(&row[col])))
        })
    }

    fn delete_where(&mut self, predicate: Predicate<'_, R>) -> DaoResult<usize> {
        self.write("delete_where", |codec, table| {
            let mut doomed = Vec::new();
            for row in table.rows() {
                if predicate(&codec.decode(row)?) {
                    doomed.push(row.clone());
                }
            }
            Ok(remove_rows(table, |row| doomed.contains(row)))
        })
    }

    fn delete_by_property(&mut self, name: &str, value: &Value) -> DaoResult<usize> {
        self.write("delete_by_property", |codec, table| {
            let col = codec.column(name)?;
            let field_type = codec.columns[col].field_type;
            Ok(remove_rows(table, |row| cell_matches(field_type, &row[col], value)))
        })
    }

    fn delete_by_pattern(&mut self, name: &str, pattern: &str) -> DaoResult<usize> {
        self.write("delete_by_pattern", |codec, table| {
            let col = codec.column(name)?;
            let regex = compile_full_match(pattern)?;
            Ok(remove_rows(table, |row| regex.is_match(&row[col])))
        })
    }

    fn get_property(&self, name: &str) -> DaoResult<ResultSet<Value>> {
        self.read(|codec, table| {
            let col = codec.column(name)?;
            table
                .rows()
                .iter()
                .map(|row| codec.parse_cell(col, &row[col]))
                .collect::<DaoResult<Vec<_>>>()
                .map(ResultSet::new)
        })
    }

    fn set(
        &mut self,
        names: &[&str],
        values: &[Value],
        predicate: Predicate<'_, R>,
    ) -> DaoResult<usize> {
        check_set_arguments(&self.schema, names, values)?;
        self.write("set", |codec, table| {
            let mut updated = 0;
            for i in 0..table.rows().len() {
                let old = codec.decode(&table.rows()[i])?;
                if !predicate(&old) {
                    continue;
                }
                let new = codec.schema.clone_with(&old, names, values)?;
                let new_row = codec.encode(&new)?;
                if table.rows()[i] == new_row {
                    continue;
                }
                codec.replace(table, i, new_row)?;
                updated += 1;
            }
            Ok(updated)
        })
    }

    fn update(&mut self, old: &R, new: &R) -> DaoResult<bool> {
        let changed = self.write("update", |codec, table| {
            let old_row = codec.encode(old)?;
            let new_row = codec.encode(new)?;
            match codec.check_replacement(table.rows(), &old_row, &new_row)? {
                Some(at) => {
                    table.replace_row(at, new_row);
                    Ok(1)
                }
                None => Ok(0),
            }
        })?;
        Ok(changed == 1)
    }

    fn update_property(
        &mut self,
        name: &str,
        old_value: &Value,
        new_value: &Value,
    ) -> DaoResult<usize> {
        self.write("update_property", |codec, table| {
            let col = codec.column(name)?;
            let field_type = codec.columns[col].field_type;
            let new_cell = codec.cell(col, new_value)?;
            let mut updated = 0;
            for i in 0..table.rows().len() {
                if !cell_matches(field_type, &table.rows()[i][col], old_value) {
                    continue;
                }
                let mut new_row = table.rows()[i].clone();
                new_row[col] = new_cell.clone();
                codec.replace(table, i, new_row)?;
                updated += 1;
            }
            Ok(updated)
        })
    }

    fn get_ids(&self) -> DaoResult<ResultSet<Value>> {
        self.read(|codec, table| {
            let col = codec.require_id_col()?;
            ensure_unique_ids(table.rows(), col)?;
            table
                .rows()
                .iter()
                .map(|row| codec.parse_cell(col, &row[col]))
                .collect::<DaoResult<Vec<_>>>()
                .map(ResultSet::new)
        })
    }

    fn get_by_id(&self, id: &Value) -> DaoResult<Option<R>> {
        self.read(|codec, table| {
            codec
                .position_of_id(table.rows(), id)?
                .map(|at| codec.decode(&table.rows()[at]))
                .transpose()
        })
    }

    fn delete_by_id(&mut self, id: &Value) -> DaoResult<bool> {
        let removed = self.write("delete_by_id", |codec, table| {
            match codec.position_of_id(table.rows(), id)? {
                Some(at) => {
                    table.remove_row(at);
                    Ok(1)
                }
                None => Ok(0),
            }
        })?;
        Ok(removed == 1)
    }

    fn update_by_id(&mut self, id: &Value, new: &R) -> DaoResult<bool> {
        let changed = self.write("update_by_id", |codec, table| {
            match codec.position_of_id(table.rows(), id)? {
                Some(at) => {
                    let new_row = codec.encode(new)?;
                    codec.replace(table, at, new_row)?;
                    Ok(1)
                }
                None => Ok(0),
            }
        })?;
        Ok(changed == 1)
    }

    fn update_property_by_id(&mut self, id: &Value, name: &str, value: &Value) -> DaoResult<bool> {
        let changed = self.write("update_property_by_id", |codec, table| {
            let col = codec.column(name)?;
            match codec.position_of_id(table.rows(), id)? {
                Some(at) => {
                    let mut new_row = table.rows()[at].clone();
                    new_row[col] = codec.cell(col, value)?;
                    codec.replace(table, at, new_row)?;
                    Ok(1)
                }
                None => Ok(0),
            }
        })?;
        Ok(changed == 1)
    }
}
