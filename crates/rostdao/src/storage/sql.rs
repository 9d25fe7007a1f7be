//! Relational storage over SQLite.
//!
//! One table per record type, named after the type, with one column per
//! declared field. Statements are generated once from the validated schema
//! and every value is bound as a parameter.

use crate::config::DaoConfig;
use crate::dao::Dao;
use crate::error::{DaoError, DaoResult};
use crate::record::{FieldDescriptor, Record};
use crate::result_set::ResultSet;
use crate::schema::RecordSchema;
use crate::value::{FieldType, Value};
use parking_lot::Mutex;
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use std::sync::Arc;

/// A connection shared by several DAOs. Each call locks it for its
/// duration.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Wraps a connection for sharing.
pub fn share(conn: Connection) -> SharedConnection {
    Arc::new(Mutex::new(conn))
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(SqlValue::Null),
            Self::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Self::Char(c) => ToSqlOutput::Owned(SqlValue::Text(c.to_string())),
            Self::Integer(n) => ToSqlOutput::Owned(SqlValue::Integer(*n)),
            Self::Float(x) => ToSqlOutput::Owned(SqlValue::Real(*x)),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Self::Date(d) => return d.to_sql(),
        })
    }
}

/// Converts a stored cell to a value of the field's type.
fn read_cell(field: &FieldDescriptor, cell: ValueRef<'_>) -> DaoResult<Value> {
    let ft = field.field_type;
    let value = match (ft, cell) {
        (_, ValueRef::Null) => Value::Null,
        (FieldType::Bool, ValueRef::Integer(n)) => Value::Bool(n != 0),
        (_, ValueRef::Integer(n)) => Value::Integer(n).coerce(ft)?,
        (_, ValueRef::Real(x)) => Value::Float(x).coerce(ft)?,
        (_, ValueRef::Text(bytes)) => Value::parse(ft, &String::from_utf8_lossy(bytes))?,
        (_, ValueRef::Blob(_)) => return Err(DaoError::value_conversion("<blob>", ft)),
    };
    Ok(value)
}

fn quote(name: &str) -> String {
    format!("\"{name}\"")
}

fn column_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Bool | FieldType::Integer => "INTEGER",
        FieldType::Float => "REAL",
        FieldType::Char | FieldType::Text => "TEXT",
        FieldType::Date => "DATE",
    }
}

/// Returns a `CREATE TABLE IF NOT EXISTS` statement for a record type.
///
/// Intended for hosts and tests that need the table to exist; it is not a
/// migration facility.
pub fn create_table_statement<R: Record>(schema: &RecordSchema<R>) -> String {
    let columns: Vec<String> = schema
        .fields()
        .iter()
        .map(|f| format!("{} {}", quote(f.name), column_type(f.field_type)))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote(schema.type_name()),
        columns.join(", ")
    )
}

/// Statement templates generated at construction.
#[derive(Debug, Clone)]
struct Statements {
    select_all: String,
    count: String,
    insert: String,
    delete: String,
    find: String,
    update: String,
    select_by_id: Option<String>,
    delete_by_id: Option<String>,
    update_by_id: Option<String>,
    count_by_id: Option<String>,
}

impl Statements {
    fn new<R: Record>(schema: &RecordSchema<R>) -> Self {
        let table = quote(schema.type_name());
        let fields = schema.fields();
        let n = fields.len();
        let columns = fields
            .iter()
            .map(|f| quote(f.name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=n).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ");
        let matching = |offset: usize| {
            fields
                .iter()
                .enumerate()
                .map(|(i, f)| format!("{} = ?{}", quote(f.name), i + 1 + offset))
                .collect::<Vec<_>>()
                .join(" AND ")
        };
        let assignments = fields
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{} = ?{}", quote(f.name), i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let by_id = |prefix: &str, offset: usize| {
            schema
                .identifier()
                .map(|id| format!("{prefix} WHERE {} = ?{}", quote(id.name), offset + 1))
        };

        Self {
            select_all: format!("SELECT {columns} FROM {table}"),
            count: format!("SELECT COUNT(*) FROM {table}"),
            insert: format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})"),
            delete: format!("DELETE FROM {table} WHERE {}", matching(0)),
            find: format!("SELECT COUNT(*) FROM {table} WHERE {}", matching(0)),
            update: format!("UPDATE {table} SET {assignments} WHERE {}", matching(n)),
            select_by_id: by_id(&format!("SELECT {columns} FROM {table}"), 0),
            delete_by_id: by_id(&format!("DELETE FROM {table}"), 0),
            update_by_id: by_id(&format!("UPDATE {table} SET {assignments}"), n),
            count_by_id: by_id(&format!("SELECT COUNT(*) FROM {table}"), 0),
        }
    }
}

/// A DAO over one SQLite table.
pub struct SqlDao<R: Record> {
    schema: RecordSchema<R>,
    conn: SharedConnection,
    sql: Statements,
}

impl<R: Record> std::fmt::Debug for SqlDao<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlDao")
            .field("schema", &self.schema)
            .field("sql", &self.sql)
            .finish_non_exhaustive()
    }
}

impl<R: Record> SqlDao<R> {
    /// Creates a DAO over the table named after `R`.
    ///
    /// # Errors
    ///
    /// Fails with [`DaoError::Sql`] if the table cannot be queried.
    pub fn new(conn: SharedConnection, config: &DaoConfig) -> DaoResult<Self> {
        let schema = RecordSchema::resolve(config)?;
        let sql = Statements::new(&schema);
        let rows: i64 = conn.lock().query_row(&sql.count, [], |row| row.get(0))?;
        tracing::trace!(insert = %sql.insert, update = %sql.update, "generated statements");
        tracing::debug!(table = R::TYPE_NAME, rows, "opened relational table");
        Ok(Self { schema, conn, sql })
    }

    /// Returns the shared connection.
    pub fn connection(&self) -> &SharedConnection {
        &self.conn
    }

    fn id_statement<'a>(&self, sql: &'a Option<String>) -> DaoResult<&'a str> {
        sql.as_deref()
            .ok_or_else(|| DaoError::missing_identifier(R::TYPE_NAME))
    }

    fn typed_id(&self, id: &Value) -> DaoResult<Value> {
        let name = self.schema.require_identifier()?.name;
        self.schema.typed_value(name, id)
    }

    /// Converts a property value to the column type. A value that cannot be
    /// converted matches no row and yields `None`.
    fn property_param(&self, name: &str, value: &Value) -> DaoResult<Option<Value>> {
        match self.schema.typed_value(name, value) {
            Ok(typed) => Ok(Some(typed)),
            Err(DaoError::ValueConversion { .. }) => {
                tracing::trace!(name, %value, "value does not convert to the column type");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn select_in(&self, conn: &Connection, sql: &str, params: &[Value]) -> DaoResult<Vec<R>> {
        let fields = self.schema.fields();
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = R::default();
            for (i, field) in fields.iter().enumerate() {
                let value = read_cell(field, row.get_ref(i)?).map_err(|e| e.for_field(field.name))?;
                record.set(field.name, value)?;
            }
            out.push(record);
        }
        Ok(out)
    }

    fn count_in(conn: &Connection, sql: &str, params: &[Value]) -> DaoResult<usize> {
        let n: i64 = conn.query_row(sql, params_from_iter(params), |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or_default())
    }

    fn exists_in(&self, conn: &Connection, values: &[Value]) -> DaoResult<bool> {
        Ok(Self::count_in(conn, &self.sql.find, values)? > 0)
    }

    /// Runs the update checks against the current table contents.
    ///
    /// A changed identifier must be free before anything else is looked at.
    /// Returns false when `old` is not stored.
    fn check_update_in(&self, conn: &Connection, old: &R, new: &R) -> DaoResult<bool> {
        if self.schema.records_equal(old, new) {
            return Err(DaoError::NoOpUpdate);
        }
        if let Some(sql) = &self.sql.count_by_id {
            let new_id = self.schema.identifier_of(new)?;
            let old_id = self.schema.identifier_of(old)?;
            if !old_id.same_text(&new_id)
                && Self::count_in(conn, sql, std::slice::from_ref(&new_id))? > 0
            {
                return Err(DaoError::identifier_conflict(new_id));
            }
        }
        if !self.exists_in(conn, &self.schema.values_of(old)?)? {
            return Ok(false);
        }
        if self.exists_in(conn, &self.schema.values_of(new)?)? {
            return Err(DaoError::RecordAlreadyExists);
        }
        Ok(true)
    }
}

impl<R: Record> Dao<R> for SqlDao<R> {
    fn schema(&self) -> &RecordSchema<R> {
        &self.schema
    }

    fn get_all(&self) -> DaoResult<ResultSet<R>> {
        let conn = self.conn.lock();
        let count = Self::count_in(&conn, &self.sql.count, &[])?;
        let mut records = Vec::with_capacity(count);
        records.extend(self.select_in(&conn, &self.sql.select_all, &[])?);
        ResultSet::try_unique(records, |_| DaoError::DuplicateRecord)
    }

    fn add_all(&mut self, records: &[R]) -> DaoResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut written = 0;
        for record in records {
            let values = self.schema.values_of(record)?;
            if self.exists_in(&tx, &values)? {
                return Err(DaoError::RecordAlreadyExists);
            }
            if let Some(sql) = &self.sql.count_by_id {
                let id = self.schema.identifier_of(record)?;
                if Self::count_in(&tx, sql, std::slice::from_ref(&id))? > 0 {
                    return Err(DaoError::identifier_conflict(id));
                }
            }
            written += tx.execute(&self.sql.insert, params_from_iter(&values))?;
        }
        tx.commit()?;
        tracing::debug!(table = R::TYPE_NAME, written, "inserted rows");
        Ok(written)
    }

    fn delete_all(&mut self, records: &[R]) -> DaoResult<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut removed = 0;
        for record in records {
            let values = self.schema.values_of(record)?;
            removed += tx.execute(&self.sql.delete, params_from_iter(&values))?;
        }
        tx.commit()?;
        tracing::debug!(table = R::TYPE_NAME, removed, "deleted rows");
        Ok(removed)
    }

    fn find(&self, record: &R) -> DaoResult<bool> {
        let values = self.schema.values_of(record)?;
        self.exists_in(&self.conn.lock(), &values)
    }

    fn get_by_property(&self, name: &str, value: &Value) -> DaoResult<ResultSet<R>> {
        let Some(typed) = self.property_param(name, value)? else {
            return Ok(ResultSet::new(Vec::new()));
        };
        let sql = format!("{} WHERE {} = ?1", self.sql.select_all, quote(name));
        tracing::trace!(%sql, "select by property");
        let records = self.select_in(&self.conn.lock(), &sql, &[typed])?;
        ResultSet::try_unique(records, |_| DaoError::DuplicateRecord)
    }

    fn delete_by_property(&mut self, name: &str, value: &Value) -> DaoResult<usize> {
        let Some(typed) = self.property_param(name, value)? else {
            return Ok(0);
        };
        let sql = format!("DELETE FROM {} WHERE {} = ?1", quote(R::TYPE_NAME), quote(name));
        tracing::trace!(%sql, "delete by property");
        let removed = self.conn.lock().execute(&sql, [&typed])?;
        tracing::debug!(table = R::TYPE_NAME, removed, "deleted rows");
        Ok(removed)
    }

    fn get_property(&self, name: &str) -> DaoResult<ResultSet<Value>> {
        let field = self.schema.validator().check(name)?;
        let sql = format!("SELECT {} FROM {}", quote(name), quote(R::TYPE_NAME));
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            values.push(read_cell(field, row.get_ref(0)?)?);
        }
        Ok(ResultSet::new(values))
    }

    fn update(&mut self, old: &R, new: &R) -> DaoResult<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        if !self.check_update_in(&tx, old, new)? {
            return Ok(false);
        }
        let mut params = self.schema.values_of(new)?;
        params.extend(self.schema.values_of(old)?);
        let changed = tx.execute(&self.sql.update, params_from_iter(&params))?;
        tx.commit()?;
        tracing::debug!(table = R::TYPE_NAME, changed, "updated rows");
        Ok(changed > 0)
    }

    fn get_ids(&self) -> DaoResult<ResultSet<Value>> {
        let name = self.schema.require_identifier()?.name;
        let ids = self.get_property(name)?.into_vec();
        ResultSet::try_unique(ids, |id| DaoError::duplicate_identifier(id))
    }

    fn get_by_id(&self, id: &Value) -> DaoResult<Option<R>> {
        let sql = self.id_statement(&self.sql.select_by_id)?;
        let typed = self.typed_id(id)?;
        let mut records = self.select_in(&self.conn.lock(), sql, &[typed])?;
        if records.len() > 1 {
            return Err(DaoError::duplicate_identifier(id));
        }
        Ok(records.pop())
    }

    fn delete_by_id(&mut self, id: &Value) -> DaoResult<bool> {
        let sql = self.id_statement(&self.sql.delete_by_id)?;
        let typed = self.typed_id(id)?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let removed = tx.execute(sql, [&typed])?;
        if removed > 1 {
            // Dropping the transaction rolls the delete back
            return Err(DaoError::duplicate_identifier(id));
        }
        tx.commit()?;
        tracing::debug!(table = R::TYPE_NAME, removed, "deleted row by identifier");
        Ok(removed == 1)
    }

    fn update_by_id(&mut self, id: &Value, new: &R) -> DaoResult<bool> {
        let select = self.id_statement(&self.sql.select_by_id)?;
        let update = self.id_statement(&self.sql.update_by_id)?;
        let typed = self.typed_id(id)?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut current = self.select_in(&tx, select, std::slice::from_ref(&typed))?;
        if current.len() > 1 {
            return Err(DaoError::duplicate_identifier(id));
        }
        let Some(old) = current.pop() else {
            return Ok(false);
        };
        if !self.check_update_in(&tx, &old, new)? {
            return Ok(false);
        }
        let mut params = self.schema.values_of(new)?;
        params.push(typed);
        let changed = tx.execute(update, params_from_iter(&params))?;
        tx.commit()?;
        tracing::debug!(table = R::TYPE_NAME, changed, "updated row by identifier");
        Ok(changed == 1)
    }
}
