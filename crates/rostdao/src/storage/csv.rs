//! Delimited-text storage.
//!
//! The first non-blank line is a header naming every declared field once,
//! in any order. Each following line is one record with its cells in
//! header order. Cells are not quoted, so values must not contain the
//! separator.

use crate::config::{CsvConfig, DaoConfig};
use crate::error::{DaoError, DaoResult};
use crate::record::Record;
use crate::schema::RecordSchema;
use crate::storage::file::TextFile;
use crate::storage::rows::{Row, RowTable};
use crate::storage::text::{TextDao, TextFormat};
use std::path::Path;

/// A DAO over a delimited-text file.
pub type CsvDao<R> = TextDao<R, CsvFormat>;

/// Rows of a delimited-text file, in header order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    columns: Vec<&'static str>,
    rows: Vec<Row>,
}

impl RowTable for CsvTable {
    fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    fn rows(&self) -> &[Row] {
        &self.rows
    }

    fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    fn remove_row(&mut self, index: usize) {
        self.rows.remove(index);
    }

    fn replace_row(&mut self, index: usize, row: Row) {
        self.rows[index] = row;
    }

    fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }
}

/// Delimited-text file format.
#[derive(Debug, Clone)]
pub struct CsvFormat {
    file: TextFile,
    separator: char,
}

impl CsvFormat {
    /// Returns the path of the file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Returns the cell separator.
    pub fn separator(&self) -> char {
        self.separator
    }

    fn header_line<R: Record>(&self, schema: &RecordSchema<R>) -> String {
        let mut line = schema.field_names().join(&self.separator.to_string());
        line.push('\n');
        line
    }

    /// Strips blank lines and writes a header into an empty file.
    fn normalize<R: Record>(&self, schema: &RecordSchema<R>, create: bool) -> DaoResult<()> {
        let lines = self.file.read_lines()?;
        let kept: Vec<&str> = lines
            .iter()
            .map(String::as_str)
            .filter(|l| !l.trim().is_empty())
            .collect();
        if kept.is_empty() {
            if create {
                tracing::debug!(path = %self.path().display(), "writing header to empty file");
                self.file.replace(&self.header_line(schema))?;
            }
            return Ok(());
        }
        if kept.len() != lines.len() {
            tracing::warn!(
                path = %self.path().display(),
                removed = lines.len() - kept.len(),
                "removed blank lines"
            );
            let mut contents = kept.join("\n");
            contents.push('\n');
            self.file.replace(&contents)?;
        }
        Ok(())
    }

    fn parse_header<R: Record>(
        &self,
        schema: &RecordSchema<R>,
        line: &str,
    ) -> DaoResult<Vec<&'static str>> {
        let found: Vec<String> = line
            .split(self.separator)
            .map(|c| c.trim().to_owned())
            .collect();
        let expected: Vec<String> = schema.field_names().iter().map(|n| (*n).to_owned()).collect();
        let invalid = || DaoError::invalid_header(expected.as_slice(), found.as_slice());

        if found.len() != expected.len() {
            return Err(invalid());
        }
        let mut columns: Vec<&'static str> = Vec::with_capacity(found.len());
        for name in &found {
            let field = schema.field(name).ok_or_else(invalid)?;
            if columns.contains(&field.name) {
                return Err(invalid());
            }
            columns.push(field.name);
        }
        Ok(columns)
    }

    fn render(&self, table: &CsvTable) -> String {
        let sep = self.separator.to_string();
        let mut out = table.columns.join(&sep);
        out.push('\n');
        for row in &table.rows {
            out.push_str(&row.join(&sep));
            out.push('\n');
        }
        out
    }
}

impl TextFormat for CsvFormat {
    type Table = CsvTable;

    fn load<R: Record>(&self, schema: &RecordSchema<R>) -> DaoResult<CsvTable> {
        let lines = self.file.read_lines()?;
        let mut numbered = lines
            .iter()
            .enumerate()
            .map(|(i, l)| (i + 1, l))
            .filter(|(_, l)| !l.trim().is_empty());

        let columns = match numbered.next() {
            Some((_, header)) => self.parse_header(schema, header)?,
            None => {
                let expected = schema.field_names();
                return Err(DaoError::invalid_header(expected.as_slice(), &[]));
            }
        };

        let mut rows = Vec::new();
        for (line, text) in numbered {
            let cells: Row = text.split(self.separator).map(str::to_owned).collect();
            if cells.len() != columns.len() {
                return Err(DaoError::malformed_row(
                    line,
                    format!("expected {} cells, found {}", columns.len(), cells.len()),
                ));
            }
            rows.push(cells);
        }
        Ok(CsvTable { columns, rows })
    }

    fn store<R: Record>(&mut self, _schema: &RecordSchema<R>, table: CsvTable) -> DaoResult<()> {
        self.file.replace(&self.render(&table))
    }
}

impl<R: Record> TextDao<R, CsvFormat> {
    /// Opens a DAO over a delimited-text file.
    ///
    /// Blank lines are stripped from the file. A missing or empty file gets
    /// a header in declaration order when `create_if_missing` is set.
    ///
    /// # Errors
    ///
    /// Fails with [`DaoError::InvalidHeader`] if the header does not name
    /// every declared field exactly once, and with
    /// [`DaoError::TypeIntrospection`] if `R` cannot be introspected.
    pub fn new(path: &Path, config: &DaoConfig, csv: &CsvConfig) -> DaoResult<Self> {
        let schema = RecordSchema::resolve(config)?;
        let file = if csv.create_if_missing {
            TextFile::open_or_create(path, csv.write_mode)?
        } else {
            TextFile::open(path, csv.write_mode)?
        };
        let format = CsvFormat {
            file,
            separator: csv.separator,
        };
        format.normalize(&schema, csv.create_if_missing)?;
        let table = format.load(&schema)?;
        tracing::debug!(
            path = %path.display(),
            type_name = R::TYPE_NAME,
            rows = table.rows.len(),
            "opened delimited-text file"
        );
        Ok(Self::from_parts(schema, format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WriteMode;
    use crate::dao::Dao;
    use crate::impl_record;
    use crate::value::Value;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::tempdir;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Person {
        id: i64,
        name: String,
        age: i64,
    }

    impl_record!(Person { id: i64, name: String, age: i64 });

    fn person(id: i64, name: &str, age: i64) -> Person {
        Person {
            id,
            name: name.into(),
            age,
        }
    }

    fn with_id() -> DaoConfig {
        DaoConfig::new().identifier("id")
    }

    fn open(path: &Path) -> CsvDao<Person> {
        CsvDao::new(path, &with_id(), &CsvConfig::default()).unwrap()
    }

    #[test]
    fn csv_creates_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.csv");

        let dao = open(&path);
        assert_eq!(fs::read_to_string(&path).unwrap(), "id,name,age\n");
        assert!(dao.get_all().unwrap().is_empty());
    }

    #[test]
    fn csv_missing_file_without_create_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.csv");

        let config = CsvConfig::new().create_if_missing(false);
        let result = CsvDao::<Person>::new(&path, &with_id(), &config);
        assert!(matches!(result, Err(DaoError::Io(_))));
    }

    #[test]
    fn csv_strips_blank_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.csv");
        fs::write(&path, "id,name,age\n\n1,Ann,30\n   \n2,Bo,41").unwrap();

        let dao = open(&path);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "id,name,age\n1,Ann,30\n2,Bo,41\n"
        );
        assert_eq!(dao.get_all().unwrap().len(), 2);
    }

    #[test]
    fn csv_rejects_bad_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.csv");

        fs::write(&path, "id,nom,age\n").unwrap();
        let result = CsvDao::<Person>::new(&path, &with_id(), &CsvConfig::default());
        assert!(matches!(result, Err(DaoError::InvalidHeader { .. })));

        fs::write(&path, "id,name,age,extra\n").unwrap();
        let result = CsvDao::<Person>::new(&path, &with_id(), &CsvConfig::default());
        assert!(matches!(result, Err(DaoError::InvalidHeader { .. })));

        fs::write(&path, "id,name,name\n").unwrap();
        let result = CsvDao::<Person>::new(&path, &with_id(), &CsvConfig::default());
        assert!(matches!(result, Err(DaoError::InvalidHeader { .. })));
    }

    #[test]
    fn csv_permuted_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.csv");
        fs::write(&path, "name,age,id\nAnn,30,1\n").unwrap();

        let mut dao = open(&path);
        assert_eq!(dao.get_all().unwrap()[0], person(1, "Ann", 30));
        dao.add(&person(2, "Bo", 41)).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "name,age,id\nAnn,30,1\nBo,41,2\n"
        );
    }

    #[test]
    fn csv_reference_scenario() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.csv");
        fs::write(&path, "id,name,age\n1,Ann,30\n2,Bo,41\n").unwrap();

        let mut dao = open(&path);
        assert_eq!(dao.delete_by_property("name", &Value::from("Ann")).unwrap(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "id,name,age\n2,Bo,41\n");

        assert!(dao.add(&person(3, "Cy", 22)).unwrap());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "id,name,age\n2,Bo,41\n3,Cy,22\n"
        );

        let err = dao.add(&person(3, "Zz", 99)).unwrap_err();
        assert!(matches!(err, DaoError::IdentifierConflict { ref id } if id == "3"));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "id,name,age\n2,Bo,41\n3,Cy,22\n"
        );
    }

    #[test]
    fn csv_failed_batch_leaves_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.csv");
        fs::write(&path, "id,name,age\n1,Ann,30\n").unwrap();

        let mut dao = open(&path);
        let result = dao.add_all(&[person(2, "Bo", 41), person(1, "Ann", 30)]);
        assert!(matches!(result, Err(DaoError::RecordAlreadyExists)));
        assert_eq!(fs::read_to_string(&path).unwrap(), "id,name,age\n1,Ann,30\n");
    }

    #[test]
    fn csv_malformed_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.csv");
        fs::write(&path, "id,name,age\n1,Ann,30\n2,Bo\n").unwrap();

        let result = CsvDao::<Person>::new(&path, &with_id(), &CsvConfig::default());
        assert!(matches!(result, Err(DaoError::MalformedRow { line: 3, .. })));
    }

    #[test]
    fn csv_custom_separator() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.csv");

        let config = CsvConfig::new().separator(';').write_mode(WriteMode::InPlace);
        let mut dao = CsvDao::<Person>::new(&path, &with_id(), &config).unwrap();
        dao.add(&person(1, "Ann, Jr", 30)).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "id;name;age\n1;Ann, Jr;30\n"
        );
        assert_eq!(dao.format().separator(), ';');
    }

    #[test]
    fn csv_update_keeps_position() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.csv");
        fs::write(&path, "id,name,age\n1,Ann,30\n2,Bo,41\n3,Cy,22\n").unwrap();

        let mut dao = open(&path);
        assert!(dao
            .update_property_by_id(&Value::Integer(2), "age", &Value::Integer(50))
            .unwrap());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "id,name,age\n1,Ann,30\n2,Bo,50\n3,Cy,22\n"
        );
        assert!(matches!(
            dao.update_by_id(&Value::Integer(1), &person(3, "Ann", 30)),
            Err(DaoError::IdentifierConflict { .. })
        ));
        assert!(matches!(
            dao.update_property_by_id(&Value::Integer(1), "age", &Value::Integer(30)),
            Err(DaoError::NoOpUpdate)
        ));
    }

    #[test]
    fn csv_set_is_all_or_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.csv");
        let original = "id,name,age\n1,Ann,30\n2,Bo,41\n";
        fs::write(&path, original).unwrap();

        let mut dao = open(&path);
        // Renaming both to the same id would collide on the second record
        let result = dao.set(
            &["id", "name"],
            &[Value::Integer(9), Value::from("X")],
            &|_: &Person| true,
        );
        assert!(matches!(result, Err(DaoError::IdentifierConflict { .. })));
        assert_eq!(fs::read_to_string(&path).unwrap(), original);

        let n = dao
            .set(&["age"], &[Value::Integer(31)], &|p: &Person| p.id == 1)
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "id,name,age\n1,Ann,31\n2,Bo,41\n"
        );
    }

    #[test]
    fn csv_duplicates_in_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.csv");
        fs::write(&path, "id,name,age\n1,Ann,30\n1,Bo,41\n1,Ann,30\n").unwrap();

        let dao = open(&path);
        assert!(matches!(dao.get_all(), Err(DaoError::DuplicateRecord)));
        assert!(matches!(dao.get_ids(), Err(DaoError::DuplicateIdentifier { .. })));
        assert!(matches!(
            dao.get_by_id(&Value::Integer(1)),
            Err(DaoError::DuplicateIdentifier { .. })
        ));
    }

    #[test]
    fn csv_pattern_and_property_reads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.csv");
        fs::write(&path, "id,name,age\n1,Ann,30\n2,Bo,41\n3,Abe,30\n").unwrap();

        let dao = open(&path);
        assert_eq!(dao.get_by_pattern("name", "A.*").unwrap().len(), 2);
        assert_eq!(dao.get_by_property("age", &Value::from("30")).unwrap().len(), 2);
        assert_eq!(dao.get_property("age").unwrap().to_string(), "[30, 41, 30]");
        assert!(matches!(
            dao.get_by_property("age; DROP", &Value::Integer(1)),
            Err(DaoError::InvalidPropertyName { .. })
        ));
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Item {
        id: i64,
        name: String,
        price: f64,
    }

    impl_record!(Item { id: i64, name: String, price: f64 });

    #[test]
    fn csv_matches_non_canonical_cells() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("items.csv");
        fs::write(&path, "id,name,price\n01,Pen,2.0\n2,Cup, 3\n").unwrap();

        let mut dao = CsvDao::<Item>::new(&path, &with_id(), &CsvConfig::default()).unwrap();
        let pen = Item { id: 1, name: "Pen".into(), price: 2.0 };
        let cup = Item { id: 2, name: "Cup".into(), price: 3.0 };
        assert!(dao.find(&pen).unwrap());
        assert!(dao.find(&cup).unwrap());
        assert_eq!(dao.get_by_id(&Value::Integer(1)).unwrap(), Some(pen.clone()));
        assert_eq!(dao.get_by_id(&Value::from("x")).unwrap(), None);

        assert!(dao.delete(&cup).unwrap());
        assert!(!dao.find(&cup).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "id,name,price\n1,Pen,2\n");

        let dear = Item { price: 2.5, ..pen.clone() };
        assert!(dao.update(&pen, &dear).unwrap());
        assert_eq!(dao.get_all().unwrap().into_vec(), vec![dear]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn csv_round_trip(people in prop::collection::vec(("[A-Za-z ]{1,10}", 0i64..120), 0..12)) {
            let dir = tempdir().unwrap();
            let path = dir.path().join("people.csv");
            let records: Vec<Person> = people
                .iter()
                .enumerate()
                .map(|(i, (name, age))| person(i as i64, name, *age))
                .collect();

            let mut dao = open(&path);
            prop_assert_eq!(dao.add_all(&records).unwrap(), records.len());

            let reopened = open(&path);
            prop_assert_eq!(reopened.get_all().unwrap().into_vec(), records);
        }
    }
}
