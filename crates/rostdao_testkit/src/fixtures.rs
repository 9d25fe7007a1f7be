//! Sample record types and DAO builders.
//!
//! Every builder returns a [`TestDao`] that owns whatever backs it (a
//! temporary directory, an in-memory connection or a shared vector), so
//! storage is cleaned up when the DAO is dropped.

use chrono::NaiveDate;
use rostdao::storage::{create_table_statement, share};
use rostdao::{
    impl_record, CsvConfig, CsvDao, Dao, DaoConfig, DaoFactory, Layout, Record, RecordSchema,
    SqlDao, ValueEq, XmlConfig, XmlDao,
};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

/// A record with an integer identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Age in years.
    pub age: i64,
}

impl_record!(Person { id: i64, name: String, age: i64 });

/// Builds a [`Person`].
pub fn person(id: i64, name: &str, age: i64) -> Person {
    Person {
        id,
        name: name.to_string(),
        age,
    }
}

/// Parses a JSON array of [`Person`] objects.
pub fn people_from_json(json: &str) -> Vec<Person> {
    serde_json::from_str(json).expect("Invalid people JSON")
}

/// A record exercising every field type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    /// Identifier.
    pub code: String,
    /// Calendar day.
    pub day: NaiveDate,
    /// Whether the event is open.
    pub active: bool,
    /// Rating.
    pub score: f64,
    /// Letter grade.
    pub grade: char,
}

impl_record!(Event {
    code: String,
    day: NaiveDate,
    active: bool,
    score: f64,
    grade: char,
});

/// Builds an [`Event`] on the given day of 2024.
pub fn event(code: &str, month: u32, day: u32, active: bool) -> Event {
    Event {
        code: code.to_string(),
        day: NaiveDate::from_ymd_opt(2024, month, day).expect("Invalid date"),
        active,
        score: 7.5,
        grade: 'B',
    }
}

/// The storage kinds a contract runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// In-memory SQLite.
    Sql,
    /// Delimited-text file.
    Csv,
    /// XML document with one child element per field.
    XmlTags,
    /// XML document with one attribute per field.
    XmlAttributes,
    /// Closures over a shared vector.
    Callback,
}

impl Backend {
    /// Every backend.
    pub const ALL: [Backend; 5] = [
        Backend::Sql,
        Backend::Csv,
        Backend::XmlTags,
        Backend::XmlAttributes,
        Backend::Callback,
    ];
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Sql => "sql",
            Backend::Csv => "csv",
            Backend::XmlTags => "xml-tags",
            Backend::XmlAttributes => "xml-attributes",
            Backend::Callback => "callback",
        };
        f.write_str(name)
    }
}

/// A DAO together with the storage it owns.
pub struct TestDao<R: Record + 'static> {
    /// The DAO under test.
    pub dao: Box<dyn Dao<R>>,
    /// Backing file, for file backends.
    path: Option<PathBuf>,
    /// Kept alive so the directory outlives the DAO.
    _temp_dir: Option<TempDir>,
}

impl<R: Record + 'static> TestDao<R> {
    /// Opens an empty DAO on the given backend.
    pub fn open(backend: Backend, config: &DaoConfig) -> Self {
        match backend {
            Backend::Sql => Self::sql(config),
            Backend::Csv => Self::csv(config, &CsvConfig::new()),
            Backend::XmlTags => Self::xml(config, &XmlConfig::new()),
            Backend::XmlAttributes => {
                Self::xml(config, &XmlConfig::new().layout(Layout::Attribute))
            }
            Backend::Callback => Self::callback(config),
        }
    }

    /// Opens a DAO on a fresh in-memory SQLite table.
    pub fn sql(config: &DaoConfig) -> Self {
        let conn = rusqlite::Connection::open_in_memory().expect("Failed to open SQLite");
        let schema = RecordSchema::<R>::resolve(config).expect("Failed to resolve schema");
        conn.execute_batch(&create_table_statement(&schema))
            .expect("Failed to create table");
        let dao = SqlDao::<R>::new(share(conn), config).expect("Failed to open SQL DAO");
        Self {
            dao: Box::new(dao),
            path: None,
            _temp_dir: None,
        }
    }

    /// Opens a DAO on a new CSV file in a temporary directory.
    pub fn csv(config: &DaoConfig, csv: &CsvConfig) -> Self {
        Self::csv_with(config, csv, None)
    }

    /// Opens a DAO on a CSV file with the given initial contents.
    pub fn csv_from(config: &DaoConfig, csv: &CsvConfig, contents: &str) -> Self {
        Self::csv_with(config, csv, Some(contents))
    }

    fn csv_with(config: &DaoConfig, csv: &CsvConfig, contents: Option<&str>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("records.csv");
        if let Some(contents) = contents {
            std::fs::write(&path, contents).expect("Failed to write CSV fixture");
        }
        let dao = CsvDao::<R>::new(&path, config, csv).expect("Failed to open CSV DAO");
        Self {
            dao: Box::new(dao),
            path: Some(path),
            _temp_dir: Some(temp_dir),
        }
    }

    /// Opens a DAO on a new XML document in a temporary directory.
    pub fn xml(config: &DaoConfig, xml: &XmlConfig) -> Self {
        Self::xml_with(config, xml, None)
    }

    /// Opens a DAO on an XML document with the given initial contents.
    pub fn xml_from(config: &DaoConfig, xml: &XmlConfig, contents: &str) -> Self {
        Self::xml_with(config, xml, Some(contents))
    }

    fn xml_with(config: &DaoConfig, xml: &XmlConfig, contents: Option<&str>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("records.xml");
        if let Some(contents) = contents {
            std::fs::write(&path, contents).expect("Failed to write XML fixture");
        }
        let dao = XmlDao::<R>::new(&path, config, xml).expect("Failed to open XML DAO");
        Self {
            dao: Box::new(dao),
            path: Some(path),
            _temp_dir: Some(temp_dir),
        }
    }

    /// Opens a closure-backed DAO over an empty vector.
    pub fn callback(config: &DaoConfig) -> Self {
        let store: Rc<RefCell<Vec<R>>> = Rc::default();
        let (read, write, remove) = (store.clone(), store.clone(), store);
        let dao = DaoFactory::callback(
            config,
            move || Ok(read.borrow().clone()),
            move |batch: &[R]| {
                write.borrow_mut().extend_from_slice(batch);
                Ok(batch.len())
            },
            move |batch: &[R]| {
                let mut rows = remove.borrow_mut();
                let before = rows.len();
                rows.retain(|r| !batch.iter().any(|b| b.value_eq(r)));
                Ok(before - rows.len())
            },
        )
        .expect("Failed to open callback DAO");
        Self {
            dao,
            path: None,
            _temp_dir: None,
        }
    }

    /// Returns the backing file, for file backends.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Reads the backing file.
    ///
    /// # Panics
    ///
    /// Panics for backends without a file.
    pub fn contents(&self) -> String {
        let path = self.path().expect("Backend has no file");
        std::fs::read_to_string(path).expect("Failed to read backing file")
    }
}

impl<R: Record + 'static> std::ops::Deref for TestDao<R> {
    type Target = dyn Dao<R>;

    fn deref(&self) -> &Self::Target {
        self.dao.as_ref()
    }
}

impl<R: Record + 'static> std::ops::DerefMut for TestDao<R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.dao.as_mut()
    }
}

/// Runs `f` once per backend with a fresh, empty DAO.
pub fn with_each_backend<R, F>(config: &DaoConfig, mut f: F)
where
    R: Record + 'static,
    F: FnMut(Backend, &mut TestDao<R>),
{
    for backend in Backend::ALL {
        let mut dao = TestDao::<R>::open(backend, config);
        f(backend, &mut dao);
    }
}

/// Configuration with `id` as identifier, for [`Person`].
pub fn person_config() -> DaoConfig {
    DaoConfig::new().identifier("id")
}

/// Configuration with `code` as identifier, for [`Event`].
pub fn event_config() -> DaoConfig {
    DaoConfig::new().identifier("code")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rostdao::Value;

    #[test]
    fn each_backend_starts_empty() {
        with_each_backend::<Person, _>(&person_config(), |backend, dao| {
            assert!(dao.get_all().unwrap().is_empty(), "{backend}");
        });
    }

    #[test]
    fn people_json_fixture() {
        let people = people_from_json(r#"[{"id": 1, "name": "Ann", "age": 30}]"#);
        assert_eq!(people, vec![person(1, "Ann", 30)]);
    }

    #[test]
    fn file_backends_expose_contents() {
        let mut dao = TestDao::<Person>::csv(&person_config(), &CsvConfig::new());
        dao.add(&person(1, "Ann", 30)).unwrap();
        assert_eq!(dao.contents(), "id,name,age\n1,Ann,30\n");
        assert!(TestDao::<Person>::sql(&person_config()).path().is_none());
    }

    #[test]
    fn event_fields_survive_each_backend() {
        with_each_backend::<Event, _>(&event_config(), |backend, dao| {
            let e = event("E1", 2, 29, true);
            dao.add(&e).unwrap();
            assert_eq!(
                dao.get_by_id(&Value::from("E1")).unwrap(),
                Some(e),
                "{backend}"
            );
        });
    }
}
