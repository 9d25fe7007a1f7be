//! Construction helpers returning boxed DAOs.

use crate::callback::CallbackDao;
use crate::config::{CsvConfig, DaoConfig};
#[cfg(feature = "xml")]
use crate::config::XmlConfig;
use crate::dao::Dao;
use crate::error::DaoResult;
use crate::record::Record;
use crate::storage::CsvDao;
#[cfg(feature = "sql")]
use crate::storage::{SharedConnection, SqlDao};
#[cfg(feature = "xml")]
use crate::storage::XmlDao;
use std::path::Path;

/// Builds `Box<dyn Dao<R>>` values for each backend.
///
/// ```no_run
/// use rostdao::{impl_record, CsvConfig, Dao, DaoConfig, DaoFactory, Value};
///
/// #[derive(Debug, Clone, Default, PartialEq)]
/// struct Person {
///     id: i64,
///     name: String,
/// }
///
/// impl_record!(Person { id: i64, name: String });
///
/// let config = DaoConfig::new().identifier("id");
/// let dao = DaoFactory::csv::<Person>("people.csv", &config, &CsvConfig::new())?;
/// let ann = dao.get_by_id(&Value::Integer(1))?;
/// # Ok::<(), rostdao::DaoError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DaoFactory;

impl DaoFactory {
    /// Opens the table named after `R` on a shared connection.
    #[cfg(feature = "sql")]
    pub fn sql<R: Record + 'static>(
        conn: SharedConnection,
        config: &DaoConfig,
    ) -> DaoResult<Box<dyn Dao<R>>> {
        Ok(Box::new(SqlDao::<R>::new(conn, config)?))
    }

    /// Opens a delimited-text file.
    pub fn csv<R: Record + 'static>(
        path: impl AsRef<Path>,
        config: &DaoConfig,
        csv: &CsvConfig,
    ) -> DaoResult<Box<dyn Dao<R>>> {
        Ok(Box::new(CsvDao::<R>::new(path.as_ref(), config, csv)?))
    }

    /// Opens an XML document.
    #[cfg(feature = "xml")]
    pub fn xml<R: Record + 'static>(
        path: impl AsRef<Path>,
        config: &DaoConfig,
        xml: &XmlConfig,
    ) -> DaoResult<Box<dyn Dao<R>>> {
        Ok(Box::new(XmlDao::<R>::new(path.as_ref(), config, xml)?))
    }

    /// Wraps three storage closures.
    pub fn callback<R: Record + 'static>(
        config: &DaoConfig,
        retriever: impl Fn() -> DaoResult<Vec<R>> + 'static,
        persister: impl FnMut(&[R]) -> DaoResult<usize> + 'static,
        remover: impl FnMut(&[R]) -> DaoResult<usize> + 'static,
    ) -> DaoResult<Box<dyn Dao<R>>> {
        Ok(Box::new(CallbackDao::new(
            config, retriever, persister, remover,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DaoError;
    use crate::impl_record;
    use crate::value::Value;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::tempdir;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Book {
        isbn: String,
        title: String,
        pages: i64,
    }

    impl_record!(Book { isbn: String, title: String, pages: i64 });

    fn book(isbn: &str, title: &str, pages: i64) -> Book {
        Book {
            isbn: isbn.into(),
            title: title.into(),
            pages,
        }
    }

    fn exercise(dao: &mut dyn Dao<Book>) {
        assert_eq!(
            dao.add_all(&[book("a1", "Dune", 412), book("b2", "Emma", 320)])
                .unwrap(),
            2
        );
        assert!(matches!(
            dao.add(&book("a1", "Other", 1)),
            Err(DaoError::IdentifierConflict { .. })
        ));
        assert!(dao
            .update_property_by_id(&Value::from("b2"), "pages", &Value::Integer(321))
            .unwrap());
        assert_eq!(
            dao.get_by_id(&Value::from("b2")).unwrap(),
            Some(book("b2", "Emma", 321))
        );
        assert_eq!(dao.get_ids().unwrap().to_string(), "[a1, b2]");
        assert!(dao.delete_by_id(&Value::from("a1")).unwrap());
        assert_eq!(dao.get_all().unwrap().len(), 1);
    }

    fn config() -> DaoConfig {
        DaoConfig::new().identifier("isbn")
    }

    #[test]
    fn factory_csv() {
        let dir = tempdir().unwrap();
        let mut dao =
            DaoFactory::csv::<Book>(dir.path().join("books.csv"), &config(), &CsvConfig::new())
                .unwrap();
        exercise(dao.as_mut());
    }

    #[cfg(feature = "xml")]
    #[test]
    fn factory_xml() {
        let dir = tempdir().unwrap();
        let mut dao =
            DaoFactory::xml::<Book>(dir.path().join("books.xml"), &config(), &XmlConfig::new())
                .unwrap();
        exercise(dao.as_mut());
    }

    #[cfg(feature = "sql")]
    #[test]
    fn factory_sql() {
        use crate::schema::RecordSchema;
        use crate::storage::{create_table_statement, share};

        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let schema = RecordSchema::<Book>::resolve(&config()).unwrap();
        conn.execute_batch(&create_table_statement(&schema)).unwrap();
        let mut dao = DaoFactory::sql::<Book>(share(conn), &config()).unwrap();
        exercise(dao.as_mut());
    }

    #[test]
    fn factory_callback() {
        let store: Rc<RefCell<Vec<Book>>> = Rc::default();
        let (read, write, remove) = (store.clone(), store.clone(), store);
        let mut dao = DaoFactory::callback(
            &config(),
            move || Ok(read.borrow().clone()),
            move |batch: &[Book]| {
                write.borrow_mut().extend_from_slice(batch);
                Ok(batch.len())
            },
            move |batch: &[Book]| {
                let mut rows = remove.borrow_mut();
                let before = rows.len();
                rows.retain(|r| !batch.contains(r));
                Ok(before - rows.len())
            },
        )
        .unwrap();
        exercise(dao.as_mut());
    }

    #[test]
    fn factory_reports_construction_errors() {
        let dir = tempdir().unwrap();
        let result = DaoFactory::csv::<Book>(
            dir.path().join("missing.csv"),
            &config(),
            &CsvConfig::new().create_if_missing(false),
        );
        assert!(result.is_err());
        assert!(DaoFactory::csv::<Book>(
            dir.path().join("x.csv"),
            &DaoConfig::new().identifier("nope"),
            &CsvConfig::new(),
        )
        .is_err());
    }
}
