//! # RostDAO
//!
//! Uniform CRUD data access objects over three kinds of storage.
//!
//! A record type describes its fields once through [`Record`], usually
//! with [`impl_record!`]. Any [`Dao`] then stores, selects, updates and
//! deletes such records by value, by property, by pattern or by a
//! configured identifier field, with the same checks on every backend:
//!
//! - no two stored records are value-equal
//! - no two stored records share an identifier
//! - a failed batch leaves storage as it was
//!
//! ## Backends
//!
//! - [`SqlDao`] - one SQLite table per record type (feature `sql`)
//! - [`CsvDao`] - a delimited-text file with a header line
//! - [`XmlDao`] - an XML document with one element per record (feature `xml`)
//! - [`CallbackDao`] - three caller-supplied closures
//!
//! ## Example
//!
//! ```rust
//! use rostdao::{impl_record, CsvConfig, CsvDao, Dao, DaoConfig, Value};
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Person {
//!     id: i64,
//!     name: String,
//!     age: i64,
//! }
//!
//! impl_record!(Person { id: i64, name: String, age: i64 });
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("people.csv");
//! let config = DaoConfig::new().identifier("id");
//! let mut dao = CsvDao::<Person>::new(&path, &config, &CsvConfig::new()).unwrap();
//!
//! dao.add(&Person { id: 1, name: "Ann".into(), age: 30 }).unwrap();
//! dao.update_property_by_id(&Value::Integer(1), "age", &Value::Integer(31)).unwrap();
//!
//! let ann = dao.get_by_id(&Value::Integer(1)).unwrap().unwrap();
//! assert_eq!(ann.age, 31);
//! assert_eq!(std::fs::read_to_string(&path).unwrap(), "id,name,age\n1,Ann,31\n");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod callback;
mod comparator;
mod config;
mod dao;
mod error;
mod factory;
mod record;
mod result_set;
mod schema;
pub mod storage;
mod value;

pub use callback::CallbackDao;
pub use comparator::{ComparisonMode, PropertyComparator, Sense};
pub use config::{CsvConfig, DaoConfig, Layout, WriteMode, XmlConfig};
pub use dao::{Dao, Predicate};
pub use error::{DaoError, DaoResult};
pub use factory::DaoFactory;
pub use record::{FieldDescriptor, FieldValue, Record};
pub use result_set::{ResultSet, ValueEq};
pub use schema::{PropertyValidator, RecordSchema};
pub use storage::CsvDao;
#[cfg(feature = "sql")]
pub use storage::{SharedConnection, SqlDao};
pub use value::{FieldType, Value, DATE_FORMAT};
#[cfg(feature = "xml")]
pub use storage::XmlDao;
