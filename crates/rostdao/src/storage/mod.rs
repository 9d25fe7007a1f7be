//! Backend engines.
//!
//! - [`SqlDao`] maps a record type onto one SQLite table
//! - [`CsvDao`] keeps records as lines of a delimited-text file
//! - [`XmlDao`] keeps records as child elements of an XML document
//!
//! The two file engines share [`TextDao`], which works on any
//! [`TextFormat`] that can load and store a table of text cells.

mod csv;
mod file;
mod rows;
#[cfg(feature = "sql")]
mod sql;
mod text;
#[cfg(feature = "xml")]
mod xml;

pub use csv::{CsvDao, CsvFormat, CsvTable};
pub use file::TextFile;
pub use rows::{Row, RowTable};
#[cfg(feature = "sql")]
pub use sql::{create_table_statement, share, SharedConnection, SqlDao};
pub use text::{TextDao, TextFormat};
#[cfg(feature = "xml")]
pub use xml::{XmlDao, XmlFormat, XmlTable};
