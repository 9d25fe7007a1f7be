//! Error types for DAO operations.

use crate::value::FieldType;
use std::io;
use thiserror::Error;

/// Result type for DAO operations.
pub type DaoResult<T> = Result<T, DaoError>;

/// Errors that can occur while reading or mutating a data store.
#[derive(Debug, Error)]
pub enum DaoError {
    /// A property name failed pattern or field-membership validation.
    #[error("invalid property name {name:?}: {reason}")]
    InvalidPropertyName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Two records share an identifier value in storage.
    #[error("two or more records have the identifier {id} in storage")]
    DuplicateIdentifier {
        /// Textual form of the shared identifier.
        id: String,
    },

    /// Two value-equal records coexist in storage.
    #[error("two or more identical records exist in storage")]
    DuplicateRecord,

    /// The record being written already exists in storage.
    #[error("a record with the same values already exists in storage")]
    RecordAlreadyExists,

    /// The record being written would reuse another record's identifier.
    #[error("a record with the identifier {id} already exists in storage")]
    IdentifierConflict {
        /// Textual form of the conflicting identifier.
        id: String,
    },

    /// `update` was called with value-equal old and new records.
    #[error("the record to replace and its replacement are identical")]
    NoOpUpdate,

    /// A delimited-text header does not list exactly the declared fields.
    #[error("invalid header: expected a permutation of {expected:?}, found {found:?}")]
    InvalidHeader {
        /// Declared field names.
        expected: Vec<String>,
        /// Column names found in the file.
        found: Vec<String>,
    },

    /// `set` targeted every declared field.
    #[error("cannot set {given} properties of a record with {declared} fields without duplicating it")]
    TooManyProperties {
        /// Number of property names supplied.
        given: usize,
        /// Number of declared fields.
        declared: usize,
    },

    /// Property names and values differ in length.
    #[error("{properties} property names supplied with {values} values")]
    ArityMismatch {
        /// Number of property names.
        properties: usize,
        /// Number of values.
        values: usize,
    },

    /// A record type does not satisfy the introspection contract.
    #[error("cannot introspect record type {type_name}: {message}")]
    TypeIntrospection {
        /// Name of the record type.
        type_name: String,
        /// What is wrong with it.
        message: String,
    },

    /// An identifier operation was called on a DAO without an identifier.
    #[error("no identifier property is configured for record type {type_name}")]
    MissingIdentifier {
        /// Name of the record type.
        type_name: String,
    },

    /// A value could not be converted to a field's type.
    #[error("cannot convert {value:?} to {expected}{}", field.as_deref().map(|f| format!(" for field {f}")).unwrap_or_default())]
    ValueConversion {
        /// Textual form of the offending value.
        value: String,
        /// Type the value had to convert to.
        expected: FieldType,
        /// Field being converted, when known.
        field: Option<String>,
    },

    /// A regular expression failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A delimited-text row does not fit the header.
    #[error("malformed row at line {line}: {message}")]
    MalformedRow {
        /// One-based line number in the file.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// A document does not have the expected record structure.
    #[error("malformed document: {message}")]
    MalformedDocument {
        /// Description of the problem.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Relational store error.
    #[cfg(feature = "sql")]
    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// Document parsing error.
    #[cfg(feature = "xml")]
    #[error("XML parse error: {0}")]
    XmlParse(#[from] xmltree::ParseError),

    /// Document serialization error.
    #[cfg(feature = "xml")]
    #[error("XML write error: {0}")]
    XmlWrite(#[from] xmltree::Error),
}

impl DaoError {
    /// Creates an invalid property name error.
    pub fn invalid_property(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPropertyName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a duplicate identifier error.
    pub fn duplicate_identifier(id: impl ToString) -> Self {
        Self::DuplicateIdentifier { id: id.to_string() }
    }

    /// Creates an identifier conflict error.
    pub fn identifier_conflict(id: impl ToString) -> Self {
        Self::IdentifierConflict { id: id.to_string() }
    }

    /// Creates an invalid header error.
    pub fn invalid_header<S: AsRef<str>>(expected: &[S], found: &[S]) -> Self {
        Self::InvalidHeader {
            expected: expected.iter().map(|s| s.as_ref().to_owned()).collect(),
            found: found.iter().map(|s| s.as_ref().to_owned()).collect(),
        }
    }

    /// Creates a type introspection error.
    pub fn type_introspection(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TypeIntrospection {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Creates a missing identifier error.
    pub fn missing_identifier(type_name: impl Into<String>) -> Self {
        Self::MissingIdentifier {
            type_name: type_name.into(),
        }
    }

    /// Creates a value conversion error.
    pub fn value_conversion(value: impl Into<String>, expected: FieldType) -> Self {
        Self::ValueConversion {
            value: value.into(),
            expected,
            field: None,
        }
    }

    /// Creates a malformed row error.
    pub fn malformed_row(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedRow {
            line,
            message: message.into(),
        }
    }

    /// Creates a malformed document error.
    pub fn malformed_document(message: impl Into<String>) -> Self {
        Self::MalformedDocument {
            message: message.into(),
        }
    }

    /// Attaches a field name to a value conversion error.
    ///
    /// Other errors are returned unchanged.
    #[must_use]
    pub fn for_field(self, name: &str) -> Self {
        match self {
            Self::ValueConversion {
                value,
                expected,
                field: None,
            } => Self::ValueConversion {
                value,
                expected,
                field: Some(name.to_owned()),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_error_names_field() {
        let err = DaoError::value_conversion("abc", FieldType::Integer).for_field("age");
        assert_eq!(
            err.to_string(),
            "cannot convert \"abc\" to integer for field age"
        );
    }

    #[test]
    fn for_field_keeps_other_errors() {
        let err = DaoError::NoOpUpdate.for_field("age");
        assert!(matches!(err, DaoError::NoOpUpdate));
    }

    #[test]
    fn header_error_lists_columns() {
        let err = DaoError::invalid_header(&["id", "name"], &["id", "nom"]);
        let text = err.to_string();
        assert!(text.contains("\"name\""));
        assert!(text.contains("\"nom\""));
    }
}
