//! Resolved record schemas and property name validation.

use crate::config::DaoConfig;
use crate::error::{DaoError, DaoResult};
use crate::record::{FieldDescriptor, Record};
use crate::value::Value;
use regex::Regex;
use std::fmt;
use std::marker::PhantomData;

/// Validates property names before they reach a statement, column lookup
/// or document name.
///
/// A valid name matches `^[A-Za-z][A-Za-z0-9_]*$` and is a declared field.
#[derive(Debug, Clone, Copy)]
pub struct PropertyValidator {
    fields: &'static [FieldDescriptor],
}

impl PropertyValidator {
    /// Creates a validator over the given fields.
    pub const fn new(fields: &'static [FieldDescriptor]) -> Self {
        Self { fields }
    }

    /// Returns true if `name` is a syntactically valid property name.
    pub fn is_valid_name(name: &str) -> bool {
        let mut chars = name.chars();
        chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    /// Checks one name and returns its descriptor.
    pub fn check(&self, name: &str) -> DaoResult<&'static FieldDescriptor> {
        if name.is_empty() {
            return Err(DaoError::invalid_property(name, "empty name"));
        }
        if !Self::is_valid_name(name) {
            return Err(DaoError::invalid_property(
                name,
                "must start with a letter and contain only letters, digits and underscores",
            ));
        }
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| DaoError::invalid_property(name, "not a declared field"))
    }

    /// Checks every name, failing on the first invalid one.
    pub fn validate(&self, names: &[&str]) -> DaoResult<()> {
        for name in names {
            self.check(name)?;
        }
        Ok(())
    }
}

/// Introspection result for a record type.
///
/// Built once when a DAO is constructed and immutable afterwards.
pub struct RecordSchema<R> {
    fields: &'static [FieldDescriptor],
    identifier: Option<usize>,
    tag_name: String,
    validator: PropertyValidator,
    _marker: PhantomData<fn() -> R>,
}

impl<R> Clone for RecordSchema<R> {
    fn clone(&self) -> Self {
        Self {
            fields: self.fields,
            identifier: self.identifier,
            tag_name: self.tag_name.clone(),
            validator: self.validator,
            _marker: PhantomData,
        }
    }
}

impl<R: Record> fmt::Debug for RecordSchema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordSchema")
            .field("type_name", &R::TYPE_NAME)
            .field("fields", &self.fields)
            .field("identifier", &self.identifier().map(|d| d.name))
            .finish()
    }
}

impl<R: Record> RecordSchema<R> {
    /// Resolves the schema of `R`.
    ///
    /// Fails with [`DaoError::TypeIntrospection`] if the type declares no
    /// fields, declares an invalid or repeated field name, or cannot read
    /// and write back one of its fields. An unknown identifier fails with
    /// [`DaoError::InvalidPropertyName`].
    pub fn resolve(config: &DaoConfig) -> DaoResult<Self> {
        let type_name = R::TYPE_NAME;
        if !PropertyValidator::is_valid_name(type_name) {
            return Err(DaoError::type_introspection(type_name, "invalid type name"));
        }

        let fields = R::fields();
        if fields.is_empty() {
            return Err(DaoError::type_introspection(type_name, "no fields declared"));
        }
        for (i, field) in fields.iter().enumerate() {
            if !PropertyValidator::is_valid_name(field.name) {
                return Err(DaoError::type_introspection(
                    type_name,
                    format!("invalid field name {:?}", field.name),
                ));
            }
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(DaoError::type_introspection(
                    type_name,
                    format!("field {} declared twice", field.name),
                ));
            }
        }

        let sample = R::default();
        for field in fields {
            let value = sample.get(field.name).ok_or_else(|| {
                DaoError::type_introspection(type_name, format!("no reader {}", field.reader_name()))
            })?;
            let mut copy = sample.clone();
            copy.set(field.name, value.clone()).map_err(|e| {
                DaoError::type_introspection(
                    type_name,
                    format!("writer {} failed: {e}", field.writer_name()),
                )
            })?;
            if !copy.get(field.name).is_some_and(|v| v.same_text(&value)) {
                return Err(DaoError::type_introspection(
                    type_name,
                    format!(
                        "{} does not read back what {} wrote",
                        field.reader_name(),
                        field.writer_name()
                    ),
                ));
            }
        }

        let validator = PropertyValidator::new(fields);
        let identifier = match config.identifier.as_deref() {
            Some(name) => {
                validator.check(name)?;
                fields.iter().position(|f| f.name == name)
            }
            None => None,
        };

        tracing::debug!(
            type_name,
            fields = fields.len(),
            identifier = ?config.identifier,
            "resolved record schema"
        );

        Ok(Self {
            fields,
            identifier,
            tag_name: lower_camel(type_name),
            validator,
            _marker: PhantomData,
        })
    }

    /// Returns the record type name.
    pub fn type_name(&self) -> &'static str {
        R::TYPE_NAME
    }

    /// Returns the document tag name of one record.
    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    /// Returns the declared fields in order.
    pub fn fields(&self) -> &'static [FieldDescriptor] {
        self.fields
    }

    /// Returns the declared field names in order.
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the position of a field.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Returns the property validator.
    pub fn validator(&self) -> &PropertyValidator {
        &self.validator
    }

    /// Validates property names.
    pub fn validate(&self, names: &[&str]) -> DaoResult<()> {
        self.validator.validate(names)
    }

    /// Returns the identifier field, if one is configured.
    pub fn identifier(&self) -> Option<&'static FieldDescriptor> {
        self.identifier.map(|i| &self.fields[i])
    }

    /// Returns the position of the identifier field.
    pub fn identifier_position(&self) -> Option<usize> {
        self.identifier
    }

    /// Returns the identifier field or fails with
    /// [`DaoError::MissingIdentifier`].
    pub fn require_identifier(&self) -> DaoResult<&'static FieldDescriptor> {
        self.identifier()
            .ok_or_else(|| DaoError::missing_identifier(R::TYPE_NAME))
    }

    /// Reads one field of a record.
    pub fn value_of(&self, record: &R, name: &str) -> DaoResult<Value> {
        record
            .get(name)
            .ok_or_else(|| DaoError::invalid_property(name, "not readable on this record"))
    }

    /// Reads every field of a record in declaration order.
    pub fn values_of(&self, record: &R) -> DaoResult<Vec<Value>> {
        self.fields
            .iter()
            .map(|f| self.value_of(record, f.name))
            .collect()
    }

    /// Reads the identifier of a record.
    pub fn identifier_of(&self, record: &R) -> DaoResult<Value> {
        let id = self.require_identifier()?;
        self.value_of(record, id.name)
    }

    /// Converts a caller-supplied value to the type of a field.
    pub fn typed_value(&self, name: &str, value: &Value) -> DaoResult<Value> {
        let field = self.validator.check(name)?;
        value
            .clone()
            .coerce(field.field_type)
            .map_err(|e| e.for_field(name))
    }

    /// Builds a record from field values.
    ///
    /// Fields not listed keep their default value.
    pub fn instantiate<'a>(
        &self,
        values: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> DaoResult<R> {
        let mut record = R::default();
        for (name, value) in values {
            record.set(name, value)?;
        }
        Ok(record)
    }

    /// Builds a replacement for `record` with the named fields changed.
    ///
    /// Untouched fields are copied. Names and values must have equal length.
    pub fn clone_with(&self, record: &R, names: &[&str], values: &[Value]) -> DaoResult<R> {
        if names.len() != values.len() {
            return Err(DaoError::ArityMismatch {
                properties: names.len(),
                values: values.len(),
            });
        }
        self.validate(names)?;
        let mut copy = record.clone();
        for (name, value) in names.iter().zip(values) {
            copy.set(name, value.clone())?;
        }
        Ok(copy)
    }

    /// Field-wise value equality of two records.
    pub fn records_equal(&self, a: &R, b: &R) -> bool {
        self.fields
            .iter()
            .all(|f| match (a.get(f.name), b.get(f.name)) {
                (Some(x), Some(y)) => x.same_text(&y),
                (None, None) => true,
                _ => false,
            })
    }
}

/// Compiles a pattern that must match a whole value.
pub(crate) fn compile_full_match(pattern: &str) -> DaoResult<Regex> {
    Ok(Regex::new(&format!("^(?:{pattern})$"))?)
}

/// Lowercases the first character of a type name.
fn lower_camel(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
