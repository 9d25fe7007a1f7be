//! Record introspection.
//!
//! A record type exposes its ordered, named, typed fields through the
//! [`Record`] trait. Each field has a reader and a writer that move values
//! in and out of the record as [`Value`]s, so storage engines never need to
//! know the concrete type.
//!
//! Most types implement the trait with [`impl_record!`](crate::impl_record):
//!
//! ```
//! use rostdao::{impl_record, Record, Value};
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Person {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl_record!(Person { id: i64, name: String });
//!
//! let mut p = Person::default();
//! p.set("name", Value::from("Ann")).unwrap();
//! assert_eq!(p.get("name"), Some(Value::from("Ann")));
//! assert_eq!(Person::fields().len(), 2);
//! ```

use crate::error::{DaoError, DaoResult};
use crate::value::{FieldType, Value};
use chrono::NaiveDate;
use std::fmt::Debug;

/// Name and type of one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    /// Field name, also used as column, tag and attribute name.
    pub name: &'static str,
    /// Storage type of the field.
    pub field_type: FieldType,
}

impl FieldDescriptor {
    /// Creates a descriptor.
    pub const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self { name, field_type }
    }

    /// Returns the conventional reader name: `isX` for booleans, `getX`
    /// otherwise.
    pub fn reader_name(&self) -> String {
        let prefix = if self.field_type == FieldType::Bool {
            "is"
        } else {
            "get"
        };
        format!("{prefix}{}", capitalize(self.name))
    }

    /// Returns the conventional writer name `setX`.
    pub fn writer_name(&self) -> String {
        format!("set{}", capitalize(self.name))
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A Rust type usable as a record field.
pub trait FieldValue: Sized {
    /// Storage type of this field type.
    const FIELD_TYPE: FieldType;

    /// Reads the field into a value.
    fn to_value(&self) -> Value;

    /// Converts a value back into the field type.
    fn from_value(value: Value) -> DaoResult<Self>;
}

impl FieldValue for bool {
    const FIELD_TYPE: FieldType = FieldType::Bool;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> DaoResult<Self> {
        match value.coerce(FieldType::Bool)? {
            Value::Bool(b) => Ok(b),
            other => Err(DaoError::value_conversion(other.to_string(), FieldType::Bool)),
        }
    }
}

impl FieldValue for char {
    const FIELD_TYPE: FieldType = FieldType::Char;

    fn to_value(&self) -> Value {
        Value::Char(*self)
    }

    fn from_value(value: Value) -> DaoResult<Self> {
        match value.coerce(FieldType::Char)? {
            Value::Char(c) => Ok(c),
            other => Err(DaoError::value_conversion(other.to_string(), FieldType::Char)),
        }
    }
}

macro_rules! integer_field {
    ($($int:ty),+) => {
        $(
            impl FieldValue for $int {
                const FIELD_TYPE: FieldType = FieldType::Integer;

                fn to_value(&self) -> Value {
                    Value::Integer(i64::from(*self))
                }

                fn from_value(value: Value) -> DaoResult<Self> {
                    match value.coerce(FieldType::Integer)? {
                        Value::Integer(n) => <$int>::try_from(n)
                            .map_err(|_| DaoError::value_conversion(n.to_string(), FieldType::Integer)),
                        other => Err(DaoError::value_conversion(other.to_string(), FieldType::Integer)),
                    }
                }
            }
        )+
    };
}

integer_field!(i8, i16, i32, i64, u8, u16, u32);

impl FieldValue for f64 {
    const FIELD_TYPE: FieldType = FieldType::Float;

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> DaoResult<Self> {
        match value.coerce(FieldType::Float)? {
            Value::Float(x) => Ok(x),
            other => Err(DaoError::value_conversion(other.to_string(), FieldType::Float)),
        }
    }
}

impl FieldValue for f32 {
    const FIELD_TYPE: FieldType = FieldType::Float;

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Value) -> DaoResult<Self> {
        f64::from_value(value).map(|x| x as f32)
    }
}

impl FieldValue for String {
    const FIELD_TYPE: FieldType = FieldType::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> DaoResult<Self> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Null => Err(DaoError::value_conversion("null", FieldType::Text)),
            other => Ok(other.to_string()),
        }
    }
}

impl FieldValue for NaiveDate {
    const FIELD_TYPE: FieldType = FieldType::Date;

    fn to_value(&self) -> Value {
        Value::Date(*self)
    }

    fn from_value(value: Value) -> DaoResult<Self> {
        match value.coerce(FieldType::Date)? {
            Value::Date(d) => Ok(d),
            other => Err(DaoError::value_conversion(other.to_string(), FieldType::Date)),
        }
    }
}

/// A record type that can be stored by a DAO.
///
/// The default instance is used at DAO construction to check that every
/// declared field can be read and written.
pub trait Record: Default + Clone + Debug {
    /// Type name, used as table name and to derive the document tag name.
    const TYPE_NAME: &'static str;

    /// Declared fields in declaration order.
    fn fields() -> &'static [FieldDescriptor];

    /// Reads a field by name.
    ///
    /// Returns `None` if the record has no such field.
    fn get(&self, name: &str) -> Option<Value>;

    /// Writes a field by name, converting the value to the field's type.
    fn set(&mut self, name: &str, value: Value) -> DaoResult<()>;
}

/// Implements [`Record`] for a struct from its field list.
///
/// Every listed field type must implement [`FieldValue`].
#[macro_export]
macro_rules! impl_record {
    ($ty:ident { $($field:ident : $fty:ty),+ $(,)? }) => {
        impl $crate::Record for $ty {
            const TYPE_NAME: &'static str = stringify!($ty);

            fn fields() -> &'static [$crate::FieldDescriptor] {
                const FIELDS: &[$crate::FieldDescriptor] = &[
                    $(
                        $crate::FieldDescriptor::new(
                            stringify!($field),
                            <$fty as $crate::FieldValue>::FIELD_TYPE,
                        ),
                    )+
                ];
                FIELDS
            }

            fn get(&self, name: &str) -> ::std::option::Option<$crate::Value> {
                $(
                    if name == stringify!($field) {
                        return ::std::option::Option::Some(
                            $crate::FieldValue::to_value(&self.$field),
                        );
                    }
                )+
                ::std::option::Option::None
            }

            fn set(&mut self, name: &str, value: $crate::Value) -> $crate::DaoResult<()> {
                $(
                    if name == stringify!($field) {
                        self.$field = <$fty as $crate::FieldValue>::from_value(value)
                            .map_err(|e| e.for_field(name))?;
                        return ::std::result::Result::Ok(());
                    }
                )+
                ::std::result::Result::Err($crate::DaoError::invalid_property(
                    name,
                    "not a field of this record type",
                ))
            }
        }
    };
}
