//! Type-erased field values.

use crate::error::{DaoError, DaoResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Date format used for the textual form of dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The storage type of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Boolean flag.
    Bool,
    /// Single character.
    Char,
    /// Signed integer.
    Integer,
    /// Floating point number.
    Float,
    /// UTF-8 text.
    Text,
    /// Calendar date without time zone.
    Date,
}

impl FieldType {
    /// Returns the lowercase name of this type.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Char => "char",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A field value detached from its record.
///
/// The [`Display`](fmt::Display) form is the canonical text used for
/// delimited-text cells, document content and textual comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Single character.
    Char(char),
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Text string.
    Text(String),
    /// Calendar date.
    Date(NaiveDate),
}

impl Value {
    /// Parses the textual form of a value of the given type.
    ///
    /// Numbers are trimmed before parsing; booleans accept `true` and
    /// `false` in any case; a character takes the first character of a
    /// non-empty string.
    pub fn parse(field_type: FieldType, text: &str) -> DaoResult<Self> {
        let fail = || DaoError::value_conversion(text, field_type);
        match field_type {
            FieldType::Text => Ok(Self::Text(text.to_owned())),
            FieldType::Bool => {
                let trimmed = text.trim();
                if trimmed.eq_ignore_ascii_case("true") {
                    Ok(Self::Bool(true))
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Ok(Self::Bool(false))
                } else {
                    Err(fail())
                }
            }
            FieldType::Char => text.chars().next().map(Self::Char).ok_or_else(fail),
            FieldType::Integer => text
                .trim()
                .parse::<i64>()
                .map(Self::Integer)
                .map_err(|_| fail()),
            FieldType::Float => text
                .trim()
                .parse::<f64>()
                .map(Self::Float)
                .map_err(|_| fail()),
            FieldType::Date => NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
                .map(Self::Date)
                .map_err(|_| fail()),
        }
    }

    /// Returns the field type this value naturally belongs to.
    ///
    /// `Null` has no type.
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(FieldType::Bool),
            Self::Char(_) => Some(FieldType::Char),
            Self::Integer(_) => Some(FieldType::Integer),
            Self::Float(_) => Some(FieldType::Float),
            Self::Text(_) => Some(FieldType::Text),
            Self::Date(_) => Some(FieldType::Date),
        }
    }

    /// Converts this value to the given field type.
    ///
    /// Values already of the target type pass through, integers widen to
    /// floats, and anything else is reparsed from its textual form.
    pub fn coerce(self, target: FieldType) -> DaoResult<Self> {
        match (self.field_type(), self) {
            (Some(t), value) if t == target => Ok(value),
            (_, Self::Integer(n)) if target == FieldType::Float => Ok(Self::Float(n as f64)),
            (_, Self::Null) => Err(DaoError::value_conversion("null", target)),
            (_, value) => Self::parse(target, &value.to_string()),
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a float, widening integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(x) => Some(*x),
            Self::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Get this value as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as a date, if it is one.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns true if both values are equal or share the same textual form.
    pub fn same_text(&self, other: &Self) -> bool {
        self == other || self.to_string() == other.to_string()
    }

    /// Compares two values by their natural ordering.
    ///
    /// Numbers compare numerically and dates chronologically. Values of
    /// unrelated types fall back to comparing their textual forms. `Null`
    /// sorts before everything else.
    pub fn cmp_typed(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Self::Null) => Ordering::Greater,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Char(a), Self::Char(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => match (self.as_float(), other.as_float()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => self.to_string().cmp(&other.to_string()),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Char(c) => write!(f, "{c}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Self::Char(c)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_each_type() {
        assert_eq!(Value::parse(FieldType::Integer, " 42 ").unwrap(), Value::Integer(42));
        assert_eq!(Value::parse(FieldType::Float, "2.5").unwrap(), Value::Float(2.5));
        assert_eq!(Value::parse(FieldType::Bool, "TRUE").unwrap(), Value::Bool(true));
        assert_eq!(Value::parse(FieldType::Char, "xyz").unwrap(), Value::Char('x'));
        assert_eq!(
            Value::parse(FieldType::Text, " spaced ").unwrap(),
            Value::Text(" spaced ".into())
        );
        assert_eq!(
            Value::parse(FieldType::Date, "2024-02-29").unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            Value::parse(FieldType::Integer, "4x"),
            Err(DaoError::ValueConversion { .. })
        ));
        assert!(Value::parse(FieldType::Bool, "yes").is_err());
        assert!(Value::parse(FieldType::Char, "").is_err());
        assert!(Value::parse(FieldType::Date, "29/02/2024").is_err());
    }

    #[test]
    fn display_is_canonical_text() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Bool(false).to_string(), "false");
        assert_eq!(Value::Integer(-7).to_string(), "-7");
        let day = NaiveDate::from_ymd_opt(2023, 1, 5).unwrap();
        assert_eq!(Value::Date(day).to_string(), "2023-01-05");
    }

    #[test]
    fn coerce_between_types() {
        assert_eq!(
            Value::Integer(3).coerce(FieldType::Float).unwrap(),
            Value::Float(3.0)
        );
        assert_eq!(
            Value::Text("17".into()).coerce(FieldType::Integer).unwrap(),
            Value::Integer(17)
        );
        assert_eq!(
            Value::Integer(17).coerce(FieldType::Text).unwrap(),
            Value::Text("17".into())
        );
        assert!(Value::Null.coerce(FieldType::Integer).is_err());
    }

    #[test]
    fn same_text_crosses_types() {
        assert!(Value::Integer(30).same_text(&Value::Text("30".into())));
        assert!(!Value::Integer(30).same_text(&Value::Integer(31)));
    }

    #[test]
    fn typed_ordering() {
        assert_eq!(
            Value::Integer(9).cmp_typed(&Value::Integer(10)),
            Ordering::Less
        );
        assert_eq!(
            Value::Float(2.5).cmp_typed(&Value::Integer(2)),
            Ordering::Greater
        );
        assert_eq!(Value::Null.cmp_typed(&Value::Integer(0)), Ordering::Less);
    }

    #[test]
    fn option_into_value() {
        let none: Option<i64> = None;
        assert_eq!(Value::from(none), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::Text("a".into()));
    }
}
