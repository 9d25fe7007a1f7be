//! Immutable query results.

use crate::error::{DaoError, DaoResult};
use crate::record::Record;
use crate::value::Value;
use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;

/// Equality by value rather than by identity or bit pattern.
pub trait ValueEq {
    /// Returns true if both sides hold the same values.
    fn value_eq(&self, other: &Self) -> bool;
}

impl ValueEq for Value {
    fn value_eq(&self, other: &Self) -> bool {
        self.same_text(other)
    }
}

impl<R: Record> ValueEq for R {
    fn value_eq(&self, other: &Self) -> bool {
        R::fields()
            .iter()
            .all(|f| match (self.get(f.name), other.get(f.name)) {
                (Some(a), Some(b)) => a.same_text(&b),
                (None, None) => true,
                _ => false,
            })
    }
}

/// A fixed-size, order-preserving result of a read.
///
/// Every read produces a fresh set that shares nothing with the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet<T> {
    items: Box<[T]>,
}

impl<T> Default for ResultSet<T> {
    fn default() -> Self {
        Self {
            items: Box::default(),
        }
    }
}

impl<T> ResultSet<T> {
    /// Creates a set from items in order.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into_boxed_slice(),
        }
    }

    /// Creates a set from a working buffer, dropping empty slots.
    pub fn from_slots(slots: Vec<Option<T>>) -> Self {
        slots.into_iter().flatten().collect()
    }

    /// Returns the first item.
    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    /// Copies the items into a vector.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.to_vec()
    }

    /// Consumes the set, returning its items.
    pub fn into_vec(self) -> Vec<T> {
        self.items.into_vec()
    }

    /// Returns a new set sorted with a stable sort.
    #[must_use]
    pub fn sorted_by(self, compare: impl FnMut(&T, &T) -> Ordering) -> Self {
        let mut items = self.into_vec();
        items.sort_by(compare);
        Self::new(items)
    }
}

impl<T: ValueEq> ResultSet<T> {
    /// Collects items, failing on the first value-equal pair.
    ///
    /// `on_duplicate` builds the error from the repeated item.
    pub fn try_unique<I, F>(items: I, on_duplicate: F) -> DaoResult<Self>
    where
        I: IntoIterator<Item = T>,
        F: FnOnce(&T) -> DaoError,
    {
        let mut out: Vec<T> = Vec::new();
        for item in items {
            if out.iter().any(|seen| seen.value_eq(&item)) {
                return Err(on_duplicate(&item));
            }
            out.push(item);
        }
        Ok(Self::new(out))
    }

    /// Returns true if a value-equal item is present.
    pub fn contains(&self, item: &T) -> bool {
        self.index_of(item).is_some()
    }

    /// Returns the position of the first value-equal item.
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.items.iter().position(|x| x.value_eq(item))
    }
}

impl<T> Deref for ResultSet<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T> FromIterator<T> for ResultSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T> IntoIterator for ResultSet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}

impl<'a, T> IntoIterator for &'a ResultSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: fmt::Display> fmt::Display for ResultSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        f.write_str("]")
    }
}
