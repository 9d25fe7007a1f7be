//! Ordering records by one property.

use crate::record::Record;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sense {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

/// How property values are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    /// Compare textual forms lexicographically, so `10` sorts before `9`.
    #[default]
    Textual,
    /// Compare numbers numerically and dates chronologically.
    Typed,
}

/// Compares records by the value of one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyComparator {
    property: String,
    sense: Sense,
    mode: ComparisonMode,
}

impl PropertyComparator {
    /// Creates a textual comparator.
    pub fn new(property: impl Into<String>, sense: Sense) -> Self {
        Self {
            property: property.into(),
            sense,
            mode: ComparisonMode::Textual,
        }
    }

    /// Sets the comparison mode.
    #[must_use]
    pub fn mode(mut self, mode: ComparisonMode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns the compared property.
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Returns the sort direction.
    pub fn sense(&self) -> Sense {
        self.sense
    }

    /// Compares two records. A missing value compares as `null`.
    pub fn compare<R: Record>(&self, a: &R, b: &R) -> Ordering {
        let left = a.get(&self.property).unwrap_or(Value::Null);
        let right = b.get(&self.property).unwrap_or(Value::Null);
        let ordering = match self.mode {
            ComparisonMode::Textual => left.to_string().cmp(&right.to_string()),
            ComparisonMode::Typed => left.cmp_typed(&right),
        };
        match self.sense {
            Sense::Asc => ordering,
            Sense::Desc => ordering.reverse(),
        }
    }

    /// Sorts records in place. The sort is stable.
    pub fn sort<R: Record>(&self, records: &mut [R]) {
        records.sort_by(|a, b| self.compare(a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impl_record;
    use proptest::prelude::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Item {
        name: String,
        qty: i64,
    }

    impl_record!(Item { name: String, qty: i64 });

    fn item(name: &str, qty: i64) -> Item {
        Item {
            name: name.into(),
            qty,
        }
    }

    #[test]
    fn textual_order_is_lexicographic() {
        let mut items = vec![item("a", 9), item("b", 10), item("c", 100)];
        PropertyComparator::new("qty", Sense::Asc).sort(&mut items);
        let qty: Vec<_> = items.iter().map(|i| i.qty).collect();
        assert_eq!(qty, [10, 100, 9]);
    }

    #[test]
    fn typed_order_is_numeric() {
        let mut items = vec![item("a", 9), item("b", 10), item("c", 100)];
        PropertyComparator::new("qty", Sense::Desc)
            .mode(ComparisonMode::Typed)
            .sort(&mut items);
        let qty: Vec<_> = items.iter().map(|i| i.qty).collect();
        assert_eq!(qty, [100, 10, 9]);
    }

    #[test]
    fn descending_reverses() {
        let cmp = PropertyComparator::new("name", Sense::Desc);
        assert_eq!(cmp.compare(&item("a", 0), &item("b", 0)), Ordering::Greater);
    }

    #[test]
    fn equal_keys_keep_order() {
        let mut items = vec![item("x", 1), item("y", 1), item("z", 0)];
        PropertyComparator::new("qty", Sense::Asc).sort(&mut items);
        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["z", "x", "y"]);
    }

    proptest! {
        #[test]
        fn asc_and_desc_are_opposite(a in "[a-z]{0,6}", b in "[a-z]{0,6}") {
            let asc = PropertyComparator::new("name", Sense::Asc);
            let desc = PropertyComparator::new("name", Sense::Desc);
            let (x, y) = (item(&a, 0), item(&b, 0));
            prop_assert_eq!(asc.compare(&x, &y), desc.compare(&x, &y).reverse());
        }

        #[test]
        fn sorted_output_is_ordered(names in prop::collection::vec("[a-z]{0,4}", 0..20)) {
            let mut items: Vec<Item> = names.iter().map(|n| item(n, 0)).collect();
            let cmp = PropertyComparator::new("name", Sense::Asc);
            cmp.sort(&mut items);
            for pair in items.windows(2) {
                prop_assert_ne!(cmp.compare(&pair[0], &pair[1]), Ordering::Greater);
            }
        }
    }
}
