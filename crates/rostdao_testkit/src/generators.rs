//! Property-based test generators using proptest.
//!
//! Generated text never contains the CSV separator, XML-significant
//! characters or surrounding whitespace, so it survives every backend
//! unchanged.

use crate::fixtures::Person;
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Strategy for names safe on every backend.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{0,9}").expect("Invalid regex")
}

/// Strategy for a single [`Person`].
pub fn person_strategy() -> impl Strategy<Value = Person> {
    (0i64..10_000, name_strategy(), 0i64..120).prop_map(|(id, name, age)| Person { id, name, age })
}

/// Strategy for people with distinct identifiers, in generation order.
pub fn people_strategy(max: usize) -> impl Strategy<Value = Vec<Person>> {
    prop::collection::btree_map(0i64..10_000, (name_strategy(), 0i64..120), 0..=max).prop_map(
        |by_id: BTreeMap<i64, (String, i64)>| {
            by_id
                .into_iter()
                .map(|(id, (name, age))| Person { id, name, age })
                .collect()
        },
    )
}

/// Strategy for names the property validator accepts.
pub fn valid_property_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for names the property validator rejects.
pub fn invalid_property_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        prop::string::string_regex("[0-9_][a-zA-Z0-9_]{0,8}").expect("Invalid regex"),
        prop::string::string_regex("[a-z]{1,6}[ ;'\"-][a-zA-Z ]{0,8}").expect("Invalid regex"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rostdao::PropertyValidator;

    proptest! {
        #[test]
        fn people_have_distinct_ids(people in people_strategy(20)) {
            let mut ids: Vec<i64> = people.iter().map(|p| p.id).collect();
            ids.dedup();
            prop_assert_eq!(ids.len(), people.len());
        }

        #[test]
        fn valid_names_pass(name in valid_property_name_strategy()) {
            prop_assert!(PropertyValidator::is_valid_name(&name));
        }

        #[test]
        fn invalid_names_fail(name in invalid_property_name_strategy()) {
            prop_assert!(!PropertyValidator::is_valid_name(&name));
        }
    }
}
