//! Behaviour every backend must share.
//!
//! Each check takes an empty DAO for [`Person`] configured with `id` as
//! identifier, and panics on the first deviation.

use crate::fixtures::{person, person_config, Backend, Person, TestDao};
use rostdao::{ComparisonMode, Dao, DaoError, PropertyComparator, Sense, Value};

fn seed(dao: &mut dyn Dao<Person>) {
    let people = [
        person(1, "Ann", 30),
        person(2, "Bo", 41),
        person(3, "Cy", 22),
        person(4, "Bea", 57),
    ];
    assert_eq!(dao.add_all(&people).expect("Failed to seed"), people.len());
}

fn ids(dao: &dyn Dao<Person>) -> String {
    dao.get_ids().expect("Failed to read ids").to_string()
}

/// `add` then `get_by_id` returns an equal record.
pub fn add_then_get_by_id(dao: &mut dyn Dao<Person>) {
    assert!(dao.add(&person(7, "Ann", 30)).unwrap());
    assert_eq!(
        dao.get_by_id(&Value::Integer(7)).unwrap(),
        Some(person(7, "Ann", 30))
    );
    assert_eq!(dao.get_by_id(&Value::Integer(8)).unwrap(), None);
    assert!(dao.find(&person(7, "Ann", 30)).unwrap());
    assert!(!dao.find(&person(7, "Ann", 31)).unwrap());
}

/// Identifiers stay unique and duplicate records are refused.
pub fn identifiers_stay_unique(dao: &mut dyn Dao<Person>) {
    seed(dao);
    assert!(matches!(
        dao.add(&person(1, "Other", 5)),
        Err(DaoError::IdentifierConflict { .. })
    ));
    assert!(matches!(
        dao.add(&person(2, "Bo", 41)),
        Err(DaoError::RecordAlreadyExists)
    ));
    assert!(matches!(
        dao.add_all(&[person(5, "Di", 1), person(5, "Ed", 2)]),
        Err(DaoError::IdentifierConflict { .. })
    ));
    assert_eq!(ids(dao), "[1, 2, 3, 4]");
}

/// Two consecutive reads agree in content and order.
pub fn reads_are_stable(dao: &mut dyn Dao<Person>) {
    seed(dao);
    let first = dao.get_all().unwrap().into_vec();
    let second = dao.get_all().unwrap().into_vec();
    assert_eq!(first, second);
    assert_eq!(first[0], person(1, "Ann", 30));
    assert_eq!(first[3], person(4, "Bea", 57));
}

/// Selection by property, pattern and order.
pub fn selections(dao: &mut dyn Dao<Person>) {
    seed(dao);
    assert_eq!(
        dao.get_by_property("name", &Value::from("Bo")).unwrap().to_vec(),
        vec![person(2, "Bo", 41)]
    );
    assert_eq!(
        dao.get_by_property("age", &Value::from("22")).unwrap().to_vec(),
        vec![person(3, "Cy", 22)]
    );
    assert_eq!(dao.get_by_pattern("name", "B.*").unwrap().len(), 2);
    assert!(dao.get_by_pattern("name", "B").unwrap().is_empty());
    assert!(matches!(
        dao.get_by_pattern("name", "("),
        Err(DaoError::InvalidPattern(_))
    ));

    let by_age = PropertyComparator::new("age", Sense::Desc).mode(ComparisonMode::Typed);
    let names: Vec<String> = dao
        .get_all_order_by(&by_age)
        .unwrap()
        .iter()
        .map(|p| p.name.clone())
        .collect();
    assert_eq!(names, ["Bea", "Bo", "Ann", "Cy"]);

    let by_name = PropertyComparator::new("name", Sense::Asc);
    let found = dao.get_by_pattern_order_by("name", "B.*", &by_name).unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].name, "Bea");

    assert_eq!(
        dao.get_property("name").unwrap().to_string(),
        "[Ann, Bo, Cy, Bea]"
    );
}

/// `delete_where` removes exactly the matches and counts them.
pub fn delete_where_counts(dao: &mut dyn Dao<Person>) {
    seed(dao);
    assert_eq!(dao.delete_where(&|p: &Person| p.age > 35).unwrap(), 2);
    assert_eq!(ids(dao), "[1, 3]");
    assert_eq!(dao.delete_where(&|p: &Person| p.age > 35).unwrap(), 0);
    assert_eq!(dao.delete_by_pattern("name", "A.*").unwrap(), 1);
    assert_eq!(dao.delete_by_property("age", &Value::Integer(22)).unwrap(), 1);
    assert!(dao.get_all().unwrap().is_empty());
    assert!(!dao.delete(&person(1, "Ann", 30)).unwrap());
}

/// `set` changes only the named properties and checks its arguments.
pub fn set_semantics(dao: &mut dyn Dao<Person>) {
    seed(dao);
    let changed = dao
        .set(&["age"], &[Value::Integer(50)], &|p: &Person| p.name.starts_with('B'))
        .unwrap();
    assert_eq!(changed, 2);
    assert_eq!(
        dao.get_by_id(&Value::Integer(2)).unwrap(),
        Some(person(2, "Bo", 50))
    );
    assert_eq!(
        dao.get_by_id(&Value::Integer(1)).unwrap(),
        Some(person(1, "Ann", 30))
    );
    // Already holding the value
    let again = dao
        .set(&["age"], &[Value::Integer(50)], &|p: &Person| p.name.starts_with('B'))
        .unwrap();
    assert_eq!(again, 0);

    let all = [Value::Integer(9), Value::from("X"), Value::Integer(1)];
    assert!(matches!(
        dao.set(&["id", "name", "age"], &all, &|_: &Person| true),
        Err(DaoError::TooManyProperties { .. })
    ));
    assert!(matches!(
        dao.set(&["name", "age"], &[Value::from("X")], &|_: &Person| true),
        Err(DaoError::ArityMismatch { .. })
    ));
    assert!(matches!(
        dao.set(&["bogus"], &[Value::Integer(1)], &|_: &Person| true),
        Err(DaoError::InvalidPropertyName { .. })
    ));
}

/// `update` and its identifier variants apply the shared checks.
pub fn update_semantics(dao: &mut dyn Dao<Person>) {
    seed(dao);
    let ann = person(1, "Ann", 30);
    assert!(matches!(dao.update(&ann, &ann), Err(DaoError::NoOpUpdate)));
    assert!(!dao.update(&person(9, "Zed", 1), &person(9, "Zed", 2)).unwrap());
    // A taken identifier is reported before the old record is looked up
    assert!(matches!(
        dao.update(&person(9, "Zed", 1), &person(2, "Zed", 1)),
        Err(DaoError::IdentifierConflict { .. })
    ));
    assert!(matches!(
        dao.update(&ann, &person(2, "Bo", 41)),
        Err(DaoError::IdentifierConflict { .. })
    ));
    assert!(matches!(
        dao.update(&ann, &person(2, "Ann", 30)),
        Err(DaoError::IdentifierConflict { .. })
    ));
    assert!(dao.update(&ann, &person(10, "Ann", 31)).unwrap());
    assert_eq!(dao.get_by_id(&Value::Integer(1)).unwrap(), None);

    assert_eq!(
        dao.update_property("age", &Value::Integer(41), &Value::Integer(42))
            .unwrap(),
        1
    );
    assert_eq!(
        dao.get_by_id(&Value::Integer(2)).unwrap(),
        Some(person(2, "Bo", 42))
    );

    assert!(dao
        .update_by_id(&Value::Integer(3), &person(3, "Cyd", 23))
        .unwrap());
    assert!(!dao
        .update_by_id(&Value::Integer(99), &person(99, "No", 1))
        .unwrap());
    assert!(dao
        .update_property_by_id(&Value::Integer(4), "age", &Value::Integer(58))
        .unwrap());
    assert!(!dao
        .update_property_by_id(&Value::Integer(99), "age", &Value::Integer(1))
        .unwrap());
    // The orchestrated update re-adds records, so compare by identifier
    let by_id = PropertyComparator::new("id", Sense::Asc).mode(ComparisonMode::Typed);
    let ages: Vec<(i64, i64)> = dao
        .get_all_order_by(&by_id)
        .unwrap()
        .iter()
        .map(|p| (p.id, p.age))
        .collect();
    assert_eq!(ages, [(2, 42), (3, 23), (4, 58), (10, 31)]);
}

/// Identifier lookups and deletes.
pub fn identifier_operations(dao: &mut dyn Dao<Person>) {
    seed(dao);
    assert!(dao.delete_by_id(&Value::Integer(3)).unwrap());
    assert!(!dao.delete_by_id(&Value::Integer(3)).unwrap());
    assert_eq!(ids(dao), "[1, 2, 4]");
    assert_eq!(
        dao.get_by_id(&Value::from("4")).unwrap(),
        Some(person(4, "Bea", 57))
    );
}

/// Property names are validated before storage is touched.
pub fn property_names_are_validated(dao: &mut dyn Dao<Person>) {
    seed(dao);
    for bad in ["age; DROP TABLE Person", "nonexistentField", ""] {
        assert!(
            matches!(
                dao.get_by_property(bad, &Value::Integer(1)),
                Err(DaoError::InvalidPropertyName { .. })
            ),
            "{bad:?}"
        );
        assert!(dao.get_property(bad).is_err(), "{bad:?}");
    }
    assert!(dao.get_property("age").is_ok());
    assert_eq!(dao.get_all().unwrap().len(), 4);
}

/// A failed batch leaves storage as it was.
pub fn failed_batch_changes_nothing(dao: &mut dyn Dao<Person>) {
    seed(dao);
    let before = dao.get_all().unwrap().into_vec();
    assert!(dao
        .add_all(&[person(5, "Di", 1), person(6, "Ed", 2), person(2, "Xo", 3)])
        .is_err());
    assert_eq!(dao.get_all().unwrap().into_vec(), before);
}

/// Every check, in order.
pub const CHECKS: &[(&str, fn(&mut dyn Dao<Person>))] = &[
    ("add_then_get_by_id", add_then_get_by_id),
    ("identifiers_stay_unique", identifiers_stay_unique),
    ("reads_are_stable", reads_are_stable),
    ("selections", selections),
    ("delete_where_counts", delete_where_counts),
    ("set_semantics", set_semantics),
    ("update_semantics", update_semantics),
    ("identifier_operations", identifier_operations),
    ("property_names_are_validated", property_names_are_validated),
    ("failed_batch_changes_nothing", failed_batch_changes_nothing),
];

/// Runs every check against fresh DAOs on one backend.
pub fn run_contract(backend: Backend) {
    for (name, check) in CHECKS {
        eprintln!("contract {backend}: {name}");
        let mut dao = TestDao::<Person>::open(backend, &person_config());
        check(&mut *dao);
    }
}
