//! The uniform DAO contract.
//!
//! [`Dao`] has three storage primitives (`get_all`, `add_all`,
//! `delete_all`). Every other operation is a provided method composed from
//! them, so a new backend works as soon as the primitives do. Engines
//! override the provided methods where the backend can do better natively.

use crate::comparator::PropertyComparator;
use crate::error::{DaoError, DaoResult};
use crate::record::Record;
use crate::result_set::{ResultSet, ValueEq};
use crate::schema::{compile_full_match, RecordSchema};
use crate::value::Value;
use std::slice;

/// Record predicate used for selection.
pub type Predicate<'a, R> = &'a dyn Fn(&R) -> bool;

/// CRUD access to records of type `R` in one backend.
pub trait Dao<R: Record> {
    /// Returns the resolved record schema.
    fn schema(&self) -> &RecordSchema<R>;

    /// Returns every stored record in storage order.
    ///
    /// Fails with [`DaoError::DuplicateRecord`] if two stored records are
    /// value-equal.
    fn get_all(&self) -> DaoResult<ResultSet<R>>;

    /// Stores a batch of records and returns how many were written.
    ///
    /// Fails with [`DaoError::RecordAlreadyExists`] or
    /// [`DaoError::IdentifierConflict`] without writing anything.
    fn add_all(&mut self, records: &[R]) -> DaoResult<usize>;

    /// Removes every stored record value-equal to one in the batch and
    /// returns how many were removed.
    fn delete_all(&mut self, records: &[R]) -> DaoResult<usize>;

    /// Stores one record. Returns true if it was written.
    fn add(&mut self, record: &R) -> DaoResult<bool> {
        Ok(self.add_all(slice::from_ref(record))? == 1)
    }

    /// Removes one record. Returns true if it was present.
    fn delete(&mut self, record: &R) -> DaoResult<bool> {
        Ok(self.delete_all(slice::from_ref(record))? == 1)
    }

    /// Returns true if a value-equal record is stored.
    fn find(&self, record: &R) -> DaoResult<bool> {
        Ok(self.get_all()?.contains(record))
    }

    /// Returns the records matching a predicate.
    fn get_where(&self, predicate: Predicate<'_, R>) -> DaoResult<ResultSet<R>> {
        Ok(self.get_all()?.into_iter().filter(|r| predicate(r)).collect())
    }

    /// Returns the records whose property equals `value`.
    fn get_by_property(&self, name: &str, value: &Value) -> DaoResult<ResultSet<R>> {
        self.schema().validate(&[name])?;
        self.get_where(&|r: &R| r.get(name).is_some_and(|v| v.same_text(value)))
    }

    /// Returns the records whose property fully matches a regular
    /// expression.
    fn get_by_pattern(&self, name: &str, pattern: &str) -> DaoResult<ResultSet<R>> {
        self.schema().validate(&[name])?;
        let regex = compile_full_match(pattern)?;
        self.get_where(&|r: &R| r.get(name).is_some_and(|v| regex.is_match(&v.to_string())))
    }

    /// Returns every record, sorted.
    fn get_all_order_by(&self, comparator: &PropertyComparator) -> DaoResult<ResultSet<R>> {
        self.schema().validate(&[comparator.property()])?;
        Ok(self.get_all()?.sorted_by(|a, b| comparator.compare(a, b)))
    }

    /// Returns the records whose property equals `value`, sorted.
    fn get_by_property_order_by(
        &self,
        name: &str,
        value: &Value,
        comparator: &PropertyComparator,
    ) -> DaoResult<ResultSet<R>> {
        self.schema().validate(&[name, comparator.property()])?;
        Ok(self
            .get_by_property(name, value)?
            .sorted_by(|a, b| comparator.compare(a, b)))
    }

    /// Returns the records whose property fully matches a pattern, sorted.
    fn get_by_pattern_order_by(
        &self,
        name: &str,
        pattern: &str,
        comparator: &PropertyComparator,
    ) -> DaoResult<ResultSet<R>> {
        self.schema().validate(&[name, comparator.property()])?;
        Ok(self
            .get_by_pattern(name, pattern)?
            .sorted_by(|a, b| comparator.compare(a, b)))
    }

    /// Removes the records matching a predicate and returns the count.
    fn delete_where(&mut self, predicate: Predicate<'_, R>) -> DaoResult<usize> {
        let matches = self.get_where(predicate)?;
        if matches.is_empty() {
            return Ok(0);
        }
        self.delete_all(&matches)
    }

    /// Removes the records whose property equals `value`.
    fn delete_by_property(&mut self, name: &str, value: &Value) -> DaoResult<usize> {
        let matches = self.get_by_property(name, value)?;
        if matches.is_empty() {
            return Ok(0);
        }
        self.delete_all(&matches)
    }

    /// Removes the records whose property fully matches a pattern.
    fn delete_by_pattern(&mut self, name: &str, pattern: &str) -> DaoResult<usize> {
        let matches = self.get_by_pattern(name, pattern)?;
        if matches.is_empty() {
            return Ok(0);
        }
        self.delete_all(&matches)
    }

    /// Returns one property of every record, in storage order.
    fn get_property(&self, name: &str) -> DaoResult<ResultSet<Value>> {
        self.schema().validate(&[name])?;
        let schema = self.schema();
        self.get_all()?
            .iter()
            .map(|r| schema.value_of(r, name))
            .collect::<DaoResult<Vec<_>>>()
            .map(ResultSet::new)
    }

    /// Sets properties on every record matching a predicate.
    ///
    /// Records already holding the values are left alone. Returns the
    /// number of records updated. Setting every declared field at once is
    /// refused with [`DaoError::TooManyProperties`], since it would turn
    /// all matches into the same record.
    fn set(
        &mut self,
        names: &[&str],
        values: &[Value],
        predicate: Predicate<'_, R>,
    ) -> DaoResult<usize> {
        check_set_arguments(self.schema(), names, values)?;

        let mut updated = 0;
        for old in self.get_where(predicate)? {
            let new = self.schema().clone_with(&old, names, values)?;
            if self.schema().records_equal(&old, &new) {
                continue;
            }
            if self.update(&old, &new)? {
                updated += 1;
            }
        }
        tracing::debug!(type_name = R::TYPE_NAME, updated, "set properties");
        Ok(updated)
    }

    /// Replaces a stored record.
    ///
    /// Fails with [`DaoError::NoOpUpdate`] when both are value-equal, then
    /// with [`DaoError::IdentifierConflict`] when `new` changes the
    /// identifier to one already stored. Only then returns false if `old`
    /// is not stored, and fails with [`DaoError::RecordAlreadyExists`] when
    /// `new` is.
    fn update(&mut self, old: &R, new: &R) -> DaoResult<bool> {
        let all = self.get_all()?;
        if !check_update(self.schema(), &all, old, new)? {
            return Ok(false);
        }
        Ok(self.delete(old)? && self.add(new)?)
    }

    /// Replaces `old_value` with `new_value` in one property of every
    /// record holding it. Returns the number of records updated.
    fn update_property(
        &mut self,
        name: &str,
        old_value: &Value,
        new_value: &Value,
    ) -> DaoResult<usize> {
        let mut updated = 0;
        for old in self.get_by_property(name, old_value)? {
            let new = self
                .schema()
                .clone_with(&old, &[name], slice::from_ref(new_value))?;
            if self.update(&old, &new)? {
                updated += 1;
            }
        }
        Ok(updated)
    }

    /// Returns the identifier of every record, in storage order.
    ///
    /// Fails with [`DaoError::DuplicateIdentifier`] on the first repeated
    /// identifier.
    fn get_ids(&self) -> DaoResult<ResultSet<Value>> {
        let schema = self.schema();
        schema.require_identifier()?;
        let ids = self
            .get_all()?
            .iter()
            .map(|r| schema.identifier_of(r))
            .collect::<DaoResult<Vec<_>>>()?;
        ResultSet::try_unique(ids, |id| DaoError::duplicate_identifier(id))
    }

    /// Returns the record with the given identifier.
    fn get_by_id(&self, id: &Value) -> DaoResult<Option<R>> {
        let name = self.schema().require_identifier()?.name;
        let mut matches = self.get_by_property(name, id)?.into_iter();
        let first = matches.next();
        if matches.next().is_some() {
            return Err(DaoError::duplicate_identifier(id));
        }
        Ok(first)
    }

    /// Removes the record with the given identifier.
    fn delete_by_id(&mut self, id: &Value) -> DaoResult<bool> {
        match self.get_by_id(id)? {
            Some(record) => self.delete(&record),
            None => Ok(false),
        }
    }

    /// Replaces the record with the given identifier.
    fn update_by_id(&mut self, id: &Value, new: &R) -> DaoResult<bool> {
        match self.get_by_id(id)? {
            Some(old) => self.update(&old, new),
            None => Ok(false),
        }
    }

    /// Sets one property of the record with the given identifier.
    fn update_property_by_id(&mut self, id: &Value, name: &str, value: &Value) -> DaoResult<bool> {
        self.schema().validate(&[name])?;
        match self.get_by_id(id)? {
            Some(old) => {
                let new = self
                    .schema()
                    .clone_with(&old, &[name], slice::from_ref(value))?;
                self.update(&old, &new)
            }
            None => Ok(false),
        }
    }
}

/// Checks the arguments of [`Dao::set`].
pub(crate) fn check_set_arguments<R: Record>(
    schema: &RecordSchema<R>,
    names: &[&str],
    values: &[Value],
) -> DaoResult<()> {
    let declared = schema.fields().len();
    if names.len() >= declared {
        return Err(DaoError::TooManyProperties {
            given: names.len(),
            declared,
        });
    }
    if names.len() != values.len() {
        return Err(DaoError::ArityMismatch {
            properties: names.len(),
            values: values.len(),
        });
    }
    schema.validate(names)
}

/// Checks a batch against stored records before insertion.
///
/// Each record must not be stored already, nor reuse a stored or earlier
/// batch identifier.
pub(crate) fn check_insert<R: Record>(
    schema: &RecordSchema<R>,
    stored: &[R],
    batch: &[R],
) -> DaoResult<()> {
    let mut seen_ids: Vec<Value> = Vec::new();
    if schema.identifier().is_some() {
        for record in stored {
            seen_ids.push(schema.identifier_of(record)?);
        }
    }
    for (i, record) in batch.iter().enumerate() {
        if stored.iter().chain(&batch[..i]).any(|r| r.value_eq(record)) {
            return Err(DaoError::RecordAlreadyExists);
        }
        if schema.identifier().is_some() {
            let id = schema.identifier_of(record)?;
            if seen_ids.iter().any(|seen| seen.same_text(&id)) {
                return Err(DaoError::identifier_conflict(id));
            }
            seen_ids.push(id);
        }
    }
    Ok(())
}

/// Checks an update against stored records.
///
/// A changed identifier must be free before anything else is looked at.
/// Returns false when `old` is not stored.
pub(crate) fn check_update<R: Record>(
    schema: &RecordSchema<R>,
    stored: &[R],
    old: &R,
    new: &R,
) -> DaoResult<bool> {
    if schema.records_equal(old, new) {
        return Err(DaoError::NoOpUpdate);
    }
    if schema.identifier().is_some() {
        let new_id = schema.identifier_of(new)?;
        if !schema.identifier_of(old)?.same_text(&new_id) {
            for record in stored {
                if schema.identifier_of(record)?.same_text(&new_id) {
                    return Err(DaoError::identifier_conflict(new_id));
                }
            }
        }
    }
    if !stored.iter().any(|r| r.value_eq(old)) {
        return Ok(false);
    }
    if stored.iter().any(|r| r.value_eq(new)) {
        return Err(DaoError::RecordAlreadyExists);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::CallbackDao;
    use crate::comparator::Sense;
    use crate::config::DaoConfig;
    use crate::impl_record;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct City {
        id: i64,
        name: String,
        size: i64,
    }

    impl_record!(City { id: i64, name: String, size: i64 });

    fn city(id: i64, name: &str, size: i64) -> City {
        City {
            id,
            name: name.into(),
            size,
        }
    }

    fn dao(initial: Vec<City>) -> CallbackDao<City> {
        dao_with(&DaoConfig::new().identifier("id"), initial)
    }

    fn dao_with(config: &DaoConfig, initial: Vec<City>) -> CallbackDao<City> {
        let store = Rc::new(RefCell::new(initial));
        let (read, add, remove) = (store.clone(), store.clone(), store);
        CallbackDao::new(
            config,
            move || Ok(read.borrow().clone()),
            move |batch: &[City]| {
                add.borrow_mut().extend_from_slice(batch);
                Ok(batch.len())
            },
            move |batch: &[City]| {
                let mut store = remove.borrow_mut();
                let before = store.len();
                store.retain(|c| !batch.contains(c));
                Ok(before - store.len())
            },
        )
        .unwrap()
    }

    fn sample() -> CallbackDao<City> {
        dao(vec![city(1, "Oslo", 700), city(2, "Bergen", 285), city(3, "Bodo", 52)])
    }

    #[test]
    fn select_by_property_and_pattern() {
        let d = sample();
        assert_eq!(d.get_by_property("size", &Value::Integer(52)).unwrap().len(), 1);
        assert_eq!(d.get_by_pattern("name", "B.*").unwrap().len(), 2);
        assert_eq!(d.get_by_pattern("name", "B").unwrap().len(), 0);
        assert!(matches!(
            d.get_by_pattern("name", "("),
            Err(DaoError::InvalidPattern(_))
        ));
    }

    #[test]
    fn ordered_reads() {
        let d = sample();
        let by_name = d
            .get_all_order_by(&PropertyComparator::new("name", Sense::Asc))
            .unwrap();
        let names: Vec<_> = by_name.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Bergen", "Bodo", "Oslo"]);

        let b = d
            .get_by_pattern_order_by("name", "B.*", &PropertyComparator::new("size", Sense::Desc))
            .unwrap();
        assert_eq!(b[0].name, "Bodo");

        assert!(matches!(
            d.get_all_order_by(&PropertyComparator::new("nope", Sense::Asc)),
            Err(DaoError::InvalidPropertyName { .. })
        ));
    }

    #[test]
    fn delete_where_counts() {
        let mut d = sample();
        assert_eq!(d.delete_where(&|c: &City| c.size < 300).unwrap(), 2);
        assert_eq!(d.get_all().unwrap().len(), 1);
        assert_eq!(d.delete_where(&|_: &City| false).unwrap(), 0);
    }

    #[test]
    fn set_changes_only_named_property() {
        let mut d = sample();
        let n = d
            .set(&["size"], &[Value::Integer(1)], &|c: &City| c.name.starts_with('B'))
            .unwrap();
        assert_eq!(n, 2);
        let bergen = d.get_by_id(&Value::Integer(2)).unwrap().unwrap();
        assert_eq!(bergen, city(2, "Bergen", 1));
        assert_eq!(d.get_by_id(&Value::Integer(1)).unwrap().unwrap().size, 700);
    }

    #[test]
    fn set_rejects_every_field() {
        let mut d = sample();
        let err = d
            .set(
                &["id", "name", "size"],
                &[Value::Integer(9), Value::from("X"), Value::Integer(0)],
                &|_: &City| true,
            )
            .unwrap_err();
        assert!(matches!(err, DaoError::TooManyProperties { given: 3, declared: 3 }));
        assert!(matches!(
            d.set(&["size"], &[], &|_: &City| true),
            Err(DaoError::ArityMismatch { .. })
        ));
    }

    #[test]
    fn update_checks() {
        let mut d = sample();
        let oslo = city(1, "Oslo", 700);
        assert!(matches!(d.update(&oslo, &oslo.clone()), Err(DaoError::NoOpUpdate)));
        assert!(!d.update(&city(9, "Nowhere", 0), &city(9, "Somewhere", 0)).unwrap());
        // A taken identifier is reported even when the old record is absent
        assert!(matches!(
            d.update(&city(9, "Nowhere", 0), &city(2, "Nowhere", 0)),
            Err(DaoError::IdentifierConflict { .. })
        ));
        assert!(matches!(
            d.update(&oslo, &city(2, "Bergen", 285)),
            Err(DaoError::IdentifierConflict { .. })
        ));
        assert!(matches!(
            d.update(&oslo, &city(2, "Oslo", 700)),
            Err(DaoError::IdentifierConflict { .. })
        ));
        assert!(d.update(&oslo, &city(1, "Oslo", 710)).unwrap());
        assert!(d.find(&city(1, "Oslo", 710)).unwrap());
    }

    #[test]
    fn update_without_identifier_refuses_duplicates() {
        let mut d = dao_with(
            &DaoConfig::new(),
            vec![city(1, "Oslo", 700), city(2, "Bergen", 285)],
        );
        assert!(matches!(
            d.update(&city(1, "Oslo", 700), &city(2, "Bergen", 285)),
            Err(DaoError::RecordAlreadyExists)
        ));
        assert!(!d.update(&city(5, "X", 1), &city(2, "Bergen", 285)).unwrap());
    }

    #[test]
    fn update_property_replaces_old_value() {
        let mut d = dao(vec![city(1, "A", 5), city(2, "B", 5), city(3, "C", 6)]);
        let n = d
            .update_property("size", &Value::Integer(5), &Value::Integer(8))
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(d.get_by_property("size", &Value::Integer(8)).unwrap().len(), 2);
        assert!(d.get_by_property("size", &Value::Integer(5)).unwrap().is_empty());
    }

    #[test]
    fn identifier_operations() {
        let mut d = sample();
        let ids = d.get_ids().unwrap();
        assert_eq!(ids.to_string(), "[1, 2, 3]");
        assert!(d.update_property_by_id(&Value::Integer(3), "name", &Value::from("Bod")).unwrap());
        assert_eq!(d.get_by_id(&Value::Integer(3)).unwrap().unwrap().name, "Bod");
        assert!(d.update_by_id(&Value::Integer(2), &city(2, "Bergen", 290)).unwrap());
        assert!(!d.update_by_id(&Value::Integer(7), &city(7, "X", 1)).unwrap());
        assert!(d.delete_by_id(&Value::Integer(1)).unwrap());
        assert!(!d.delete_by_id(&Value::Integer(1)).unwrap());
        assert_eq!(d.get_property("name").unwrap().to_string(), "[Bod, Bergen]");
    }

    #[test]
    fn duplicate_identifiers_in_storage() {
        let d = dao(vec![city(1, "A", 1), city(1, "B", 2)]);
        assert!(matches!(d.get_ids(), Err(DaoError::DuplicateIdentifier { .. })));
        assert!(matches!(
            d.get_by_id(&Value::Integer(1)),
            Err(DaoError::DuplicateIdentifier { .. })
        ));
    }

    #[test]
    fn check_insert_sees_batch_members() {
        let schema = RecordSchema::<City>::resolve(&DaoConfig::new().identifier("id")).unwrap();
        let stored = [city(1, "A", 1)];
        assert!(check_insert(&schema, &stored, &[city(2, "B", 1)]).is_ok());
        assert!(matches!(
            check_insert(&schema, &stored, &[city(2, "B", 1), city(2, "C", 1)]),
            Err(DaoError::IdentifierConflict { .. })
        ));
        assert!(matches!(
            check_insert(&schema, &stored, &[city(1, "A", 1)]),
            Err(DaoError::RecordAlreadyExists)
        ));
    }
}
