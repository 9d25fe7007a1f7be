//! Closure-backed DAO.

use crate::config::DaoConfig;
use crate::dao::{check_insert, Dao};
use crate::error::{DaoError, DaoResult};
use crate::record::Record;
use crate::result_set::ResultSet;
use crate::schema::RecordSchema;

type Retriever<R> = Box<dyn Fn() -> DaoResult<Vec<R>>>;
type Writer<R> = Box<dyn FnMut(&[R]) -> DaoResult<usize>>;

/// A DAO whose storage is three caller-supplied closures.
///
/// The retriever lists stored records, the persister stores a batch and
/// the remover removes one. Every other operation uses the provided
/// compositions of [`Dao`]. Insert checks run before the persister sees a
/// batch, and the remover only receives records that are stored.
pub struct CallbackDao<R: Record> {
    schema: RecordSchema<R>,
    retriever: Retriever<R>,
    persister: Writer<R>,
    remover: Writer<R>,
}

impl<R: Record> CallbackDao<R> {
    /// Creates a DAO from its three primitives.
    pub fn new(
        config: &DaoConfig,
        retriever: impl Fn() -> DaoResult<Vec<R>> + 'static,
        persister: impl FnMut(&[R]) -> DaoResult<usize> + 'static,
        remover: impl FnMut(&[R]) -> DaoResult<usize> + 'static,
    ) -> DaoResult<Self> {
        Ok(Self {
            schema: RecordSchema::resolve(config)?,
            retriever: Box::new(retriever),
            persister: Box::new(persister),
            remover: Box::new(remover),
        })
    }
}

impl<R: Record> std::fmt::Debug for CallbackDao<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackDao")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl<R: Record> Dao<R> for CallbackDao<R> {
    fn schema(&self) -> &RecordSchema<R> {
        &self.schema
    }

    fn get_all(&self) -> DaoResult<ResultSet<R>> {
        ResultSet::try_unique((self.retriever)()?, |_| DaoError::DuplicateRecord)
    }

    fn add_all(&mut self, records: &[R]) -> DaoResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let stored = self.get_all()?;
        check_insert(&self.schema, &stored, records)?;
        let written = (self.persister)(records)?;
        tracing::debug!(type_name = R::TYPE_NAME, written, "persisted records");
        Ok(written)
    }

    fn delete_all(&mut self, records: &[R]) -> DaoResult<usize> {
        let stored = self.get_all()?;
        let present: Vec<R> = records
            .iter()
            .filter(|r| stored.contains(r))
            .cloned()
            .collect();
        if present.is_empty() {
            return Ok(0);
        }
        let removed = (self.remover)(&present)?;
        tracing::debug!(type_name = R::TYPE_NAME, removed, "removed records");
        Ok(removed)
    }
}
