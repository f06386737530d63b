//! Append-only destination for normalized relations.

use crate::error::{ProcessingError, Result};
use crate::schema::Entity;
use crate::writers::relation::{column, Relation};
use arrow::array::{Array, Int64Array, StringArray};
use arrow::compute;
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use std::collections::{HashMap, HashSet};

/// A destination that relations are appended to and read back from.
///
/// Stores are single-writer. Appends never check uniqueness; callers dedup and
/// filter before writing.
pub trait Store {
    /// Append one batch, creating the relation on first use.
    fn append(&mut self, entity: Entity, batch: RecordBatch) -> Result<()>;

    /// Every batch of a relation in append order. Unknown relations are empty.
    fn scan(&self, entity: Entity) -> Result<Vec<RecordBatch>>;

    /// Hand `visit` each batch of a relation in append order, narrowed to
    /// `columns`. Stores that read from disk decode only those columns, one
    /// batch at a time.
    fn scan_columns(
        &self,
        entity: Entity,
        columns: &[&str],
        visit: &mut dyn FnMut(RecordBatch) -> Result<()>,
    ) -> Result<()> {
        for batch in self.scan(entity)? {
            visit(project_columns(entity, &batch, columns)?)?;
        }
        Ok(())
    }

    /// Largest value of an integer column, `None` if the relation is empty or
    /// the column is all null.
    fn max_i64(&self, entity: Entity, name: &str) -> Result<Option<i64>> {
        let mut max = None;
        self.scan_columns(entity, &[name], &mut |batch| {
            let array = column::<Int64Array>(&batch, entity, name)?;
            if array.null_count() < array.len() {
                max = max.max(compute::max(array));
            }
            Ok(())
        })?;
        Ok(max)
    }

    fn row_count(&self, entity: Entity) -> Result<usize> {
        Ok(self.scan(entity)?.iter().map(RecordBatch::num_rows).sum())
    }
}

/// Keeps every relation in memory. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    relations: HashMap<Entity, Vec<RecordBatch>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn append(&mut self, entity: Entity, batch: RecordBatch) -> Result<()> {
        let batches = self.relations.entry(entity).or_default();
        if let Some(first) = batches.first() {
            check_schema(entity, &first.schema(), &batch.schema())?;
        }
        batches.push(batch);
        Ok(())
    }

    fn scan(&self, entity: Entity) -> Result<Vec<RecordBatch>> {
        Ok(self.relations.get(&entity).cloned().unwrap_or_default())
    }

    fn scan_columns(
        &self,
        entity: Entity,
        columns: &[&str],
        visit: &mut dyn FnMut(RecordBatch) -> Result<()>,
    ) -> Result<()> {
        for batch in self.relations.get(&entity).into_iter().flatten() {
            visit(project_columns(entity, batch, columns)?)?;
        }
        Ok(())
    }

    fn row_count(&self, entity: Entity) -> Result<usize> {
        Ok(self
            .relations
            .get(&entity)
            .map_or(0, |batches| batches.iter().map(RecordBatch::num_rows).sum()))
    }
}

/// Narrow `batch` to the named columns, in the order given.
pub(crate) fn project_columns(entity: Entity, batch: &RecordBatch, columns: &[&str]) -> Result<RecordBatch> {
    let schema = batch.schema();
    let indices = columns
        .iter()
        .map(|name| {
            schema.index_of(name).map_err(|_| ProcessingError::RelationSchema {
                relation: entity.table_name().to_string(),
                details: format!("missing column '{}'", name),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(batch.project(&indices)?)
}

/// Column names and types must match; nullability and metadata are ignored.
pub(crate) fn check_schema(entity: Entity, existing: &Schema, incoming: &Schema) -> Result<()> {
    let same = existing.fields().len() == incoming.fields().len()
        && existing
            .fields()
            .iter()
            .zip(incoming.fields().iter())
            .all(|(a, b)| a.name() == b.name() && a.data_type() == b.data_type());
    if !same {
        return Err(ProcessingError::RelationSchema {
            relation: entity.table_name().to_string(),
            details: "appended batch does not match the stored schema".to_string(),
        });
    }
    Ok(())
}

/// Convert `rows` and append them. Empty input writes nothing.
pub fn append_rows<R: Relation, S: Store + ?Sized>(store: &mut S, rows: &[R]) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }
    store.append(R::ENTITY, R::to_batch(rows)?)?;
    Ok(rows.len())
}

/// Read a whole relation back as typed rows.
pub fn load_rows<R: Relation, S: Store + ?Sized>(store: &S) -> Result<Vec<R>> {
    let mut rows = Vec::new();
    for batch in store.scan(R::ENTITY)? {
        rows.extend(R::from_batch(&batch)?);
    }
    Ok(rows)
}

/// Distinct non-null values of a text column.
pub fn distinct_strings<S: Store + ?Sized>(store: &S, entity: Entity, name: &str) -> Result<HashSet<String>> {
    let mut values = HashSet::new();
    store.scan_columns(entity, &[name], &mut |batch| {
        let array = column::<StringArray>(&batch, entity, name)?;
        values.extend(array.iter().flatten().map(str::to_string));
        Ok(())
    })?;
    Ok(values)
}

/// Distinct non-null values of an integer column.
pub fn distinct_i64<S: Store + ?Sized>(store: &S, entity: Entity, name: &str) -> Result<HashSet<i64>> {
    let mut values = HashSet::new();
    store.scan_columns(entity, &[name], &mut |batch| {
        let array = column::<Int64Array>(&batch, entity, name)?;
        values.extend(array.iter().flatten());
        Ok(())
    })?;
    Ok(values)
}
