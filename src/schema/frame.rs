use crate::error::{ProcessingError, Result};
use crate::readers::RawBatch;
use crate::schema::mapping::EntitySchema;
use csv::StringRecord;
use std::collections::HashMap;
use tracing::debug;

/// A raw batch viewed through an entity's rename table.
///
/// Renaming and dropping never copy cell data: the frame only records which
/// raw column index backs each canonical column. Several frames (one per
/// entity projection) can share the same raw batch.
#[derive(Debug)]
pub struct Frame<'a> {
    schema: EntitySchema,
    batch: &'a RawBatch,
    columns: HashMap<&'static str, usize>,
}

impl<'a> Frame<'a> {
    /// Apply `schema` to `batch`: rename mapped columns, discard the drop list
    /// and fail if any mapped raw column is absent.
    pub fn conform(schema: EntitySchema, batch: &'a RawBatch) -> Result<Self> {
        let headers: Vec<&str> = batch.headers.iter().map(clean_header).collect();
        let dropped = schema.drop_list(headers.iter().copied());

        let mut columns = HashMap::with_capacity(schema.renames.len());
        for (raw, canonical) in schema.renames {
            let index = headers.iter().position(|h| h == raw).ok_or_else(|| {
                ProcessingError::MissingColumn {
                    entity: schema.entity.to_string(),
                    column: raw.to_string(),
                    source_name: batch.source_name(),
                }
            })?;
            columns.insert(*canonical, index);
        }

        let ignored: Vec<&str> = headers
            .iter()
            .copied()
            .filter(|h| schema.canonical(h).is_none() && !dropped.iter().any(|d| d.as_str() == *h))
            .collect();
        if !ignored.is_empty() {
            debug!(
                entity = %schema.entity,
                source = %batch.source.display(),
                ?ignored,
                "Ignoring columns that are neither mapped nor dropped"
            );
        }

        Ok(Self {
            schema,
            batch,
            columns,
        })
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    pub fn has_column(&self, canonical: &str) -> bool {
        self.columns.contains_key(canonical)
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        self.batch.records.iter().map(move |record| Row {
            columns: &self.columns,
            record,
        })
    }
}

/// One record addressed by canonical column name.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a HashMap<&'static str, usize>,
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    /// Trimmed cell value; empty cells and unmapped columns are `None`.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.columns
            .get(column)
            .and_then(|&index| self.record.get(index))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Cell value that must be present.
    pub fn required(&self, column: &str) -> Result<&'a str> {
        self.get(column)
            .ok_or_else(|| ProcessingError::field_parse(column, "", "a non-empty value"))
    }
}

fn clean_header(header: &str) -> &str {
    header.trim().trim_start_matches('\u{feff}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::mapping::Entity;
    use std::path::PathBuf;

    fn batch(headers: &[&str], rows: &[&[&str]]) -> RawBatch {
        RawBatch {
            source: PathBuf::from("test.csv"),
            index: 0,
            headers: StringRecord::from(headers.to_vec()),
            records: rows.iter().map(|r| StringRecord::from(r.to_vec())).collect(),
        }
    }

    #[test]
    fn test_conform_renames_columns() -> Result<()> {
        let raw = batch(
            &["BETREIBER_ID", "BETREIBER_ABK", "BETREIBER_NAME", "BPUIC"],
            &[&["85:11", "SBB", "Schweizerische Bundesbahnen SBB", "8503000"]],
        );
        let frame = Frame::conform(EntitySchema::for_entity(Entity::TransportOperator), &raw)?;

        let row = frame.rows().next().unwrap();
        assert_eq!(row.get("betreiberid"), Some("85:11"));
        assert_eq!(row.get("betreibername"), Some("Schweizerische Bundesbahnen SBB"));
        assert!(!frame.has_column("bpuic"));
        assert_eq!(row.get("bpuic"), None);
        Ok(())
    }

    #[test]
    fn test_missing_raw_column_is_a_schema_error() {
        let raw = batch(&["BETREIBER_ID", "BETREIBER_ABK"], &[]);
        let err = Frame::conform(EntitySchema::for_entity(Entity::TransportOperator), &raw).unwrap_err();

        match err {
            ProcessingError::MissingColumn { column, .. } => assert_eq!(column, "BETREIBER_NAME"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_cells_are_none() -> Result<()> {
        let raw = batch(
            &["TU_CODE", "TU_BEZEICHNUNG", "TU_ABKUERZUNG"],
            &[&["11", "  ", "SBB"]],
        );
        let frame = Frame::conform(EntitySchema::for_entity(Entity::TransportUndertaking), &raw)?;
        let row = frame.rows().next().unwrap();

        assert_eq!(row.get("tu_bezeichnung"), None);
        assert!(row.required("tu_bezeichnung").is_err());
        assert_eq!(row.required("tu_code")?, "11");
        Ok(())
    }

    #[test]
    fn test_bom_prefixed_header_matches() -> Result<()> {
        let raw = batch(
            &["\u{feff}TU_CODE", "TU_BEZEICHNUNG", "TU_ABKUERZUNG"],
            &[&["11", "SBB", "SBB"]],
        );
        let frame = Frame::conform(EntitySchema::for_entity(Entity::TransportUndertaking), &raw)?;
        assert_eq!(frame.len(), 1);
        Ok(())
    }
}
