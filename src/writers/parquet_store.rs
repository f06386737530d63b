use crate::error::{ProcessingError, Result};
use crate::schema::Entity;
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE,
};
use crate::writers::relation::column;
use crate::writers::store::{check_schema, project_columns, Store};
use arrow::array::{Array, Int64Array};
use arrow::compute;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::{ArrowWriter, ProjectionMask};
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::statistics::Statistics;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

const PART_PREFIX: &str = "part-";
const PART_EXTENSION: &str = "parquet";

/// Stores each relation as a directory of Parquet part files, one part per
/// appended batch:
///
/// ```text
/// <root>/transportevent/part-00000.parquet
/// <root>/transportevent/part-00001.parquet
/// ```
///
/// Parts are written under a temporary name and renamed into place, so a
/// failed append leaves no partial part behind.
pub struct ParquetStore {
    root: PathBuf,
    compression: Compression,
    row_group_size: usize,
}

impl ParquetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn relation_dir(&self, entity: Entity) -> PathBuf {
        self.root.join(entity.table_name())
    }

    /// Part files of a relation in append order.
    pub fn parts(&self, entity: Entity) -> Result<Vec<PathBuf>> {
        let dir = self.relation_dir(entity);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut parts = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if let Some(index) = part_index(&path) {
                parts.push((index, path));
            }
        }
        parts.sort();
        Ok(parts.into_iter().map(|(_, path)| path).collect())
    }

    /// Storage statistics for one relation, read from Parquet footers only.
    pub fn relation_info(&self, entity: Entity) -> Result<RelationInfo> {
        let mut info = RelationInfo {
            relation: entity.table_name().to_string(),
            parts: 0,
            total_rows: 0,
            row_groups: 0,
            size_bytes: 0,
            compression: self.compression,
        };

        for part in self.parts(entity)? {
            let reader = SerializedFileReader::new(File::open(&part)?)?;
            let metadata = reader.metadata();
            info.parts += 1;
            info.total_rows += metadata.file_metadata().num_rows();
            info.row_groups += metadata.num_row_groups();
            info.size_bytes += fs::metadata(&part)?.len();
        }

        Ok(info)
    }

    fn read_part(path: &Path) -> Result<Vec<RecordBatch>> {
        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?.build()?;
        let mut batches = Vec::new();
        for batch in reader {
            batches.push(batch?);
        }
        Ok(batches)
    }

    fn stored_schema(path: &Path) -> Result<SchemaRef> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
        Ok(builder.schema().clone())
    }

    /// Decode only the leaf columns named in `columns` from one part.
    fn read_part_columns(
        entity: Entity,
        path: &Path,
        columns: &[&str],
        visit: &mut dyn FnMut(RecordBatch) -> Result<()>,
    ) -> Result<()> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
        let descriptor = builder.parquet_schema();
        let leaves = columns
            .iter()
            .map(|name| {
                descriptor
                    .columns()
                    .iter()
                    .position(|c| c.name() == *name)
                    .ok_or_else(|| missing_column(entity, name))
            })
            .collect::<Result<Vec<_>>>()?;
        let mask = ProjectionMask::leaves(descriptor, leaves);

        for batch in builder.with_projection(mask).build()? {
            visit(project_columns(entity, &batch?, columns)?)?;
        }
        Ok(())
    }

    /// Largest value of an INT64 column in one part, taken from the footer
    /// statistics. Falls back to reading the column when a row group has none.
    fn part_max(entity: Entity, path: &Path, name: &str) -> Result<Option<i64>> {
        let reader = SerializedFileReader::new(File::open(path)?)?;
        let metadata = reader.metadata();
        let position = metadata
            .file_metadata()
            .schema_descr()
            .columns()
            .iter()
            .position(|c| c.name() == name)
            .ok_or_else(|| missing_column(entity, name))?;

        let mut max = None;
        for row_group in metadata.row_groups() {
            if row_group.num_rows() == 0 {
                continue;
            }
            match row_group.column(position).statistics() {
                // All-null row groups carry no max.
                Some(Statistics::Int64(stats)) => max = max.max(stats.max_opt().copied()),
                Some(_) => {
                    return Err(ProcessingError::RelationSchema {
                        relation: entity.table_name().to_string(),
                        details: format!("column '{}' is not a 64-bit integer", name),
                    })
                }
                None => {
                    debug!(relation = %entity, part = %path.display(), "No column statistics, reading values");
                    return Self::scanned_max(entity, path, name);
                }
            }
        }
        Ok(max)
    }

    fn scanned_max(entity: Entity, path: &Path, name: &str) -> Result<Option<i64>> {
        let mut max = None;
        Self::read_part_columns(entity, path, &[name], &mut |batch| {
            let array = column::<Int64Array>(&batch, entity, name)?;
            if array.null_count() < array.len() {
                max = max.max(compute::max(array));
            }
            Ok(())
        })?;
        Ok(max)
    }
}

fn missing_column(entity: Entity, name: &str) -> ProcessingError {
    ProcessingError::RelationSchema {
        relation: entity.table_name().to_string(),
        details: format!("missing column '{}'", name),
    }
}

/// Numeric index of a `part-N.parquet` file name.
fn part_index(path: &Path) -> Option<u64> {
    if path.extension()? != PART_EXTENSION {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix(PART_PREFIX)?
        .parse()
        .ok()
}

impl Store for ParquetStore {
    fn append(&mut self, entity: Entity, batch: RecordBatch) -> Result<()> {
        let dir = self.relation_dir(entity);
        fs::create_dir_all(&dir)?;

        let parts = self.parts(entity)?;
        if let Some(first) = parts.first() {
            let stored = Self::stored_schema(first)?;
            check_schema(entity, &stored, &batch.schema())?;
        }

        let next = parts.last().and_then(|p| part_index(p)).map_or(0, |i| i + 1);
        let name = format!("{}{:05}.{}", PART_PREFIX, next, PART_EXTENSION);
        let staging = dir.join(format!(".{}.tmp", name));
        let target = dir.join(&name);

        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let file = File::create(&staging)?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer.write(&batch)?;
        writer.close()?;
        fs::rename(&staging, &target)?;

        debug!(
            relation = %entity,
            part = %name,
            rows = batch.num_rows(),
            "Appended batch"
        );
        Ok(())
    }

    fn scan(&self, entity: Entity) -> Result<Vec<RecordBatch>> {
        let mut batches = Vec::new();
        for part in self.parts(entity)? {
            batches.extend(Self::read_part(&part)?);
        }
        Ok(batches)
    }

    fn scan_columns(
        &self,
        entity: Entity,
        columns: &[&str],
        visit: &mut dyn FnMut(RecordBatch) -> Result<()>,
    ) -> Result<()> {
        for part in self.parts(entity)? {
            Self::read_part_columns(entity, &part, columns, visit)?;
        }
        Ok(())
    }

    fn max_i64(&self, entity: Entity, name: &str) -> Result<Option<i64>> {
        let mut max = None;
        for part in self.parts(entity)? {
            max = max.max(Self::part_max(entity, &part, name)?);
        }
        Ok(max)
    }

    fn row_count(&self, entity: Entity) -> Result<usize> {
        Ok(self.relation_info(entity)?.total_rows as usize)
    }
}

/// Footer-level statistics for a stored relation.
#[derive(Debug)]
pub struct RelationInfo {
    pub relation: String,
    pub parts: usize,
    pub total_rows: i64,
    pub row_groups: usize,
    pub size_bytes: u64,
    pub compression: Compression,
}

impl RelationInfo {
    pub fn summary(&self) -> String {
        format!(
            "{:<22} {:>12} rows  {:>5} parts  {:>5} row groups  {:>9.2} MB",
            self.relation,
            self.total_rows,
            self.parts,
            self.row_groups,
            self.size_bytes as f64 / 1_048_576.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TransportEventInfo, TransportOperator};
    use crate::writers::relation::Relation;
    use crate::writers::store::{append_rows, distinct_strings, load_rows};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn operator(id: &str, name: Option<&str>) -> TransportOperator {
        TransportOperator {
            operator_id: id.to_string(),
            abbreviation: None,
            name: name.map(str::to_string),
        }
    }

    #[test]
    fn test_scan_of_missing_relation_is_empty() -> Result<()> {
        let dir = TempDir::new()?;
        let store = ParquetStore::new(dir.path());

        assert!(store.scan(Entity::TransportEvent)?.is_empty());
        assert_eq!(store.row_count(Entity::TransportEvent)?, 0);
        Ok(())
    }

    #[test]
    fn test_each_append_writes_one_part() -> Result<()> {
        let dir = TempDir::new()?;
        let mut store = ParquetStore::new(dir.path());

        append_rows(&mut store, &[operator("80", Some("DB")), operator("11", None)])?;
        append_rows(&mut store, &[operator("33", Some("SBB GmbH"))])?;

        let parts = store.parts(Entity::TransportOperator)?;
        assert_eq!(parts.len(), 2);
        assert!(parts[0].ends_with("transportoperator/part-00000.parquet"));

        let loaded: Vec<TransportOperator> = load_rows(&store)?;
        assert_eq!(
            loaded,
            vec![operator("80", Some("DB")), operator("11", None), operator("33", Some("SBB GmbH"))]
        );
        assert_eq!(store.row_count(Entity::TransportOperator)?, 3);
        Ok(())
    }

    #[test]
    fn test_timestamps_survive_round_trip() -> Result<()> {
        let dir = TempDir::new()?;
        let mut store = ParquetStore::new(dir.path()).with_compression("zstd")?;
        let predicted = NaiveDate::from_ymd_opt(2024, 11, 3)
            .unwrap()
            .and_hms_opt(23, 59, 58)
            .unwrap();
        let info = TransportEventInfo {
            tid: 7,
            arrival_prediction: Some(predicted),
            additional_trip: Some(true),
            ..Default::default()
        };

        append_rows(&mut store, &[info.clone()])?;

        let loaded: Vec<TransportEventInfo> = load_rows(&store)?;
        assert_eq!(loaded, vec![info]);
        assert_eq!(store.max_i64(Entity::TransportEventInfo, "tid")?, Some(7));
        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        for compression in ["snappy", "gzip", "lz4", "zstd", "none"] {
            let dir = TempDir::new()?;
            let mut store = ParquetStore::new(dir.path()).with_compression(compression)?;
            let result = append_rows(&mut store, &[operator("80", None)]);
            assert!(result.is_ok(), "Failed with compression: {}", compression);
        }

        assert!(ParquetStore::new("unused").with_compression("brotli9000").is_err());
        Ok(())
    }

    #[test]
    fn test_schema_mismatch_is_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let mut store = ParquetStore::new(dir.path());
        append_rows(&mut store, &[operator("80", None)])?;

        let narrowed = TransportOperator::to_batch(&[operator("11", None)])?.project(&[0, 1])?;
        let result = store.append(Entity::TransportOperator, narrowed);

        assert!(matches!(result, Err(ProcessingError::RelationSchema { .. })));
        assert_eq!(store.parts(Entity::TransportOperator)?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_relation_info() -> Result<()> {
        let dir = TempDir::new()?;
        let mut store = ParquetStore::new(dir.path());
        append_rows(&mut store, &[operator("80", None), operator("11", None)])?;

        let info = store.relation_info(Entity::TransportOperator)?;
        assert_eq!(info.parts, 1);
        assert_eq!(info.total_rows, 2);
        assert!(info.summary().starts_with("transportoperator"));
        Ok(())
    }

    #[test]
    fn test_max_comes_from_every_part() -> Result<()> {
        let dir = TempDir::new()?;
        let mut store = ParquetStore::new(dir.path()).with_row_group_size(2);
        let info = |tid| TransportEventInfo {
            tid,
            ..Default::default()
        };

        assert_eq!(store.max_i64(Entity::TransportEventInfo, "tid")?, None);
        append_rows(&mut store, &[info(3), info(41), info(7)])?;
        append_rows(&mut store, &[info(12)])?;

        assert_eq!(store.max_i64(Entity::TransportEventInfo, "tid")?, Some(41));
        for part in store.parts(Entity::TransportEventInfo)? {
            assert_eq!(
                ParquetStore::part_max(Entity::TransportEventInfo, &part, "tid")?,
                ParquetStore::scanned_max(Entity::TransportEventInfo, &part, "tid")?
            );
        }
        assert!(store.max_i64(Entity::TransportEventInfo, "nope").is_err());
        Ok(())
    }

    #[test]
    fn test_scan_columns_reads_only_the_projection() -> Result<()> {
        let dir = TempDir::new()?;
        let mut store = ParquetStore::new(dir.path());
        append_rows(&mut store, &[operator("80", Some("DB")), operator("11", None)])?;
        append_rows(&mut store, &[operator("80", Some("DB"))])?;

        let mut widths = Vec::new();
        store.scan_columns(Entity::TransportOperator, &["betreiberid"], &mut |batch| {
            widths.push(batch.num_columns());
            Ok(())
        })?;
        assert_eq!(widths, vec![1, 1]);

        let ids = distinct_strings(&store, Entity::TransportOperator, "betreiberid")?;
        assert_eq!(ids.len(), 2);
        Ok(())
    }

    #[test]
    fn test_parts_are_ordered_numerically() -> Result<()> {
        let dir = TempDir::new()?;
        let store = ParquetStore::new(dir.path());
        let relation = store.relation_dir(Entity::TransportEvent);
        fs::create_dir_all(&relation)?;
        for name in ["part-100000.parquet", "part-99999.parquet", "part-00002.parquet", "notes.txt"] {
            File::create(relation.join(name))?;
        }

        let names: Vec<String> = store
            .parts(Entity::TransportEvent)?
            .iter()
            .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
            .collect();

        assert_eq!(names, vec!["part-00002.parquet", "part-99999.parquet", "part-100000.parquet"]);
        Ok(())
    }
}
