use crate::error::{ProcessingError, Result};
use crate::readers::decoding::{resolve_encoding, DecodingReader};
use crate::utils::constants::DEFAULT_BUFFER_SIZE;
use csv::{ReaderBuilder, StringRecord};
use encoding_rs::{Encoding, UTF_8};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One bounded slice of a delimited source file.
#[derive(Debug, Clone)]
pub struct RawBatch {
    pub source: PathBuf,
    /// Zero-based position of this batch within its file.
    pub index: usize,
    pub headers: StringRecord,
    pub records: Vec<StringRecord>,
}

impl RawBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn source_name(&self) -> String {
        self.source.display().to_string()
    }
}

/// Reads delimited files as a sequence of row batches.
///
/// With a batch bound the file is consumed lazily, `batch_rows` records at a
/// time; without one the whole file becomes a single batch.
#[derive(Debug, Clone)]
pub struct ChunkedReader {
    delimiter: u8,
    encoding: &'static Encoding,
    batch_rows: Option<usize>,
}

impl ChunkedReader {
    pub fn new(delimiter: u8) -> Self {
        Self {
            delimiter,
            encoding: UTF_8,
            batch_rows: None,
        }
    }

    pub fn with_encoding(mut self, label: &str) -> Result<Self> {
        self.encoding =
            resolve_encoding(label).ok_or_else(|| ProcessingError::UnknownEncoding(label.to_string()))?;
        Ok(self)
    }

    /// Bound each batch to `rows` records. `None` or zero reads the file in one shot.
    pub fn with_batch_rows(mut self, rows: Option<usize>) -> Self {
        self.batch_rows = rows.filter(|&r| r > 0);
        self
    }

    /// Open `path` and return a lazy iterator over its batches.
    pub fn open(&self, path: &Path) -> Result<BatchIter> {
        let file = File::open(path)?;
        let buffered = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file);
        let source: Box<dyn Read> = if self.encoding == UTF_8 {
            Box::new(buffered)
        } else {
            Box::new(DecodingReader::new(buffered, self.encoding))
        };

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(false)
            .from_reader(source);

        let mut headers = reader
            .headers()
            .map_err(|e| self.classify(e, path))?
            .clone();
        headers.trim();

        debug!(
            path = %path.display(),
            columns = headers.len(),
            encoding = self.encoding.name(),
            "Opened delimited source"
        );

        Ok(BatchIter {
            reader,
            headers,
            batch_rows: self.batch_rows,
            source: path.to_path_buf(),
            encoding: self.encoding,
            next_index: 0,
            done: false,
        })
    }

    /// Read the whole file as a single batch.
    pub fn read_all(&self, path: &Path) -> Result<RawBatch> {
        let single_shot = Self {
            batch_rows: None,
            ..self.clone()
        };
        single_shot.open(path)?.next().unwrap_or_else(|| {
            Err(ProcessingError::InvalidFormat(format!(
                "No data read from {}",
                path.display()
            )))
        })
    }

    fn classify(&self, error: csv::Error, path: &Path) -> ProcessingError {
        classify_csv_error(error, self.encoding, path)
    }
}

fn classify_csv_error(error: csv::Error, encoding: &'static Encoding, path: &Path) -> ProcessingError {
    let invalid_text = match error.kind() {
        csv::ErrorKind::Utf8 { .. } => true,
        csv::ErrorKind::Io(io) => io.kind() == std::io::ErrorKind::InvalidData,
        _ => false,
    };

    if invalid_text {
        ProcessingError::Encoding {
            encoding: encoding.name().to_string(),
            path: path.display().to_string(),
        }
    } else {
        ProcessingError::Csv(error)
    }
}

/// Lazy, finite, non-restartable sequence of batches from one file.
pub struct BatchIter {
    reader: csv::Reader<Box<dyn Read>>,
    headers: StringRecord,
    batch_rows: Option<usize>,
    source: PathBuf,
    encoding: &'static Encoding,
    next_index: usize,
    done: bool,
}

impl BatchIter {
    fn read_batch(&mut self) -> Result<Vec<StringRecord>> {
        let limit = self.batch_rows.unwrap_or(usize::MAX);
        let mut records = Vec::with_capacity(limit.min(DEFAULT_BATCH_CAPACITY));
        let mut record = StringRecord::new();

        while records.len() < limit {
            let has_more = self
                .reader
                .read_record(&mut record)
                .map_err(|e| classify_csv_error(e, self.encoding, &self.source))?;
            if !has_more {
                self.done = true;
                break;
            }
            records.push(record.clone());
        }

        Ok(records)
    }
}

const DEFAULT_BATCH_CAPACITY: usize = 8192;

impl Iterator for BatchIter {
    type Item = Result<RawBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let records = match self.read_batch() {
            Ok(records) => records,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        // A file that ends exactly on a batch boundary still yields its first batch,
        // but never a trailing empty one.
        if records.is_empty() && self.next_index > 0 {
            return None;
        }

        let batch = RawBatch {
            source: self.source.clone(),
            index: self.next_index,
            headers: self.headers.clone(),
            records,
        };
        self.next_index += 1;
        Some(Ok(batch))
    }
}

/// List `*.csv` files directly inside `dir`, in directory-listing order.
pub fn discover_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_file()
            && path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        {
            files.push(path);
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn write_rows(rows: usize) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "BPUIC,BP_BEZEICHNUNG,KANTON").unwrap();
        for i in 0..rows {
            writeln!(file, "{},Stop {},BE", 8500000 + i, i).unwrap();
        }
        file
    }

    #[test]
    fn test_bound_larger_than_file_yields_one_batch() -> Result<()> {
        let file = write_rows(5);
        let reader = ChunkedReader::new(b',').with_batch_rows(Some(10_000_000));

        let batches: Vec<RawBatch> = reader.open(file.path())?.collect::<Result<_>>()?;

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 5);
        assert_eq!(&batches[0].headers[0], "BPUIC");
        Ok(())
    }

    #[test]
    fn test_batches_are_bounded() -> Result<()> {
        let file = write_rows(7);
        let reader = ChunkedReader::new(b',').with_batch_rows(Some(3));

        let sizes: Vec<usize> = reader
            .open(file.path())?
            .map(|b| b.map(|b| b.len()))
            .collect::<Result<_>>()?;

        assert_eq!(sizes, vec![3, 3, 1]);
        Ok(())
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_empty_batch() -> Result<()> {
        let file = write_rows(6);
        let reader = ChunkedReader::new(b',').with_batch_rows(Some(3));

        let batches: Vec<RawBatch> = reader.open(file.path())?.collect::<Result<_>>()?;

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].index, 1);
        Ok(())
    }

    #[test]
    fn test_header_only_file_yields_single_empty_batch() -> Result<()> {
        let file = write_rows(0);
        let batch = ChunkedReader::new(b',').read_all(file.path())?;
        assert!(batch.is_empty());
        Ok(())
    }

    #[test]
    fn test_latin1_source() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"Station;station/location;Canton\nZ\xfcrich / Fluntern;SMA;ZH\n")?;

        let batch = ChunkedReader::new(b';')
            .with_encoding("ISO-8859-1")?
            .read_all(file.path())?;

        assert_eq!(&batch.records[0][0], "Zürich / Fluntern");
        Ok(())
    }

    #[test]
    fn test_ragged_row_is_fatal() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "a;b;c").unwrap();
        writeln!(file, "1;2").unwrap();

        let result = ChunkedReader::new(b';').read_all(file.path());
        assert!(matches!(result, Err(ProcessingError::Csv(_))));
    }

    #[test]
    fn test_invalid_utf8_is_an_encoding_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"a;b\nZ\xfcrich;1\n").unwrap();

        let result = ChunkedReader::new(b';').read_all(file.path());
        assert!(matches!(result, Err(ProcessingError::Encoding { .. })));
    }

    #[test]
    fn test_unknown_encoding_label() {
        let result = ChunkedReader::new(b';').with_encoding("klingon");
        assert!(matches!(result, Err(ProcessingError::UnknownEncoding(_))));
    }

    #[test]
    fn test_discover_only_csv_files() -> Result<()> {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("a.csv"), "x\n1\n")?;
        std::fs::write(dir.path().join("b.CSV"), "x\n1\n")?;
        std::fs::write(dir.path().join("notes.txt"), "ignore")?;
        std::fs::create_dir(dir.path().join("nested.csv"))?;

        let mut files = discover_csv_files(dir.path())?;
        files.sort();

        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.csv"));
        Ok(())
    }
}
