pub mod chunked_reader;
pub mod decoding;

pub use chunked_reader::{discover_csv_files, BatchIter, ChunkedReader, RawBatch};
pub use decoding::{resolve_encoding, DecodingReader};
