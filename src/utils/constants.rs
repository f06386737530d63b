/// Text encodings
pub const LEGACY_WEATHER_ENCODING: &str = "ISO-8859-1";
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// Delimiters per source dataset
pub const WEATHER_DELIMITER: &str = ";";
pub const STOP_DELIMITER: &str = ",";
pub const EVENT_DELIMITER: &str = ";";

/// Fixed date/time formats per source column
pub const MEASUREMENT_DATE_FORMAT: &str = "%Y%m%d";
pub const DAY_FORMAT: &str = "%d.%m.%Y";
pub const EVENT_TIME_FORMAT: &str = "%d.%m.%Y %H:%M";
pub const PREDICTION_TIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Token used by the measurement exports for a missing value
pub const MISSING_VALUE_TOKEN: &str = "-";

/// Elevation bands (metres above sea level)
pub const MEDIUM_ELEVATION_FROM_M: f64 = 500.0;
pub const HIGH_ELEVATION_FROM_M: f64 = 1500.0;

/// Default dataset layout, relative to the data root
pub const WEATHER_STATIONS_FILE: &str = "weather/weatherStation.csv";
pub const WEATHER_MEASUREMENTS_DIR: &str = "weather/measurements";
pub const TRANSPORT_STOPS_FILE: &str = "transport/haltestellen_2024/haltestellen_2024.csv";
pub const TRANSPORT_EVENT_DIRS: [&str; 4] = [
    "transport/ist-daten-2024-01",
    "transport/ist-daten-2024-04",
    "transport/ist-daten-2024-07",
    "transport/ist-daten-2024-11",
];

/// Processing defaults
pub const DEFAULT_CHUNK_ROWS: usize = 500_000;
pub const DEFAULT_ROW_GROUP_SIZE: usize = 100_000;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
