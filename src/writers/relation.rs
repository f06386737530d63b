use crate::error::{ProcessingError, Result};
use crate::schema::Entity;
use arrow::array::{
    Array, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray, TimestampSecondArray,
};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// A typed row that can be persisted as, and read back from, an Arrow batch.
pub trait Relation: Sized {
    const ENTITY: Entity;

    fn schema() -> SchemaRef;

    fn to_batch(rows: &[Self]) -> Result<RecordBatch>;

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>>;
}

/// Look up a column by name and downcast it to its concrete array type.
pub fn column<'a, T: Array + 'static>(
    batch: &'a RecordBatch,
    entity: Entity,
    name: &str,
) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| ProcessingError::RelationSchema {
            relation: entity.table_name().to_string(),
            details: format!("missing or mistyped column '{}'", name),
        })
}

pub fn string_at(array: &StringArray, i: usize) -> Option<String> {
    (!array.is_null(i)).then(|| array.value(i).to_string())
}

pub fn f64_at(array: &Float64Array, i: usize) -> Option<f64> {
    (!array.is_null(i)).then(|| array.value(i))
}

pub fn i64_at(array: &Int64Array, i: usize) -> Option<i64> {
    (!array.is_null(i)).then(|| array.value(i))
}

pub fn bool_at(array: &BooleanArray, i: usize) -> Option<bool> {
    (!array.is_null(i)).then(|| array.value(i))
}

pub fn date_at(array: &Date32Array, i: usize) -> Option<NaiveDate> {
    if array.is_null(i) {
        None
    } else {
        days_to_date(array.value(i))
    }
}

pub fn datetime_at(array: &TimestampSecondArray, i: usize) -> Option<NaiveDateTime> {
    if array.is_null(i) {
        None
    } else {
        DateTime::from_timestamp(array.value(i), 0).map(|dt| dt.naive_utc())
    }
}

/// A non-null string column value, failing with a schema error otherwise.
pub fn required_string(array: &StringArray, i: usize, entity: Entity, name: &str) -> Result<String> {
    string_at(array, i).ok_or_else(|| null_in_required(entity, name, i))
}

pub fn required_i64(array: &Int64Array, i: usize, entity: Entity, name: &str) -> Result<i64> {
    i64_at(array, i).ok_or_else(|| null_in_required(entity, name, i))
}

fn null_in_required(entity: Entity, name: &str, row: usize) -> ProcessingError {
    ProcessingError::RelationSchema {
        relation: entity.table_name().to_string(),
        details: format!("null in required column '{}' at row {}", name, row),
    }
}

/// Days since the Unix epoch, as stored in `Date32` columns.
pub fn date_to_days(date: NaiveDate) -> i32 {
    date.signed_duration_since(DateTime::UNIX_EPOCH.date_naive())
        .num_days() as i32
}

pub fn days_to_date(days: i32) -> Option<NaiveDate> {
    DateTime::UNIX_EPOCH
        .date_naive()
        .checked_add_signed(chrono::Duration::days(days as i64))
}

/// Seconds since the Unix epoch for a naive (station-local) timestamp.
pub fn datetime_to_seconds(datetime: NaiveDateTime) -> i64 {
    datetime.and_utc().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_conversion_uses_unix_epoch() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(date_to_days(epoch), 0);

        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(days_to_date(date_to_days(date)), Some(date));
    }

    #[test]
    fn test_timestamp_conversion() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(7, 42, 10)
            .unwrap();
        let array = TimestampSecondArray::from(vec![Some(datetime_to_seconds(dt)), None]);

        assert_eq!(datetime_at(&array, 0), Some(dt));
        assert_eq!(datetime_at(&array, 1), None);
    }
}
