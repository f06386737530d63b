use crate::error::{ProcessingError, Result};
use crate::schema::Entity;
use crate::writers::relation::{
    bool_at, column, date_at, date_to_days, datetime_at, datetime_to_seconds, required_i64,
    string_at, Relation,
};
use arrow::array::{BooleanArray, Date32Array, Int64Array, StringArray, TimestampSecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An observed arrival/departure of one trip at one stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportEvent {
    /// Operating day (`BETRIEBSTAG`).
    pub date: NaiveDate,
    pub bpuic: i64,
    pub product_id: Option<String>,
    pub arrival_time: Option<NaiveDateTime>,
    pub departure_time: Option<NaiveDateTime>,
    pub cancelled: Option<bool>,
}

impl Relation for TransportEvent {
    const ENTITY: Entity = Entity::TransportEvent;

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("date", DataType::Date32, false),
            Field::new("bpuic", DataType::Int64, false),
            Field::new("produktid", DataType::Utf8, true),
            Field::new("arrivaltime", DataType::Timestamp(TimeUnit::Second, None), true),
            Field::new("departuretime", DataType::Timestamp(TimeUnit::Second, None), true),
            Field::new("faelltaus", DataType::Boolean, true),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let dates: Vec<i32> = rows.iter().map(|r| date_to_days(r.date)).collect();
        let bpuics: Vec<i64> = rows.iter().map(|r| r.bpuic).collect();
        let products: Vec<Option<&str>> = rows.iter().map(|r| r.product_id.as_deref()).collect();
        let arrivals: Vec<Option<i64>> = rows.iter().map(|r| r.arrival_time.map(datetime_to_seconds)).collect();
        let departures: Vec<Option<i64>> = rows.iter().map(|r| r.departure_time.map(datetime_to_seconds)).collect();
        let cancelled: Vec<Option<bool>> = rows.iter().map(|r| r.cancelled).collect();

        Ok(RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(Date32Array::from(dates)),
                Arc::new(Int64Array::from(bpuics)),
                Arc::new(StringArray::from(products)),
                Arc::new(TimestampSecondArray::from(arrivals)),
                Arc::new(TimestampSecondArray::from(departures)),
                Arc::new(BooleanArray::from(cancelled)),
            ],
        )?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let e = Self::ENTITY;
        let dates = column::<Date32Array>(batch, e, "date")?;
        let bpuics = column::<Int64Array>(batch, e, "bpuic")?;
        let products = column::<StringArray>(batch, e, "produktid")?;
        let arrivals = column::<TimestampSecondArray>(batch, e, "arrivaltime")?;
        let departures = column::<TimestampSecondArray>(batch, e, "departuretime")?;
        let cancelled = column::<BooleanArray>(batch, e, "faelltaus")?;

        (0..batch.num_rows())
            .map(|i| {
                Ok(TransportEvent {
                    date: date_at(dates, i).ok_or_else(|| ProcessingError::RelationSchema {
                        relation: e.table_name().to_string(),
                        details: format!("null date at row {}", i),
                    })?,
                    bpuic: required_i64(bpuics, i, e, "bpuic")?,
                    product_id: string_at(products, i),
                    arrival_time: datetime_at(arrivals, i),
                    departure_time: datetime_at(departures, i),
                    cancelled: bool_at(cancelled, i),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_round_trip() -> Result<()> {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let rows = vec![
            TransportEvent {
                date,
                bpuic: 8503000,
                product_id: Some("Zug".to_string()),
                arrival_time: None,
                departure_time: date.and_hms_opt(6, 2, 0),
                cancelled: Some(false),
            },
            TransportEvent {
                date,
                bpuic: 8507000,
                product_id: None,
                arrival_time: date.and_hms_opt(6, 58, 0),
                departure_time: None,
                cancelled: Some(true),
            },
        ];

        let batch = TransportEvent::to_batch(&rows)?;
        assert_eq!(TransportEvent::from_batch(&batch)?, rows);
        Ok(())
    }
}
