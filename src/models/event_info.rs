use crate::error::Result;
use crate::schema::Entity;
use crate::writers::relation::{
    bool_at, column, datetime_at, datetime_to_seconds, required_i64, string_at, Relation,
};
use arrow::array::{BooleanArray, Int64Array, StringArray, TimestampSecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Forecast and flag details of one transport event, keyed by a pipeline-assigned id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransportEventInfo {
    pub tid: i64,
    pub journey_id: Option<String>,
    pub operator_id: Option<String>,
    pub additional_trip: Option<bool>,
    pub arrival_prediction: Option<NaiveDateTime>,
    pub arrival_prediction_status: Option<String>,
    pub departure_prediction: Option<NaiveDateTime>,
    pub departure_prediction_status: Option<String>,
    pub through_trip: Option<bool>,
}

/// Event detail as parsed, still carrying the stop id it is filtered on.
///
/// The stop id is not part of the stored relation; it only exists so rows
/// referring to unknown stops can be dropped before ids are assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedEventInfo {
    pub bpuic: i64,
    pub info: TransportEventInfo,
}

impl StagedEventInfo {
    pub fn into_row(self, tid: i64) -> TransportEventInfo {
        TransportEventInfo { tid, ..self.info }
    }
}

impl Relation for TransportEventInfo {
    const ENTITY: Entity = Entity::TransportEventInfo;

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("tid", DataType::Int64, false),
            Field::new("fahrt_bezeichner", DataType::Utf8, true),
            Field::new("betreiberid", DataType::Utf8, true),
            Field::new("zusatzfahrt_tf", DataType::Boolean, true),
            Field::new("arrivaltimepred", DataType::Timestamp(TimeUnit::Second, None), true),
            Field::new("arrivalpredstatus", DataType::Utf8, true),
            Field::new("departuretimepred", DataType::Timestamp(TimeUnit::Second, None), true),
            Field::new("departurepredstatus", DataType::Utf8, true),
            Field::new("durchfahrt_tf", DataType::Boolean, true),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let tids: Vec<i64> = rows.iter().map(|r| r.tid).collect();
        let journeys: Vec<Option<&str>> = rows.iter().map(|r| r.journey_id.as_deref()).collect();
        let operators: Vec<Option<&str>> = rows.iter().map(|r| r.operator_id.as_deref()).collect();
        let additional: Vec<Option<bool>> = rows.iter().map(|r| r.additional_trip).collect();
        let arrivals: Vec<Option<i64>> = rows
            .iter()
            .map(|r| r.arrival_prediction.map(datetime_to_seconds))
            .collect();
        let arrival_status: Vec<Option<&str>> = rows
            .iter()
            .map(|r| r.arrival_prediction_status.as_deref())
            .collect();
        let departures: Vec<Option<i64>> = rows
            .iter()
            .map(|r| r.departure_prediction.map(datetime_to_seconds))
            .collect();
        let departure_status: Vec<Option<&str>> = rows
            .iter()
            .map(|r| r.departure_prediction_status.as_deref())
            .collect();
        let through: Vec<Option<bool>> = rows.iter().map(|r| r.through_trip).collect();

        Ok(RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(Int64Array::from(tids)),
                Arc::new(StringArray::from(journeys)),
                Arc::new(StringArray::from(operators)),
                Arc::new(BooleanArray::from(additional)),
                Arc::new(TimestampSecondArray::from(arrivals)),
                Arc::new(StringArray::from(arrival_status)),
                Arc::new(TimestampSecondArray::from(departures)),
                Arc::new(StringArray::from(departure_status)),
                Arc::new(BooleanArray::from(through)),
            ],
        )?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let e = Self::ENTITY;
        let tids = column::<Int64Array>(batch, e, "tid")?;
        let journeys = column::<StringArray>(batch, e, "fahrt_bezeichner")?;
        let operators = column::<StringArray>(batch, e, "betreiberid")?;
        let additional = column::<BooleanArray>(batch, e, "zusatzfahrt_tf")?;
        let arrivals = column::<TimestampSecondArray>(batch, e, "arrivaltimepred")?;
        let arrival_status = column::<StringArray>(batch, e, "arrivalpredstatus")?;
        let departures = column::<TimestampSecondArray>(batch, e, "departuretimepred")?;
        let departure_status = column::<StringArray>(batch, e, "departurepredstatus")?;
        let through = column::<BooleanArray>(batch, e, "durchfahrt_tf")?;

        (0..batch.num_rows())
            .map(|i| {
                Ok(TransportEventInfo {
                    tid: required_i64(tids, i, e, "tid")?,
                    journey_id: string_at(journeys, i),
                    operator_id: string_at(operators, i),
                    additional_trip: bool_at(additional, i),
                    arrival_prediction: datetime_at(arrivals, i),
                    arrival_prediction_status: string_at(arrival_status, i),
                    departure_prediction: datetime_at(departures, i),
                    departure_prediction_status: string_at(departure_status, i),
                    through_trip: bool_at(through, i),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_staged_row_takes_assigned_id() {
        let staged = StagedEventInfo {
            bpuic: 8503000,
            info: TransportEventInfo {
                journey_id: Some("85:11:1:001".to_string()),
                ..Default::default()
            },
        };

        let row = staged.into_row(42);
        assert_eq!(row.tid, 42);
        assert_eq!(row.journey_id.as_deref(), Some("85:11:1:001"));
    }

    #[test]
    fn test_event_info_round_trip() -> Result<()> {
        let predicted = NaiveDate::from_ymd_opt(2024, 4, 2)
            .unwrap()
            .and_hms_opt(8, 15, 31)
            .unwrap();
        let rows = vec![TransportEventInfo {
            tid: 1,
            journey_id: Some("85:11:1:001".to_string()),
            operator_id: Some("85:11".to_string()),
            additional_trip: Some(false),
            arrival_prediction: Some(predicted),
            arrival_prediction_status: Some("REAL".to_string()),
            departure_prediction: None,
            departure_prediction_status: None,
            through_trip: Some(false),
        }];

        let batch = TransportEventInfo::to_batch(&rows)?;
        assert_eq!(TransportEventInfo::from_batch(&batch)?, rows);
        Ok(())
    }
}
