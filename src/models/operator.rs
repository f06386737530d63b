use crate::error::Result;
use crate::schema::Entity;
use crate::writers::relation::{column, required_string, string_at, Relation};
use arrow::array::StringArray;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Operator of a trip, keyed by `BETREIBER_ID` (e.g. `85:11`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportOperator {
    pub operator_id: String,
    pub abbreviation: Option<String>,
    pub name: Option<String>,
}

/// A single trip, keyed by `FAHRT_BEZEICHNER`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportJourney {
    pub journey_id: String,
    pub line_id: Option<String>,
    pub line_text: Option<String>,
    pub circulation_id: Option<String>,
    pub vehicle_type: Option<String>,
}

impl Relation for TransportOperator {
    const ENTITY: Entity = Entity::TransportOperator;

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("betreiberid", DataType::Utf8, false),
            Field::new("betreiberabk", DataType::Utf8, true),
            Field::new("betreibername", DataType::Utf8, true),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let ids: Vec<&str> = rows.iter().map(|r| r.operator_id.as_str()).collect();
        let abbreviations: Vec<Option<&str>> = rows.iter().map(|r| r.abbreviation.as_deref()).collect();
        let names: Vec<Option<&str>> = rows.iter().map(|r| r.name.as_deref()).collect();

        Ok(RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(abbreviations)),
                Arc::new(StringArray::from(names)),
            ],
        )?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let e = Self::ENTITY;
        let ids = column::<StringArray>(batch, e, "betreiberid")?;
        let abbreviations = column::<StringArray>(batch, e, "betreiberabk")?;
        let names = column::<StringArray>(batch, e, "betreibername")?;

        (0..batch.num_rows())
            .map(|i| {
                Ok(TransportOperator {
                    operator_id: required_string(ids, i, e, "betreiberid")?,
                    abbreviation: string_at(abbreviations, i),
                    name: string_at(names, i),
                })
            })
            .collect()
    }
}

impl Relation for TransportJourney {
    const ENTITY: Entity = Entity::TransportJourney;

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("fahrt_bezeichner", DataType::Utf8, false),
            Field::new("linienid", DataType::Utf8, true),
            Field::new("linientext", DataType::Utf8, true),
            Field::new("umlaufid", DataType::Utf8, true),
            Field::new("verkehrsmitteltext", DataType::Utf8, true),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let ids: Vec<&str> = rows.iter().map(|r| r.journey_id.as_str()).collect();
        let line_ids: Vec<Option<&str>> = rows.iter().map(|r| r.line_id.as_deref()).collect();
        let line_texts: Vec<Option<&str>> = rows.iter().map(|r| r.line_text.as_deref()).collect();
        let circulation_ids: Vec<Option<&str>> = rows.iter().map(|r| r.circulation_id.as_deref()).collect();
        let vehicle_types: Vec<Option<&str>> = rows.iter().map(|r| r.vehicle_type.as_deref()).collect();

        Ok(RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(line_ids)),
                Arc::new(StringArray::from(line_texts)),
                Arc::new(StringArray::from(circulation_ids)),
                Arc::new(StringArray::from(vehicle_types)),
            ],
        )?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let e = Self::ENTITY;
        let ids = column::<StringArray>(batch, e, "fahrt_bezeichner")?;
        let line_ids = column::<StringArray>(batch, e, "linienid")?;
        let line_texts = column::<StringArray>(batch, e, "linientext")?;
        let circulation_ids = column::<StringArray>(batch, e, "umlaufid")?;
        let vehicle_types = column::<StringArray>(batch, e, "verkehrsmitteltext")?;

        (0..batch.num_rows())
            .map(|i| {
                Ok(TransportJourney {
                    journey_id: required_string(ids, i, e, "fahrt_bezeichner")?,
                    line_id: string_at(line_ids, i),
                    line_text: string_at(line_texts, i),
                    circulation_id: string_at(circulation_ids, i),
                    vehicle_type: string_at(vehicle_types, i),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_round_trip() -> Result<()> {
        let rows = vec![TransportOperator {
            operator_id: "85:11".to_string(),
            abbreviation: Some("SBB".to_string()),
            name: Some("Schweizerische Bundesbahnen SBB".to_string()),
        }];
        let batch = TransportOperator::to_batch(&rows)?;
        assert_eq!(TransportOperator::from_batch(&batch)?, rows);
        Ok(())
    }

    #[test]
    fn test_journey_schema_names() {
        let schema = TransportJourney::schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(
            names,
            vec!["fahrt_bezeichner", "linienid", "linientext", "umlaufid", "verkehrsmitteltext"]
        );
    }
}
