use crate::error::Result;
use crate::schema::Entity;
use crate::writers::relation::{column, required_i64, required_string, Relation};
use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Pairs a transport stop with a weather station in the same canton.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StationRegionMapping {
    pub bpuic: i64,
    pub weather_station_name: String,
    pub canton: String,
}

impl Relation for StationRegionMapping {
    const ENTITY: Entity = Entity::StationRegionMapping;

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("bpuic", DataType::Int64, false),
            Field::new("canton", DataType::Utf8, false),
            Field::new("weatherstationname", DataType::Utf8, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let bpuics: Vec<i64> = rows.iter().map(|r| r.bpuic).collect();
        let cantons: Vec<&str> = rows.iter().map(|r| r.canton.as_str()).collect();
        let names: Vec<&str> = rows.iter().map(|r| r.weather_station_name.as_str()).collect();

        Ok(RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(Int64Array::from(bpuics)),
                Arc::new(StringArray::from(cantons)),
                Arc::new(StringArray::from(names)),
            ],
        )?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let e = Self::ENTITY;
        let bpuics = column::<Int64Array>(batch, e, "bpuic")?;
        let cantons = column::<StringArray>(batch, e, "canton")?;
        let names = column::<StringArray>(batch, e, "weatherstationname")?;

        (0..batch.num_rows())
            .map(|i| {
                Ok(StationRegionMapping {
                    bpuic: required_i64(bpuics, i, e, "bpuic")?,
                    weather_station_name: required_string(names, i, e, "weatherstationname")?,
                    canton: required_string(cantons, i, e, "canton")?,
                })
            })
            .collect()
    }
}
