use crate::error::{ProcessingError, Result};
use crate::schema::Entity;
use crate::writers::relation::{column, date_at, date_to_days, f64_at, required_string, Relation};
use arrow::array::{ArrayRef, Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Canonical names of the daily measurement columns, in storage order.
pub const MEASUREMENT_COLUMNS: [&str; 10] = [
    "globalradiation",
    "totalsnowdepth",
    "cloudcover",
    "pressure",
    "precipitation",
    "sunshineduration",
    "airtemperature_mean",
    "airtemperature_min",
    "airtemperature_max",
    "relativehumidity",
];

/// One station's daily aggregates. Every measurement may be missing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeatherMeasurement {
    pub station_name: String,
    pub date: NaiveDate,
    /// W/m², daily mean.
    pub global_radiation: Option<f64>,
    /// cm, at 06 UTC.
    pub total_snow_depth: Option<f64>,
    /// %, daily mean.
    pub cloud_cover: Option<f64>,
    /// hPa at station level.
    pub pressure: Option<f64>,
    /// mm, 06 UTC to 06 UTC next day.
    pub precipitation: Option<f64>,
    /// Minutes.
    pub sunshine_duration: Option<f64>,
    pub air_temperature_mean: Option<f64>,
    pub air_temperature_min: Option<f64>,
    pub air_temperature_max: Option<f64>,
    pub relative_humidity: Option<f64>,
}

impl WeatherMeasurement {
    /// Measurement values in `MEASUREMENT_COLUMNS` order.
    pub fn values(&self) -> [Option<f64>; 10] {
        [
            self.global_radiation,
            self.total_snow_depth,
            self.cloud_cover,
            self.pressure,
            self.precipitation,
            self.sunshine_duration,
            self.air_temperature_mean,
            self.air_temperature_min,
            self.air_temperature_max,
            self.relative_humidity,
        ]
    }

    /// Set a measurement by its canonical column name.
    pub fn set(&mut self, column: &str, value: Option<f64>) -> Result<()> {
        let slot = match column {
            "globalradiation" => &mut self.global_radiation,
            "totalsnowdepth" => &mut self.total_snow_depth,
            "cloudcover" => &mut self.cloud_cover,
            "pressure" => &mut self.pressure,
            "precipitation" => &mut self.precipitation,
            "sunshineduration" => &mut self.sunshine_duration,
            "airtemperature_mean" => &mut self.air_temperature_mean,
            "airtemperature_min" => &mut self.air_temperature_min,
            "airtemperature_max" => &mut self.air_temperature_max,
            "relativehumidity" => &mut self.relative_humidity,
            other => {
                return Err(ProcessingError::InvalidFormat(format!(
                    "Unknown measurement column: {}",
                    other
                )))
            }
        };
        *slot = value;
        Ok(())
    }
}

impl Relation for WeatherMeasurement {
    const ENTITY: Entity = Entity::WeatherMeasurement;

    fn schema() -> SchemaRef {
        let mut fields = vec![
            Field::new("weatherstationname", DataType::Utf8, false),
            Field::new("date", DataType::Date32, false),
        ];
        fields.extend(
            MEASUREMENT_COLUMNS
                .iter()
                .map(|name| Field::new(*name, DataType::Float64, true)),
        );
        Arc::new(Schema::new(fields))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let names: Vec<&str> = rows.iter().map(|r| r.station_name.as_str()).collect();
        let dates: Vec<i32> = rows.iter().map(|r| date_to_days(r.date)).collect();

        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(names)),
            Arc::new(Date32Array::from(dates)),
        ];
        for index in 0..MEASUREMENT_COLUMNS.len() {
            let values: Vec<Option<f64>> = rows.iter().map(|r| r.values()[index]).collect();
            columns.push(Arc::new(Float64Array::from(values)));
        }

        Ok(RecordBatch::try_new(Self::schema(), columns)?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let e = Self::ENTITY;
        let names = column::<StringArray>(batch, e, "weatherstationname")?;
        let dates = column::<Date32Array>(batch, e, "date")?;
        let measurements = MEASUREMENT_COLUMNS
            .iter()
            .map(|name| column::<Float64Array>(batch, e, name).map(|array| (*name, array)))
            .collect::<Result<Vec<_>>>()?;

        let mut rows = Vec::with_capacity(batch.num_rows());
        for i in 0..batch.num_rows() {
            let mut row = WeatherMeasurement {
                station_name: required_string(names, i, e, "weatherstationname")?,
                date: date_at(dates, i).ok_or_else(|| ProcessingError::RelationSchema {
                    relation: e.table_name().to_string(),
                    details: format!("null date at row {}", i),
                })?,
                ..Default::default()
            };
            for (name, array) in &measurements {
                row.set(name, f64_at(array, i))?;
            }
            rows.push(row);
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_by_column_name() -> Result<()> {
        let mut m = WeatherMeasurement::default();
        m.set("tre200d0", Some(1.0)).unwrap_err();
        m.set("airtemperature_mean", Some(4.2))?;
        m.set("totalsnowdepth", None)?;

        assert_eq!(m.air_temperature_mean, Some(4.2));
        assert_eq!(m.values()[6], Some(4.2));
        Ok(())
    }

    #[test]
    fn test_batch_keeps_missing_values_null() -> Result<()> {
        let row = WeatherMeasurement {
            station_name: "BAS".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            precipitation: Some(0.4),
            ..Default::default()
        };

        let batch = WeatherMeasurement::to_batch(&[row.clone()])?;
        let snow = column::<Float64Array>(&batch, Entity::WeatherMeasurement, "totalsnowdepth")?;
        assert!(arrow::array::Array::is_null(snow, 0));
        assert_eq!(WeatherMeasurement::from_batch(&batch)?, vec![row]);
        Ok(())
    }
}
