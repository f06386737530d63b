use crate::error::Result;
use crate::schema::Entity;
use crate::writers::relation::{column, i64_at, required_i64, required_string, string_at, Relation};
use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A public-transport stop, keyed by its BPUIC number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportStation {
    pub bpuic: i64,
    pub name: Option<String>,
    pub abbreviation: Option<String>,
    pub bp_id: Option<String>,
    pub sloid: Option<String>,
    pub canton: Option<String>,
}

/// A transport undertaking (operator) as listed in the stop timetable export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportUndertaking {
    pub tu_code: String,
    pub name: Option<String>,
    pub abbreviation: Option<String>,
}

/// Timetabled service of one trip at one stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportStationInfo {
    pub fp_id: Option<String>,
    pub tu_code: Option<String>,
    pub trip_number: Option<String>,
    pub bpuic: Option<i64>,
    pub transport_mode: Option<String>,
    pub operating_days: Option<String>,
    /// Timetabled departure, kept as written (`HH:MM`).
    pub departure_time: Option<String>,
    pub arrival_time: Option<String>,
    pub direction: Option<String>,
    pub terminus: Option<String>,
    pub line: Option<String>,
}

impl Relation for TransportStation {
    const ENTITY: Entity = Entity::TransportStation;

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("bpuic", DataType::Int64, false),
            Field::new("tstationname", DataType::Utf8, true),
            Field::new("tstation_abk", DataType::Utf8, true),
            Field::new("bp_id", DataType::Utf8, true),
            Field::new("sloid", DataType::Utf8, true),
            Field::new("canton", DataType::Utf8, true),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let bpuics: Vec<i64> = rows.iter().map(|r| r.bpuic).collect();
        let names: Vec<Option<&str>> = rows.iter().map(|r| r.name.as_deref()).collect();
        let abbreviations: Vec<Option<&str>> = rows.iter().map(|r| r.abbreviation.as_deref()).collect();
        let bp_ids: Vec<Option<&str>> = rows.iter().map(|r| r.bp_id.as_deref()).collect();
        let sloids: Vec<Option<&str>> = rows.iter().map(|r| r.sloid.as_deref()).collect();
        let cantons: Vec<Option<&str>> = rows.iter().map(|r| r.canton.as_deref()).collect();

        Ok(RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(Int64Array::from(bpuics)),
                Arc::new(StringArray::from(names)),
                Arc::new(StringArray::from(abbreviations)),
                Arc::new(StringArray::from(bp_ids)),
                Arc::new(StringArray::from(sloids)),
                Arc::new(StringArray::from(cantons)),
            ],
        )?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let e = Self::ENTITY;
        let bpuics = column::<Int64Array>(batch, e, "bpuic")?;
        let names = column::<StringArray>(batch, e, "tstationname")?;
        let abbreviations = column::<StringArray>(batch, e, "tstation_abk")?;
        let bp_ids = column::<StringArray>(batch, e, "bp_id")?;
        let sloids = column::<StringArray>(batch, e, "sloid")?;
        let cantons = column::<StringArray>(batch, e, "canton")?;

        (0..batch.num_rows())
            .map(|i| {
                Ok(TransportStation {
                    bpuic: required_i64(bpuics, i, e, "bpuic")?,
                    name: string_at(names, i),
                    abbreviation: string_at(abbreviations, i),
                    bp_id: string_at(bp_ids, i),
                    sloid: string_at(sloids, i),
                    canton: string_at(cantons, i),
                })
            })
            .collect()
    }
}

impl Relation for TransportUndertaking {
    const ENTITY: Entity = Entity::TransportUndertaking;

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("tu_code", DataType::Utf8, false),
            Field::new("tu_bezeichnung", DataType::Utf8, true),
            Field::new("tu_abkuerzung", DataType::Utf8, true),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let codes: Vec<&str> = rows.iter().map(|r| r.tu_code.as_str()).collect();
        let names: Vec<Option<&str>> = rows.iter().map(|r| r.name.as_deref()).collect();
        let abbreviations: Vec<Option<&str>> = rows.iter().map(|r| r.abbreviation.as_deref()).collect();

        Ok(RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(StringArray::from(codes)),
                Arc::new(StringArray::from(names)),
                Arc::new(StringArray::from(abbreviations)),
            ],
        )?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let e = Self::ENTITY;
        let codes = column::<StringArray>(batch, e, "tu_code")?;
        let names = column::<StringArray>(batch, e, "tu_bezeichnung")?;
        let abbreviations = column::<StringArray>(batch, e, "tu_abkuerzung")?;

        (0..batch.num_rows())
            .map(|i| {
                Ok(TransportUndertaking {
                    tu_code: required_string(codes, i, e, "tu_code")?,
                    name: string_at(names, i),
                    abbreviation: string_at(abbreviations, i),
                })
            })
            .collect()
    }
}

const STATION_INFO_TEXT_COLUMNS: [&str; 10] = [
    "fpid",
    "tu_code",
    "fartnummer",
    "vm_art",
    "fahrtage",
    "ab_zeit_kb",
    "an_zeit_kb",
    "richtung_text_aggregiert",
    "end_bp_bezeichnung",
    "linie",
];

impl TransportStationInfo {
    fn text_fields(&self) -> [Option<&str>; 10] {
        [
            self.fp_id.as_deref(),
            self.tu_code.as_deref(),
            self.trip_number.as_deref(),
            self.transport_mode.as_deref(),
            self.operating_days.as_deref(),
            self.departure_time.as_deref(),
            self.arrival_time.as_deref(),
            self.direction.as_deref(),
            self.terminus.as_deref(),
            self.line.as_deref(),
        ]
    }
}

impl Relation for TransportStationInfo {
    const ENTITY: Entity = Entity::TransportStationInfo;

    fn schema() -> SchemaRef {
        let mut fields: Vec<Field> = STATION_INFO_TEXT_COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::Utf8, true))
            .collect();
        fields.insert(3, Field::new("bpuic", DataType::Int64, true));
        Arc::new(Schema::new(fields))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let mut columns: Vec<arrow::array::ArrayRef> = (0..STATION_INFO_TEXT_COLUMNS.len())
            .map(|index| {
                let values: Vec<Option<&str>> = rows.iter().map(|r| r.text_fields()[index]).collect();
                Arc::new(StringArray::from(values)) as arrow::array::ArrayRef
            })
            .collect();
        let bpuics: Vec<Option<i64>> = rows.iter().map(|r| r.bpuic).collect();
        columns.insert(3, Arc::new(Int64Array::from(bpuics)));

        Ok(RecordBatch::try_new(Self::schema(), columns)?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let e = Self::ENTITY;
        let text = STATION_INFO_TEXT_COLUMNS
            .iter()
            .map(|name| column::<StringArray>(batch, e, name))
            .collect::<Result<Vec<_>>>()?;
        let bpuics = column::<Int64Array>(batch, e, "bpuic")?;

        Ok((0..batch.num_rows())
            .map(|i| TransportStationInfo {
                fp_id: string_at(text[0], i),
                tu_code: string_at(text[1], i),
                trip_number: string_at(text[2], i),
                bpuic: i64_at(bpuics, i),
                transport_mode: string_at(text[3], i),
                operating_days: string_at(text[4], i),
                departure_time: string_at(text[5], i),
                arrival_time: string_at(text[6], i),
                direction: string_at(text[7], i),
                terminus: string_at(text[8], i),
                line: string_at(text[9], i),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_batch_round_trip() -> Result<()> {
        let rows = vec![
            TransportStation {
                bpuic: 8503000,
                name: Some("Zürich HB".to_string()),
                abbreviation: Some("ZUE".to_string()),
                bp_id: Some("1".to_string()),
                sloid: Some("ch:1:sloid:3000".to_string()),
                canton: Some("ZH".to_string()),
            },
            TransportStation {
                bpuic: 8507000,
                name: Some("Bern".to_string()),
                abbreviation: None,
                bp_id: None,
                sloid: None,
                canton: None,
            },
        ];

        let batch = TransportStation::to_batch(&rows)?;
        assert_eq!(TransportStation::from_batch(&batch)?, rows);
        Ok(())
    }

    #[test]
    fn test_station_info_column_order() -> Result<()> {
        let info = TransportStationInfo {
            fp_id: Some("2024".to_string()),
            tu_code: Some("11".to_string()),
            trip_number: Some("1234".to_string()),
            bpuic: Some(8503000),
            transport_mode: Some("Zug".to_string()),
            operating_days: Some("Mo-Fr".to_string()),
            departure_time: Some("06:32".to_string()),
            arrival_time: None,
            direction: Some("Bern".to_string()),
            terminus: Some("Bern".to_string()),
            line: Some("IC1".to_string()),
        };

        let batch = TransportStationInfo::to_batch(&[info.clone()])?;
        let schema = batch.schema();
        assert_eq!(schema.field(3).name(), "bpuic");
        assert_eq!(schema.field(4).name(), "vm_art");
        assert_eq!(TransportStationInfo::from_batch(&batch)?, vec![info]);
        Ok(())
    }
}
