//! Typed parsing of conformed batches.
//!
//! Every date/time column has exactly one accepted format; a cell that does
//! not match it is a fatal error for the whole batch. Numeric measurement
//! cells may hold the missing-value token, which becomes `None`.

use crate::error::{ProcessingError, Result};
use crate::models::{
    StagedEventInfo, TransportEvent, TransportEventInfo, TransportJourney, TransportOperator,
    TransportStation, TransportStationInfo, TransportUndertaking, WeatherMeasurement,
    WeatherStation, MEASUREMENT_COLUMNS,
};
use crate::readers::RawBatch;
use crate::schema::{Entity, EntitySchema, Frame, Row};
use crate::utils::constants::{
    DAY_FORMAT, EVENT_TIME_FORMAT, MEASUREMENT_DATE_FORMAT, MISSING_VALUE_TOKEN,
    PREDICTION_TIME_FORMAT,
};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::error;
use validator::Validate;

/// A record type that can be built from one conformed source row.
pub trait FromRow: Sized {
    /// Entity whose rename table produces the columns this type reads.
    const ENTITY: Entity;

    fn from_row(row: &Row<'_>) -> Result<Self>;
}

/// Conform `batch` to `T`'s schema and parse every row.
pub fn normalize<T: FromRow>(batch: &RawBatch) -> Result<Vec<T>> {
    let frame = Frame::conform(EntitySchema::for_entity(T::ENTITY), batch)?;

    frame
        .rows()
        .enumerate()
        .map(|(line, row)| {
            T::from_row(&row).map_err(|e| {
                error!(
                    entity = %T::ENTITY,
                    source = %batch.source.display(),
                    batch = batch.index,
                    row = line,
                    "Row rejected: {}",
                    e
                );
                e
            })
        })
        .collect()
}

pub fn parse_date(row: &Row<'_>, column: &str, format: &str) -> Result<Option<NaiveDate>> {
    row.get(column)
        .map(|value| {
            NaiveDate::parse_from_str(value, format)
                .map_err(|_| ProcessingError::field_parse(column, value, &format!("date '{}'", format)))
        })
        .transpose()
}

pub fn parse_datetime(row: &Row<'_>, column: &str, format: &str) -> Result<Option<NaiveDateTime>> {
    row.get(column)
        .map(|value| {
            NaiveDateTime::parse_from_str(value, format).map_err(|_| {
                ProcessingError::field_parse(column, value, &format!("timestamp '{}'", format))
            })
        })
        .transpose()
}

pub fn parse_f64(row: &Row<'_>, column: &str) -> Result<Option<f64>> {
    row.get(column)
        .map(|value| {
            value
                .parse::<f64>()
                .map_err(|_| ProcessingError::field_parse(column, value, "a number"))
        })
        .transpose()
}

/// Like [`parse_f64`], but the missing-value token is `None` rather than an error.
pub fn parse_measurement(row: &Row<'_>, column: &str) -> Result<Option<f64>> {
    match row.get(column) {
        Some(MISSING_VALUE_TOKEN) | None => Ok(None),
        Some(_) => parse_f64(row, column),
    }
}

pub fn parse_required_f64(row: &Row<'_>, column: &str) -> Result<f64> {
    parse_f64(row, column)?.ok_or_else(|| ProcessingError::field_parse(column, "", "a number"))
}

pub fn parse_required_i64(row: &Row<'_>, column: &str) -> Result<i64> {
    let value = row.required(column)?;
    value
        .parse::<i64>()
        .map_err(|_| ProcessingError::field_parse(column, value, "an integer"))
}

pub fn parse_optional_i64(row: &Row<'_>, column: &str) -> Result<Option<i64>> {
    row.get(column)
        .map(|value| {
            value
                .parse::<i64>()
                .map_err(|_| ProcessingError::field_parse(column, value, "an integer"))
        })
        .transpose()
}

pub fn parse_bool(row: &Row<'_>, column: &str) -> Result<Option<bool>> {
    row.get(column)
        .map(|value| match value.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(ProcessingError::field_parse(column, value, "a boolean")),
        })
        .transpose()
}

fn text(row: &Row<'_>, column: &str) -> Option<String> {
    row.get(column).map(str::to_string)
}

impl FromRow for WeatherStation {
    const ENTITY: Entity = Entity::WeatherStation;

    fn from_row(row: &Row<'_>) -> Result<Self> {
        let station = WeatherStation {
            full_name: text(row, "station"),
            name: row.required("weatherstationname")?.to_string(),
            wigos_id: text(row, "wigosid"),
            data_since: parse_date(row, "datasince", DAY_FORMAT)?,
            height: parse_f64(row, "stationheight")?,
            coord_e: parse_f64(row, "coorde")?,
            coord_n: parse_f64(row, "coordn")?,
            latitude: parse_required_f64(row, "lat")?,
            longitude: parse_required_f64(row, "long")?,
            climate_region: text(row, "climateregion"),
            canton: text(row, "canton"),
        };
        station.validate()?;
        Ok(station)
    }
}

impl FromRow for WeatherMeasurement {
    const ENTITY: Entity = Entity::WeatherMeasurement;

    fn from_row(row: &Row<'_>) -> Result<Self> {
        let date = parse_date(row, "date", MEASUREMENT_DATE_FORMAT)?
            .ok_or_else(|| ProcessingError::field_parse("date", "", MEASUREMENT_DATE_FORMAT))?;

        let mut measurement = WeatherMeasurement {
            station_name: row.required("weatherstationname")?.to_string(),
            date,
            ..Default::default()
        };
        for column in MEASUREMENT_COLUMNS {
            measurement.set(column, parse_measurement(row, column)?)?;
        }

        Ok(measurement)
    }
}

impl FromRow for TransportStation {
    const ENTITY: Entity = Entity::TransportStation;

    fn from_row(row: &Row<'_>) -> Result<Self> {
        Ok(TransportStation {
            bpuic: parse_required_i64(row, "bpuic")?,
            name: text(row, "tstationname"),
            abbreviation: text(row, "tstation_abk"),
            bp_id: text(row, "bp_id"),
            sloid: text(row, "sloid"),
            canton: text(row, "canton"),
        })
    }
}

impl FromRow for TransportUndertaking {
    const ENTITY: Entity = Entity::TransportUndertaking;

    fn from_row(row: &Row<'_>) -> Result<Self> {
        Ok(TransportUndertaking {
            tu_code: row.required("tu_code")?.to_string(),
            name: text(row, "tu_bezeichnung"),
            abbreviation: text(row, "tu_abkuerzung"),
        })
    }
}

impl FromRow for TransportStationInfo {
    const ENTITY: Entity = Entity::TransportStationInfo;

    fn from_row(row: &Row<'_>) -> Result<Self> {
        Ok(TransportStationInfo {
            fp_id: text(row, "fpid"),
            tu_code: text(row, "tu_code"),
            trip_number: text(row, "fartnummer"),
            bpuic: parse_optional_i64(row, "bpuic")?,
            transport_mode: text(row, "vm_art"),
            operating_days: text(row, "fahrtage"),
            departure_time: text(row, "ab_zeit_kb"),
            arrival_time: text(row, "an_zeit_kb"),
            direction: text(row, "richtung_text_aggregiert"),
            terminus: text(row, "end_bp_bezeichnung"),
            line: text(row, "linie"),
        })
    }
}

impl FromRow for TransportOperator {
    const ENTITY: Entity = Entity::TransportOperator;

    fn from_row(row: &Row<'_>) -> Result<Self> {
        Ok(TransportOperator {
            operator_id: row.required("betreiberid")?.to_string(),
            abbreviation: text(row, "betreiberabk"),
            name: text(row, "betreibername"),
        })
    }
}

impl FromRow for TransportJourney {
    const ENTITY: Entity = Entity::TransportJourney;

    fn from_row(row: &Row<'_>) -> Result<Self> {
        Ok(TransportJourney {
            journey_id: row.required("fahrt_bezeichner")?.to_string(),
            line_id: text(row, "linienid"),
            line_text: text(row, "linientext"),
            circulation_id: text(row, "umlaufid"),
            vehicle_type: text(row, "verkehrsmitteltext"),
        })
    }
}

impl FromRow for TransportEvent {
    const ENTITY: Entity = Entity::TransportEvent;

    fn from_row(row: &Row<'_>) -> Result<Self> {
        let date = parse_date(row, "date", DAY_FORMAT)?
            .ok_or_else(|| ProcessingError::field_parse("date", "", DAY_FORMAT))?;

        Ok(TransportEvent {
            date,
            bpuic: parse_required_i64(row, "bpuic")?,
            product_id: text(row, "produktid"),
            arrival_time: parse_datetime(row, "arrivaltime", EVENT_TIME_FORMAT)?,
            departure_time: parse_datetime(row, "departuretime", EVENT_TIME_FORMAT)?,
            cancelled: parse_bool(row, "faelltaus")?,
        })
    }
}

impl FromRow for StagedEventInfo {
    const ENTITY: Entity = Entity::TransportEventInfo;

    fn from_row(row: &Row<'_>) -> Result<Self> {
        Ok(StagedEventInfo {
            bpuic: parse_required_i64(row, "bpuic")?,
            info: TransportEventInfo {
                tid: 0,
                journey_id: text(row, "fahrt_bezeichner"),
                operator_id: text(row, "betreiberid"),
                additional_trip: parse_bool(row, "zusatzfahrt_tf")?,
                arrival_prediction: parse_datetime(row, "arrivaltimepred", PREDICTION_TIME_FORMAT)?,
                arrival_prediction_status: text(row, "arrivalpredstatus"),
                departure_prediction: parse_datetime(row, "departuretimepred", PREDICTION_TIME_FORMAT)?,
                departure_prediction_status: text(row, "departurepredstatus"),
                through_trip: parse_bool(row, "durchfahrt_tf")?,
            },
        })
    }
}
