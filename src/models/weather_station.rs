use crate::error::Result;
use crate::schema::Entity;
use crate::utils::constants::{HIGH_ELEVATION_FROM_M, MEDIUM_ELEVATION_FROM_M};
use crate::writers::relation::{
    column, date_at, date_to_days, f64_at, required_string, string_at, Relation,
};
use arrow::array::{Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct WeatherStation {
    /// Full station name from the `Station` column, e.g. `Basel / Binningen`.
    pub full_name: Option<String>,

    /// MeteoSwiss station code from `station/location`, e.g. `BAS`. Measurement
    /// files refer to stations by this code.
    #[validate(length(min = 1))]
    pub name: String,

    pub wigos_id: Option<String>,
    pub data_since: Option<NaiveDate>,

    /// Metres above sea level.
    pub height: Option<f64>,

    /// Swiss LV95 grid coordinates.
    pub coord_e: Option<f64>,
    pub coord_n: Option<f64>,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    pub climate_region: Option<String>,
    pub canton: Option<String>,
}

impl WeatherStation {
    pub fn elevation_group(&self) -> Option<ElevationGroup> {
        self.height.map(ElevationGroup::classify)
    }
}

/// Coarse altitude band used to compare stations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElevationGroup {
    Low,
    Medium,
    High,
}

impl ElevationGroup {
    /// `< 500 m` is low, `[500, 1500)` medium, `>= 1500 m` high.
    pub fn classify(height: f64) -> Self {
        if height < MEDIUM_ELEVATION_FROM_M {
            ElevationGroup::Low
        } else if height < HIGH_ELEVATION_FROM_M {
            ElevationGroup::Medium
        } else {
            ElevationGroup::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ElevationGroup::Low => "Low Elevation",
            ElevationGroup::Medium => "Medium Elevation",
            ElevationGroup::High => "High Elevation",
        }
    }
}

/// Number of stations per elevation band. Stations without a height are
/// counted under `None`.
pub fn elevation_profile(stations: &[WeatherStation]) -> BTreeMap<Option<ElevationGroup>, usize> {
    let mut profile = BTreeMap::new();
    for station in stations {
        *profile.entry(station.elevation_group()).or_default() += 1;
    }
    profile
}

impl fmt::Display for ElevationGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl Relation for WeatherStation {
    const ENTITY: Entity = Entity::WeatherStation;

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("station", DataType::Utf8, true),
            Field::new("weatherstationname", DataType::Utf8, false),
            Field::new("wigosid", DataType::Utf8, true),
            Field::new("datasince", DataType::Date32, true),
            Field::new("stationheight", DataType::Float64, true),
            Field::new("coorde", DataType::Float64, true),
            Field::new("coordn", DataType::Float64, true),
            Field::new("lat", DataType::Float64, false),
            Field::new("long", DataType::Float64, false),
            Field::new("climateregion", DataType::Utf8, true),
            Field::new("canton", DataType::Utf8, true),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let full_names: Vec<Option<&str>> = rows.iter().map(|r| r.full_name.as_deref()).collect();
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        let wigos_ids: Vec<Option<&str>> = rows.iter().map(|r| r.wigos_id.as_deref()).collect();
        let data_since: Vec<Option<i32>> = rows.iter().map(|r| r.data_since.map(date_to_days)).collect();
        let heights: Vec<Option<f64>> = rows.iter().map(|r| r.height).collect();
        let coord_e: Vec<Option<f64>> = rows.iter().map(|r| r.coord_e).collect();
        let coord_n: Vec<Option<f64>> = rows.iter().map(|r| r.coord_n).collect();
        let latitudes: Vec<f64> = rows.iter().map(|r| r.latitude).collect();
        let longitudes: Vec<f64> = rows.iter().map(|r| r.longitude).collect();
        let climate_regions: Vec<Option<&str>> = rows.iter().map(|r| r.climate_region.as_deref()).collect();
        let cantons: Vec<Option<&str>> = rows.iter().map(|r| r.canton.as_deref()).collect();

        let batch = RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(StringArray::from(full_names)),
                Arc::new(StringArray::from(names)),
                Arc::new(StringArray::from(wigos_ids)),
                Arc::new(Date32Array::from(data_since)),
                Arc::new(Float64Array::from(heights)),
                Arc::new(Float64Array::from(coord_e)),
                Arc::new(Float64Array::from(coord_n)),
                Arc::new(Float64Array::from(latitudes)),
                Arc::new(Float64Array::from(longitudes)),
                Arc::new(StringArray::from(climate_regions)),
                Arc::new(StringArray::from(cantons)),
            ],
        )?;

        Ok(batch)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let e = Self::ENTITY;
        let full_names = column::<StringArray>(batch, e, "station")?;
        let names = column::<StringArray>(batch, e, "weatherstationname")?;
        let wigos_ids = column::<StringArray>(batch, e, "wigosid")?;
        let data_since = column::<Date32Array>(batch, e, "datasince")?;
        let heights = column::<Float64Array>(batch, e, "stationheight")?;
        let coord_e = column::<Float64Array>(batch, e, "coorde")?;
        let coord_n = column::<Float64Array>(batch, e, "coordn")?;
        let latitudes = column::<Float64Array>(batch, e, "lat")?;
        let longitudes = column::<Float64Array>(batch, e, "long")?;
        let climate_regions = column::<StringArray>(batch, e, "climateregion")?;
        let cantons = column::<StringArray>(batch, e, "canton")?;

        (0..batch.num_rows())
            .map(|i| {
                Ok(WeatherStation {
                    full_name: string_at(full_names, i),
                    name: required_string(names, i, e, "weatherstationname")?,
                    wigos_id: string_at(wigos_ids, i),
                    data_since: date_at(data_since, i),
                    height: f64_at(heights, i),
                    coord_e: f64_at(coord_e, i),
                    coord_n: f64_at(coord_n, i),
                    latitude: latitudes.value(i),
                    longitude: longitudes.value(i),
                    climate_region: string_at(climate_regions, i),
                    canton: string_at(cantons, i),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(name: &str, height: Option<f64>) -> WeatherStation {
        WeatherStation {
            full_name: Some("Basel / Binningen".to_string()),
            name: name.to_string(),
            wigos_id: Some("0-20000-0-06601".to_string()),
            data_since: NaiveDate::from_ymd_opt(1864, 1, 1),
            height,
            coord_e: Some(2_610_911.0),
            coord_n: Some(1_265_600.0),
            latitude: 47.541142,
            longitude: 7.583525,
            climate_region: Some("Northern Jura".to_string()),
            canton: Some("BL".to_string()),
        }
    }

    #[test]
    fn test_elevation_boundaries() {
        assert_eq!(ElevationGroup::classify(499.9), ElevationGroup::Low);
        assert_eq!(ElevationGroup::classify(500.0), ElevationGroup::Medium);
        assert_eq!(ElevationGroup::classify(1499.9), ElevationGroup::Medium);
        assert_eq!(ElevationGroup::classify(1500.0), ElevationGroup::High);
        assert_eq!(ElevationGroup::classify(-3.0), ElevationGroup::Low);
    }

    #[test]
    fn test_station_elevation_group() {
        assert_eq!(
            station("BAS", Some(316.0)).elevation_group(),
            Some(ElevationGroup::Low)
        );
        assert_eq!(station("XXX", None).elevation_group(), None);
        assert_eq!(ElevationGroup::High.to_string(), "High Elevation");
    }

    #[test]
    fn test_elevation_profile_counts_each_band() {
        let stations = vec![
            station("BAS", Some(316.0)),
            station("BER", Some(553.0)),
            station("SAE", Some(2502.0)),
            station("DAV", Some(1594.0)),
            station("XXX", None),
        ];

        let profile = elevation_profile(&stations);

        assert_eq!(profile[&Some(ElevationGroup::Low)], 1);
        assert_eq!(profile[&Some(ElevationGroup::Medium)], 1);
        assert_eq!(profile[&Some(ElevationGroup::High)], 2);
        assert_eq!(profile[&None], 1);
    }

    #[test]
    fn test_station_validation() {
        assert!(station("BAS", Some(316.0)).validate().is_ok());

        let mut invalid = station("BAS", Some(316.0));
        invalid.latitude = 91.0;
        assert!(invalid.validate().is_err());

        assert!(station("", Some(316.0)).validate().is_err());
    }

    #[test]
    fn test_batch_round_trip_keeps_nulls() -> Result<()> {
        let rows = vec![station("BAS", Some(316.0)), {
            let mut s = station("SAE", None);
            s.canton = None;
            s.data_since = None;
            s
        }];

        let batch = WeatherStation::to_batch(&rows)?;
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(WeatherStation::from_batch(&batch)?, rows);
        Ok(())
    }
}
