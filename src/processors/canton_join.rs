use crate::error::Result;
use crate::models::StationRegionMapping;
use crate::schema::Entity;
use crate::writers::relation::{column, required_i64, required_string, string_at};
use crate::writers::Store;
use arrow::array::{Int64Array, StringArray};
use std::collections::HashMap;
use tracing::debug;

/// Pair every transport station with every weather station in the same canton.
///
/// Output follows transport-station order, then weather-station order within a
/// canton. Stations without a canton never match. A canton with R transport and
/// W weather stations yields R×W rows.
pub fn build_region_mapping(
    weather_stations: &[(String, Option<String>)],
    transport_stations: &[(i64, Option<String>)],
) -> Vec<StationRegionMapping> {
    let mut by_canton: HashMap<&str, Vec<&str>> = HashMap::new();
    for (name, canton) in weather_stations {
        if let Some(canton) = canton {
            by_canton.entry(canton.as_str()).or_default().push(name.as_str());
        }
    }

    let mut mapping = Vec::new();
    for (bpuic, canton) in transport_stations {
        let Some(canton) = canton else { continue };
        let Some(names) = by_canton.get(canton.as_str()) else {
            continue;
        };
        mapping.extend(names.iter().map(|name| StationRegionMapping {
            bpuic: *bpuic,
            weather_station_name: name.to_string(),
            canton: canton.clone(),
        }));
    }

    mapping
}

/// Read both station relations back from `store` and join them.
pub fn region_mapping_from_store<S: Store + ?Sized>(store: &S) -> Result<Vec<StationRegionMapping>> {
    let weather = weather_projection(store)?;
    let transport = transport_projection(store)?;
    debug!(
        weather_stations = weather.len(),
        transport_stations = transport.len(),
        "Loaded station projections for canton join"
    );
    Ok(build_region_mapping(&weather, &transport))
}

fn weather_projection<S: Store + ?Sized>(store: &S) -> Result<Vec<(String, Option<String>)>> {
    let e = Entity::WeatherStation;
    let mut rows = Vec::new();
    store.scan_columns(e, &["weatherstationname", "canton"], &mut |batch| {
        let names = column::<StringArray>(&batch, e, "weatherstationname")?;
        let cantons = column::<StringArray>(&batch, e, "canton")?;
        for i in 0..batch.num_rows() {
            rows.push((required_string(names, i, e, "weatherstationname")?, string_at(cantons, i)));
        }
        Ok(())
    })?;
    Ok(rows)
}

fn transport_projection<S: Store + ?Sized>(store: &S) -> Result<Vec<(i64, Option<String>)>> {
    let e = Entity::TransportStation;
    let mut rows = Vec::new();
    store.scan_columns(e, &["bpuic", "canton"], &mut |batch| {
        let ids = column::<Int64Array>(&batch, e, "bpuic")?;
        let cantons = column::<StringArray>(&batch, e, "canton")?;
        for i in 0..batch.num_rows() {
            rows.push((required_i64(ids, i, e, "bpuic")?, string_at(cantons, i)));
        }
        Ok(())
    })?;
    Ok(rows)
}
