//! Declarative raw-column → canonical-column tables for every relation.
//!
//! Each source dataset names its columns differently (German abbreviations in
//! the transport exports, MeteoSwiss parameter codes in the measurement
//! files). The tables below are the single place where those names are tied
//! to the canonical column names used in storage.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every relation the pipeline writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Entity {
    WeatherStation,
    WeatherMeasurement,
    TransportStation,
    TransportUndertaking,
    TransportStationInfo,
    StationRegionMapping,
    TransportOperator,
    TransportJourney,
    TransportEvent,
    TransportEventInfo,
}

impl Entity {
    pub const ALL: [Entity; 10] = [
        Entity::WeatherStation,
        Entity::WeatherMeasurement,
        Entity::TransportStation,
        Entity::TransportUndertaking,
        Entity::TransportStationInfo,
        Entity::StationRegionMapping,
        Entity::TransportOperator,
        Entity::TransportJourney,
        Entity::TransportEvent,
        Entity::TransportEventInfo,
    ];

    /// Name of the destination relation.
    pub fn table_name(&self) -> &'static str {
        match self {
            Entity::WeatherStation => "weatherstation",
            Entity::WeatherMeasurement => "weather",
            Entity::TransportStation => "transportstation",
            Entity::TransportUndertaking => "transportundertaking",
            Entity::TransportStationInfo => "transportstationinfo",
            Entity::StationRegionMapping => "map_to_transport",
            Entity::TransportOperator => "transportoperator",
            Entity::TransportJourney => "transportjourney",
            Entity::TransportEvent => "transportevent",
            Entity::TransportEventInfo => "transporteventinfo",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table_name())
    }
}

/// Columns removed from a batch after renaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPolicy {
    /// Only the listed raw columns are discarded.
    Columns(&'static [&'static str]),
    /// Everything not named in the rename table is discarded (a projection).
    AllUnmapped,
}

/// Rename table and drop list for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySchema {
    pub entity: Entity,
    /// Ordered `(raw, canonical)` pairs. Every raw column listed here is required.
    pub renames: &'static [(&'static str, &'static str)],
    pub drops: DropPolicy,
}

impl EntitySchema {
    pub fn for_entity(entity: Entity) -> Self {
        let (renames, drops) = match entity {
            Entity::WeatherStation => (WEATHER_STATION_RENAMES, DropPolicy::Columns(WEATHER_STATION_DROPS)),
            Entity::WeatherMeasurement => (MEASUREMENT_RENAMES, DropPolicy::Columns(&[])),
            Entity::TransportStation => (TRANSPORT_STATION_RENAMES, DropPolicy::Columns(TRANSPORT_STATION_DROPS)),
            Entity::TransportUndertaking => (UNDERTAKING_RENAMES, DropPolicy::AllUnmapped),
            Entity::TransportStationInfo => (STATION_INFO_RENAMES, DropPolicy::AllUnmapped),
            Entity::StationRegionMapping => (&[][..], DropPolicy::Columns(&[])),
            Entity::TransportOperator => (OPERATOR_RENAMES, DropPolicy::AllUnmapped),
            Entity::TransportJourney => (JOURNEY_RENAMES, DropPolicy::AllUnmapped),
            Entity::TransportEvent => (EVENT_RENAMES, DropPolicy::Columns(EVENT_DROPS)),
            Entity::TransportEventInfo => (EVENT_INFO_RENAMES, DropPolicy::AllUnmapped),
        };

        Self {
            entity,
            renames,
            drops,
        }
    }

    /// Canonical name for a raw header, if the header is mapped.
    pub fn canonical(&self, raw: &str) -> Option<&'static str> {
        self.renames
            .iter()
            .find(|(from, _)| *from == raw)
            .map(|(_, to)| *to)
    }

    /// Canonical column names in rename-table order.
    pub fn canonical_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.renames.iter().map(|(_, to)| *to)
    }

    /// Raw columns to discard from a source with the given headers.
    pub fn drop_list<'h>(&self, headers: impl IntoIterator<Item = &'h str>) -> Vec<String> {
        match self.drops {
            DropPolicy::Columns(columns) => columns.iter().map(|c| c.to_string()).collect(),
            DropPolicy::AllUnmapped => headers
                .into_iter()
                .filter(|h| self.canonical(h).is_none())
                .map(str::to_string)
                .collect(),
        }
    }
}

const WEATHER_STATION_RENAMES: &[(&str, &str)] = &[
    ("Station", "station"),
    ("station/location", "weatherstationname"),
    ("WIGOS-ID", "wigosid"),
    ("Data since", "datasince"),
    ("Station height m. a. sea level", "stationheight"),
    ("CoordinatesE", "coorde"),
    ("CoordinatesN", "coordn"),
    ("Latitude", "lat"),
    ("Longitude", "long"),
    ("Climate region", "climateregion"),
    ("Canton", "canton"),
];

const WEATHER_STATION_DROPS: &[&str] = &["URL Previous years (verified data)", "URL Current year"];

const MEASUREMENT_RENAMES: &[(&str, &str)] = &[
    ("station/location", "weatherstationname"),
    ("date", "date"),
    ("gre000d0", "globalradiation"),
    ("hto000d0", "totalsnowdepth"),
    ("nto000d0", "cloudcover"),
    ("prestad0", "pressure"),
    ("rre150d0", "precipitation"),
    ("sre000d0", "sunshineduration"),
    ("tre200d0", "airtemperature_mean"),
    ("tre200dn", "airtemperature_min"),
    ("tre200dx", "airtemperature_max"),
    ("ure200d0", "relativehumidity"),
];

const TRANSPORT_STATION_RENAMES: &[(&str, &str)] = &[
    ("BPUIC", "bpuic"),
    ("BP_BEZEICHNUNG", "tstationname"),
    ("BP_ABKUERZUNG", "tstation_abk"),
    ("BP_ID", "bp_id"),
    ("SLOID", "sloid"),
    ("KANTON", "canton"),
];

const TRANSPORT_STATION_DROPS: &[&str] = &[
    "FP_ID",
    "TU_CODE",
    "TU_BEZEICHNUNG",
    "TU_ABKUERZUNG",
    "FARTNUMMER",
    "VM_ART",
    "FAHRTAGE",
    "AB_ZEIT_KB",
    "AN_ZEIT_KB",
    "RICHTUNG_TEXT_AGGREGIERT",
    "END_BP_BEZEICHNUNG",
    "LINIE",
];

const UNDERTAKING_RENAMES: &[(&str, &str)] = &[
    ("TU_CODE", "tu_code"),
    ("TU_BEZEICHNUNG", "tu_bezeichnung"),
    ("TU_ABKUERZUNG", "tu_abkuerzung"),
];

const STATION_INFO_RENAMES: &[(&str, &str)] = &[
    ("FP_ID", "fpid"),
    ("TU_CODE", "tu_code"),
    ("FARTNUMMER", "fartnummer"),
    ("BPUIC", "bpuic"),
    ("VM_ART", "vm_art"),
    ("FAHRTAGE", "fahrtage"),
    ("AB_ZEIT_KB", "ab_zeit_kb"),
    ("AN_ZEIT_KB", "an_zeit_kb"),
    ("RICHTUNG_TEXT_AGGREGIERT", "richtung_text_aggregiert"),
    ("END_BP_BEZEICHNUNG", "end_bp_bezeichnung"),
    ("LINIE", "linie"),
];

const OPERATOR_RENAMES: &[(&str, &str)] = &[
    ("BETREIBER_ID", "betreiberid"),
    ("BETREIBER_ABK", "betreiberabk"),
    ("BETREIBER_NAME", "betreibername"),
];

const JOURNEY_RENAMES: &[(&str, &str)] = &[
    ("FAHRT_BEZEICHNER", "fahrt_bezeichner"),
    ("LINIEN_ID", "linienid"),
    ("LINIEN_TEXT", "linientext"),
    ("UMLAUF_ID", "umlaufid"),
    ("VERKEHRSMITTEL_TEXT", "verkehrsmitteltext"),
];

const EVENT_RENAMES: &[(&str, &str)] = &[
    ("BETRIEBSTAG", "date"),
    ("BPUIC", "bpuic"),
    ("PRODUKT_ID", "produktid"),
    ("ANKUNFTSZEIT", "arrivaltime"),
    ("ABFAHRTSZEIT", "departuretime"),
    ("FAELLT_AUS_TF", "faelltaus"),
];

const EVENT_DROPS: &[&str] = &[
    "FAHRT_BEZEICHNER",
    "BETREIBER_ID",
    "BETREIBER_ABK",
    "BETREIBER_NAME",
    "LINIEN_ID",
    "LINIEN_TEXT",
    "UMLAUF_ID",
    "VERKEHRSMITTEL_TEXT",
    "ZUSATZFAHRT_TF",
    "HALTESTELLEN_NAME",
    "AN_PROGNOSE",
    "AN_PROGNOSE_STATUS",
    "AB_PROGNOSE",
    "AB_PROGNOSE_STATUS",
    "DURCHFAHRT_TF",
];

const EVENT_INFO_RENAMES: &[(&str, &str)] = &[
    ("FAHRT_BEZEICHNER", "fahrt_bezeichner"),
    ("BETREIBER_ID", "betreiberid"),
    ("ZUSATZFAHRT_TF", "zusatzfahrt_tf"),
    ("AN_PROGNOSE", "arrivaltimepred"),
    ("AN_PROGNOSE_STATUS", "arrivalpredstatus"),
    ("AB_PROGNOSE", "departuretimepred"),
    ("AB_PROGNOSE_STATUS", "departurepredstatus"),
    ("DURCHFAHRT_TF", "durchfahrt_tf"),
    ("BPUIC", "bpuic"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_entity_has_a_distinct_table() {
        let mut names: Vec<&str> = Entity::ALL.iter().map(|e| e.table_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Entity::ALL.len());
    }

    #[test]
    fn test_weather_station_mapping() {
        let schema = EntitySchema::for_entity(Entity::WeatherStation);
        assert_eq!(schema.canonical("station/location"), Some("weatherstationname"));
        assert_eq!(schema.canonical("Canton"), Some("canton"));
        assert_eq!(schema.canonical("URL Current year"), None);

        let drops = schema.drop_list(["Station", "URL Current year"]);
        assert_eq!(drops, vec!["URL Previous years (verified data)", "URL Current year"]);
    }

    #[test]
    fn test_projection_drops_everything_unmapped() {
        let schema = EntitySchema::for_entity(Entity::TransportOperator);
        let headers = ["BETRIEBSTAG", "BETREIBER_ID", "BETREIBER_ABK", "BETREIBER_NAME", "BPUIC"];
        assert_eq!(schema.drop_list(headers), vec!["BETRIEBSTAG", "BPUIC"]);
    }

    #[test]
    fn test_canonical_columns_keep_table_order() {
        let schema = EntitySchema::for_entity(Entity::TransportEvent);
        let columns: Vec<&str> = schema.canonical_columns().collect();
        assert_eq!(
            columns,
            vec!["date", "bpuic", "produktid", "arrivaltime", "departuretime", "faelltaus"]
        );
    }

    #[test]
    fn test_region_mapping_has_no_source_columns() {
        let schema = EntitySchema::for_entity(Entity::StationRegionMapping);
        assert!(schema.renames.is_empty());
    }
}
