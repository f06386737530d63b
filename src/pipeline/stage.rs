use crate::error::{ProcessingError, Result};
use crate::schema::Entity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One import step. Declaration order is the legacy fixed run order and is
/// used as the tie-break when ordering independent stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    WeatherStations,
    WeatherMeasurements,
    TransportStations,
    RegionMapping,
    StationInfo,
    TransportEvents,
    OperatorsAndJourneys,
    EventInfo,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::WeatherStations,
        Stage::WeatherMeasurements,
        Stage::TransportStations,
        Stage::RegionMapping,
        Stage::StationInfo,
        Stage::TransportEvents,
        Stage::OperatorsAndJourneys,
        Stage::EventInfo,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::WeatherStations => "weather_stations",
            Stage::WeatherMeasurements => "weather_measurements",
            Stage::TransportStations => "transport_stations",
            Stage::RegionMapping => "region_mapping",
            Stage::StationInfo => "station_info",
            Stage::TransportEvents => "transport_events",
            Stage::OperatorsAndJourneys => "operators_and_journeys",
            Stage::EventInfo => "event_info",
        }
    }

    /// Stages whose relations this stage reads.
    pub fn dependencies(&self) -> &'static [Stage] {
        match self {
            Stage::WeatherStations | Stage::TransportStations => &[],
            Stage::WeatherMeasurements => &[Stage::WeatherStations],
            Stage::RegionMapping => &[Stage::WeatherStations, Stage::TransportStations],
            Stage::StationInfo | Stage::TransportEvents | Stage::OperatorsAndJourneys => {
                &[Stage::TransportStations]
            }
            Stage::EventInfo => &[Stage::TransportStations, Stage::OperatorsAndJourneys],
        }
    }

    /// Relations this stage appends to.
    pub fn outputs(&self) -> &'static [Entity] {
        match self {
            Stage::WeatherStations => &[Entity::WeatherStation],
            Stage::WeatherMeasurements => &[Entity::WeatherMeasurement],
            Stage::TransportStations => &[Entity::TransportStation],
            Stage::RegionMapping => &[Entity::StationRegionMapping],
            Stage::StationInfo => &[Entity::TransportUndertaking, Entity::TransportStationInfo],
            Stage::TransportEvents => &[Entity::TransportEvent],
            Stage::OperatorsAndJourneys => &[Entity::TransportOperator, Entity::TransportJourney],
            Stage::EventInfo => &[Entity::TransportEventInfo],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace('-', "_").to_ascii_lowercase();
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name() == wanted)
            .ok_or_else(|| ProcessingError::UnknownStage(s.to_string()))
    }
}

/// Order `selected` (all stages when empty) so that every stage runs after the
/// selected stages it depends on. Unselected dependencies are assumed to be
/// already loaded and are not added.
pub fn plan(selected: &[Stage]) -> Result<Vec<Stage>> {
    let mut pending: Vec<Stage> = if selected.is_empty() {
        Stage::ALL.to_vec()
    } else {
        let mut stages = selected.to_vec();
        stages.sort();
        stages.dedup();
        stages
    };

    let mut order = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let ready = pending.iter().position(|stage| {
            stage
                .dependencies()
                .iter()
                .all(|dep| !pending.contains(dep))
        });

        match ready {
            Some(index) => order.push(pending.remove(index)),
            None => {
                let names: Vec<&str> = pending.iter().map(Stage::name).collect();
                return Err(ProcessingError::StageCycle(names.join(", ")));
            }
        }
    }

    Ok(order)
}
