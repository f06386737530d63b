pub mod event;
pub mod event_info;
pub mod measurement;
pub mod operator;
pub mod region_mapping;
pub mod transport_station;
pub mod weather_station;

pub use event::TransportEvent;
pub use event_info::{StagedEventInfo, TransportEventInfo};
pub use measurement::{WeatherMeasurement, MEASUREMENT_COLUMNS};
pub use operator::{TransportJourney, TransportOperator};
pub use region_mapping::StationRegionMapping;
pub use transport_station::{TransportStation, TransportStationInfo, TransportUndertaking};
pub use weather_station::{elevation_profile, ElevationGroup, WeatherStation};
