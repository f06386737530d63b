//! The body of each import stage.
//!
//! Every stage streams its source files batch by batch: conform and parse,
//! dedup or filter, then append. Nothing is buffered across batches except
//! the dedup key sets and the surrogate key counter.

use crate::config::{delimiter_byte, Settings};
use crate::error::Result;
use crate::models::{
    StagedEventInfo, TransportEvent, TransportEventInfo, TransportJourney, TransportOperator,
    TransportStation, TransportStationInfo, TransportUndertaking, WeatherMeasurement,
    WeatherStation,
};
use crate::pipeline::{Stage, StageReport};
use crate::processors::{
    dedup_within_batch, normalize, region_mapping_from_store, DedupTracker, ReferentialFilter,
    SurrogateKeyGenerator,
};
use crate::readers::{discover_csv_files, BatchIter, ChunkedReader, RawBatch};
use crate::schema::Entity;
use crate::utils::ProgressReporter;
use crate::writers::relation::Relation;
use crate::writers::store::{append_rows, distinct_i64, distinct_strings};
use crate::writers::Store;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Executes one stage against a store and accumulates its report.
pub struct StageRunner<'a, S: Store + ?Sized> {
    settings: &'a Settings,
    store: &'a mut S,
    progress: &'a ProgressReporter,
    report: StageReport,
}

impl<'a, S: Store + ?Sized> StageRunner<'a, S> {
    pub fn new(
        settings: &'a Settings,
        store: &'a mut S,
        progress: &'a ProgressReporter,
        stage: Stage,
    ) -> Self {
        Self {
            settings,
            store,
            progress,
            report: StageReport::new(stage),
        }
    }

    pub fn run(mut self) -> Result<StageReport> {
        match self.report.stage {
            Stage::WeatherStations => self.weather_stations()?,
            Stage::WeatherMeasurements => self.weather_measurements()?,
            Stage::TransportStations => self.transport_stations()?,
            Stage::RegionMapping => self.region_mapping()?,
            Stage::StationInfo => self.station_info()?,
            Stage::TransportEvents => self.transport_events()?,
            Stage::OperatorsAndJourneys => self.operators_and_journeys()?,
            Stage::EventInfo => self.event_info()?,
        }
        Ok(self.report)
    }

    fn weather_stations(&mut self) -> Result<()> {
        let reader = self.weather_reader()?;
        let path = self.settings.weather_stations_path();

        for batch in self.open(&reader, &path)? {
            let batch = self.observe(batch?);
            let stations: Vec<WeatherStation> = normalize(&batch)?;
            self.write(&stations)?;
        }
        Ok(())
    }

    fn weather_measurements(&mut self) -> Result<()> {
        let reader = self.weather_reader()?;

        for path in self.source_files(&[self.settings.weather_measurements_dir()])? {
            for batch in self.open(&reader, &path)? {
                let batch = self.observe(batch?);
                let measurements: Vec<WeatherMeasurement> = normalize(&batch)?;
                self.write(&measurements)?;
            }
        }
        Ok(())
    }

    fn transport_stations(&mut self) -> Result<()> {
        let reader = self.stop_reader()?;
        let path = self.settings.transport_stops_path();

        for batch in self.open(&reader, &path)? {
            let batch = self.observe(batch?);
            let stations: Vec<TransportStation> = normalize(&batch)?;
            let (stations, dropped) = dedup_within_batch(stations, |s| s.bpuic);
            self.report.duplicates_dropped += dropped;
            self.write(&stations)?;
        }
        Ok(())
    }

    fn region_mapping(&mut self) -> Result<()> {
        self.progress.set_message("Joining stations on canton");
        let mapping = region_mapping_from_store(&*self.store)?;
        self.report.rows_read = self.store.row_count(Entity::WeatherStation)?
            + self.store.row_count(Entity::TransportStation)?;
        self.progress.increment(mapping.len() as u64);
        self.write(&mapping)
    }

    fn station_info(&mut self) -> Result<()> {
        let reader = self.stop_reader()?;
        let path = self.settings.transport_stops_path();

        for batch in self.open(&reader, &path)? {
            let batch = self.observe(batch?);

            let undertakings: Vec<TransportUndertaking> = normalize(&batch)?;
            let (undertakings, dropped) = dedup_within_batch(undertakings, |u| u.tu_code.clone());
            self.report.duplicates_dropped += dropped;
            self.write(&undertakings)?;

            let info: Vec<TransportStationInfo> = normalize(&batch)?;
            self.write(&info)?;
        }
        Ok(())
    }

    fn transport_events(&mut self) -> Result<()> {
        let reader = self.event_reader()?;
        let parents = self.station_filter()?;

        for path in self.source_files(&self.settings.event_dirs())? {
            for batch in self.open(&reader, &path)? {
                let batch = self.observe(batch?);
                let events: Vec<TransportEvent> = normalize(&batch)?;
                let kept = parents.retain(events, |e| e.bpuic);
                self.report.orphans_dropped += kept.orphans;
                self.write(&kept.rows)?;
            }
        }
        Ok(())
    }

    fn operators_and_journeys(&mut self) -> Result<()> {
        let reader = self.event_reader()?;
        let mut operators = DedupTracker::seeded(
            "transportoperator",
            distinct_strings(&*self.store, Entity::TransportOperator, "betreiberid")?,
        );
        let mut journeys = DedupTracker::seeded(
            "transportjourney",
            distinct_strings(&*self.store, Entity::TransportJourney, "fahrt_bezeichner")?,
        );

        for path in self.source_files(&self.settings.event_dirs())? {
            for batch in self.open(&reader, &path)? {
                let batch = self.observe(batch?);

                let rows: Vec<TransportOperator> = normalize(&batch)?;
                let fresh = operators.filter(rows, |o| o.operator_id.clone());
                self.report.duplicates_dropped += fresh.dropped();
                self.write(&fresh.rows)?;

                let rows: Vec<TransportJourney> = normalize(&batch)?;
                let fresh = journeys.filter(rows, |j| j.journey_id.clone());
                self.report.duplicates_dropped += fresh.dropped();
                self.write(&fresh.rows)?;
            }
        }

        debug!(
            operators = operators.len(),
            journeys = journeys.len(),
            "Tracked keys after stage"
        );
        Ok(())
    }

    fn event_info(&mut self) -> Result<()> {
        let reader = self.event_reader()?;
        let parents = self.station_filter()?;
        let stored_max = self.store.max_i64(Entity::TransportEventInfo, "tid")?;
        let mut keys = SurrogateKeyGenerator::for_mode(self.settings.ingest.surrogate_keys, stored_max);
        info!(
            first_tid = keys.peek(),
            mode = ?self.settings.ingest.surrogate_keys,
            "Surrogate keys initialised"
        );

        for path in self.source_files(&self.settings.event_dirs())? {
            for batch in self.open(&reader, &path)? {
                let batch = self.observe(batch?);
                let staged: Vec<StagedEventInfo> = normalize(&batch)?;
                let kept = parents.retain(staged, |s| s.bpuic);
                self.report.orphans_dropped += kept.orphans;

                let tids = keys.assign(kept.rows.len());
                let rows: Vec<TransportEventInfo> = kept
                    .rows
                    .into_iter()
                    .zip(tids)
                    .map(|(staged, tid)| staged.into_row(tid))
                    .collect();
                self.write(&rows)?;
            }
        }
        Ok(())
    }

    /// Parent key set for station foreign keys, loaded once per stage.
    fn station_filter(&self) -> Result<ReferentialFilter<i64>> {
        let parents = distinct_i64(&*self.store, Entity::TransportStation, "bpuic")?;
        if parents.is_empty() {
            warn!(
                stage = %self.report.stage,
                "No transport stations stored; every event row will be dropped"
            );
        }
        Ok(ReferentialFilter::new(Entity::TransportStation.table_name(), parents))
    }

    fn weather_reader(&self) -> Result<ChunkedReader> {
        self.reader(&self.settings.ingest.weather_delimiter, &self.settings.ingest.weather_encoding)
    }

    fn stop_reader(&self) -> Result<ChunkedReader> {
        self.reader(&self.settings.ingest.stop_delimiter, &self.settings.ingest.default_encoding)
    }

    fn event_reader(&self) -> Result<ChunkedReader> {
        self.reader(&self.settings.ingest.event_delimiter, &self.settings.ingest.default_encoding)
    }

    fn reader(&self, delimiter: &str, encoding: &str) -> Result<ChunkedReader> {
        Ok(ChunkedReader::new(delimiter_byte(delimiter)?)
            .with_encoding(encoding)?
            .with_batch_rows(self.settings.chunk_bound()))
    }

    /// CSV files of each directory, directories in the given order.
    fn source_files(&self, dirs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for dir in dirs {
            let found = discover_csv_files(dir)?;
            if found.is_empty() {
                warn!(directory = %dir.display(), "No CSV files found");
            }
            files.extend(found);
        }
        Ok(files)
    }

    fn open(&mut self, reader: &ChunkedReader, path: &Path) -> Result<BatchIter> {
        info!(stage = %self.report.stage, file = %path.display(), "Processing file");
        self.report.files += 1;
        self.progress.set_message(&format!(
            "{}: {}",
            self.report.stage,
            path.file_name().unwrap_or(path.as_os_str()).to_string_lossy()
        ));
        reader.open(path)
    }

    fn observe(&mut self, batch: RawBatch) -> RawBatch {
        self.report.batches += 1;
        self.report.rows_read += batch.len();
        self.progress.increment(batch.len() as u64);
        batch
    }

    fn write<R: Relation>(&mut self, rows: &[R]) -> Result<()> {
        let written = append_rows(&mut *self.store, rows)?;
        self.report.record_written(R::ENTITY.table_name(), written);
        Ok(())
    }
}
