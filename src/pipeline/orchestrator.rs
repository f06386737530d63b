use crate::config::Settings;
use crate::error::Result;
use crate::pipeline::stages::StageRunner;
use crate::pipeline::{plan, RunReport, Stage};
use crate::utils::ProgressReporter;
use crate::writers::Store;
use std::time::Instant;
use tracing::{error, info};

/// Runs stages one after another against a single store.
///
/// There are no retries and no checkpoints: the first failing stage ends the
/// run, and whatever earlier stages appended stays in the store.
pub struct Orchestrator<'a, S: Store + ?Sized> {
    settings: &'a Settings,
    store: &'a mut S,
    show_progress: bool,
}

impl<'a, S: Store + ?Sized> Orchestrator<'a, S> {
    pub fn new(settings: &'a Settings, store: &'a mut S) -> Self {
        Self {
            settings,
            store,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Run `selected` (every stage when empty) in dependency order.
    pub fn run(&mut self, selected: &[Stage]) -> Result<RunReport> {
        let order = plan(selected)?;
        let names: Vec<&str> = order.iter().map(Stage::name).collect();
        info!(stages = ?names, "Starting ingestion run");

        let started = Instant::now();
        let mut run = RunReport::new();

        for stage in order {
            let progress = ProgressReporter::new_spinner(&format!("Running {}", stage), !self.show_progress);
            let stage_started = Instant::now();

            let mut report = StageRunner::new(self.settings, &mut *self.store, &progress, stage)
                .run()
                .map_err(|e| {
                    error!(stage = %stage, "Stage failed, halting run: {}", e);
                    e
                })?;
            report.elapsed_ms = stage_started.elapsed().as_millis() as u64;

            progress.finish_with_message(&format!(
                "{} complete: {} rows written",
                stage,
                report.total_written()
            ));
            info!(
                stage = %stage,
                files = report.files,
                rows_read = report.rows_read,
                rows_written = report.total_written(),
                duplicates_dropped = report.duplicates_dropped,
                orphans_dropped = report.orphans_dropped,
                elapsed_ms = report.elapsed_ms,
                "Stage finished"
            );
            run.stages.push(report);
        }

        run.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(elapsed_ms = run.elapsed_ms, "Ingestion run finished");
        Ok(run)
    }
}
