use crate::error::Result;
use crate::pipeline::Stage;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Counters for one executed stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub files: usize,
    pub batches: usize,
    pub rows_read: usize,
    pub duplicates_dropped: usize,
    /// Child rows dropped because their parent key was unknown.
    pub orphans_dropped: usize,
    /// Rows appended, per relation.
    pub rows_written: BTreeMap<String, usize>,
    pub elapsed_ms: u64,
}

impl StageReport {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            files: 0,
            batches: 0,
            rows_read: 0,
            duplicates_dropped: 0,
            orphans_dropped: 0,
            rows_written: stage
                .outputs()
                .iter()
                .map(|entity| (entity.table_name().to_string(), 0))
                .collect(),
            elapsed_ms: 0,
        }
    }

    pub fn record_written(&mut self, relation: &str, rows: usize) {
        *self.rows_written.entry(relation.to_string()).or_default() += rows;
    }

    pub fn total_written(&self) -> usize {
        self.rows_written.values().sum()
    }
}

/// Everything that happened in one orchestrated run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub stages: Vec<StageReport>,
    pub elapsed_ms: u64,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            stages: Vec::new(),
            elapsed_ms: 0,
        }
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|report| report.stage == stage)
    }

    pub fn total_orphans(&self) -> usize {
        self.stages.iter().map(|s| s.orphans_dropped).sum()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Ingestion Run Report ===\n");
        summary.push_str(&format!("Started: {}\n", self.started_at.format("%Y-%m-%d %H:%M:%S UTC")));
        summary.push_str(&format!("Elapsed: {:.1}s\n\n", self.elapsed_ms as f64 / 1000.0));

        for stage in &self.stages {
            summary.push_str(&format!(
                "{:<24} files {:>4}  read {:>10}  duplicates {:>8}  orphans {:>8}  {:.1}s\n",
                stage.stage.name(),
                stage.files,
                stage.rows_read,
                stage.duplicates_dropped,
                stage.orphans_dropped,
                stage.elapsed_ms as f64 / 1000.0
            ));
            for (relation, rows) in &stage.rows_written {
                summary.push_str(&format!("    -> {:<22} {:>10} rows\n", relation, rows));
            }
        }

        let orphans = self.total_orphans();
        if orphans > 0 {
            summary.push_str(&format!(
                "\n{} rows referenced unknown transport stations and were dropped\n",
                orphans
            ));
        }

        summary
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
