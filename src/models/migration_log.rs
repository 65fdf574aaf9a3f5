use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// Errors listed in full before the summary truncates.
const SUMMARY_ERROR_LIMIT: usize = 5;

/// Non-fatal issues collected for one URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UrlWarnings {
    pub url: String,
    pub trace_id: String,
    pub warnings: Vec<String>,
}

/// Accumulator for one batch run, written to disk when the run ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationLog {
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<f64>,
    pub total_urls: usize,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<UrlWarnings>,
    pub cost_estimate: f64,
    pub trace_ids: Vec<String>,
    /// Images that reached the object store
    pub remote_assets: usize,
    /// Images that only reached the local fallback directory
    pub local_assets: usize,
}

impl Default for MigrationLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationLog {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            completed_at: None,
            duration_minutes: None,
            total_urls: 0,
            processed: 0,
            successful: 0,
            failed: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            cost_estimate: 0.0,
            trace_ids: Vec::new(),
            remote_assets: 0,
            local_assets: 0,
        }
    }

    pub fn record_success(&mut self, cost: f64) {
        self.processed += 1;
        self.successful += 1;
        self.cost_estimate += cost;
    }

    pub fn record_failure(&mut self, error: String) {
        self.processed += 1;
        self.failed += 1;
        self.errors.push(error);
    }

    /// Attach warnings for a URL; empty lists are dropped.
    pub fn record_warnings(&mut self, url: &str, trace_id: &str, warnings: Vec<String>) {
        if warnings.is_empty() {
            return;
        }
        self.warnings.push(UrlWarnings {
            url: url.to_string(),
            trace_id: trace_id.to_string(),
            warnings,
        });
    }

    /// Stamp completion time and duration.
    pub fn finish(&mut self) {
        let completed_at = Utc::now();
        let elapsed = completed_at - self.started_at;
        self.duration_minutes = Some(elapsed.num_milliseconds() as f64 / 60_000.0);
        self.completed_at = Some(completed_at);
    }

    /// Write the log as pretty-printed JSON.
    pub fn write_to(&self, path: &Path) -> Result<(), LogWriteError> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Human-readable end-of-run summary.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Migration Summary:");
        let _ = writeln!(out, "   Total URLs: {}", self.total_urls);
        let _ = writeln!(out, "   Processed: {}", self.processed);
        let _ = writeln!(out, "   Successful: {}", self.successful);
        let _ = writeln!(out, "   Failed: {}", self.failed);
        let _ = writeln!(
            out,
            "   Images: {} remote, {} local fallback",
            self.remote_assets, self.local_assets
        );
        let _ = writeln!(out, "   Cost Estimate: ${:.2}", self.cost_estimate);
        let _ = writeln!(
            out,
            "   Duration: {:.1} minutes",
            self.duration_minutes.unwrap_or(0.0)
        );

        if !self.warnings.is_empty() {
            let _ = writeln!(out, "Warnings encountered:");
            for entry in &self.warnings {
                let _ = writeln!(out, "   - {}: {}", entry.url, entry.warnings.join("; "));
            }
        }

        if !self.errors.is_empty() {
            let _ = writeln!(out, "Errors encountered:");
            for error in self.errors.iter().take(SUMMARY_ERROR_LIMIT) {
                let _ = writeln!(out, "   - {}", error);
            }
            if self.errors.len() > SUMMARY_ERROR_LIMIT {
                let _ = writeln!(
                    out,
                    "   - ... and {} more errors",
                    self.errors.len() - SUMMARY_ERROR_LIMIT
                );
            }
        }

        out
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LogWriteError {
    #[error("Failed to serialize migration log: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write migration log: {0}")]
    Io(#[from] std::io::Error),
}
