//! Batch orchestration.
//!
//! URLs are processed strictly one after another. A failed URL is recorded
//! in the [`MigrationLog`] and the batch moves on.

use std::time::Duration;
use uuid::Uuid;

use crate::models::gallery::{AssetLocation, RecordLocation};
use crate::models::metadata::MigrationTask;
use crate::models::migration_log::MigrationLog;
use crate::services::archive::{ArchiveError, ArchiveUnpacker};
use crate::services::generation::{GenerationClient, GenerationError};
use crate::services::metadata::extract_metadata;
use crate::services::prompt::build_prompt;
use crate::services::publisher::AssetPublisher;

pub struct Migrator {
    generation: GenerationClient,
    unpacker: ArchiveUnpacker,
    publisher: AssetPublisher,
    delay: Duration,
    cost_per_generation: f64,
}

/// Per-URL summary of a successful migration.
#[derive(Debug)]
pub struct TaskReport {
    pub trace_id: String,
    pub remote: usize,
    pub local: usize,
    pub unsaved: usize,
    /// Records kept in the local metadata log instead of the table
    pub logged_locally: usize,
    /// Records stored nowhere
    pub unrecorded: usize,
}

impl Migrator {
    pub fn new(
        generation: GenerationClient,
        unpacker: ArchiveUnpacker,
        publisher: AssetPublisher,
        delay: Duration,
        cost_per_generation: f64,
    ) -> Self {
        Self {
            generation,
            unpacker,
            publisher,
            delay,
            cost_per_generation,
        }
    }

    /// Migrate every URL in order, accumulating results into `log`.
    pub async fn run(&self, urls: &[String], log: &mut MigrationLog) {
        log.total_urls += urls.len();
        tracing::info!(total = urls.len(), "Starting Gamma gallery migration");

        for (i, url) in urls.iter().enumerate() {
            println!("[{}/{}] Processing {}", i + 1, urls.len(), url);

            match self.migrate_url(url, log).await {
                Ok(report) => {
                    tracing::info!(
                        url = %url,
                        trace_id = %report.trace_id,
                        remote = report.remote,
                        local = report.local,
                        unsaved = report.unsaved,
                        logged_locally = report.logged_locally,
                        "Successfully migrated"
                    );
                    log.record_success(self.cost_per_generation);
                }
                Err(e) => {
                    tracing::error!(url = %url, error = %e, "Migration failed");
                    log.record_failure(e.to_string());
                }
            }

            if i + 1 < urls.len() && !self.delay.is_zero() {
                tracing::debug!(delay_ms = self.delay.as_millis() as u64, "Waiting before next request");
                tokio::time::sleep(self.delay).await;
            }
        }
    }

    /// Run one URL through generate, unpack and publish.
    pub async fn migrate_url(
        &self,
        url: &str,
        log: &mut MigrationLog,
    ) -> Result<TaskReport, MigrationError> {
        let task = new_task(url);
        log.trace_ids.push(task.trace_id.clone());
        let trace_id = task.trace_id.as_str();

        tracing::info!(
            url,
            trace_id,
            niche = %task.metadata.niche,
            language = %task.metadata.language,
            fomo_score = task.metadata.fomo_score,
            "Processing URL"
        );

        let prompt = build_prompt(url, &task.metadata);
        let generation = self.generation.generate(&prompt, trace_id).await;
        let mut warnings = generation.warnings;

        let archive_url = match generation.outcome {
            Ok(archive_url) => archive_url,
            Err(source) => {
                log.record_warnings(url, trace_id, warnings);
                return Err(MigrationError::Generation {
                    url: url.to_string(),
                    trace_id: task.trace_id.clone(),
                    source,
                });
            }
        };

        let unpacked = match self.unpacker.fetch(&archive_url, trace_id).await {
            Ok(unpacked) => unpacked,
            Err(source) => {
                log.record_warnings(url, trace_id, warnings);
                return Err(MigrationError::Extraction {
                    url: url.to_string(),
                    trace_id: task.trace_id.clone(),
                    source,
                });
            }
        };
        tracing::info!(trace_id, count = unpacked.images.len(), "Extracted images");
        warnings.extend(
            unpacked
                .skipped
                .iter()
                .map(|entry| format!("skipped archive entry {}", entry)),
        );

        let assets = self.publisher.publish(&unpacked.images, &task).await;

        let mut report = TaskReport {
            trace_id: task.trace_id.clone(),
            remote: 0,
            local: 0,
            unsaved: 0,
            logged_locally: 0,
            unrecorded: 0,
        };
        for asset in &assets {
            match &asset.location {
                AssetLocation::Remote => report.remote += 1,
                AssetLocation::Local(path) => {
                    report.local += 1;
                    warnings.push(format!(
                        "{} stored locally at {}",
                        asset.storage_path,
                        path.display()
                    ));
                }
                AssetLocation::Unsaved(reason) => {
                    report.unsaved += 1;
                    warnings.push(format!("{} not saved: {}", asset.storage_path, reason));
                }
            }
            match &asset.record_location {
                RecordLocation::Table => {}
                RecordLocation::LocalLog(path) => {
                    report.logged_locally += 1;
                    warnings.push(format!(
                        "{} metadata logged locally at {}",
                        asset.storage_path,
                        path.display()
                    ));
                }
                RecordLocation::Unrecorded(reason) => {
                    report.unrecorded += 1;
                    warnings.push(format!(
                        "{} metadata not recorded: {}",
                        asset.storage_path, reason
                    ));
                }
            }
        }
        log.remote_assets += report.remote;
        log.local_assets += report.local;
        log.record_warnings(url, trace_id, warnings);

        if !assets.iter().any(|asset| asset.location.is_saved()) {
            return Err(MigrationError::Publish {
                url: url.to_string(),
                trace_id: task.trace_id.clone(),
            });
        }
        if report.unrecorded == assets.len() {
            return Err(MigrationError::Metadata {
                url: url.to_string(),
                trace_id: task.trace_id.clone(),
            });
        }

        Ok(report)
    }
}

fn new_task(url: &str) -> MigrationTask {
    let trace_id = Uuid::new_v4().simple().to_string()[..8].to_string();
    MigrationTask {
        source_url: url.to_string(),
        trace_id,
        metadata: extract_metadata(url),
    }
}

/// Task-level failure. The message names the URL and trace id.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("API call failed: {url} - Trace: {trace_id} ({source})")]
    Generation {
        url: String,
        trace_id: String,
        source: GenerationError,
    },

    #[error("ZIP extraction failed: {url} - Trace: {trace_id} ({source})")]
    Extraction {
        url: String,
        trace_id: String,
        source: ArchiveError,
    },

    #[error("Upload failed: {url} - Trace: {trace_id}")]
    Publish { url: String, trace_id: String },

    #[error("Metadata insert failed: {url} - Trace: {trace_id}")]
    Metadata { url: String, trace_id: String },
}
