//! Asset publishing with local fallbacks.
//!
//! Images go to the object store and metadata rows go to the gallery table.
//! When either remote side is missing or fails, the data lands under the
//! fallback directory instead, and the returned locations say which one
//! actually holds it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::models::gallery::{AssetLocation, GalleryRecord, ImageAsset, RecordLocation, StoredAsset};
use crate::models::metadata::MigrationTask;
use crate::services::gallery_table::GalleryTable;
use crate::services::storage::ObjectStore;

const PNG_CONTENT_TYPE: &str = "image/png";
/// Cards at or above this score are featured in the gallery.
const FEATURED_FOMO_SCORE: i16 = 8;

pub struct AssetPublisher {
    store: Option<Arc<dyn ObjectStore>>,
    table: Option<Arc<dyn GalleryTable>>,
    fallback_dir: PathBuf,
}

impl AssetPublisher {
    pub fn new(
        store: Option<Arc<dyn ObjectStore>>,
        table: Option<Arc<dyn GalleryTable>>,
        fallback_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            table,
            fallback_dir: fallback_dir.into(),
        }
    }

    pub fn fallback_dir(&self) -> &Path {
        &self.fallback_dir
    }

    /// Publish every image of a task. One [`StoredAsset`] per input image, in order.
    pub async fn publish(&self, images: &[ImageAsset], task: &MigrationTask) -> Vec<StoredAsset> {
        let mut assets = Vec::with_capacity(images.len());

        for (i, image) in images.iter().enumerate() {
            let storage_path = storage_path(task, i + 1);
            let location = self.store_image(&storage_path, &image.bytes, &task.trace_id).await;
            let record = gallery_record(task, &storage_path, i + 1, &location);
            let record_location = self.store_record(&record, &task.trace_id).await;

            assets.push(StoredAsset {
                storage_path,
                location,
                record,
                record_location,
            });
        }

        assets
    }

    async fn store_image(&self, storage_path: &str, bytes: &[u8], trace_id: &str) -> AssetLocation {
        match &self.store {
            Some(store) => match store.upload(storage_path, bytes, PNG_CONTENT_TYPE).await {
                Ok(()) => {
                    tracing::info!(trace_id, storage_path, "Uploaded to storage");
                    return AssetLocation::Remote;
                }
                Err(e) => {
                    tracing::error!(trace_id, storage_path, error = %e, "Upload failed, saving locally");
                }
            },
            None => {
                tracing::warn!(trace_id, storage_path, "Storage client not available, saving locally");
            }
        }

        let local_path = self.fallback_dir.join(storage_path);
        match write_file(&local_path, bytes).await {
            Ok(()) => {
                tracing::info!(trace_id, path = %local_path.display(), "Saved locally");
                AssetLocation::Local(local_path)
            }
            Err(e) => {
                tracing::error!(trace_id, storage_path, error = %e, "Local save failed");
                AssetLocation::Unsaved(e.to_string())
            }
        }
    }

    async fn store_record(&self, record: &GalleryRecord, trace_id: &str) -> RecordLocation {
        match &self.table {
            Some(table) => match table.insert(record).await {
                Ok(()) => {
                    tracing::info!(trace_id, storage_path = %record.storage_path, "Metadata inserted");
                    return RecordLocation::Table;
                }
                Err(e) => {
                    tracing::error!(
                        trace_id,
                        storage_path = %record.storage_path,
                        error = %e,
                        "Metadata insert failed, logging locally"
                    );
                }
            },
            None => {
                tracing::warn!(trace_id, "Gallery table not available, logging metadata locally");
            }
        }

        let log_path = self.metadata_log_path(trace_id);
        match append_json_line(&log_path, record).await {
            Ok(()) => RecordLocation::LocalLog(log_path),
            Err(e) => {
                tracing::error!(trace_id, error = %e, "Local metadata log failed");
                RecordLocation::Unrecorded(e.to_string())
            }
        }
    }

    /// JSON-lines file collecting fallback metadata for one task.
    pub fn metadata_log_path(&self, trace_id: &str) -> PathBuf {
        self.fallback_dir.join(format!("metadata_log_{}.jsonl", trace_id))
    }
}

/// `{niche}/{language}/{slug}-{index}-{trace_id}.png`, index 1-based.
pub fn storage_path(task: &MigrationTask, index: usize) -> String {
    let meta = &task.metadata;
    format!(
        "{}/{}/{}-{}-{}.png",
        meta.niche,
        meta.language,
        meta.slug(),
        index,
        task.trace_id
    )
}

fn gallery_record(
    task: &MigrationTask,
    storage_path: &str,
    index: usize,
    location: &AssetLocation,
) -> GalleryRecord {
    let meta = &task.metadata;
    GalleryRecord {
        original_gamma_url: task.source_url.clone(),
        storage_path: storage_path.to_string(),
        niche: meta.niche,
        language: meta.language,
        title: format!("{} - Card {}", meta.business_name, index),
        description: format!(
            "Professional {} ad card with {} theme",
            meta.niche, meta.cta_type
        ),
        fomo_score: meta.fomo_score,
        cta_type: meta.cta_type,
        is_featured: meta.fomo_score >= FEATURED_FOMO_SCORE,
        is_placeholder: false,
        utm_campaign: meta.utm_campaign.clone(),
        stored_remotely: *location == AssetLocation::Remote,
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, bytes).await
}

async fn append_json_line(path: &Path, record: &GalleryRecord) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}
