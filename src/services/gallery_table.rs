use async_trait::async_trait;
use garde::Validate;
use sqlx::PgPool;

use crate::db::gallery_queries;
use crate::models::gallery::GalleryRecord;

/// Destination for gallery metadata rows.
#[async_trait]
pub trait GalleryTable: Send + Sync {
    async fn insert(&self, record: &GalleryRecord) -> Result<(), GalleryTableError>;
}

/// `gamma_gallery` table in the Supabase Postgres database.
pub struct PgGalleryTable {
    pool: PgPool,
}

impl PgGalleryTable {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GalleryTable for PgGalleryTable {
    async fn insert(&self, record: &GalleryRecord) -> Result<(), GalleryTableError> {
        record.validate()?;
        let id = gallery_queries::insert_gallery_record(&self.pool, record).await?;
        tracing::debug!(%id, storage_path = %record.storage_path, "Gallery row inserted");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GalleryTableError {
    #[error("Invalid gallery record: {0}")]
    Invalid(#[from] garde::Report),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
