use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::gallery::GalleryRecord;

/// Insert a gallery row, returning its id
pub async fn insert_gallery_record(
    pool: &PgPool,
    record: &GalleryRecord,
) -> Result<Uuid, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO gamma_gallery (
            original_gamma_url, storage_path, niche, language, title, description,
            fomo_score, cta_type, is_featured, is_placeholder, utm_campaign, stored_remotely
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING id
        "#,
    )
    .bind(&record.original_gamma_url)
    .bind(&record.storage_path)
    .bind(record.niche.as_ref())
    .bind(record.language.as_ref())
    .bind(&record.title)
    .bind(&record.description)
    .bind(record.fomo_score)
    .bind(record.cta_type.as_ref())
    .bind(record.is_featured)
    .bind(record.is_placeholder)
    .bind(&record.utm_campaign)
    .bind(record.stored_remotely)
    .fetch_one(pool)
    .await?;

    row.try_get("id")
}

/// Count gallery rows for a source URL
pub async fn count_for_url(pool: &PgPool, original_gamma_url: &str) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS count
        FROM gamma_gallery
        WHERE original_gamma_url = $1
        "#,
    )
    .bind(original_gamma_url)
    .fetch_one(pool)
    .await?;

    row.try_get("count")
}
