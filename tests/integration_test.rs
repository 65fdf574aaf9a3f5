mod fixtures;

use gamma_gallery_migrate::{
    config::AppConfig,
    db::{self, gallery_queries},
    models::gallery::GalleryRecord,
    models::metadata::MigrationTask,
    services::{
        gallery_table::{GalleryTable, PgGalleryTable},
        metadata::extract_metadata,
        publisher::storage_path,
        storage::{ObjectStore, SupabaseStorage},
    },
};
use uuid::Uuid;

/// Integration test: publish one card to live Supabase
///
/// This test verifies:
/// 1. Database connection and gamma_gallery schema
/// 2. Supabase Storage upload over the S3 endpoint
/// 3. Gallery row insert and lookup
///
/// Note: This requires SUPABASE_URL, SUPABASE_SERVICE_ROLE_KEY, GAMMA_API_KEY
/// and DATABASE_URL in the environment, and an existing gallery bucket.
#[tokio::test]
#[ignore] // Run with: cargo test --test integration_test -- --ignored
async fn test_live_publish() {
    let config = AppConfig::from_env().expect("Failed to load config");
    let database_url = config
        .database_url
        .as_deref()
        .expect("DATABASE_URL must be set for this test");

    let pool = db::init_pool(database_url)
        .await
        .expect("Failed to connect to database");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let project_ref = config.project_ref().expect("Cannot derive project ref");
    let storage = SupabaseStorage::new(
        &config.gallery_bucket,
        &config.storage_endpoint(),
        &config.storage_region,
        config.storage_access_key.as_deref().unwrap_or(project_ref),
        config
            .storage_secret_key
            .as_deref()
            .unwrap_or(&config.supabase_service_role_key),
        match config.storage_access_key {
            Some(_) => None,
            None => Some(config.supabase_service_role_key.as_str()),
        },
    )
    .expect("Failed to initialize storage");

    // Unique source URL so reruns don't collide
    let url = format!(
        "https://integration-plumbing-{}.gamma.site/",
        &Uuid::new_v4().simple().to_string()[..8]
    );
    let task = MigrationTask {
        source_url: url.clone(),
        trace_id: "itest001".to_string(),
        metadata: extract_metadata(&url),
    };
    let path = storage_path(&task, 1);

    // Step 1: Upload a card
    let card = fixtures::png_card(1080, 1080, 200);
    storage
        .upload(&path, &card, "image/png")
        .await
        .expect("Upload failed");
    println!("✓ Uploaded {}", path);

    // Step 2: Insert the gallery row
    let record = GalleryRecord {
        original_gamma_url: url.clone(),
        storage_path: path.clone(),
        niche: task.metadata.niche,
        language: task.metadata.language,
        title: format!("{} - Card 1", task.metadata.business_name),
        description: "Integration test card".to_string(),
        fomo_score: task.metadata.fomo_score,
        cta_type: task.metadata.cta_type,
        is_featured: false,
        is_placeholder: true,
        utm_campaign: task.metadata.utm_campaign.clone(),
        stored_remotely: true,
    };
    let table = PgGalleryTable::new(pool.clone());
    table.insert(&record).await.expect("Insert failed");
    println!("✓ Inserted gallery row");

    // Step 3: Row is visible
    let count = gallery_queries::count_for_url(&pool, &url)
        .await
        .expect("Count failed");
    assert_eq!(count, 1);
    println!("✓ Gallery row found");
}
