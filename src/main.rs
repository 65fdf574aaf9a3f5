use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use gamma_gallery_migrate::{
    config::AppConfig,
    db,
    models::migration_log::MigrationLog,
    services::{
        archive::ArchiveUnpacker,
        gallery_table::{GalleryTable, PgGalleryTable},
        generation::GenerationClient,
        migrator::Migrator,
        publisher::AssetPublisher,
        retry::RetryPolicy,
        storage::{ObjectStore, SupabaseStorage},
    },
};

/// Gamma pages migrated when no URL file is given.
const DEFAULT_GAMMA_URLS: &[&str] = &[
    "https://lupes-gourmet-tamales-ki0bb9s.gamma.site/",
    "https://stress-free-plumbing-fre-o80krz7.gamma.site/",
    "https://coolfix-fresno-xhcbhqq.gamma.site/",
    "https://coolfix-fresno-lvcnlk0.gamma.site/",
    "https://coolfix-fresno-w6yxeky.gamma.site/",
    "https://coolfixfresno-vjvpban.gamma.site/",
    "https://fresno-plumber-marketing-mpxds4u.gamma.site/",
    "https://modesto-piano-movers-vkcjkyg.gamma.site/",
    "https://r-movers-smb9gbi.gamma.site/",
    "https://r-movers-nszrisn.gamma.site/",
    "https://modesto-movers-zpfo6w4.gamma.site/",
    "https://rmovers-ienbs1i.gamma.site/",
    "https://rmoversmodesto-odlov19.gamma.site/",
    "https://rmoversmodesto-hkzjsdi.gamma.site/",
    "https://mudanzas-r-movers-sb78tsz.gamma.site/",
    "https://labor-day-weekend-sale-2i56zet.gamma.site/",
];

#[derive(Parser)]
#[command(name = "gallery-migrate", version, about = "Migrate Gamma ad card galleries to Supabase")]
struct Cli {
    /// File with one Gamma URL per line (`#` starts a comment)
    urls_file: Option<PathBuf>,

    /// Where the run log is written
    #[arg(long, default_value = "migration-log.json")]
    log_file: PathBuf,

    /// Local directory for images and metadata that could not reach Supabase
    #[arg(long, default_value = "migrated_files")]
    fallback_dir: PathBuf,

    /// Apply the gallery table migrations before migrating
    #[arg(long)]
    run_migrations: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();

    // Missing credentials are fatal before any work starts
    let config = AppConfig::from_env().expect(
        "Missing required environment variables. Check SUPABASE_URL, SUPABASE_SERVICE_ROLE_KEY, and GAMMA_API_KEY",
    );

    let urls = match &cli.urls_file {
        Some(path) => match load_urls(path) {
            Ok(urls) => urls,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to read URL file");
                return ExitCode::FAILURE;
            }
        },
        None => DEFAULT_GAMMA_URLS.iter().map(|u| u.to_string()).collect(),
    };

    tracing::info!(
        urls = urls.len(),
        expected_cost = urls.len() as f64 * config.cost_per_generation,
        "Initializing Gamma gallery migration"
    );

    let retry = RetryPolicy::default();

    let generation = GenerationClient::new(
        &config.gamma_api_url,
        &config.gamma_api_key,
        config.http_timeout(),
        retry.clone(),
    )
    .expect("Failed to initialize Gamma API client");

    let unpacker = ArchiveUnpacker::new(config.http_timeout(), retry)
        .expect("Failed to initialize archive downloader");

    let store = init_storage(&config);
    let table = init_gallery_table(&config, cli.run_migrations).await;
    let publisher = AssetPublisher::new(store, table, &cli.fallback_dir);

    let migrator = Migrator::new(
        generation,
        unpacker,
        publisher,
        config.migration_delay(),
        config.cost_per_generation,
    );

    println!("Starting Gamma Gallery Migration");
    println!("Processing {} URLs", urls.len());

    let mut log = MigrationLog::new();
    migrator.run(&urls, &mut log).await;
    log.finish();

    println!();
    print!("{}", log.summary());

    if let Err(e) = log.write_to(&cli.log_file) {
        tracing::error!(path = %cli.log_file.display(), error = %e, "Failed to write migration log");
        return ExitCode::FAILURE;
    }

    tracing::info!(
        successful = log.successful,
        failed = log.failed,
        warnings = log.warnings.len(),
        cost = log.cost_estimate,
        log_file = %cli.log_file.display(),
        "Migration completed"
    );

    ExitCode::SUCCESS
}

/// Supabase Storage client, or `None` to run on local fallback only.
fn init_storage(config: &AppConfig) -> Option<Arc<dyn ObjectStore>> {
    let endpoint = config.storage_endpoint();

    // Explicit S3 keys, otherwise session-token auth with the service-role key
    let (access_key, secret_key, session_token) =
        match (&config.storage_access_key, &config.storage_secret_key) {
            (Some(access), Some(secret)) => (access.as_str(), secret.as_str(), None),
            _ => {
                let Some(project_ref) = config.project_ref() else {
                    tracing::error!(supabase_url = %config.supabase_url, "Cannot derive project ref");
                    return None;
                };
                (
                    project_ref,
                    config.supabase_service_role_key.as_str(),
                    Some(config.supabase_service_role_key.as_str()),
                )
            }
        };

    tracing::info!(%endpoint, bucket = %config.gallery_bucket, "Initializing Supabase Storage client");
    match SupabaseStorage::new(
        &config.gallery_bucket,
        &endpoint,
        &config.storage_region,
        access_key,
        secret_key,
        session_token,
    ) {
        Ok(storage) => Some(Arc::new(storage) as Arc<dyn ObjectStore>),
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize Supabase Storage client, images will be saved locally");
            None
        }
    }
}

/// Gallery table client, or `None` to log metadata locally.
async fn init_gallery_table(
    config: &AppConfig,
    run_migrations: bool,
) -> Option<Arc<dyn GalleryTable>> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, gallery metadata will be logged locally");
        return None;
    };

    tracing::info!("Connecting to PostgreSQL database");
    let pool = match db::init_pool(database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database, gallery metadata will be logged locally");
            return None;
        }
    };

    if run_migrations {
        tracing::info!("Running database migrations");
        if let Err(e) = db::run_migrations(&pool).await {
            tracing::error!(error = %e, "Failed to run database migrations");
            return None;
        }
    }

    Some(Arc::new(PgGalleryTable::new(pool)) as Arc<dyn GalleryTable>)
}

fn load_urls(path: &Path) -> std::io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_url_list(&content))
}

fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
