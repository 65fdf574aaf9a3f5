use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Supabase project URL (e.g., "https://abcd1234.supabase.co")
    pub supabase_url: String,

    /// Supabase service-role key, used for Storage access
    pub supabase_service_role_key: String,

    /// Gamma generation API key
    pub gamma_api_key: String,

    /// Gamma generation endpoint
    #[serde(default = "default_gamma_api_url")]
    pub gamma_api_url: String,

    /// Postgres connection string for the `gamma_gallery` table. Without it,
    /// metadata records only go to the local fallback log.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Storage bucket receiving the ad cards
    #[serde(default = "default_gallery_bucket")]
    pub gallery_bucket: String,

    /// Supabase project region, required by the S3 protocol signer
    #[serde(default = "default_storage_region")]
    pub storage_region: String,

    /// Explicit S3 access key. Defaults to the project ref.
    #[serde(default)]
    pub storage_access_key: Option<String>,

    /// Explicit S3 secret key. Defaults to the service-role key (session token auth).
    #[serde(default)]
    pub storage_secret_key: Option<String>,

    /// Seconds to wait between URLs
    #[serde(default = "default_migration_delay_secs")]
    pub migration_delay_secs: u64,

    /// Estimated cost of one successful generation, in dollars
    #[serde(default = "default_cost_per_generation")]
    pub cost_per_generation: f64,

    /// Per-request timeout for generation and archive downloads
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_gamma_api_url() -> String {
    "https://api.gamma.app/v1/generations".to_string()
}

fn default_gallery_bucket() -> String {
    "gamma-cards".to_string()
}

fn default_storage_region() -> String {
    "us-east-1".to_string()
}

fn default_migration_delay_secs() -> u64 {
    1
}

fn default_cost_per_generation() -> f64 {
    0.50
}

fn default_http_timeout_secs() -> u64 {
    60
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// S3-compatible endpoint exposed by Supabase Storage.
    pub fn storage_endpoint(&self) -> String {
        format!("{}/storage/v1/s3", self.supabase_url.trim_end_matches('/'))
    }

    /// Project ref, i.e. the first host label of the project URL.
    pub fn project_ref(&self) -> Option<&str> {
        let host = self
            .supabase_url
            .split("//")
            .nth(1)
            .unwrap_or(&self.supabase_url);
        host.split(['.', '/', ':'])
            .next()
            .filter(|label| !label.is_empty())
    }

    pub fn migration_delay(&self) -> Duration {
        Duration::from_secs(self.migration_delay_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
