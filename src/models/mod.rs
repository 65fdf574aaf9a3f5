pub mod gallery;
pub mod metadata;
pub mod migration_log;
