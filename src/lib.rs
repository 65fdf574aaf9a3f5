//! Gamma Gallery Migration
//!
//! This library re-creates Gamma-hosted ad pages as square PNG card sets via
//! the Gamma generation API, normalizes the cards and publishes them to
//! Supabase Storage with a `gamma_gallery` metadata row per card. Local
//! fallbacks keep a run going when Supabase is unreachable.

pub mod config;
pub mod db;
pub mod models;
pub mod services;
