use garde::Validate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::metadata::{CtaType, Language, Niche};

/// A normalized image pulled out of a generation archive.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    /// Entry name inside the archive
    pub name: String,
    /// PNG-encoded bytes
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Row written to the `gamma_gallery` table.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GalleryRecord {
    #[garde(length(min = 1))]
    pub original_gamma_url: String,

    #[garde(length(min = 1, max = 512))]
    pub storage_path: String,

    #[garde(skip)]
    pub niche: Niche,

    #[garde(skip)]
    pub language: Language,

    #[garde(length(min = 1, max = 200))]
    pub title: String,

    #[garde(skip)]
    pub description: String,

    #[garde(range(min = 1, max = 10))]
    pub fomo_score: i16,

    #[garde(skip)]
    pub cta_type: CtaType,

    #[garde(skip)]
    pub is_featured: bool,

    #[garde(skip)]
    pub is_placeholder: bool,

    #[garde(skip)]
    pub utm_campaign: String,

    /// False when the bytes only exist in the local fallback directory
    #[garde(skip)]
    pub stored_remotely: bool,
}

/// Where the image bytes ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetLocation {
    Remote,
    Local(PathBuf),
    /// Neither the store nor the local fallback accepted the bytes
    Unsaved(String),
}

impl AssetLocation {
    pub fn is_saved(&self) -> bool {
        !matches!(self, AssetLocation::Unsaved(_))
    }
}

/// Where the metadata record ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordLocation {
    Table,
    LocalLog(PathBuf),
    Unrecorded(String),
}

/// A published image together with its metadata record.
#[derive(Debug, Clone)]
pub struct StoredAsset {
    pub storage_path: String,
    pub location: AssetLocation,
    pub record: GalleryRecord,
    pub record_location: RecordLocation,
}

impl StoredAsset {
    pub fn stored_remotely(&self) -> bool {
        self.location == AssetLocation::Remote
    }
}
