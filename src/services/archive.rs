//! Archive download and image normalization.
//!
//! Generation results arrive as a ZIP of card images. Every image is brought
//! to exactly 1080x1080 and PNG-encoded before it is published.

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use reqwest::Client;
use std::io::{Cursor, Read};
use std::path::Path;
use std::time::Duration;

use crate::models::gallery::ImageAsset;
use crate::services::retry::{AttemptError, RetryPolicy};

/// Edge length of a normalized card, in pixels.
pub const CARD_SIZE: u32 = 1080;

/// Upper bound on the buffer reserved up front for one entry.
const MAX_PREALLOCATED_ENTRY: usize = 64 << 20;

/// Images pulled out of one archive.
#[derive(Debug, Default)]
pub struct UnpackedArchive {
    pub images: Vec<ImageAsset>,
    /// Entries that looked like images but could not be decoded
    pub skipped: Vec<String>,
}

/// Downloads generation archives and extracts their images.
pub struct ArchiveUnpacker {
    http: Client,
    retry: RetryPolicy,
}

impl ArchiveUnpacker {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self, ArchiveError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ArchiveError::Download)?;
        Ok(Self { http, retry })
    }

    /// Download `archive_url` and return its normalized images.
    pub async fn fetch(
        &self,
        archive_url: &str,
        trace_id: &str,
    ) -> Result<UnpackedArchive, ArchiveError> {
        let (bytes, _) = self
            .retry
            .run("archive_download", |_| self.download(archive_url))
            .await
            .map_err(|failure| failure.error)?;

        tracing::debug!(trace_id, size = bytes.len(), "Archive downloaded");

        // Decoding and resampling are CPU-bound.
        let unpacked = tokio::task::spawn_blocking(move || extract_images(&bytes)).await??;

        for entry in &unpacked.skipped {
            tracing::warn!(trace_id, entry = %entry, "Skipped undecodable archive entry");
        }
        Ok(unpacked)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, AttemptError<ArchiveError>> {
        let response = self.http.get(url).send().await.map_err(|e| {
            if e.is_builder() {
                AttemptError::Fatal(ArchiveError::Download(e))
            } else {
                AttemptError::retry(ArchiveError::Download(e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error = ArchiveError::DownloadStatus(status.as_u16());
            return Err(if RetryPolicy::is_retryable_status(status) {
                AttemptError::retry(error)
            } else {
                AttemptError::Fatal(error)
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AttemptError::retry(ArchiveError::Download(e)))?;
        Ok(bytes.to_vec())
    }
}

/// Extract every image entry from ZIP bytes, normalized to [`CARD_SIZE`].
pub fn extract_images(archive_bytes: &[u8]) -> Result<UnpackedArchive, ArchiveError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(archive_bytes))?;
    let mut unpacked = UnpackedArchive::default();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        // macOS resource forks
        if name.starts_with("__MACOSX/") {
            continue;
        }
        let Some(format) = image_format(&name) else {
            continue;
        };

        // Declared sizes come from the remote archive
        let mut data = Vec::with_capacity((entry.size() as usize).min(MAX_PREALLOCATED_ENTRY));
        entry.read_to_end(&mut data)?;

        match normalize_image(&name, data, format) {
            Ok(asset) => unpacked.images.push(asset),
            Err(e) => unpacked.skipped.push(format!("{}: {}", name, e)),
        }
    }

    if unpacked.images.is_empty() {
        return Err(ArchiveError::NoImages);
    }
    Ok(unpacked)
}

fn image_format(name: &str) -> Option<ImageFormat> {
    let extension = Path::new(name).extension()?.to_str()?;
    ImageFormat::from_extension(extension)
        .filter(|f| matches!(f, ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP))
}

/// Bring one image to `CARD_SIZE` x `CARD_SIZE` PNG.
///
/// PNGs already at the target size are passed through untouched.
pub fn normalize_image(
    name: &str,
    data: Vec<u8>,
    format: ImageFormat,
) -> Result<ImageAsset, image::ImageError> {
    let decoded = image::load_from_memory_with_format(&data, format)?;
    let at_target = decoded.width() == CARD_SIZE && decoded.height() == CARD_SIZE;

    if at_target && format == ImageFormat::Png {
        return Ok(ImageAsset {
            name: name.to_string(),
            bytes: data,
            width: CARD_SIZE,
            height: CARD_SIZE,
        });
    }

    let card: DynamicImage = if at_target {
        decoded
    } else {
        decoded.resize_exact(CARD_SIZE, CARD_SIZE, FilterType::Lanczos3)
    };

    let mut out = Cursor::new(Vec::new());
    card.write_to(&mut out, ImageFormat::Png)?;

    Ok(ImageAsset {
        name: name.to_string(),
        bytes: out.into_inner(),
        width: CARD_SIZE,
        height: CARD_SIZE,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Archive download failed: {0}")]
    Download(reqwest::Error),

    #[error("Archive download returned HTTP {0}")]
    DownloadStatus(u16),

    #[error("Corrupt archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to read archive entry: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive contained no images")]
    NoImages,

    #[error("Image processing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([239, 68, 68, 255]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn zip_of(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer
                .start_file(name.to_string(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_resizes_to_card_size() {
        let archive = zip_of(&[("card-1.png", png_bytes(640, 360))]);
        let unpacked = extract_images(&archive).unwrap();

        assert_eq!(unpacked.images.len(), 1);
        let decoded = image::load_from_memory(&unpacked.images[0].bytes).unwrap();
        assert_eq!(decoded.width(), CARD_SIZE);
        assert_eq!(decoded.height(), CARD_SIZE);
    }

    #[test]
    fn test_card_sized_png_passes_through() {
        let original = png_bytes(CARD_SIZE, CARD_SIZE);
        let archive = zip_of(&[("card-1.png", original.clone())]);
        let unpacked = extract_images(&archive).unwrap();
        assert_eq!(unpacked.images[0].bytes, original);
    }

    #[test]
    fn test_non_image_entries_ignored() {
        let archive = zip_of(&[
            ("README.txt", b"generated by gamma".to_vec()),
            ("__MACOSX/._card-1.png", b"resource fork".to_vec()),
            ("cards/card-1.png", png_bytes(100, 100)),
            ("cards/card-2.PNG", png_bytes(100, 200)),
        ]);
        let unpacked = extract_images(&archive).unwrap();
        assert_eq!(unpacked.images.len(), 2);
        assert_eq!(unpacked.images[0].name, "cards/card-1.png");
        assert!(unpacked.skipped.is_empty());
    }

    #[test]
    fn test_corrupt_entry_skipped() {
        let archive = zip_of(&[
            ("card-1.png", b"not a png".to_vec()),
            ("card-2.png", png_bytes(50, 50)),
        ]);
        let unpacked = extract_images(&archive).unwrap();
        assert_eq!(unpacked.images.len(), 1);
        assert_eq!(unpacked.skipped.len(), 1);
        assert!(unpacked.skipped[0].starts_with("card-1.png"));
    }

    #[test]
    fn test_no_images_is_error() {
        let archive = zip_of(&[("notes.txt", b"empty".to_vec())]);
        assert!(matches!(extract_images(&archive), Err(ArchiveError::NoImages)));
    }

    /// Overwrite the uncompressed size of every local and central header.
    fn inflate_declared_sizes(archive: &mut [u8], size: u32) {
        const LOCAL: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];
        const CENTRAL: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];
        let mut i = 0;
        while i + 4 <= archive.len() {
            let offset = match &archive[i..i + 4] {
                sig if sig == LOCAL => Some(22),
                sig if sig == CENTRAL => Some(24),
                _ => None,
            };
            if let Some(offset) = offset {
                archive[i + offset..i + offset + 4].copy_from_slice(&size.to_le_bytes());
            }
            i += 1;
        }
    }

    #[test]
    fn test_bogus_declared_size_does_not_panic() {
        let mut archive = zip_of(&[("card-1.png", png_bytes(40, 40))]);
        inflate_declared_sizes(&mut archive, 0xFFFF_FFF0);

        // Either outcome is fine as long as extraction returns
        match extract_images(&archive) {
            Ok(unpacked) => assert!(unpacked.images.len() <= 1),
            Err(e) => assert!(!e.to_string().is_empty()),
        }
    }

    #[test]
    fn test_corrupt_archive_is_error() {
        assert!(matches!(
            extract_images(b"definitely not a zip"),
            Err(ArchiveError::Zip(_))
        ));
    }
}
