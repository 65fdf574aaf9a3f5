//! Test fixtures: generated card archives and sample Gamma URLs
#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

/// URL that classifies as plumber / urgency / fomo 9
pub const PLUMBER_URL: &str = "https://stress-free-plumbing-fre-o80krz7.gamma.site/";

/// URL that classifies as movers / value / fomo 6
pub const MOVERS_URL: &str = "https://r-movers-nszrisn.gamma.site/";

/// PNG of the given size filled with a single color
pub fn png_card(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([shade, 68, 68, 255]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, ImageFormat::Png)
        .expect("Failed to encode test PNG");
    out.into_inner()
}

/// ZIP with `count` off-size PNG cards, like a generation archive
pub fn card_archive(count: usize) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for i in 0..count {
        writer
            .start_file(format!("cards/card-{}.png", i + 1), SimpleFileOptions::default())
            .expect("Failed to start zip entry");
        writer
            .write_all(&png_card(320, 200, (i * 40) as u8))
            .expect("Failed to write zip entry");
    }
    writer
        .finish()
        .expect("Failed to finish zip")
        .into_inner()
}
