//! Cover image rendering: wrapped title and description over a background,
//! written to a PNG in the temp directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::Engine;
use image::{ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::ComposeError;
use crate::font::{Font, FontResolver};

pub const TITLE_FONT_SIZE: u32 = 26;
pub const DESCRIPTION_FONT_SIZE: u32 = 16;
/// Gap above the title
const TOP_PADDING: i64 = 10;
/// Gap between the title block and the description block
const BLOCK_SPACING: i64 = 20;
/// Gap between wrapped lines inside a block
const LINE_SPACING: u32 = 4;
/// Canvas pixels per wrapped column
const PIXELS_PER_COLUMN: u32 = 12;
const FALLBACK_COLOR: [u8; 4] = [255, 255, 0, 255];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverSettings {
    pub title: String,
    pub description: String,
    pub width: u32,
    pub height: u32,
    /// Image to draw on; opaque white when `None`
    pub background_path: Option<PathBuf>,
    /// Font name, path, hub asset or URL
    pub font: String,
    /// `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`
    pub font_color: String,
}

impl Default for CoverSettings {
    fn default() -> Self {
        Self {
            title: "title".to_string(),
            description: String::new(),
            width: 768,
            height: 512,
            background_path: None,
            font: "arial.ttf".to_string(),
            font_color: "#ffffff".to_string(),
        }
    }
}

/// Parse a hex color, falling back to opaque yellow
pub fn hex_to_rgba(hex: &str) -> [u8; 4] {
    parse_hex_color(hex).unwrap_or(FALLBACK_COLOR)
}

fn parse_hex_color(hex: &str) -> Option<[u8; 4]> {
    let digits = hex.trim().strip_prefix('#')?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&digits[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();

    match digits.len() {
        3 => Some([nibble(0)?, nibble(1)?, nibble(2)?, 255]),
        4 => Some([nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?]),
        6 => Some([byte(0)?, byte(2)?, byte(4)?, 255]),
        8 => Some([byte(0)?, byte(2)?, byte(4)?, byte(6)?]),
        _ => None,
    }
}

/// Greedy word wrap at `columns` characters
pub fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    textwrap::wrap(text, columns.max(1))
        .into_iter()
        .map(|line| line.into_owned())
        .collect()
}

fn load_background(settings: &CoverSettings) -> RgbaImage {
    let white = || RgbaImage::from_pixel(settings.width, settings.height, Rgba([255, 255, 255, 255]));
    let Some(path) = settings.background_path.as_deref() else {
        return white();
    };
    match image::open(path) {
        Ok(img) => img.to_rgba8(),
        Err(source) => {
            let err = ComposeError::Background {
                path: path.to_path_buf(),
                source,
            };
            warn!("{err}; using a white background");
            white()
        }
    }
}

/// Draw `lines` centred on the canvas starting at `top`, returns the block height
fn draw_block(canvas: &mut RgbaImage, font: &Font, lines: &[String], top: i64, color: Rgba<u8>) -> i64 {
    let (block_width, block_height) = font.measure_lines(lines, LINE_SPACING);
    let center_x = (canvas.width() / 2) as i64;
    let block_x = (center_x - block_width as i64 / 2).max(0);
    let line_step = (font.line_height() + LINE_SPACING) as i64;

    for (i, line) in lines.iter().enumerate() {
        let line_width = font.text_width(line) as i64;
        let x = block_x + (block_width as i64 - line_width) / 2;
        let y = top + i as i64 * line_step;
        font.draw_text(canvas, x as i32, y as i32, line, color);
    }
    block_height as i64
}

/// Alpha-composite `overlay` onto `background` at `offset`, using the
/// overlay's own alpha as the mask
pub fn paste_with_alpha(background: &mut RgbaImage, overlay: &RgbaImage, offset: (i64, i64)) {
    let (bg_w, bg_h) = (background.width() as i64, background.height() as i64);
    for (x, y, src) in overlay.enumerate_pixels() {
        let (bx, by) = (x as i64 + offset.0, y as i64 + offset.1);
        if bx < 0 || by < 0 || bx >= bg_w || by >= bg_h {
            continue;
        }
        let mask = src[3] as u32;
        if mask == 0 {
            continue;
        }
        let dst = background.get_pixel_mut(bx as u32, by as u32);
        for c in 0..4 {
            let blended = (src[c] as u32 * mask + dst[c] as u32 * (255 - mask) + 127) / 255;
            dst[c] = blended as u8;
        }
    }
}

/// Compose the cover in memory
pub fn render_cover(settings: &CoverSettings, fonts: &FontResolver) -> RgbaImage {
    let (width, height) = (settings.width, settings.height);
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 0]));
    let mut background = load_background(settings);
    let color = Rgba(hex_to_rgba(&settings.font_color));
    let columns = (width / PIXELS_PER_COLUMN) as usize;

    let title_font = fonts.resolve(&settings.font, TITLE_FONT_SIZE);
    let title_lines = wrap_text(&settings.title, columns);
    let title_y = TOP_PADDING;
    let title_height = draw_block(&mut canvas, &title_font, &title_lines, title_y, color);

    let description_font = fonts.resolve(&settings.font, DESCRIPTION_FONT_SIZE);
    let description_lines = wrap_text(&settings.description, columns);
    let description_y = title_y + title_height + BLOCK_SPACING;
    draw_block(&mut canvas, &description_font, &description_lines, description_y, color);

    let offset = (
        (background.width() as i64 - width as i64) / 2,
        (background.height() as i64 - height as i64) / 2,
    );
    paste_with_alpha(&mut background, &canvas, offset);
    background
}

/// Render the cover and write it to a new temp PNG
pub fn add_settings_to_image(settings: &CoverSettings, fonts: &FontResolver) -> Option<PathBuf> {
    add_settings_to_image_in(&std::env::temp_dir(), settings, fonts)
}

/// Like [`add_settings_to_image`] but the PNG goes inside `dir`
pub fn add_settings_to_image_in(dir: &Path, settings: &CoverSettings, fonts: &FontResolver) -> Option<PathBuf> {
    save_image_in(dir, &render_cover(settings, fonts))
}

/// Write `image` to a new PNG in the system temp directory.
///
/// Returns `None` when the file could not be written; the error is logged.
pub fn save_image(image: &RgbaImage) -> Option<PathBuf> {
    save_image_in(&std::env::temp_dir(), image)
}

/// Like [`save_image`] but inside `dir`
pub fn save_image_in(dir: &Path, image: &RgbaImage) -> Option<PathBuf> {
    match write_png_in(dir, image) {
        Ok(path) => {
            info!("cover saved to {}", path.display());
            Some(path)
        }
        Err(e) => {
            error!("Unable to save image: {}", e);
            None
        }
    }
}

/// Write `image` to a new kept `cover-*.png` inside `dir`.
///
/// A partially written file is removed before the error is returned.
pub fn write_png_in(dir: &Path, image: &RgbaImage) -> Result<PathBuf, ComposeError> {
    // The file outlives this call; cleanup is up to the caller
    let path = tempfile::Builder::new()
        .prefix("cover-")
        .suffix(".png")
        .tempfile_in(dir)?
        .into_temp_path()
        .keep()
        .map_err(io::Error::from)?;

    if let Err(e) = image.save_with_format(&path, ImageFormat::Png) {
        let _ = fs::remove_file(&path);
        return Err(e.into());
    }
    Ok(path)
}

/// Encode as base64 PNG
pub fn encode_png_base64(image: &RgbaImage) -> Result<String, ComposeError> {
    use image::ImageEncoder;

    let mut png_bytes: Vec<u8> = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png_bytes).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ColorType::Rgba8,
    )?;
    Ok(base64::engine::general_purpose::STANDARD.encode(png_bytes))
}
