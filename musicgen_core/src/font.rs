//! Font lookup with an ordered chain of sources and a built-in fallback.
//!
//! A font name may be a system font file name, a path, a file in the hub
//! Space's `assets/` folder, a file in the local assets folder or a URL.
//! Sources are tried in order and the first one that yields a parseable
//! font wins. If none does, text is drawn with an 8x8 bitmap font, so
//! resolution itself never fails.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use ab_glyph::{point, Font as AbFont, FontVec, PxScale, ScaleFont};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use hf_hub::{api::sync::Api, Repo, RepoType};
use image::{Rgba, RgbaImage};
use tracing::{debug, info, warn};

use crate::config::FontConfig;
use crate::error::FontError;

/// Directory depth searched below each system font folder
const MAX_SEARCH_DEPTH: usize = 4;
const BUILTIN_CELL: u32 = 8;

/// One place a font can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontSource {
    /// The name as a file path, then by file name under the system font folders
    SystemPath,
    /// `assets/<name>` in the hub Space named by `SPACE_ID`
    Hub,
    /// `<assets_dir>/<name>` on local disk
    LocalAssets,
    /// The name as an HTTP(S) URL
    Url,
}

impl FontSource {
    pub const DEFAULT_ORDER: [FontSource; 4] = [
        FontSource::SystemPath,
        FontSource::Hub,
        FontSource::LocalAssets,
        FontSource::Url,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FontSource::SystemPath => "system",
            FontSource::Hub => "hub",
            FontSource::LocalAssets => "assets",
            FontSource::Url => "url",
        }
    }

    /// Names that look like URLs only go to the URL source
    pub fn applies_to(&self, name: &str) -> bool {
        match self {
            FontSource::Url => true,
            _ => !name.contains("http"),
        }
    }

    /// Raw font file bytes for `name`
    pub fn fetch(&self, name: &str, config: &FontConfig) -> Result<Vec<u8>, FontError> {
        match self {
            FontSource::SystemPath => {
                let direct = Path::new(name);
                if direct.is_file() {
                    return Ok(fs::read(direct)?);
                }
                let file_name = direct
                    .file_name()
                    .and_then(|f| f.to_str())
                    .ok_or_else(|| FontError::NotFound(name.to_string()))?;
                for dir in &config.font_dirs {
                    if let Some(found) = find_font_file(dir, file_name, MAX_SEARCH_DEPTH) {
                        debug!("found {} at {}", name, found.display());
                        return Ok(fs::read(found)?);
                    }
                }
                Err(FontError::NotFound(name.to_string()))
            }
            FontSource::Hub => {
                let space_id = config
                    .space_id
                    .as_deref()
                    .ok_or(FontError::MissingNamespace)?;
                let api = Api::new()?;
                let repo = api.repo(Repo::new(space_id.to_string(), RepoType::Space));
                let path = repo.get(&format!("assets/{name}"))?;
                Ok(fs::read(path)?)
            }
            FontSource::LocalAssets => {
                let path = config.assets_dir.join(name);
                if !path.is_file() {
                    return Err(FontError::NotFound(path.display().to_string()));
                }
                Ok(fs::read(path)?)
            }
            FontSource::Url => {
                let client = reqwest::blocking::Client::builder()
                    .timeout(config.http_timeout)
                    .build()?;
                let bytes = client.get(name).send()?.error_for_status()?.bytes()?;
                Ok(bytes.to_vec())
            }
        }
    }
}

/// Case-insensitive search for `file_name` under `dir`
fn find_font_file(dir: &Path, file_name: &str, depth: usize) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if entry
            .file_name()
            .to_str()
            .is_some_and(|f| f.eq_ignore_ascii_case(file_name))
        {
            return Some(path);
        }
    }
    if depth == 0 {
        return None;
    }
    subdirs
        .iter()
        .find_map(|sub| find_font_file(sub, file_name, depth - 1))
}

/// A font ready to measure and draw text at a fixed size.
#[derive(Clone)]
pub enum Font {
    TrueType {
        name: String,
        face: Arc<FontVec>,
        size: f32,
    },
    /// 8x8 bitmap glyphs scaled up by an integer factor
    Builtin { scale: u32 },
}

// FontVec carries raw font tables, keep them out of debug output
impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Font::TrueType { name, size, .. } => f
                .debug_struct("TrueType")
                .field("name", name)
                .field("size", size)
                .finish(),
            Font::Builtin { scale } => f.debug_struct("Builtin").field("scale", scale).finish(),
        }
    }
}

impl Font {
    /// The bitmap fallback sized as close to `size` pixels as whole cells allow
    pub fn builtin(size: u32) -> Self {
        Font::Builtin {
            scale: (size / BUILTIN_CELL).max(1),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Font::TrueType { name, .. } => name,
            Font::Builtin { .. } => "builtin",
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Font::Builtin { .. })
    }

    pub fn line_height(&self) -> u32 {
        match self {
            Font::TrueType { face, size, .. } => {
                let scaled = face.as_scaled(PxScale::from(*size));
                (scaled.ascent() - scaled.descent()).ceil() as u32
            }
            Font::Builtin { scale } => BUILTIN_CELL * scale,
        }
    }

    /// Advance width of a single line in pixels
    pub fn text_width(&self, text: &str) -> u32 {
        match self {
            Font::TrueType { face, size, .. } => {
                let scaled = face.as_scaled(PxScale::from(*size));
                let mut width = 0.0f32;
                let mut previous = None;
                for c in text.chars() {
                    let id = scaled.glyph_id(c);
                    if let Some(prev) = previous {
                        width += scaled.kern(prev, id);
                    }
                    width += scaled.h_advance(id);
                    previous = Some(id);
                }
                width.ceil().max(0.0) as u32
            }
            Font::Builtin { scale } => text.chars().count() as u32 * BUILTIN_CELL * scale,
        }
    }

    /// Width and height of a block of lines separated by `spacing` pixels
    pub fn measure_lines<S: AsRef<str>>(&self, lines: &[S], spacing: u32) -> (u32, u32) {
        if lines.is_empty() {
            return (0, 0);
        }
        let width = lines
            .iter()
            .map(|l| self.text_width(l.as_ref()))
            .max()
            .unwrap_or(0);
        let count = lines.len() as u32;
        let height = count * self.line_height() + (count - 1) * spacing;
        (width, height)
    }

    /// Draw one line with its top-left corner at `(x, y)`
    pub fn draw_text(&self, canvas: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>) {
        match self {
            Font::TrueType { face, size, .. } => {
                let scale = PxScale::from(*size);
                let scaled = face.as_scaled(scale);
                let baseline = y as f32 + scaled.ascent();
                let mut caret = x as f32;
                let mut previous = None;
                for c in text.chars() {
                    let id = scaled.glyph_id(c);
                    if let Some(prev) = previous {
                        caret += scaled.kern(prev, id);
                    }
                    let glyph = id.with_scale_and_position(scale, point(caret, baseline));
                    caret += scaled.h_advance(id);
                    previous = Some(id);

                    if let Some(outlined) = face.outline_glyph(glyph) {
                        let bounds = outlined.px_bounds();
                        outlined.draw(|gx, gy, coverage| {
                            let px = bounds.min.x as i32 + gx as i32;
                            let py = bounds.min.y as i32 + gy as i32;
                            blend_coverage(canvas, px, py, color, coverage);
                        });
                    }
                }
            }
            Font::Builtin { scale } => {
                let scale = *scale as i32;
                let cell = BUILTIN_CELL as i32 * scale;
                for (i, c) in text.chars().enumerate() {
                    let rows = BASIC_FONTS.get(c).or_else(|| BASIC_FONTS.get('?'));
                    let Some(rows) = rows else { continue };
                    let origin_x = x + i as i32 * cell;
                    for (row_idx, row) in rows.iter().enumerate() {
                        for bit in 0..8i32 {
                            if row & (1 << bit) == 0 {
                                continue;
                            }
                            for dy in 0..scale {
                                for dx in 0..scale {
                                    let px = origin_x + bit * scale + dx;
                                    let py = y + row_idx as i32 * scale + dy;
                                    blend_coverage(canvas, px, py, color, 1.0);
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Paint `color` at `coverage` onto a transparent text layer
fn blend_coverage(canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 || x as u32 >= canvas.width() || y as u32 >= canvas.height() {
        return;
    }
    let alpha = (color[3] as f32 * coverage.clamp(0.0, 1.0)).round() as u8;
    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
    if alpha > pixel[3] {
        *pixel = Rgba([color[0], color[1], color[2], alpha]);
    }
}

/// Tries each [`FontSource`] in order and keeps parsed faces for reuse.
#[derive(Debug)]
pub struct FontResolver {
    config: FontConfig,
    sources: Vec<FontSource>,
    // font name -> parsed face; only successful loads are kept
    faces: RwLock<HashMap<String, Arc<FontVec>>>,
}

impl FontResolver {
    pub fn new(config: FontConfig) -> Self {
        Self::with_sources(config, FontSource::DEFAULT_ORDER.to_vec())
    }

    pub fn with_sources(config: FontConfig, sources: Vec<FontSource>) -> Self {
        Self {
            config,
            sources,
            faces: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_env() -> Self {
        Self::new(FontConfig::from_env())
    }

    pub fn config(&self) -> &FontConfig {
        &self.config
    }

    /// Load `name` at `size` pixels, falling back to the built-in font
    pub fn resolve(&self, name: &str, size: u32) -> Font {
        let display_name = Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name)
            .to_string();

        if let Some(face) = self.cached(name) {
            return Font::TrueType {
                name: display_name,
                face,
                size: size as f32,
            };
        }

        for source in self.sources.iter().filter(|s| s.applies_to(name)) {
            match source.fetch(name, &self.config).and_then(parse_face) {
                Ok(face) => {
                    let face = Arc::new(face);
                    if let Ok(mut faces) = self.faces.write() {
                        faces.insert(name.to_string(), face.clone());
                    }
                    info!("Font loaded {} from {}", display_name, source.label());
                    return Font::TrueType {
                        name: display_name,
                        face,
                        size: size as f32,
                    };
                }
                Err(e) => warn!("Font {} not available from {}: {}", name, source.label(), e),
            }
        }

        warn!("Font not found: {}. Using default font", name);
        Font::builtin(size)
    }

    fn cached(&self, name: &str) -> Option<Arc<FontVec>> {
        self.faces.read().ok()?.get(name).cloned()
    }
}

fn parse_face(bytes: Vec<u8>) -> Result<FontVec, FontError> {
    FontVec::try_from_vec(bytes).map_err(|e| FontError::Parse(e.to_string()))
}

/// Resolve a font with a one-off resolver
pub fn load_font(name: &str, size: u32, config: &FontConfig) -> Font {
    FontResolver::new(config.clone()).resolve(name, size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_config(assets_dir: &Path) -> FontConfig {
        FontConfig {
            space_id: None,
            assets_dir: assets_dir.to_path_buf(),
            font_dirs: Vec::new(),
            http_timeout: None,
        }
    }

    #[test]
    fn test_missing_font_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FontResolver::new(offline_config(dir.path()));
        let font = resolver.resolve("definitely-not-a-font.ttf", 16);
        assert!(font.is_builtin());
        assert_eq!(font.name(), "builtin");
        assert_eq!(font.line_height(), 16);
    }

    #[test]
    fn test_unparseable_asset_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.ttf"), b"not a font").unwrap();
        let resolver = FontResolver::with_sources(
            offline_config(dir.path()),
            vec![FontSource::LocalAssets],
        );
        assert!(resolver.resolve("broken.ttf", 26).is_builtin());
        assert!(matches!(
            parse_face(b"not a font".to_vec()),
            Err(FontError::Parse(_))
        ));
    }

    #[test]
    fn test_hub_needs_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let err = FontSource::Hub
            .fetch("arial.ttf", &offline_config(dir.path()))
            .unwrap_err();
        assert!(matches!(err, FontError::MissingNamespace));
    }

    #[test]
    fn test_urls_skip_local_sources() {
        let url = "https://example.com/fonts/Roboto.ttf";
        assert!(!FontSource::SystemPath.applies_to(url));
        assert!(!FontSource::Hub.applies_to(url));
        assert!(!FontSource::LocalAssets.applies_to(url));
        assert!(FontSource::Url.applies_to(url));
        assert!(FontSource::SystemPath.applies_to("arial.ttf"));
    }

    #[test]
    fn test_system_search_is_recursive_and_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("truetype").join("custom");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("MyFont.TTF"), b"bytes").unwrap();

        let config = FontConfig {
            font_dirs: vec![dir.path().to_path_buf()],
            ..offline_config(dir.path())
        };
        let bytes = FontSource::SystemPath.fetch("myfont.ttf", &config).unwrap();
        assert_eq!(bytes, b"bytes");
        assert!(matches!(
            FontSource::SystemPath.fetch("other.ttf", &config),
            Err(FontError::NotFound(_))
        ));
    }

    #[test]
    fn test_builtin_metrics_scale_with_size() {
        let font = Font::builtin(26);
        assert!(matches!(font, Font::Builtin { scale: 3 }));
        assert_eq!(font.text_width("abcd"), 96);
        assert_eq!(font.measure_lines(&["ab", "abcd"], 4), (96, 52));
        assert_eq!(Font::builtin(4).line_height(), 8);
    }

    #[test]
    fn test_builtin_draws_in_color() {
        let mut canvas = RgbaImage::new(40, 20);
        let color = Rgba([10, 20, 30, 255]);
        Font::builtin(8).draw_text(&mut canvas, 2, 2, "H", color);
        let painted: Vec<_> = canvas.pixels().filter(|p| p[3] > 0).collect();
        assert!(!painted.is_empty());
        assert!(painted.iter().all(|p| **p == color));
        // nothing outside the first 8x8 cell
        assert_eq!(canvas.get_pixel(20, 2)[3], 0);
    }
}
