// Font lookup configuration

use std::path::PathBuf;
use std::time::Duration;

/// Where the font resolver looks, read from the environment by default.
#[derive(Debug, Clone, PartialEq)]
pub struct FontConfig {
    /// Hub Space that hosts an `assets/` folder of fonts (`SPACE_ID`)
    pub space_id: Option<String>,
    /// Local folder of bundled fonts (`FONT_ASSETS_DIR`)
    pub assets_dir: PathBuf,
    /// System folders searched by file name (`FONT_DIRS`, `:`-separated)
    pub font_dirs: Vec<PathBuf>,
    /// Timeout for URL downloads (`FONT_HTTP_TIMEOUT_SECS`), none when unset
    pub http_timeout: Option<Duration>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            space_id: None,
            assets_dir: PathBuf::from("assets"),
            font_dirs: default_font_dirs(),
            http_timeout: None,
        }
    }
}

impl FontConfig {
    pub fn from_env() -> Self {
        let space_id = std::env::var("SPACE_ID")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let assets_dir = std::env::var("FONT_ASSETS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("assets"));

        let font_dirs = std::env::var("FONT_DIRS")
            .ok()
            .map(|dirs| {
                dirs.split(':')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_else(default_font_dirs);

        let http_timeout = std::env::var("FONT_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs);

        Self {
            space_id,
            assets_dir,
            font_dirs,
            http_timeout,
        }
    }
}

fn default_font_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![
        PathBuf::from("/usr/share/fonts"),
        PathBuf::from("/usr/local/share/fonts"),
        PathBuf::from("/Library/Fonts"),
        PathBuf::from("/System/Library/Fonts"),
        PathBuf::from("C:\\Windows\\Fonts"),
    ];
    if let Some(home) = std::env::var_os("HOME") {
        let home = PathBuf::from(home);
        dirs.push(home.join(".fonts"));
        dirs.push(home.join(".local/share/fonts"));
        dirs.push(home.join("Library/Fonts"));
    }
    dirs
}
