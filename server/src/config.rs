// Configuration for the server

use std::path::PathBuf;
use std::time::Duration;

use musicgen_core::FontConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub request_timeout_secs: u64,
    pub cors_allowed_origins: Option<Vec<String>>,
    /// Where cover PNGs are written; the system temp dir when unset
    pub cover_output_dir: Option<PathBuf>,
    /// Only images under this directory may be used as backgrounds; none when unset
    pub cover_background_dir: Option<PathBuf>,
    pub fonts: FontConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8086,
            request_timeout_secs: 60,
            cors_allowed_origins: None,
            cover_output_dir: None,
            cover_background_dir: None,
            fonts: FontConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8086);

        let request_timeout_secs = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect()
            });

        let cover_output_dir = std::env::var("COVER_OUTPUT_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let cover_background_dir = std::env::var("COVER_BACKGROUND_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            port,
            request_timeout_secs,
            cors_allowed_origins,
            cover_output_dir,
            cover_background_dir,
            fonts: FontConfig::from_env(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
