use crate::features::storage::preferred_data_dir;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://10.0.2.2:3333";
pub const DEFAULT_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/reverse";
/// Maputo, used until the device reports its own position.
pub const DEFAULT_CENTER: (f64, f64) = (-25.9692, 32.5732);

/// Settings the host hands over with the `init` command.
///
/// Every field is optional on the wire; gaps are filled from the
/// environment and then from built-in defaults by [`CoreConfig::resolve`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawConfig {
    pub api_base_url: Option<String>,
    pub data_dir: Option<String>,
    pub locale: Option<String>,
    pub tile_url: Option<String>,
    pub geocoder_url: Option<String>,
    pub default_center: Option<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoreConfig {
    pub api_base_url: String,
    pub data_dir: PathBuf,
    pub locale: String,
    pub tile_url: String,
    pub geocoder_url: String,
    pub default_center: (f64, f64),
}

impl CoreConfig {
    pub fn resolve(raw: RawConfig) -> Self {
        let api_base_url = raw
            .api_base_url
            .filter(|s| !s.trim().is_empty())
            .or_else(|| std::env::var("SAFEZONE_API_URL").ok())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let data_dir = raw
            .data_dir
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(preferred_data_dir);

        Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            data_dir,
            locale: raw.locale.unwrap_or_else(|| "pt".into()),
            tile_url: raw.tile_url.unwrap_or_else(|| DEFAULT_TILE_URL.into()),
            geocoder_url: raw
                .geocoder_url
                .unwrap_or_else(|| DEFAULT_GEOCODER_URL.into()),
            default_center: raw.default_center.unwrap_or(DEFAULT_CENTER),
        }
    }

    pub fn session_db_path(&self) -> PathBuf {
        self.data_dir.join("session.sqlite3")
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::resolve(RawConfig::default())
    }
}
