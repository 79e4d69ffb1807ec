use std::path::{Path, PathBuf};

use bevy::prelude::*;
use serde::Deserialize;

// Earth measurements
pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const EARTH_CIRCUMFERENCE_M: f64 = 40_075_017.0;

// WGS-84 ellipsoid, used for inertial -> geodetic conversion
pub const WGS84_A_KM: f64 = 6378.137;
pub const WGS84_B_KM: f64 = 6356.7523142;

// Web-Mercator tile size in pixels
pub const TILE_SIZE_PX: f64 = 256.0;

// catalog and cache
pub const CATALOG_URL: &str = "https://celestrak.org/NORAD/elements/gp.php?GROUP=active&FORMAT=tle";
pub const USER_AGENT: &str = "proxtrack-satellite-tracker";
pub const CACHE_TEXT_KEY: &str = "satellites_tle_v2";
pub const CACHE_TIME_KEY: &str = "satellites_tle_time_v2";
pub const CACHE_TTL_MS: i64 = 24 * 60 * 60 * 1000;

// tracking
pub const TICK_PERIOD_MS: u64 = 3000;
pub const PROXIMITY_THRESHOLD_KM: f64 = 200.0;
pub const GEOFENCE_GROUND_DIAMETER_M: f64 = 400_000.0;

// map view
pub const MIN_ZOOM: f64 = 2.0;
pub const MAX_ZOOM: f64 = 18.0;
pub const MAX_MAP_LATITUDE: f64 = 85.0;

// audio
pub const RADAR_PING_SOUND: &str = "sounds/radar_ping.ogg";

// file looked up in the working directory on startup
pub const CONFIG_FILE: &str = "proxtrack.json";

/// Marker palette, in assignment order: (style name, sRGB hex)
pub const PALETTE: [(&str, &str); 11] = [
    ("red", "#e6194b"),
    ("orange", "#f58231"),
    ("yellow", "#ffe119"),
    ("green", "#3cb44b"),
    ("blue", "#4363d8"),
    ("magenta", "#f032e6"),
    ("brown", "#9a6324"),
    ("pink", "#fabed4"),
    ("lime", "#bfef45"),
    ("teal", "#469990"),
    ("indigo", "#4b0082"),
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Runtime tunables. Every field falls back to the constants above.
#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub catalog_url: String,
    pub user_agent: String,
    pub cache_dir: PathBuf,
    pub cache_ttl_ms: i64,
    pub tick_period_ms: u64,
    pub proximity_threshold_km: f64,
    pub geofence_ground_diameter_m: f64,
    pub audio_cue: Option<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            catalog_url: CATALOG_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
            cache_dir: PathBuf::from(".proxtrack-cache"),
            cache_ttl_ms: CACHE_TTL_MS,
            tick_period_ms: TICK_PERIOD_MS,
            proximity_threshold_km: PROXIMITY_THRESHOLD_KM,
            geofence_ground_diameter_m: GEOFENCE_GROUND_DIAMETER_M,
            audio_cue: Some(RADAR_PING_SOUND.to_string()),
        }
    }
}

impl TrackerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    // missing file is the normal case, a broken one is worth a warning
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }

        match Self::from_file(path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", path);
                config
            }
            Err(err) => {
                warn!("Ignoring {:?}, using defaults: {err}", path);
                Self::default()
            }
        }
    }
}
