use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod aggregator;
pub mod cache;
pub mod changes;
pub mod controller;
pub mod media;
pub mod repository;
pub mod selection;
pub mod startup_checks;
pub mod timeline;
pub mod transfer;
pub mod viewer;

use media::Handle;
use timeline::ZoomLevel;
use transfer::TransferConfig;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub app: AppConfig,
    pub cache: CacheConfig,
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    pub thumbnail_directory: PathBuf,
    pub preview_directory: PathBuf,
    /// Minimum delay between two fetch dispatches.
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    /// Clear the outstanding marker when a fetch fails, so the next
    /// request retries right away.
    #[serde(default)]
    pub release_on_failure: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimelineConfig {
    #[serde(default)]
    pub default_zoom: ZoomLevel,
    #[serde(default)]
    pub camera_uploads: Option<Handle>,
    #[serde(default = "default_window_ms")]
    pub open_throttle_ms: u64,
    #[serde(default = "default_window_ms")]
    pub refresh_throttle_ms: u64,
}

fn default_throttle_ms() -> u64 {
    50
}

fn default_window_ms() -> u64 {
    1000
}

impl CacheConfig {
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

impl TimelineConfig {
    pub fn open_throttle(&self) -> Duration {
        Duration::from_millis(self.open_throttle_ms)
    }

    pub fn refresh_throttle(&self) -> Duration {
        Duration::from_millis(self.refresh_throttle_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig {
                name: "Photo Timeline".to_string(),
                log_level: "info".to_string(),
            },
            cache: CacheConfig {
                thumbnail_directory: PathBuf::from("cache/thumbnails"),
                preview_directory: PathBuf::from("cache/previews"),
                throttle_ms: default_throttle_ms(),
                release_on_failure: false,
            },
            timeline: TimelineConfig {
                default_zoom: ZoomLevel::Month,
                camera_uploads: None,
                open_throttle_ms: default_window_ms(),
                refresh_throttle_ms: default_window_ms(),
            },
            transfer: TransferConfig::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let content = r#"
[app]
name = "Uploads"
log_level = "debug"

[cache]
thumbnail_directory = "/var/cache/uploads/thumbnails"
preview_directory = "/var/cache/uploads/previews"
release_on_failure = true

[timeline]
default_zoom = "day"
camera_uploads = 100
refresh_throttle_ms = 250

[transfer]
provider = "local"
directory = "/srv/mirror"
"#;
        let config: Config = toml_edit::de::from_str(content).unwrap();

        assert_eq!(config.app.name, "Uploads");
        assert_eq!(config.cache.throttle(), Duration::from_millis(50));
        assert!(config.cache.release_on_failure);
        assert_eq!(config.timeline.default_zoom, ZoomLevel::Day);
        assert_eq!(config.timeline.camera_uploads, Some(100));
        assert_eq!(config.timeline.open_throttle(), Duration::from_secs(1));
        assert_eq!(
            config.timeline.refresh_throttle(),
            Duration::from_millis(250)
        );
        assert!(matches!(
            config.transfer,
            TransferConfig::Local(ref local) if local.directory == PathBuf::from("/srv/mirror")
        ));
    }

    #[test]
    fn test_transfer_defaults_to_null() {
        let content = r#"
[app]
name = "Uploads"
log_level = "info"

[cache]
thumbnail_directory = "t"
preview_directory = "p"

[timeline]
"#;
        let config: Config = toml_edit::de::from_str(content).unwrap();
        assert!(matches!(config.transfer, TransferConfig::Null));
        assert_eq!(config.timeline.default_zoom, ZoomLevel::Month);
    }
}
