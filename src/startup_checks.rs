use crate::Config;
use crate::transfer::TransferConfig;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create cache directory: {0}")]
    CacheDirectoryCreationFailed(#[from] std::io::Error),

    #[error("Transfer mirror directory does not exist: {0}")]
    MirrorDirectoryMissing(String),
}

async fn ensure_cache_directory(
    label: &str,
    directory: &Path,
    errors: &mut Vec<StartupCheckError>,
) {
    if directory.exists() {
        info!("{} cache directory exists: {:?}", label, directory);
        return;
    }

    info!(
        "{} cache directory does not exist, creating: {:?}",
        label, directory
    );
    match tokio::fs::create_dir_all(directory).await {
        Ok(()) => info!("{} cache directory created successfully", label),
        Err(e) => {
            error!("Failed to create {} cache directory: {}", label, e);
            errors.push(StartupCheckError::CacheDirectoryCreationFailed(e));
        }
    }
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    ensure_cache_directory("Thumbnail", &config.cache.thumbnail_directory, &mut errors).await;
    ensure_cache_directory("Preview", &config.cache.preview_directory, &mut errors).await;

    match &config.transfer {
        TransferConfig::Local(local) => {
            if local.directory.exists() {
                info!("Transfer mirror directory exists: {:?}", local.directory);
            } else {
                error!(
                    "Transfer mirror directory does not exist: {:?}",
                    local.directory
                );
                errors.push(StartupCheckError::MirrorDirectoryMissing(
                    local.directory.display().to_string(),
                ));
            }
        }
        TransferConfig::Null => {
            warn!("No transfer provider configured, missing renditions will not be fetched");
        }
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::LocalMirrorConfig;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_creates_cache_directories() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.cache.thumbnail_directory = temp_dir.path().join("cache/thumbnails");
        config.cache.preview_directory = temp_dir.path().join("cache/previews");

        perform_startup_checks(&config).await.unwrap();
        assert!(config.cache.thumbnail_directory.is_dir());
        assert!(config.cache.preview_directory.is_dir());
    }

    #[tokio::test]
    async fn test_missing_mirror_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.cache.thumbnail_directory = temp_dir.path().join("thumbnails");
        config.cache.preview_directory = temp_dir.path().join("previews");
        config.transfer = TransferConfig::Local(LocalMirrorConfig {
            directory: temp_dir.path().join("mirror"),
        });

        let errors = perform_startup_checks(&config).await.unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            StartupCheckError::MirrorDirectoryMissing(_)
        ));
    }
}
