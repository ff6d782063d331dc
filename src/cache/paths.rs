use super::CacheKind;
use crate::CacheConfig;
use crate::media::{Handle, handle_to_base64};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const CACHE_EXTENSION: &str = "jpg";

/// Deterministic on-disk locations of cached renditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    thumbnail_directory: PathBuf,
    preview_directory: PathBuf,
}

impl CachePaths {
    pub fn new(thumbnail_directory: PathBuf, preview_directory: PathBuf) -> Self {
        Self {
            thumbnail_directory,
            preview_directory,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            config.thumbnail_directory.clone(),
            config.preview_directory.clone(),
        )
    }

    /// Both cache kinds under one root, the layout used by tests and the CLI.
    pub fn under(root: &Path) -> Self {
        Self::new(root.join("thumbnails"), root.join("previews"))
    }

    pub fn directory(&self, kind: CacheKind) -> &Path {
        match kind {
            CacheKind::Thumbnail => &self.thumbnail_directory,
            CacheKind::Preview => &self.preview_directory,
        }
    }

    pub fn cache_filename(handle: Handle) -> String {
        format!("{}.{}", handle_to_base64(handle), CACHE_EXTENSION)
    }

    pub fn path_for(&self, kind: CacheKind, handle: Handle) -> PathBuf {
        self.directory(kind).join(Self::cache_filename(handle))
    }

    pub fn thumbnail_path(&self, handle: Handle) -> PathBuf {
        self.path_for(CacheKind::Thumbnail, handle)
    }

    pub fn preview_path(&self, handle: Handle) -> PathBuf {
        self.path_for(CacheKind::Preview, handle)
    }

    /// Path of the cached file if it is already on disk.
    pub fn existing(&self, kind: CacheKind, handle: Handle) -> Option<PathBuf> {
        let path = self.path_for(kind, handle);
        path.exists().then_some(path)
    }

    pub async fn is_cached(&self, kind: CacheKind, handle: Handle) -> bool {
        tokio::fs::try_exists(self.path_for(kind, handle))
            .await
            .unwrap_or(false)
    }

    pub async fn ensure_directories(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.thumbnail_directory).await?;
        tokio::fs::create_dir_all(&self.preview_directory).await?;
        Ok(())
    }

    /// Number of cached renditions of one kind currently on disk.
    pub fn cached_count(&self, kind: CacheKind) -> usize {
        WalkDir::new(self.directory(kind))
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .flatten()
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry
                        .path()
                        .extension()
                        .is_some_and(|ext| ext == CACHE_EXTENSION)
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cache_filename_generation() {
        let filename = CachePaths::cache_filename(0x1234);
        assert!(
            filename.ends_with(".jpg"),
            "Filename should end with correct extension"
        );
        assert_eq!(filename, format!("{}.jpg", handle_to_base64(0x1234)));

        // Same handle always maps to the same file
        assert_eq!(filename, CachePaths::cache_filename(0x1234));
        assert_ne!(filename, CachePaths::cache_filename(0x1235));
    }

    #[tokio::test]
    async fn test_handles_differing_in_high_bytes_do_not_share_files() {
        let temp_dir = TempDir::new().unwrap();
        let paths = CachePaths::under(temp_dir.path());
        paths.ensure_directories().await.unwrap();
        std::fs::write(paths.thumbnail_path(1), b"x").unwrap();

        let high = 0x0001_0000_0000_0001;
        assert_ne!(CachePaths::cache_filename(high), CachePaths::cache_filename(1));
        assert_eq!(paths.existing(CacheKind::Thumbnail, high), None);
    }

    #[test]
    fn test_kinds_use_separate_directories() {
        let paths = CachePaths::under(Path::new("/tmp/cache"));
        assert_eq!(
            paths.thumbnail_path(1).parent(),
            Some(Path::new("/tmp/cache/thumbnails"))
        );
        assert_eq!(
            paths.preview_path(1).parent(),
            Some(Path::new("/tmp/cache/previews"))
        );
        assert_eq!(
            paths.thumbnail_path(1).file_name(),
            paths.preview_path(1).file_name()
        );
    }

    #[tokio::test]
    async fn test_existing_and_count() {
        let temp_dir = TempDir::new().unwrap();
        let paths = CachePaths::under(temp_dir.path());
        paths.ensure_directories().await.unwrap();

        assert_eq!(paths.existing(CacheKind::Thumbnail, 9), None);
        assert!(!paths.is_cached(CacheKind::Thumbnail, 9).await);

        std::fs::write(paths.thumbnail_path(9), b"x").unwrap();
        std::fs::write(paths.thumbnail_path(10), b"x").unwrap();
        std::fs::write(paths.directory(CacheKind::Thumbnail).join("stray.tmp"), b"x").unwrap();

        assert_eq!(
            paths.existing(CacheKind::Thumbnail, 9),
            Some(paths.thumbnail_path(9))
        );
        assert!(paths.is_cached(CacheKind::Thumbnail, 9).await);
        assert!(!paths.is_cached(CacheKind::Preview, 9).await);
        assert_eq!(paths.cached_count(CacheKind::Thumbnail), 2);
        assert_eq!(paths.cached_count(CacheKind::Preview), 0);
    }
}
