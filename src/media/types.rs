use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier of a remote node.
pub type Handle = u64;

pub const INVALID_HANDLE: Handle = u64::MAX;

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "heic", "heif", "tif", "tiff", "dng",
];

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "m4v", "3gp", "mkv", "avi", "webm", "mpg", "mpeg", "wmv", "flv",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Folder,
    Other,
}

impl MediaKind {
    /// Guess the kind of a file from the extension of its name.
    pub fn from_name(name: &str) -> Self {
        let extension = match name.rsplit_once('.') {
            Some((_, ext)) => ext.to_lowercase(),
            None => return MediaKind::Other,
        };

        if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            MediaKind::Image
        } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            MediaKind::Video
        } else {
            MediaKind::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub handle: Handle,
    pub parent_handle: Option<Handle>,
    pub name: String,
    /// Modification time in seconds since the unix epoch.
    pub modified: i64,
    pub kind: MediaKind,
    pub public_link: Option<String>,
    pub is_offline: bool,
    pub is_dirty: bool,
    pub in_rubbish: bool,
}

impl MediaItem {
    pub fn new(handle: Handle, name: impl Into<String>, modified: i64) -> Self {
        let name = name.into();
        let kind = MediaKind::from_name(&name);
        Self {
            handle,
            parent_handle: None,
            name,
            modified,
            kind,
            public_link: None,
            is_offline: false,
            is_dirty: false,
            in_rubbish: false,
        }
    }

    pub fn folder(handle: Handle, name: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Folder,
            ..Self::new(handle, name, 0)
        }
    }

    /// Placeholder for a node only known by its handle in the offline store.
    /// The viewer opens these as images.
    pub fn offline(handle: Handle) -> Self {
        Self {
            kind: MediaKind::Image,
            is_offline: true,
            ..Self::new(handle, "", 0)
        }
    }

    pub fn with_parent(mut self, parent: Handle) -> Self {
        self.parent_handle = Some(parent);
        self
    }

    pub fn with_public_link(mut self, link: impl Into<String>) -> Self {
        self.public_link = Some(link.into());
        self
    }

    pub fn dirty(mut self) -> Self {
        self.is_dirty = true;
        self
    }

    pub fn is_folder(&self) -> bool {
        self.kind == MediaKind::Folder
    }

    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    pub fn is_photo(&self) -> bool {
        self.kind == MediaKind::Image
    }

    /// Whether the image viewer can display this node.
    pub fn is_valid_for_viewer(&self) -> bool {
        !self.in_rubbish && matches!(self.kind, MediaKind::Image | MediaKind::Video)
    }

    pub fn modified_at(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.modified, 0).unwrap_or_default()
    }

    pub fn modified_date(&self) -> NaiveDate {
        self.modified_at().date_naive()
    }

    pub fn base64_handle(&self) -> String {
        handle_to_base64(self.handle)
    }
}

/// Encode a handle the way cache file names are derived from it. All eight
/// bytes are kept so distinct handles never share a cache file.
pub fn handle_to_base64(handle: Handle) -> String {
    URL_SAFE_NO_PAD.encode(handle.to_le_bytes())
}

pub fn base64_to_handle(encoded: &str) -> Option<Handle> {
    let decoded = URL_SAFE_NO_PAD.decode(encoded).ok()?;
    let bytes: [u8; 8] = decoded.try_into().ok()?;
    Some(Handle::from_le_bytes(bytes))
}
