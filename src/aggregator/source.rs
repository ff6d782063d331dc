use super::AggregatorError;
use crate::media::{Handle, INVALID_HANDLE};
use crate::repository::SortOrder;

/// Where the viewer's images come from.
///
/// Several inputs may be set at once; the first usable one wins, in this
/// order: parent folder, handle list, public links, single offline handle,
/// single online handle.
#[derive(Debug, Clone, Default)]
pub struct ImageSource {
    pub parent: Option<Handle>,
    pub sort_order: Option<SortOrder>,
    pub handles: Option<Vec<Handle>>,
    /// The handle list refers to offline copies.
    pub handles_offline: bool,
    pub public_links: Option<Vec<String>>,
    pub offline_handle: Option<Handle>,
    pub online_handle: Option<Handle>,
}

impl ImageSource {
    pub fn parent(handle: Handle) -> Self {
        Self {
            parent: Some(handle),
            ..Self::default()
        }
    }

    pub fn handles(handles: Vec<Handle>) -> Self {
        Self {
            handles: Some(handles),
            ..Self::default()
        }
    }

    pub fn offline_handles(handles: Vec<Handle>) -> Self {
        Self {
            handles: Some(handles),
            handles_offline: true,
            ..Self::default()
        }
    }

    pub fn public_links(links: Vec<String>) -> Self {
        Self {
            public_links: Some(links),
            ..Self::default()
        }
    }

    pub fn offline(handle: Handle) -> Self {
        Self {
            offline_handle: Some(handle),
            ..Self::default()
        }
    }

    pub fn single(handle: Handle) -> Self {
        Self {
            online_handle: Some(handle),
            ..Self::default()
        }
    }

    pub fn with_sort_order(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = Some(sort_order);
        self
    }

    pub(crate) fn resolve(&self) -> Result<ResolvedSource, AggregatorError> {
        if let Some(parent) = self.parent.filter(|h| is_valid(*h)) {
            return Ok(ResolvedSource::Parent {
                handle: parent,
                sort: self.sort_order.unwrap_or(SortOrder::ModificationAsc),
            });
        }

        if let Some(handles) = self.handles.as_ref().filter(|h| !h.is_empty()) {
            return Ok(ResolvedSource::Handles {
                handles: handles.clone(),
                offline: self.handles_offline,
            });
        }

        if let Some(links) = self.public_links.as_ref().filter(|l| !l.is_empty()) {
            return Ok(ResolvedSource::PublicLinks(links.clone()));
        }

        if let Some(handle) = self.offline_handle.filter(|h| is_valid(*h)) {
            return Ok(ResolvedSource::Offline(handle));
        }

        if let Some(handle) = self.online_handle.filter(|h| is_valid(*h)) {
            return Ok(ResolvedSource::Online(handle));
        }

        Err(AggregatorError::InvalidArguments)
    }
}

fn is_valid(handle: Handle) -> bool {
    handle != INVALID_HANDLE
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ResolvedSource {
    Parent { handle: Handle, sort: SortOrder },
    Handles { handles: Vec<Handle>, offline: bool },
    PublicLinks(Vec<String>),
    Offline(Handle),
    Online(Handle),
}

impl ResolvedSource {
    /// The folder that scopes incoming changes, when there is one.
    pub(crate) fn parent(&self) -> Option<Handle> {
        match self {
            ResolvedSource::Parent { handle, .. } => Some(*handle),
            _ => None,
        }
    }

    /// How many entries the caller asked for. A folder is sized by its
    /// listing, so it has no count of its own.
    pub(crate) fn requested(&self) -> Option<usize> {
        match self {
            ResolvedSource::Parent { .. } => None,
            ResolvedSource::Handles { handles, .. } => Some(handles.len()),
            ResolvedSource::PublicLinks(links) => Some(links.len()),
            ResolvedSource::Offline(_) | ResolvedSource::Online(_) => Some(1),
        }
    }
}
