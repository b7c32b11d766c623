//! Media library contract for PhotoSweep.
//!
//! The gallery never talks to the device photo store directly; it goes through
//! [`MediaLibrary`], which models the paginated enumerate/resolve/delete API of
//! a device media library. [`FsLibrary`] backs it with a local photo directory.

mod fs;

pub use fs::FsLibrary;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

/// Number of assets requested per page by the gallery.
pub const DEFAULT_PAGE_SIZE: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("Permission to read the photo library was denied")]
    PermissionDenied,
    #[error("Pagination cursor is no longer valid: {0}")]
    CursorExpired(String),
    #[error("Asset not found: {0}")]
    NotFound(String),
    #[error("I/O Error: {0}")]
    Io(String),
    #[error("Other Error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

/// One media item as the library reports it, before location resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub uri: String,
    pub creation_time: DateTime<Utc>,
}

/// Result of resolving an asset's displayable location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    pub local_uri: Option<String>,
    pub uri: String,
}

impl AssetInfo {
    /// The location to display: the local copy when one exists.
    pub fn display_uri(&self) -> &str {
        self.local_uri.as_deref().unwrap_or(&self.uri)
    }
}

/// A page request. Pages are always photos sorted by creation time, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page_size: usize,
    pub after: Option<String>,
}

impl PageRequest {
    pub fn first(page_size: usize) -> Self {
        PageRequest { page_size, after: None }
    }

    pub fn after(page_size: usize, cursor: impl Into<String>) -> Self {
        PageRequest {
            page_size,
            after: Some(cursor.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPage {
    pub assets: Vec<Asset>,
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

/// Device media library as consumed by the gallery.
///
/// `delete_assets` is all-or-nothing from the caller's point of view.
pub trait MediaLibrary: Send + Sync {
    fn permission_status(&self) -> impl Future<Output = Result<PermissionStatus, MediaError>> + Send;

    fn request_permission(&self) -> impl Future<Output = Result<PermissionStatus, MediaError>> + Send;

    /// Fetch one page of photos. Fails with [`MediaError::CursorExpired`] when
    /// `request.after` no longer designates a position in the library.
    fn fetch_page(&self, request: PageRequest) -> impl Future<Output = Result<AssetPage, MediaError>> + Send;

    fn resolve_asset_info(&self, asset: &Asset) -> impl Future<Output = Result<AssetInfo, MediaError>> + Send;

    fn delete_assets(&self, ids: &[String]) -> impl Future<Output = Result<(), MediaError>> + Send;
}
