//! Photo list, pagination, selection and preview state.

use crate::grouping::{self, Group, GroupBy};
use crate::layout;
use crate::photo::Photo;
use crate::preferences::PreferencesStore;
use chrono::Local;
use futures::future::try_join_all;
use media_library::{AssetPage, MediaError, MediaLibrary, PageRequest};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use store::KeyValueStore;
use thiserror::Error;
use tokio::sync::watch;

pub const PAGE_SIZE: usize = media_library::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GalleryError {
    #[error("Permission to access your photos is required")]
    PermissionDenied,
    #[error("Failed to load photos: {0}")]
    FetchFailed(String),
    #[error("Pagination cursor expired")]
    CursorExpired,
    #[error("Failed to delete photos: {0}")]
    DeleteFailed(String),
}

impl GalleryError {
    fn from_fetch(e: MediaError) -> Self {
        match e {
            MediaError::PermissionDenied => GalleryError::PermissionDenied,
            MediaError::CursorExpired(_) => GalleryError::CursorExpired,
            other => GalleryError::FetchFailed(other.to_string()),
        }
    }

    /// `CursorExpired` is never shown to the user as such.
    fn surfaced(self) -> Self {
        match self {
            GalleryError::CursorExpired => {
                GalleryError::FetchFailed("pagination cursor expired".into())
            }
            other => other,
        }
    }
}

/// Immutable view of the controller state, published after every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GallerySnapshot {
    pub photos: Vec<Photo>,
    pub cursor: Option<String>,
    pub has_more: bool,
    pub selection: BTreeSet<String>,
    pub preview: Option<Photo>,
    pub loading: bool,
    pub error: Option<GalleryError>,
}

impl Default for GallerySnapshot {
    fn default() -> Self {
        GallerySnapshot {
            photos: Vec::new(),
            cursor: None,
            has_more: true,
            selection: BTreeSet::new(),
            preview: None,
            loading: false,
            error: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    LoadPhotos,
    LoadMorePhotos,
    ToggleSelection(String),
    SelectGroup(Group),
    ClearSelection,
    DeletePhotos,
    ShowPreview(Photo),
    HidePreview,
    DismissError,
}

pub struct GalleryController<L, S> {
    library: L,
    preferences: Arc<PreferencesStore<S>>,
    state: GallerySnapshot,
    updates: watch::Sender<GallerySnapshot>,
}

impl<L: MediaLibrary, S: KeyValueStore> GalleryController<L, S> {
    pub fn new(library: L, preferences: Arc<PreferencesStore<S>>) -> Self {
        let (updates, _) = watch::channel(GallerySnapshot::default());
        GalleryController {
            library,
            preferences,
            state: GallerySnapshot::default(),
            updates,
        }
    }

    pub fn preferences(&self) -> &Arc<PreferencesStore<S>> {
        &self.preferences
    }

    pub fn snapshot(&self) -> &GallerySnapshot {
        &self.state
    }

    pub fn subscribe(&self) -> watch::Receiver<GallerySnapshot> {
        self.updates.subscribe()
    }

    pub fn photos(&self) -> &[Photo] {
        &self.state.photos
    }

    pub fn has_more(&self) -> bool {
        self.state.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.state.loading
    }

    pub fn error(&self) -> Option<&GalleryError> {
        self.state.error.as_ref()
    }

    pub fn preview(&self) -> Option<&Photo> {
        self.state.preview.as_ref()
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.state.selection
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.state.selection.contains(id)
    }

    pub fn selected_count(&self) -> usize {
        self.state.selection.len()
    }

    fn publish(&self) {
        self.updates.send_replace(self.state.clone());
    }

    pub async fn update(&mut self, message: Message) -> Result<(), GalleryError> {
        match message {
            Message::LoadPhotos => {
                self.reload().await?;
            }
            Message::LoadMorePhotos => {
                self.load_more().await?;
            }
            Message::ToggleSelection(id) => {
                self.toggle_selection(&id);
            }
            Message::SelectGroup(group) => self.select_all_in_group(&group),
            Message::ClearSelection => self.clear_selection(),
            Message::DeletePhotos => {
                self.delete_photos().await?;
            }
            Message::ShowPreview(photo) => self.show_preview(photo),
            Message::HidePreview => self.hide_preview(),
            Message::DismissError => self.clear_error(),
        }
        Ok(())
    }

    pub async fn reload(&mut self) -> Result<usize, GalleryError> {
        self.load_photos(false).await
    }

    pub async fn load_more(&mut self) -> Result<usize, GalleryError> {
        self.load_photos(true).await
    }

    /// Fetch one page. With `refresh` the page continues from the cursor and
    /// is appended; otherwise the first page replaces the list. Returns the
    /// number of photos that were not already listed.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn load_photos(&mut self, refresh: bool) -> Result<usize, GalleryError> {
        if refresh && !self.state.has_more {
            tracing::debug!("no more pages to load");
            return Ok(0);
        }

        self.state.loading = true;
        self.state.error = None;
        self.publish();

        let result = self.fetch_and_merge(refresh).await;

        self.state.loading = false;
        if let Err(e) = &result {
            tracing::error!(error = %e, refresh, "loading photos failed");
            self.state.error = Some(e.clone());
        }
        self.publish();
        result
    }

    async fn ensure_permission(&self) -> Result<(), GalleryError> {
        let status = self
            .library
            .permission_status()
            .await
            .map_err(GalleryError::from_fetch)?;
        if status.is_granted() {
            return Ok(());
        }
        let status = self
            .library
            .request_permission()
            .await
            .map_err(GalleryError::from_fetch)?;
        if status.is_granted() {
            Ok(())
        } else {
            tracing::warn!(?status, "photo library access not granted");
            Err(GalleryError::PermissionDenied)
        }
    }

    async fn fetch(&self, request: PageRequest) -> Result<AssetPage, GalleryError> {
        self.library
            .fetch_page(request)
            .await
            .map_err(GalleryError::from_fetch)
    }

    async fn fetch_and_merge(&mut self, refresh: bool) -> Result<usize, GalleryError> {
        self.ensure_permission().await?;

        let request = match (&self.state.cursor, refresh) {
            (Some(cursor), true) => PageRequest::after(PAGE_SIZE, cursor.clone()),
            _ => PageRequest::first(PAGE_SIZE),
        };

        let page = match self.fetch(request).await {
            Err(GalleryError::CursorExpired) if refresh => {
                // Best effort: refetch everything seen so far plus one page.
                let page_size = PAGE_SIZE + self.state.photos.len();
                tracing::warn!(page_size, "cursor expired, refetching from the start");
                self.fetch(PageRequest::first(page_size))
                    .await
                    .map_err(GalleryError::surfaced)?
            }
            other => other.map_err(GalleryError::surfaced)?,
        };

        let batch = self.resolve(&page).await?;
        Ok(self.merge(batch, &page, refresh))
    }

    /// Resolve display locations for a whole page. Lookups run concurrently;
    /// the page only counts as fetched once all of them succeed.
    async fn resolve(&self, page: &AssetPage) -> Result<Vec<Photo>, GalleryError> {
        let library = &self.library;
        try_join_all(page.assets.iter().map(|asset| async move {
            let info = library.resolve_asset_info(asset).await.map_err(|e| {
                GalleryError::FetchFailed(format!("could not resolve {}: {}", asset.id, e))
            })?;
            Ok::<_, GalleryError>(Photo::from_asset(asset, &info))
        }))
        .await
    }

    fn merge(&mut self, batch: Vec<Photo>, page: &AssetPage, refresh: bool) -> usize {
        let mut known: HashSet<String> = if refresh {
            self.state.photos.iter().map(|p| p.id.clone()).collect()
        } else {
            HashSet::new()
        };
        let fresh: Vec<Photo> = batch
            .into_iter()
            .filter(|p| known.insert(p.id.clone()))
            .collect();
        let added = fresh.len();

        if refresh {
            self.state.photos.extend(fresh);
        } else {
            self.state.photos = fresh;
            self.prune_to_list();
        }

        self.state.cursor = page.end_cursor.clone();
        // A page of nothing but known photos stops pagination so the same
        // page is not fetched forever.
        self.state.has_more = page.has_next_page && added > 0;

        tracing::info!(
            added,
            total = self.state.photos.len(),
            has_more = self.state.has_more,
            refresh,
            "page merged"
        );
        added
    }

    /// Drop selection and preview entries whose photo is no longer listed.
    fn prune_to_list(&mut self) {
        let ids: HashSet<&str> = self.state.photos.iter().map(|p| p.id.as_str()).collect();
        self.state.selection.retain(|id| ids.contains(id.as_str()));
        if let Some(preview) = &self.state.preview {
            if !ids.contains(preview.id.as_str()) {
                self.state.preview = None;
            }
        }
    }

    /// Flip `id` in the selection. Ids that are not listed are ignored.
    /// Returns whether `id` is selected afterwards.
    pub fn toggle_selection(&mut self, id: &str) -> bool {
        if !self.state.selection.remove(id) {
            if !self.state.photos.iter().any(|p| p.id == id) {
                tracing::debug!(id, "ignoring selection of unknown photo");
                return false;
            }
            self.state.selection.insert(id.to_string());
        }
        self.publish();
        self.state.selection.contains(id)
    }

    /// Ids of `group` that are still listed. A group built before a delete
    /// or reload may name photos that are gone.
    fn listed_in_group<'g>(&self, group: &'g Group) -> Vec<&'g str> {
        let listed: HashSet<&str> = self.state.photos.iter().map(|p| p.id.as_str()).collect();
        group.ids().filter(|id| listed.contains(id)).collect()
    }

    pub fn is_group_fully_selected(&self, group: &Group) -> bool {
        let ids = self.listed_in_group(group);
        !ids.is_empty() && ids.iter().all(|id| self.state.selection.contains(*id))
    }

    /// Select every listed photo of `group`, or deselect them all when they
    /// are already selected.
    pub fn select_all_in_group(&mut self, group: &Group) {
        let fully_selected = self.is_group_fully_selected(group);
        let ids: Vec<String> = self
            .listed_in_group(group)
            .into_iter()
            .map(str::to_string)
            .collect();
        if fully_selected {
            for id in &ids {
                self.state.selection.remove(id);
            }
        } else {
            self.state.selection.extend(ids);
        }
        self.publish();
    }

    pub fn clear_selection(&mut self) {
        self.state.selection.clear();
        self.publish();
    }

    /// Delete every selected photo. All-or-nothing: on failure the list and
    /// the selection are left as they were.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn delete_photos(&mut self) -> Result<usize, GalleryError> {
        if self.state.selection.is_empty() {
            return Ok(0);
        }
        let ids: Vec<String> = self.state.selection.iter().cloned().collect();

        if let Err(e) = self.library.delete_assets(&ids).await {
            let err = GalleryError::DeleteFailed(e.to_string());
            tracing::error!(error = %e, count = ids.len(), "deleting photos failed");
            self.state.error = Some(err.clone());
            self.publish();
            return Err(err);
        }

        let deleted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.state.photos.retain(|p| !deleted.contains(p.id.as_str()));
        self.state.selection.clear();
        self.state.error = None;
        if let Some(preview) = &self.state.preview {
            if deleted.contains(preview.id.as_str()) {
                self.state.preview = None;
            }
        }
        self.publish();

        tracing::info!(count = ids.len(), "photos deleted");
        self.preferences.increment_deleted_count(ids.len() as u64).await;
        Ok(ids.len())
    }

    /// Groups for the grid, using the grouping preference and the local time zone.
    pub fn group_photos(&self) -> Vec<Group> {
        let by = GroupBy::from_group_by_day(self.preferences.get().group_by_day);
        grouping::group_photos(&self.state.photos, by, &Local)
    }

    pub fn column_count(&self, viewport_width: f32) -> usize {
        layout::column_count(viewport_width, self.preferences.get().thumbnail_size)
    }

    pub fn show_preview(&mut self, photo: Photo) {
        self.state.preview = Some(photo);
        self.publish();
    }

    pub fn hide_preview(&mut self) {
        self.state.preview = None;
        self.publish();
    }

    pub fn clear_error(&mut self) {
        self.state.error = None;
        self.publish();
    }
}
