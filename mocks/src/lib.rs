use chrono::{DateTime, Duration, TimeZone, Utc};
use media_library::{
    Asset, AssetInfo, AssetPage, MediaError, MediaLibrary, PageRequest, PermissionStatus,
};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use store::{KeyValueStore, MemoryStore, StoreError};

/// Reference instant for generated assets.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap()
}

/// Asset taken `hours_ago` hours before [`base_time`].
pub fn asset(id: &str, hours_ago: i64) -> Asset {
    asset_at(id, base_time() - Duration::hours(hours_ago))
}

pub fn asset_at(id: &str, creation_time: DateTime<Utc>) -> Asset {
    Asset {
        id: id.to_string(),
        uri: format!("ph://{}", id),
        creation_time,
    }
}

/// `count` assets named `p000`, `p001`, ... one hour apart, newest first.
pub fn numbered_assets(start: usize, count: usize) -> Vec<Asset> {
    (start..start + count)
        .map(|i| asset(&format!("p{:03}", i), i as i64))
        .collect()
}

#[derive(Default)]
struct MockState {
    assets: Vec<Asset>,
    permission: Option<PermissionStatus>,
    grant_on_request: bool,
    scripted: VecDeque<Result<AssetPage, MediaError>>,
    requests: Vec<PageRequest>,
    deleted: Vec<Vec<String>>,
    delete_fault: Option<MediaError>,
    resolve_faults: HashSet<String>,
    remote_only: HashSet<String>,
    permission_requests: usize,
}

/// In-memory media library with scripted responses and fault injection.
///
/// Unscripted fetches paginate over the stored assets with the offset as
/// cursor. Scripted pages and faults are consumed first, in push order.
#[derive(Clone, Default)]
pub struct MockLibrary {
    state: Arc<Mutex<MockState>>,
}

impl MockLibrary {
    pub fn new(assets: Vec<Asset>) -> Self {
        let lib = MockLibrary::default();
        lib.state().assets = assets;
        lib
    }

    pub fn with_photos(count: usize) -> Self {
        Self::new(numbered_assets(0, count))
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start with `status`; `request_permission` grants access only when
    /// `grant_on_request` is set.
    pub fn set_permission(&self, status: PermissionStatus, grant_on_request: bool) {
        let mut state = self.state();
        state.permission = Some(status);
        state.grant_on_request = grant_on_request;
    }

    pub fn set_assets(&self, assets: Vec<Asset>) {
        self.state().assets = assets;
    }

    pub fn push_page(&self, page: AssetPage) {
        self.state().scripted.push_back(Ok(page));
    }

    pub fn push_fault(&self, fault: MediaError) {
        self.state().scripted.push_back(Err(fault));
    }

    pub fn fail_next_delete(&self, fault: MediaError) {
        self.state().delete_fault = Some(fault);
    }

    pub fn fail_resolve(&self, id: &str) {
        self.state().resolve_faults.insert(id.to_string());
    }

    pub fn remote_only(&self, id: &str) {
        self.state().remote_only.insert(id.to_string());
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.state().requests.clone()
    }

    pub fn deleted(&self) -> Vec<Vec<String>> {
        self.state().deleted.clone()
    }

    pub fn permission_requests(&self) -> usize {
        self.state().permission_requests
    }

    pub fn asset_ids(&self) -> Vec<String> {
        self.state().assets.iter().map(|a| a.id.clone()).collect()
    }
}

impl MediaLibrary for MockLibrary {
    async fn permission_status(&self) -> Result<PermissionStatus, MediaError> {
        Ok(self.state().permission.unwrap_or(PermissionStatus::Granted))
    }

    async fn request_permission(&self) -> Result<PermissionStatus, MediaError> {
        let mut state = self.state();
        state.permission_requests += 1;
        if state.grant_on_request {
            state.permission = Some(PermissionStatus::Granted);
        }
        Ok(state.permission.unwrap_or(PermissionStatus::Granted))
    }

    async fn fetch_page(&self, request: PageRequest) -> Result<AssetPage, MediaError> {
        let mut state = self.state();
        state.requests.push(request.clone());
        if let Some(next) = state.scripted.pop_front() {
            return next;
        }
        let offset = match &request.after {
            None => 0,
            Some(cursor) => match cursor.parse::<usize>() {
                Ok(o) if o <= state.assets.len() => o,
                _ => return Err(MediaError::CursorExpired(cursor.clone())),
            },
        };
        let end = (offset + request.page_size).min(state.assets.len());
        Ok(AssetPage {
            assets: state.assets[offset..end].to_vec(),
            end_cursor: Some(end.to_string()),
            has_next_page: end < state.assets.len(),
        })
    }

    async fn resolve_asset_info(&self, asset: &Asset) -> Result<AssetInfo, MediaError> {
        let state = self.state();
        if state.resolve_faults.contains(&asset.id) {
            return Err(MediaError::Io(format!("cannot resolve {}", asset.id)));
        }
        let local_uri = if state.remote_only.contains(&asset.id) {
            None
        } else {
            Some(format!("file:///local/{}.jpg", asset.id))
        };
        Ok(AssetInfo {
            local_uri,
            uri: asset.uri.clone(),
        })
    }

    async fn delete_assets(&self, ids: &[String]) -> Result<(), MediaError> {
        let mut state = self.state();
        if let Some(fault) = state.delete_fault.take() {
            return Err(fault);
        }
        state.assets.retain(|a| !ids.contains(&a.id));
        state.deleted.push(ids.to_vec());
        Ok(())
    }
}

/// Key-value store whose reads or writes always fail. Successful reads come
/// from the wrapped [`MemoryStore`].
#[derive(Clone, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_reads: bool,
    fail_writes: bool,
}

impl FailingStore {
    pub fn failing_writes(inner: MemoryStore) -> Self {
        FailingStore {
            inner,
            fail_reads: false,
            fail_writes: true,
        }
    }

    pub fn failing_reads() -> Self {
        FailingStore {
            inner: MemoryStore::new(),
            fail_reads: true,
            fail_writes: false,
        }
    }
}

impl KeyValueStore for FailingStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads {
            return Err(StoreError::DatabaseError(format!("read of {} failed", key)));
        }
        self.inner.get_item(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::DatabaseError(format!("write of {} failed", key)));
        }
        self.inner.set_item(key, value).await
    }
}
