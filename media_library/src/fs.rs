use crate::{Asset, AssetInfo, AssetPage, MediaError, MediaLibrary, PageRequest, PermissionStatus};
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use walkdir::WalkDir;

const PHOTO_EXTENSIONS: [&str; 10] = [
    "jpg", "jpeg", "png", "gif", "webp", "heic", "heif", "bmp", "tif", "tiff",
];

/// Media library over a directory of image files.
///
/// Cursors have the form `<generation>:<offset>`. Every deletion bumps the
/// generation, which invalidates all cursors handed out before it.
#[derive(Clone)]
pub struct FsLibrary {
    inner: Arc<Inner>,
}

struct Inner {
    root: PathBuf,
    generation: AtomicU64,
}

impl FsLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsLibrary {
            inner: Arc::new(Inner {
                root: root.into(),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    fn check_access(root: &Path) -> PermissionStatus {
        match std::fs::read_dir(root) {
            Ok(_) => PermissionStatus::Granted,
            Err(_) => PermissionStatus::Denied,
        }
    }

    fn is_photo(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_ascii_lowercase();
                PHOTO_EXTENSIONS.contains(&e.as_str())
            })
            .unwrap_or(false)
    }

    fn relative_id(root: &Path, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(root).ok()?;
        let parts: Vec<&str> = rel
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;
        Some(parts.join("/"))
    }

    /// Resolve an asset id to a path inside the root, rejecting ids that
    /// would escape it.
    fn path_for(root: &Path, id: &str) -> Option<PathBuf> {
        let rel = Path::new(id);
        if id.is_empty() || rel.components().any(|c| !matches!(c, Component::Normal(_))) {
            return None;
        }
        Some(root.join(rel))
    }

    fn scan(root: &Path) -> Result<Vec<Asset>, MediaError> {
        if Self::check_access(root) != PermissionStatus::Granted {
            return Err(MediaError::PermissionDenied);
        }
        let mut assets = Vec::new();
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry.map_err(|e| MediaError::Io(e.to_string()))?;
            if !entry.file_type().is_file() || !Self::is_photo(entry.path()) {
                continue;
            }
            let Some(id) = Self::relative_id(root, entry.path()) else {
                tracing::warn!(path = %entry.path().display(), "skipping non UTF-8 path");
                continue;
            };
            let modified = entry
                .metadata()
                .map_err(|e| MediaError::Io(e.to_string()))?
                .modified()
                .map_err(|e| MediaError::Io(e.to_string()))?;
            assets.push(Asset {
                id,
                uri: format!("file://{}", entry.path().display()),
                creation_time: DateTime::<Utc>::from(modified),
            });
        }
        assets.sort_by(|a, b| {
            b.creation_time
                .cmp(&a.creation_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(assets)
    }

    fn parse_cursor(cursor: &str) -> Option<(u64, usize)> {
        let (generation, offset) = cursor.split_once(':')?;
        Some((generation.parse().ok()?, offset.parse().ok()?))
    }

    fn paginate(
        assets: Vec<Asset>,
        request: &PageRequest,
        generation: u64,
    ) -> Result<AssetPage, MediaError> {
        let offset = match &request.after {
            None => 0,
            Some(cursor) => match Self::parse_cursor(cursor) {
                Some((g, offset)) if g == generation && offset <= assets.len() => offset,
                _ => return Err(MediaError::CursorExpired(cursor.clone())),
            },
        };
        let end = (offset + request.page_size.max(1)).min(assets.len());
        let page: Vec<Asset> = assets[offset..end].to_vec();
        Ok(AssetPage {
            assets: page,
            end_cursor: Some(format!("{}:{}", generation, end)),
            has_next_page: end < assets.len(),
        })
    }
}

impl MediaLibrary for FsLibrary {
    async fn permission_status(&self) -> Result<PermissionStatus, MediaError> {
        let root = self.inner.root.clone();
        tokio::task::spawn_blocking(move || Self::check_access(&root))
            .await
            .map_err(|e| MediaError::Other(e.to_string()))
    }

    async fn request_permission(&self) -> Result<PermissionStatus, MediaError> {
        let status = self.permission_status().await?;
        tracing::info!(root = %self.inner.root.display(), ?status, "photo library access checked");
        Ok(status)
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    async fn fetch_page(&self, request: PageRequest) -> Result<AssetPage, MediaError> {
        let root = self.inner.root.clone();
        let assets = tokio::task::spawn_blocking(move || Self::scan(&root))
            .await
            .map_err(|e| MediaError::Other(e.to_string()))??;
        Self::paginate(assets, &request, self.generation())
    }

    async fn resolve_asset_info(&self, asset: &Asset) -> Result<AssetInfo, MediaError> {
        let path = Self::path_for(&self.inner.root, &asset.id)
            .ok_or_else(|| MediaError::NotFound(asset.id.clone()))?;
        let local = tokio::fs::canonicalize(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MediaError::NotFound(asset.id.clone()),
            _ => MediaError::Io(e.to_string()),
        })?;
        Ok(AssetInfo {
            local_uri: Some(local.to_string_lossy().to_string()),
            uri: asset.uri.clone(),
        })
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    async fn delete_assets(&self, ids: &[String]) -> Result<(), MediaError> {
        if ids.is_empty() {
            return Ok(());
        }
        let root = self.inner.root.clone();
        let ids = ids.to_vec();
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let mut paths = Vec::with_capacity(ids.len());
            for id in &ids {
                match Self::path_for(&root, id) {
                    Some(p) if p.is_file() => paths.push(p),
                    _ => return Err(MediaError::NotFound(id.clone())),
                }
            }
            let mut removed = 0usize;
            let result = paths.iter().try_for_each(|p| {
                std::fs::remove_file(p)
                    .map(|_| removed += 1)
                    .map_err(|e| MediaError::Io(format!("{}: {}", p.display(), e)))
            });
            if removed > 0 {
                inner.generation.fetch_add(1, Ordering::SeqCst);
            }
            tracing::info!(removed, requested = ids.len(), "deleted photo files");
            result
        })
        .await
        .map_err(|e| MediaError::Other(e.to_string()))?
    }
}
