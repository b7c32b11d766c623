//! User preferences shared by the gallery and settings screens.
//!
//! Writes are optimistic: the in-memory value changes first and a failed
//! write to the key-value store is only logged.

use std::fmt;
use std::str::FromStr;
use store::KeyValueStore;
use tokio::sync::watch;

pub const DELETED_COUNT_KEY: &str = "deletedCount";
pub const PHOTO_SIZE_KEY: &str = "photoSize";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub const ALL: [Theme; 2] = [Theme::Light, Theme::Dark];
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme: {}", other)),
        }
    }
}

/// Thumbnail edge length in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThumbnailSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl ThumbnailSize {
    pub const ALL: [ThumbnailSize; 3] = [
        ThumbnailSize::Small,
        ThumbnailSize::Medium,
        ThumbnailSize::Large,
    ];

    pub fn pixels(self) -> u32 {
        match self {
            ThumbnailSize::Small => 80,
            ThumbnailSize::Medium => 100,
            ThumbnailSize::Large => 120,
        }
    }

    pub fn from_pixels(px: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.pixels() == px)
    }
}

impl fmt::Display for ThumbnailSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pixels())
    }
}

impl FromStr for ThumbnailSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let px: u32 = s
            .trim()
            .parse()
            .map_err(|_| format!("not a thumbnail size: {}", s))?;
        Self::from_pixels(px).ok_or_else(|| format!("unsupported thumbnail size: {}", px))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preferences {
    pub group_by_day: bool,
    pub theme: Theme,
    pub thumbnail_size: ThumbnailSize,
    pub deleted_count: u64,
}

/// Owner of [`Preferences`]. Only `deleted_count` and `thumbnail_size` are
/// persisted; grouping and theme last for the session.
pub struct PreferencesStore<S> {
    store: S,
    state: watch::Sender<Preferences>,
}

impl<S: KeyValueStore> PreferencesStore<S> {
    pub fn new(store: S) -> Self {
        let (state, _) = watch::channel(Preferences::default());
        PreferencesStore { store, state }
    }

    pub fn get(&self) -> Preferences {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Preferences> {
        self.state.subscribe()
    }

    /// Read persisted values. Missing, unreadable or malformed entries leave
    /// the current value in place.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn load(&self) {
        match self.store.get_item(DELETED_COUNT_KEY).await {
            Ok(Some(raw)) => match raw.trim().parse::<u64>() {
                Ok(count) => self.state.send_modify(|p| p.deleted_count = count),
                Err(e) => tracing::warn!(value = %raw, error = %e, "ignoring stored deleted count"),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "failed to read deleted count"),
        }

        match self.store.get_item(PHOTO_SIZE_KEY).await {
            Ok(Some(raw)) => match raw.parse::<ThumbnailSize>() {
                Ok(size) => self.state.send_modify(|p| p.thumbnail_size = size),
                Err(e) => tracing::warn!(error = %e, "ignoring stored thumbnail size"),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "failed to read thumbnail size"),
        }

        let prefs = self.get();
        tracing::debug!(
            deleted_count = prefs.deleted_count,
            thumbnail_size = prefs.thumbnail_size.pixels(),
            "preferences loaded"
        );
    }

    pub async fn set_thumbnail_size(&self, size: ThumbnailSize) {
        self.state.send_modify(|p| p.thumbnail_size = size);
        self.persist(PHOTO_SIZE_KEY, size.pixels().to_string()).await;
    }

    pub fn set_group_by_day(&self, group_by_day: bool) {
        self.state.send_modify(|p| p.group_by_day = group_by_day);
    }

    pub fn set_theme(&self, theme: Theme) {
        self.state.send_modify(|p| p.theme = theme);
    }

    pub async fn increment_deleted_count(&self, n: u64) {
        if n == 0 {
            return;
        }
        let mut total = 0;
        self.state.send_modify(|p| {
            p.deleted_count = p.deleted_count.saturating_add(n);
            total = p.deleted_count;
        });
        self.persist(DELETED_COUNT_KEY, total.to_string()).await;
    }

    pub async fn reset_deleted_count(&self) {
        self.state.send_modify(|p| p.deleted_count = 0);
        self.persist(DELETED_COUNT_KEY, "0".to_string()).await;
    }

    async fn persist(&self, key: &str, value: String) {
        if let Err(e) = self.store.set_item(key, &value).await {
            tracing::warn!(key, value = %value, error = %e, "failed to persist preference");
        }
    }
}
