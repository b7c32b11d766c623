//! Gallery state for PhotoSweep.
//!
//! [`GalleryController`] owns the photo list, pagination cursor, selection and
//! preview; [`PreferencesStore`] owns the user settings. Both publish
//! snapshots through `tokio::sync::watch` so a front-end can re-render on change.

mod controller;
mod grouping;
mod layout;
mod photo;
mod preferences;

pub use controller::{GalleryController, GalleryError, GallerySnapshot, Message, PAGE_SIZE};
pub use grouping::{group_photos, Group, GroupBy};
pub use layout::{column_count, row_count, ITEM_MARGIN, OUTER_PADDING};
pub use photo::Photo;
pub use preferences::{
    Preferences, PreferencesStore, Theme, ThumbnailSize, DELETED_COUNT_KEY, PHOTO_SIZE_KEY,
};
