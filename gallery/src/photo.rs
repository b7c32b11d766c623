use chrono::{DateTime, Utc};
use media_library::{Asset, AssetInfo};

/// A photo as shown in the grid. Never mutated once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Photo {
    pub id: String,
    pub uri: String,
    pub creation_time: DateTime<Utc>,
}

impl Photo {
    pub fn from_asset(asset: &Asset, info: &AssetInfo) -> Self {
        Photo {
            id: asset.id.clone(),
            uri: info.display_uri().to_string(),
            creation_time: asset.creation_time,
        }
    }
}
