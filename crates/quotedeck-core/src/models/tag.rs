use serde::{Deserialize, Serialize};

/// A tag as reported by the store's tag listing, with its usage count.
///
/// The store sends the name twice (`name` and the older `tag` key); both are
/// kept so payloads round-trip unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagInfo {
    pub name: String,

    #[serde(default)]
    pub tag: String,

    #[serde(default)]
    pub quote_count: u32,
}

impl TagInfo {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            tag: name.clone(),
            name,
            quote_count: 0,
        }
    }
}
