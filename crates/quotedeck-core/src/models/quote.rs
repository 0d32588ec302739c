use serde::{Deserialize, Serialize};

/// A quote as stored by the remote quote store.
///
/// The body travels on the wire as `quote`; everything else keeps its own
/// name. Timestamps are ISO-8601 strings issued by the store; the client
/// never parses them, it only displays them and passes them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: String,

    #[serde(rename = "quote")]
    pub text: String,

    pub author: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub created_at: String,

    #[serde(default)]
    pub updated_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

/// Payload for creating or updating a quote. The store assigns `id` and
/// timestamps itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteDraft {
    #[serde(rename = "quote")]
    pub text: String,

    pub author: String,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl QuoteDraft {
    pub fn new(text: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
            tags: Vec::new(),
        }
    }

    /// Every violation that would make the store reject this draft.
    /// Messages match the store's own 400 responses.
    pub fn violations(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.text.trim().is_empty() {
            errors.push("'quote' is required and cannot be empty".to_string());
        }
        if self.author.trim().is_empty() {
            errors.push("'author' is required and cannot be empty".to_string());
        }
        if self.tags.iter().any(|t| t.trim().is_empty()) {
            errors.push("All tags must be non-empty strings".to_string());
        }
        errors
    }
}
