//! What the viewer needs to open a document.

use serde::Serialize;

use pagevault_core::{DocumentId, UserId};

/// Identity of the signed-in user, as far as watermarking cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerIdentity {
    pub user_id: UserId,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl ViewerIdentity {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            email: None,
            name: None,
        }
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Text stamped over rendered pages: email, else name, else `user-<id>`.
    pub fn watermark(&self) -> String {
        [&self.email, &self.name]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("user-{}", self.user_id))
    }
}

/// Serializes as `{documentId, pageCount, watermark}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerManifest {
    pub document_id: DocumentId,
    pub page_count: u32,
    pub watermark: String,
}
