//! Persistent records shared by the store, the pipeline and the services.

use serde::{Deserialize, Serialize};

use crate::types::{DocumentId, UserId};

/// Maximum number of characters of a client IP kept in the access log.
pub const MAX_LOGGED_IP_LEN: usize = 64;

/// Maximum number of characters of a user agent kept in the access log.
pub const MAX_LOGGED_USER_AGENT_LEN: usize = 180;

/// A protected document as persisted by the encryption pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    /// Number of contiguously numbered encrypted pages, starting at 1.
    pub page_count: u32,
    /// Base64 of `nonce(12) || tag(16) || ciphertext`.
    pub wrapped_key: String,
    /// Creation time (Unix ms).
    pub created_at: i64,
}

/// The fields the pipeline supplies when creating a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub title: String,
    pub page_count: u32,
    pub wrapped_key: String,
}

/// A user's right to view a document, owned by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub user_id: UserId,
    pub document_id: DocumentId,
    /// Optional expiry (Unix ms). `None` means the entitlement never lapses.
    pub expires_at: Option<i64>,
}

impl Entitlement {
    /// A permanent entitlement.
    pub fn permanent(user_id: UserId, document_id: DocumentId) -> Self {
        Self {
            user_id,
            document_id,
            expires_at: None,
        }
    }

    /// An entitlement that lapses at `expires_at` (Unix ms).
    pub fn until(user_id: UserId, document_id: DocumentId, expires_at: i64) -> Self {
        Self {
            user_id,
            document_id,
            expires_at: Some(expires_at),
        }
    }

    /// Check whether the entitlement is still in force at `now` (Unix ms).
    ///
    /// An entitlement is expired once `expires_at` lies strictly in the past.
    pub fn is_active(&self, now: i64) -> bool {
        match self.expires_at {
            Some(expires) => now <= expires,
            None => true,
        }
    }
}

/// One row of the append-only page access log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub user_id: UserId,
    pub document_id: DocumentId,
    pub page: u32,
    pub ip: String,
    pub user_agent: String,
    /// Time of access (Unix ms).
    pub accessed_at: i64,
}

impl AccessLogEntry {
    /// Build an entry, truncating the client IP and user agent.
    pub fn new(
        user_id: UserId,
        document_id: DocumentId,
        page: u32,
        ip: &str,
        user_agent: &str,
        accessed_at: i64,
    ) -> Self {
        Self {
            user_id,
            document_id,
            page,
            ip: truncate_chars(ip, MAX_LOGGED_IP_LEN),
            user_agent: truncate_chars(user_agent, MAX_LOGGED_USER_AGENT_LEN),
            accessed_at,
        }
    }
}

/// Keep at most `max` characters, never splitting a UTF-8 sequence.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entitlement_expiry_boundary() {
        let ent = Entitlement::until(UserId(1), DocumentId(2), 1_000);
        assert!(ent.is_active(999));
        assert!(ent.is_active(1_000));
        assert!(!ent.is_active(1_001));
    }

    #[test]
    fn test_permanent_entitlement_never_expires() {
        let ent = Entitlement::permanent(UserId(1), DocumentId(2));
        assert!(ent.is_active(i64::MAX));
    }

    #[test]
    fn test_access_log_truncation() {
        let ip = "1".repeat(100);
        let ua = "é".repeat(300);
        let entry = AccessLogEntry::new(UserId(1), DocumentId(2), 3, &ip, &ua, 0);
        assert_eq!(entry.ip.chars().count(), MAX_LOGGED_IP_LEN);
        assert_eq!(entry.user_agent.chars().count(), MAX_LOGGED_USER_AGENT_LEN);
    }

    #[test]
    fn test_truncate_short_input_unchanged() {
        assert_eq!(truncate_chars("10.0.0.1", 64), "10.0.0.1");
        assert_eq!(truncate_chars("", 64), "");
    }
}
