//! Strong type definitions for PageVault.
//!
//! Identifiers are newtypes so a user id can never be passed where a
//! document id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a protected document.
///
/// Assigned by the document store when the encryption pipeline persists a
/// new document. It doubles as the storage namespace for encrypted pages.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub i64);

impl DocumentId {
    /// Create from a raw database id.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw id.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for DocumentId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Identifier of an authenticated storefront user.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    /// Create from a raw database id.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw id.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// An inclusive, 1-based page range `[from, to]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub from: u32,
    pub to: u32,
}

impl PageRange {
    /// Create a range. Returns `None` unless `1 <= from <= to`.
    pub fn new(from: u32, to: u32) -> Option<Self> {
        if from == 0 || from > to {
            return None;
        }
        Some(Self { from, to })
    }

    /// The range covering a whole document, `[1, page_count]`.
    ///
    /// Returns `None` for an empty document.
    pub fn whole(page_count: u32) -> Option<Self> {
        Self::new(1, page_count)
    }

    /// Check whether `page` lies inside the range.
    pub fn contains(&self, page: u32) -> bool {
        page >= self.from && page <= self.to
    }

    /// Check whether this range lies inside `[1, page_count]`.
    pub fn within(&self, page_count: u32) -> bool {
        self.from >= 1 && self.to <= page_count
    }

    /// Number of pages in the range.
    pub fn len(&self) -> u32 {
        self.to - self.from + 1
    }

    /// A valid range is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

/// Current Unix time in milliseconds.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_range_rejects_empty_and_zero() {
        assert!(PageRange::new(0, 3).is_none());
        assert!(PageRange::new(4, 3).is_none());
        assert!(PageRange::whole(0).is_none());
    }

    #[test]
    fn test_page_range_contains() {
        let range = PageRange::whole(3).unwrap();
        assert!(!range.contains(0));
        assert!(range.contains(1));
        assert!(range.contains(3));
        assert!(!range.contains(4));
        assert_eq!(range.len(), 3);
        assert!(range.within(3));
        assert!(!range.within(2));
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&DocumentId::new(42)).unwrap();
        assert_eq!(json, "42");
        let user: UserId = serde_json::from_str("7").unwrap();
        assert_eq!(user, UserId::new(7));
    }

    #[test]
    fn test_page_range_wire_shape() {
        let json = serde_json::to_string(&PageRange::whole(12).unwrap()).unwrap();
        assert_eq!(json, r#"{"from":1,"to":12}"#);
    }
}
