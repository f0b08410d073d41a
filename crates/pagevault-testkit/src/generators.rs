//! Proptest generators for property-based testing.

use proptest::prelude::*;

use pagevault_core::{ContentKey, DocumentId, MasterKey, PageRange, UserId};
use pagevault_license::{LicenseClaims, LicenseTtl};

/// Generate a random master key.
pub fn master_key() -> impl Strategy<Value = MasterKey> {
    any::<[u8; 32]>().prop_map(MasterKey::from_bytes)
}

/// Generate a random content key.
pub fn content_key() -> impl Strategy<Value = ContentKey> {
    any::<[u8; 32]>().prop_map(ContentKey::from_bytes)
}

/// Generate page bytes of at most `max_len` bytes.
pub fn page_bytes(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

pub fn document_id() -> impl Strategy<Value = DocumentId> {
    (1i64..=1_000_000).prop_map(DocumentId)
}

pub fn user_id() -> impl Strategy<Value = UserId> {
    (1i64..=1_000_000).prop_map(UserId)
}

/// Generate a valid TTL in `(0, 3600]` seconds.
pub fn license_ttl() -> impl Strategy<Value = LicenseTtl> {
    (1i64..=3600).prop_filter_map("ttl out of range", LicenseTtl::new)
}

/// A page count together with a page that lies outside `[1, count]`.
pub fn count_and_outside_page() -> impl Strategy<Value = (u32, u32)> {
    (1u32..=500).prop_flat_map(|count| {
        (
            Just(count),
            prop_oneof![Just(0u32), (count + 1)..=count.saturating_add(1000)],
        )
    })
}

/// Parameters for a whole-document license.
#[derive(Debug, Clone)]
pub struct LicenseParams {
    pub document_id: DocumentId,
    pub key: ContentKey,
    pub page_count: u32,
    pub issued_at: i64,
    pub ttl: LicenseTtl,
}

impl LicenseParams {
    /// The claims these parameters describe.
    pub fn claims(&self) -> LicenseClaims {
        LicenseClaims::new(
            self.document_id,
            &self.key,
            PageRange::new(1, self.page_count).unwrap(),
            self.issued_at,
            self.ttl,
        )
    }
}

impl Arbitrary for LicenseParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            document_id(),
            content_key(),
            1u32..=2000,                      // page_count
            1_600_000_000i64..=1_900_000_000, // issued_at (s)
            license_ttl(),
        )
            .prop_map(|(document_id, key, page_count, issued_at, ttl)| LicenseParams {
                document_id,
                key,
                page_count,
                issued_at,
                ttl,
            })
            .boxed()
    }
}
