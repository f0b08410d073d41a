//! License lifetime policy.

use std::fmt;

/// Environment variable overriding the license TTL.
pub const LICENSE_TTL_ENV: &str = "LICENSE_TTL_SECONDS";

/// TTL used when none (or an invalid one) is configured.
pub const DEFAULT_LICENSE_TTL_SECS: u32 = 60;

/// Upper bound on the license TTL.
pub const MAX_LICENSE_TTL_SECS: u32 = 3600;

/// How long an issued license stays valid. Always in `(0, 3600]` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LicenseTtl(u32);

impl LicenseTtl {
    /// Create a TTL, rejecting values outside `(0, 3600]`.
    pub fn new(secs: i64) -> Option<Self> {
        if secs > 0 && secs <= MAX_LICENSE_TTL_SECS as i64 {
            Some(Self(secs as u32))
        } else {
            None
        }
    }

    /// Resolve the TTL from a raw configuration value.
    ///
    /// The leading integer of the value is used (`"90s"` means 90). Unset,
    /// unparsable, or out-of-range values fall back to 60 seconds.
    pub fn from_config(raw: Option<&str>) -> Self {
        raw.and_then(leading_integer)
            .and_then(Self::new)
            .unwrap_or_default()
    }

    /// Resolve the TTL from `LICENSE_TTL_SECONDS`.
    pub fn from_env() -> Self {
        Self::from_config(std::env::var(LICENSE_TTL_ENV).ok().as_deref())
    }

    /// The TTL in seconds.
    pub fn as_secs(&self) -> i64 {
        self.0 as i64
    }
}

impl Default for LicenseTtl {
    fn default() -> Self {
        Self(DEFAULT_LICENSE_TTL_SECS)
    }
}

impl fmt::Display for LicenseTtl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

fn leading_integer(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // Anything too long to fit is out of range anyway.
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}
