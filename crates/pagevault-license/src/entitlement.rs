//! The entitlement gate.

use pagevault_core::Entitlement;

use crate::error::EntitlementError;

/// Check that an entitlement exists and is still in force at `now` (Unix ms).
///
/// Used both before issuing a license and again on every page request.
pub fn check_entitlement(
    entitlement: Option<&Entitlement>,
    now: i64,
) -> Result<&Entitlement, EntitlementError> {
    let entitlement = entitlement.ok_or(EntitlementError::Forbidden)?;
    match entitlement.expires_at {
        Some(expires_at) if !entitlement.is_active(now) => {
            Err(EntitlementError::Expired { expires_at })
        }
        _ => Ok(entitlement),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagevault_core::{DocumentId, UserId};

    #[test]
    fn test_absent_is_forbidden() {
        assert_eq!(
            check_entitlement(None, 0).unwrap_err(),
            EntitlementError::Forbidden
        );
    }

    #[test]
    fn test_expired() {
        let ent = Entitlement::until(UserId(1), DocumentId(1), 100);
        assert!(check_entitlement(Some(&ent), 100).is_ok());
        assert_eq!(
            check_entitlement(Some(&ent), 101).unwrap_err(),
            EntitlementError::Expired { expires_at: 100 }
        );
    }

    #[test]
    fn test_permanent() {
        let ent = Entitlement::permanent(UserId(1), DocumentId(1));
        assert_eq!(check_entitlement(Some(&ent), i64::MAX).unwrap(), &ent);
    }
}
