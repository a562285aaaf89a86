//! Row-level ownership policy
//!
//! Pure predicates consulted before every read and write. Reads are
//! strict self-ownership: a row is visible only to its owner. Writes
//! may never tag a foreign owner; the services derive ownership from
//! the verified identity, so the only legitimate claims are "none" or
//! the caller itself.
//!
//! Callers must not surface a failed check differently from "no such
//! row" - an enumeration probe sees the same empty result either way.

use crate::types::UserId;

/// Can `identity` read a row owned by `row_owner`?
pub fn can_read(identity: UserId, row_owner: UserId) -> bool {
    identity == row_owner
}

/// Can `identity` write a row that claims `claimed_owner`?
///
/// `None` means the caller supplied no owner field, which is the
/// normal path: the service stamps the verified identity itself.
pub fn can_write(identity: UserId, claimed_owner: Option<UserId>) -> bool {
    match claimed_owner {
        None => true,
        Some(owner) => owner == identity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_own_rows_only() {
        let a = UserId::new();
        let b = UserId::new();
        assert!(can_read(a, a));
        assert!(!can_read(a, b));
        assert!(!can_read(b, a));
    }

    #[test]
    fn test_write_without_owner_claim_allowed() {
        let a = UserId::new();
        assert!(can_write(a, None));
    }

    #[test]
    fn test_write_claiming_self_allowed() {
        let a = UserId::new();
        assert!(can_write(a, Some(a)));
    }

    #[test]
    fn test_spoofed_owner_rejected() {
        let a = UserId::new();
        let b = UserId::new();
        assert!(!can_write(a, Some(b)));
    }
}
