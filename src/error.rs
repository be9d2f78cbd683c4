//! AWS error classification.
//!
//! SDK errors are classified by the error code exposed through the
//! `ProvideErrorMetadata` trait, never by string matching on Debug output.
//! The orchestration code uses these predicates to decide whether a failed
//! call means "adopt the existing resource", "already gone, keep going" or
//! "stop and surface the error".

use thiserror::Error;

/// Sentinel for a remote resource that does not exist.
///
/// Describe operations return this so the wait engine can distinguish
/// "deleted, condition met" from a genuine failure. Test for it with
/// `anyhow::Error::is::<ResourceNotFound>()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("resource not found")]
pub struct ResourceNotFound;

/// Error codes that mean the resource is already gone.
const NOT_FOUND_CODES: &[&str] = &[
    "InvalidVpcID.NotFound",
    "InvalidInternetGatewayID.NotFound",
    "InvalidSubnetID.NotFound",
    "InvalidAllocationID.NotFound",
    "InvalidRouteTableID.NotFound",
    "InvalidGroup.NotFound",
    "NatGatewayNotFound",
    "ResourceNotFoundException",
    "NoSuchEntity",
    "DBInstanceNotFound",
    "DBSubnetGroupNotFoundFault",
    "NoSuchBucket",
    "NoSuchAccessPoint",
    "NoSuchBucketPolicy",
];

/// Error codes that mean the resource already exists and may be adopted.
const ALREADY_EXISTS_CODES: &[&str] = &[
    "EntityAlreadyExists",
    "InvalidGroup.Duplicate",
    "DBInstanceAlreadyExists",
    "DBSubnetGroupAlreadyExists",
    "ResourceInUseException",
    "BucketAlreadyOwnedByYou",
];

/// Error codes that mean an attach/associate call targeted an attachment
/// that is already in place. Only tolerated for attach-style operations.
const ALREADY_ASSOCIATED_CODES: &[&str] = &["Resource.AlreadyAssociated"];

/// True if the code identifies a missing remote resource.
pub fn is_not_found(code: Option<&str>) -> bool {
    code.is_some_and(|c| NOT_FOUND_CODES.contains(&c))
}

/// True if the code identifies a pre-existing resource (adoption candidate).
pub fn is_already_exists(code: Option<&str>) -> bool {
    code.is_some_and(|c| ALREADY_EXISTS_CODES.contains(&c))
}

/// True if the code identifies an attachment that already exists.
pub fn is_already_associated(code: Option<&str>) -> bool {
    code.is_some_and(|c| ALREADY_ASSOCIATED_CODES.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_codes_classified() {
        assert!(is_not_found(Some("InvalidVpcID.NotFound")));
        assert!(is_not_found(Some("DBInstanceNotFound")));
        assert!(is_not_found(Some("NoSuchEntity")));
        assert!(!is_not_found(Some("Throttling")));
        assert!(!is_not_found(None));
    }

    #[test]
    fn already_exists_codes_classified() {
        assert!(is_already_exists(Some("EntityAlreadyExists")));
        assert!(is_already_exists(Some("ResourceInUseException")));
        assert!(!is_already_exists(Some("InvalidVpcID.NotFound")));
    }

    #[test]
    fn already_associated_is_not_already_exists() {
        assert!(is_already_associated(Some("Resource.AlreadyAssociated")));
        assert!(!is_already_exists(Some("Resource.AlreadyAssociated")));
    }

    #[test]
    fn not_found_sentinel_downcasts() {
        let err = anyhow::Error::new(ResourceNotFound);
        assert!(err.is::<ResourceNotFound>());
    }
}
