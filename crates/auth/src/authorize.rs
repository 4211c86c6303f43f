//! Ordered policy pipeline evaluated before a handler touches a record.
//!
//! Each policy may veto at two points: once per request (before any record is
//! loaded) and once per object (after the target record is known). The first
//! rejection wins; later policies are not consulted.

use std::sync::Arc;

use thiserror::Error;

use profilehub_core::ProfileId;

use crate::{Operation, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication credentials were not provided")]
    NotAuthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),
}

/// A record that belongs to exactly one profile.
pub trait Owned {
    fn owner(&self) -> ProfileId;
}

/// One authorization rule for records of type `R`.
pub trait Policy<R>: Send + Sync {
    fn name(&self) -> &'static str;

    fn check_request(&self, _principal: &Principal, _operation: Operation) -> Result<(), AuthzError> {
        Ok(())
    }

    fn check_object(
        &self,
        _principal: &Principal,
        _operation: Operation,
        _record: &R,
    ) -> Result<(), AuthzError> {
        Ok(())
    }
}

/// Rejects anonymous principals for every operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsAuthenticated;

impl<R> Policy<R> for IsAuthenticated {
    fn name(&self) -> &'static str {
        "is_authenticated"
    }

    fn check_request(&self, principal: &Principal, _operation: Operation) -> Result<(), AuthzError> {
        if principal.is_authenticated() {
            Ok(())
        } else {
            Err(AuthzError::NotAuthenticated)
        }
    }
}

/// Safe operations pass; unsafe operations require `principal == record.owner()`.
///
/// An anonymous principal is reported as `NotAuthenticated` rather than
/// `Forbidden` so the caller can tell "log in" apart from "not yours".
#[derive(Debug, Clone, Copy)]
pub struct OwnerOnly {
    name: &'static str,
    denial: &'static str,
}

impl OwnerOnly {
    pub const fn new(name: &'static str, denial: &'static str) -> Self {
        Self { name, denial }
    }

    /// Profiles: the owner is the profile itself.
    pub const fn own_profile() -> Self {
        Self::new("update_own_profile", "you can only modify your own profile")
    }

    /// Feed items: the owner is the posting profile.
    pub const fn own_status() -> Self {
        Self::new("update_own_status", "you can only modify your own status")
    }
}

impl<R: Owned> Policy<R> for OwnerOnly {
    fn name(&self) -> &'static str {
        self.name
    }

    fn check_object(&self, principal: &Principal, operation: Operation, record: &R) -> Result<(), AuthzError> {
        if operation.is_safe() || principal.is(record.owner()) {
            return Ok(());
        }
        if !principal.is_authenticated() {
            return Err(AuthzError::NotAuthenticated);
        }
        Err(AuthzError::Forbidden(self.denial.to_string()))
    }
}

/// Ordered list of policies for one resource.
pub struct Policies<R> {
    chain: Vec<Arc<dyn Policy<R>>>,
}

impl<R> Policies<R> {
    pub fn new() -> Self {
        Self { chain: Vec::new() }
    }

    pub fn with(mut self, policy: impl Policy<R> + 'static) -> Self {
        self.chain.push(Arc::new(policy));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.chain.iter().map(|p| p.name()).collect()
    }

    pub fn check_request(&self, principal: &Principal, operation: Operation) -> Result<(), AuthzError> {
        for policy in &self.chain {
            if let Err(e) = policy.check_request(principal, operation) {
                tracing::debug!(policy = policy.name(), %principal, %operation, "request rejected");
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn check_object(&self, principal: &Principal, operation: Operation, record: &R) -> Result<(), AuthzError> {
        for policy in &self.chain {
            if let Err(e) = policy.check_object(principal, operation, record) {
                tracing::debug!(policy = policy.name(), %principal, %operation, "object access rejected");
                return Err(e);
            }
        }
        Ok(())
    }
}

impl<R> Default for Policies<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for Policies<R> {
    fn clone(&self) -> Self {
        Self { chain: self.chain.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    struct Post {
        owner: ProfileId,
    }

    impl Owned for Post {
        fn owner(&self) -> ProfileId {
            self.owner
        }
    }

    const ALL_OPS: [Operation; 6] = [
        Operation::List,
        Operation::Retrieve,
        Operation::Create,
        Operation::Update,
        Operation::PartialUpdate,
        Operation::Destroy,
    ];

    fn feed_policies() -> Policies<Post> {
        Policies::new().with(IsAuthenticated).with(OwnerOnly::own_status())
    }

    #[test]
    fn owner_may_mutate() {
        let owner = ProfileId::new();
        let post = Post { owner };
        let policies = feed_policies();
        for op in ALL_OPS {
            assert!(policies.check_object(&Principal::Profile(owner), op, &post).is_ok());
        }
    }

    #[test]
    fn other_profile_is_forbidden_for_unsafe_ops() {
        let post = Post { owner: ProfileId::new() };
        let intruder = Principal::Profile(ProfileId::new());
        let err = feed_policies()
            .check_object(&intruder, Operation::Destroy, &post)
            .unwrap_err();
        assert_eq!(err, AuthzError::Forbidden("you can only modify your own status".to_string()));
    }

    #[test]
    fn anonymous_is_rejected_at_request_level() {
        let policies = feed_policies();
        assert_eq!(
            policies.check_request(&Principal::Anonymous, Operation::List),
            Err(AuthzError::NotAuthenticated)
        );
    }

    #[test]
    fn anonymous_unsafe_object_access_is_not_authenticated() {
        let post = Post { owner: ProfileId::new() };
        let policies: Policies<Post> = Policies::new().with(OwnerOnly::own_profile());
        assert_eq!(
            policies.check_object(&Principal::Anonymous, Operation::Update, &post),
            Err(AuthzError::NotAuthenticated)
        );
        assert!(policies.check_object(&Principal::Anonymous, Operation::Retrieve, &post).is_ok());
    }

    struct Counting(Arc<AtomicUsize>);

    impl Policy<Post> for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn check_request(&self, _principal: &Principal, _operation: Operation) -> Result<(), AuthzError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn pipeline_short_circuits_on_first_rejection() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policies = Policies::new()
            .with(IsAuthenticated)
            .with(Counting(calls.clone()));

        assert!(policies.check_request(&Principal::Anonymous, Operation::Create).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert!(policies
            .check_request(&Principal::Profile(ProfileId::new()), Operation::Create)
            .is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(policies.names(), vec!["is_authenticated", "counting"]);
    }

    proptest! {
        #[test]
        fn unsafe_ops_allowed_only_for_owner(owner in any::<u128>(), requester in any::<u128>(), op_idx in 0usize..6) {
            let owner = ProfileId::from_uuid(Uuid::from_u128(owner));
            let requester = ProfileId::from_uuid(Uuid::from_u128(requester));
            let op = ALL_OPS[op_idx];
            let post = Post { owner };

            let result = OwnerOnly::own_profile().check_object(&Principal::Profile(requester), op, &post);
            prop_assert_eq!(result.is_ok(), op.is_safe() || owner == requester);
        }

        #[test]
        fn safe_ops_never_rejected_by_ownership(owner in any::<u128>(), anonymous in any::<bool>()) {
            let post = Post { owner: ProfileId::from_uuid(Uuid::from_u128(owner)) };
            let principal = if anonymous { Principal::Anonymous } else { Principal::Profile(ProfileId::new()) };
            for op in [Operation::List, Operation::Retrieve] {
                prop_assert!(OwnerOnly::own_status().check_object(&principal, op, &post).is_ok());
            }
        }
    }
}
