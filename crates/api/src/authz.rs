//! Permission pipelines attached to each resource.
//!
//! Policies run in order; the first rejection wins.

use profilehub_auth::{IsAuthenticated, OwnerOnly, Policies};
use profilehub_feed::ProfileFeedItem;
use profilehub_profiles::UserProfile;

/// Anyone may list, retrieve and register; only the profile itself may
/// change or delete it.
pub fn profile_policies() -> Policies<UserProfile> {
    Policies::new().with(OwnerOnly::own_profile())
}

/// Every feed operation needs a token; only the author may change or delete
/// an item.
pub fn feed_policies() -> Policies<ProfileFeedItem> {
    Policies::new()
        .with(IsAuthenticated)
        .with(OwnerOnly::own_status())
}
