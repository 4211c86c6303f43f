//! Infrastructure layer: persistence adapters behind repository traits.

pub mod store;

pub use store::{
    FeedRepository, ProfileRepository, Repository, StoreError, TokenRepository,
};
