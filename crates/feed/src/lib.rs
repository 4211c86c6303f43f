//! `profilehub-feed`: status updates posted by profiles.

pub mod item;

pub use item::{FeedItemInput, ProfileFeedItem, STATUS_TEXT_MAX_LEN};
