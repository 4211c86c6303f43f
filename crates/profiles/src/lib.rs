//! `profilehub-profiles`: user profiles (the identities of the system).

pub mod profile;
pub mod search;

pub use profile::{ProfileInput, UserProfile, EMAIL_MAX_LEN, NAME_MAX_LEN, PASSWORD_MAX_LEN};
pub use search::SearchQuery;
