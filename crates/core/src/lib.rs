//! `profilehub-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod email;
pub mod entity;
pub mod error;
pub mod id;
pub mod validation;
pub mod value_object;

pub use email::Email;
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{FeedItemId, ProfileId};
pub use validation::FieldErrors;
pub use value_object::ValueObject;
