//! `profilehub-auth`: authentication/authorization boundary.
//!
//! No HTTP or storage types appear here.

pub mod authorize;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod token;

pub use authorize::{AuthzError, IsAuthenticated, Owned, OwnerOnly, Policies, Policy};
pub use password::{PasswordError, PasswordHash};
pub use permissions::Operation;
pub use principal::Principal;
pub use token::AuthToken;
