//! Process configuration read from the environment.

use std::net::SocketAddr;

use thiserror::Error;

use profilehub_profiles::ProfileInput;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_ADMIN_NAME: &str = "admin";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("BIND_ADDR is not a socket address: {0}")]
    InvalidBindAddr(String),

    #[error("{present} is set but {missing} is not")]
    IncompleteAdmin {
        present: &'static str,
        missing: &'static str,
    },
}

/// Superuser created at startup when it does not exist yet.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminBootstrap {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl AdminBootstrap {
    pub fn to_input(&self) -> ProfileInput {
        ProfileInput {
            email: Some(self.email.clone()),
            name: Some(self.name.clone()),
            password: Some(self.password.clone()),
        }
    }
}

impl core::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("email", &self.email)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// Postgres connection string; in-memory stores are used when absent.
    pub database_url: Option<String>,
    pub admin: Option<AdminBootstrap>,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    ///
    /// Values are trimmed, except the admin password which is taken verbatim.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let verbatim = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let raw_addr = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(raw_addr.clone()))?;

        let admin = match (get("ADMIN_EMAIL"), verbatim("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap {
                email,
                name: get("ADMIN_NAME").unwrap_or_else(|| DEFAULT_ADMIN_NAME.to_string()),
                password,
            }),
            (Some(_), None) => {
                return Err(ConfigError::IncompleteAdmin {
                    present: "ADMIN_EMAIL",
                    missing: "ADMIN_PASSWORD",
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::IncompleteAdmin {
                    present: "ADMIN_PASSWORD",
                    missing: "ADMIN_EMAIL",
                });
            }
            (None, None) => None,
        };

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            admin,
        })
    }
}
