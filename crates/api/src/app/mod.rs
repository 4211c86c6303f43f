//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: the operations behind each endpoint, over injected stores
//! - `routes/`: the route table + handlers (one file per resource)
//! - `dto.rs`: request bodies and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Fails if the route table is inconsistent.
pub fn build_app(services: AppServices) -> Result<Router, routes::RouteTableError> {
    let services = Arc::new(services);
    let auth_state = middleware::AuthState {
        services: services.clone(),
    };

    let app = routes::router()?
        .fallback(routes::system::not_found)
        .method_not_allowed_fallback(routes::system::method_not_allowed)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    auth_state,
                    middleware::auth_middleware,
                ))
                .layer(Extension(services)),
        );

    Ok(app)
}
