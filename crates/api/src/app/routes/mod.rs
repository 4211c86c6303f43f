//! Route table for the whole API.
//!
//! Every endpoint is declared once in [`table`] as `(path, name, methods)`.
//! The table is checked before the router is built, so a duplicate or
//! malformed entry fails startup instead of surfacing as a runtime panic.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::{
    handler::Handler,
    http::Method,
    routing::{on, MethodFilter, MethodRouter},
    Extension, Router,
};
use thiserror::Error;

pub mod feed;
pub mod hello;
pub mod login;
pub mod profiles;
pub mod system;

/// Route names ending in this suffix are listed by the API root.
const LIST_SUFFIX: &str = "-list";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteTableError {
    #[error("malformed route path {path:?}: {reason}")]
    Malformed { path: String, reason: &'static str },

    #[error("route path {path:?} overlaps {existing:?}")]
    DuplicatePath { path: String, existing: String },

    #[error("route name {0:?} is used more than once")]
    DuplicateName(String),

    #[error("route {path:?} declares {method} more than once")]
    DuplicateMethod { path: String, method: Method },

    #[error("route {path:?} has no methods")]
    NoMethods { path: String },

    #[error("route {path:?} uses unsupported method {method}")]
    UnsupportedMethod { path: String, method: Method },
}

struct Endpoint {
    method: Method,
    handler: Option<MethodRouter>,
}

/// One path and the handlers bound to it.
pub struct Route {
    path: &'static str,
    name: &'static str,
    endpoints: Vec<Endpoint>,
}

impl Route {
    pub fn new(path: &'static str, name: &'static str) -> Self {
        Self {
            path,
            name,
            endpoints: Vec::new(),
        }
    }

    pub fn on<H, T>(mut self, method: Method, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        let handler = method_filter(&method).map(|filter| on(filter, handler));
        self.endpoints.push(Endpoint { method, handler });
        self
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.endpoints.iter().map(|e| &e.method)
    }
}

/// Links served by the API root: collection name to path.
#[derive(Debug, Clone, Default)]
pub struct RootLinks(Arc<BTreeMap<&'static str, &'static str>>);

impl RootLinks {
    fn from_routes(routes: &[Route]) -> Self {
        let links = routes
            .iter()
            .filter_map(|r| r.name.strip_suffix(LIST_SUFFIX).map(|key| (key, r.path)))
            .collect();
        Self(Arc::new(links))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

pub fn table() -> Vec<Route> {
    vec![
        Route::new("/", "api-root").on(Method::GET, system::api_root),
        Route::new("/health", "health").on(Method::GET, system::health),
        Route::new("/hello-view", "hello-view")
            .on(Method::GET, hello::view_get)
            .on(Method::POST, hello::view_post)
            .on(Method::PUT, hello::view_put)
            .on(Method::PATCH, hello::view_patch)
            .on(Method::DELETE, hello::view_delete),
        Route::new("/hello-viewset/", "hello-viewset-list")
            .on(Method::GET, hello::viewset_list)
            .on(Method::POST, hello::viewset_create),
        Route::new("/hello-viewset/:id/", "hello-viewset-detail")
            .on(Method::GET, hello::viewset_retrieve)
            .on(Method::PUT, hello::viewset_update)
            .on(Method::PATCH, hello::viewset_partial_update)
            .on(Method::DELETE, hello::viewset_destroy),
        Route::new("/login/", "login").on(Method::POST, login::login),
        Route::new("/profile/", "profile-list")
            .on(Method::GET, profiles::list)
            .on(Method::POST, profiles::create),
        Route::new("/profile/:id/", "profile-detail")
            .on(Method::GET, profiles::retrieve)
            .on(Method::PUT, profiles::update)
            .on(Method::PATCH, profiles::partial_update)
            .on(Method::DELETE, profiles::destroy),
        Route::new("/feed/", "feed-list")
            .on(Method::GET, feed::list)
            .on(Method::POST, feed::create),
        Route::new("/feed/:id/", "feed-detail")
            .on(Method::GET, feed::retrieve)
            .on(Method::PUT, feed::update)
            .on(Method::PATCH, feed::partial_update)
            .on(Method::DELETE, feed::destroy),
    ]
}

/// Router for every endpoint in [`table`].
pub fn router() -> Result<Router, RouteTableError> {
    build(table())
}

pub fn build(routes: Vec<Route>) -> Result<Router, RouteTableError> {
    validate(&routes)?;
    let links = RootLinks::from_routes(&routes);

    let mut router = Router::new();
    for route in routes {
        let method_router = route
            .endpoints
            .into_iter()
            .filter_map(|e| e.handler)
            .fold(MethodRouter::new(), MethodRouter::merge);
        router = router.route(route.path, method_router);
        tracing::debug!(path = route.path, name = route.name, "route registered");
    }

    Ok(router.layer(Extension(links)))
}

pub fn validate(routes: &[Route]) -> Result<(), RouteTableError> {
    let mut shapes: BTreeMap<String, &str> = BTreeMap::new();
    let mut names = BTreeSet::new();

    for route in routes {
        let shape = path_shape(route.path)?;
        if let Some(existing) = shapes.insert(shape, route.path) {
            return Err(RouteTableError::DuplicatePath {
                path: route.path.to_string(),
                existing: existing.to_string(),
            });
        }
        if !names.insert(route.name) {
            return Err(RouteTableError::DuplicateName(route.name.to_string()));
        }

        if route.endpoints.is_empty() {
            return Err(RouteTableError::NoMethods {
                path: route.path.to_string(),
            });
        }
        let mut seen = BTreeSet::new();
        for endpoint in &route.endpoints {
            if endpoint.handler.is_none() {
                return Err(RouteTableError::UnsupportedMethod {
                    path: route.path.to_string(),
                    method: endpoint.method.clone(),
                });
            }
            if !seen.insert(endpoint.method.as_str()) {
                return Err(RouteTableError::DuplicateMethod {
                    path: route.path.to_string(),
                    method: endpoint.method.clone(),
                });
            }
        }
    }
    Ok(())
}

/// The path with parameter names erased, so `/a/:id/` and `/a/:pk/` compare
/// equal.
fn path_shape(path: &str) -> Result<String, RouteTableError> {
    let malformed = |reason| RouteTableError::Malformed {
        path: path.to_string(),
        reason,
    };

    let rest = path.strip_prefix('/').ok_or_else(|| malformed("must start with '/'"))?;
    if rest.is_empty() {
        return Ok("/".to_string());
    }

    let trailing = rest.ends_with('/');
    let rest = rest.strip_suffix('/').unwrap_or(rest);

    let mut params = BTreeSet::new();
    let mut shape = String::new();
    for segment in rest.split('/') {
        if segment.is_empty() {
            return Err(malformed("empty segment"));
        }
        shape.push('/');
        if let Some(param) = segment.strip_prefix(':') {
            if param.is_empty() || !param.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(malformed("bad parameter name"));
            }
            if !params.insert(param) {
                return Err(malformed("repeated parameter name"));
            }
            shape.push(':');
        } else if segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            shape.push_str(segment);
        } else {
            return Err(malformed("unsupported character"));
        }
    }
    if trailing {
        shape.push('/');
    }
    Ok(shape)
}

fn method_filter(method: &Method) -> Option<MethodFilter> {
    Some(match *method {
        Method::GET => MethodFilter::GET,
        Method::POST => MethodFilter::POST,
        Method::PUT => MethodFilter::PUT,
        Method::PATCH => MethodFilter::PATCH,
        Method::DELETE => MethodFilter::DELETE,
        Method::HEAD => MethodFilter::HEAD,
        Method::OPTIONS => MethodFilter::OPTIONS,
        _ => return None,
    })
}
