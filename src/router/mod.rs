//! Route table and dispatch.
//!
//! Routes are registered once at startup and only read afterwards, so the
//! table is shared between connection tasks without locking.
//!
//! Matching is a linear scan in registration order and the first route whose
//! method and pattern match wins. Registering a route with the same method
//! and pattern shape as an earlier one is rejected; a route that is merely
//! shadowed on some paths by an earlier one is allowed but logged.

pub mod pattern;

use std::sync::Arc;
use thiserror::Error;

use crate::error::{ApiError, ApiResult};
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::session::{SESSION_COOKIE, Session};
use crate::state::AppState;

pub use pattern::{PathParams, PathPattern, Segment};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("route {method} {pattern} is already registered")]
    Duplicate { method: Method, pattern: String },
}

/// Everything a handler gets to see.
pub struct Context<'a> {
    pub request: &'a Request,
    pub params: &'a PathParams,
    /// Present for routes that require authentication.
    pub session: Option<&'a Session>,
    pub state: &'a AppState,
}

impl Context<'_> {
    /// Raw value of a `{name}` path parameter.
    pub fn param(&self, name: &str) -> ApiResult<&str> {
        self.params
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ApiError::internal(format!("route has no parameter '{name}'")))
    }

    /// Username of the authenticated caller.
    pub fn username(&self) -> ApiResult<&str> {
        self.session
            .map(|s| s.username.as_str())
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

pub type Handler = Arc<dyn Fn(&Context<'_>) -> ApiResult<Response> + Send + Sync>;

pub struct Route {
    pub method: Method,
    pub pattern: PathPattern,
    pub requires_auth: bool,
    handler: Handler,
}

impl Route {
    pub fn new<F>(
        method: Method,
        pattern: &str,
        requires_auth: bool,
        handler: F,
    ) -> Result<Self, RouteError>
    where
        F: Fn(&Context<'_>) -> ApiResult<Response> + Send + Sync + 'static,
    {
        Ok(Self {
            method,
            pattern: PathPattern::parse(pattern)?,
            requires_auth,
            handler: Arc::new(handler),
        })
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .field("requires_auth", &self.requires_auth)
            .finish()
    }
}

#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    fallback: Option<Handler>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route. Fails if an identical method + pattern already exists.
    pub fn add(&mut self, route: Route) -> Result<(), RouteError> {
        for existing in self.routes.iter().filter(|r| r.method == route.method) {
            if existing.pattern.same_shape(&route.pattern) {
                return Err(RouteError::Duplicate {
                    method: route.method,
                    pattern: route.pattern.as_str().to_string(),
                });
            }
            if existing.pattern.overlaps(&route.pattern) {
                tracing::warn!(
                    method = %route.method,
                    earlier = existing.pattern.as_str(),
                    later = route.pattern.as_str(),
                    "Route is shadowed on some paths by an earlier registration"
                );
            }
        }

        self.routes.push(route);
        Ok(())
    }

    /// Shorthand for `add(Route::new(..)?)`.
    pub fn route<F>(
        &mut self,
        method: Method,
        pattern: &str,
        requires_auth: bool,
        handler: F,
    ) -> Result<&mut Self, RouteError>
    where
        F: Fn(&Context<'_>) -> ApiResult<Response> + Send + Sync + 'static,
    {
        self.add(Route::new(method, pattern, requires_auth, handler)?)?;
        Ok(self)
    }

    /// Handler for requests no route matched. Runs without authentication.
    pub fn set_fallback<F>(&mut self, handler: F)
    where
        F: Fn(&Context<'_>) -> ApiResult<Response> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(handler));
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// First route matching `method` and `path`, with its captured parameters.
    pub fn find(&self, method: Method, path: &str) -> Option<(&Route, PathParams)> {
        self.routes
            .iter()
            .filter(|route| route.method == method)
            .find_map(|route| route.pattern.matches(path).map(|params| (route, params)))
    }

    /// Matches, authenticates and runs the handler, returning typed failures.
    pub fn resolve(&self, request: &Request, state: &AppState) -> ApiResult<Response> {
        let Some((route, params)) = self.find(request.method, &request.path) else {
            return match &self.fallback {
                Some(fallback) => {
                    let params = PathParams::new();
                    let ctx = Context {
                        request,
                        params: &params,
                        session: None,
                        state,
                    };
                    fallback(&ctx)
                }
                None => Err(ApiError::not_found(format!(
                    "No route for {} {}",
                    request.method, request.path
                ))),
            };
        };

        let session = if route.requires_auth {
            Some(authenticate(request, state)?)
        } else {
            None
        };

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            pattern = route.pattern.as_str(),
            "Route matched"
        );

        let ctx = Context {
            request,
            params: &params,
            session: session.as_ref(),
            state,
        };
        (route.handler)(&ctx)
    }

    /// Like [`resolve`](Self::resolve) but always yields a response, mapping
    /// failures through the error mapper.
    pub fn dispatch(&self, request: &Request, state: &AppState) -> Response {
        match self.resolve(request, state) {
            Ok(response) => response,
            Err(err) => {
                match &err {
                    ApiError::Internal(detail) => tracing::error!(
                        method = %request.method,
                        path = %request.path,
                        error = %detail,
                        "Handler failed"
                    ),
                    other => tracing::debug!(
                        method = %request.method,
                        path = %request.path,
                        status = other.status().as_u16(),
                        error = %other,
                        "Request rejected"
                    ),
                }
                err.into_response(state.config.dev_mode)
            }
        }
    }
}

fn authenticate(request: &Request, state: &AppState) -> ApiResult<Session> {
    let token = request
        .cookie(SESSION_COOKIE)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    state
        .sessions
        .validate_session(token)
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))
}
