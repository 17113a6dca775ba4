//! Route and middleware registration.
//!
//! # Responsibilities
//! - Collect `(method, pattern, handler)` registrations into a route table
//! - Collect middleware in registration order
//! - Install config-driven middleware and static directories
//! - Freeze everything into a [`Dispatcher`]
//!
//! # Design Decisions
//! - Registration takes `&mut self`; `into_dispatcher` consumes the router,
//!   so nothing can be registered once serving begins
//! - Conflicting parameter names surface as `RouteError` at registration

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::Method;
use thiserror::Error;

use crate::config::AppConfig;
use crate::http::dispatcher::Dispatcher;
use crate::http::handler::{Handler, IntoHandler};
use crate::http::middleware::rate_limit::{forwarded_for_key, peer_ip_key};
use crate::http::middleware::{
    cors, logger, rate_limiter, recovery, CorsError, Middleware, MiddlewareChain, RateLimiter,
};
use crate::http::static_files::{static_handler, static_pattern};
use crate::routing::{RouteError, RouteTable};
use crate::templates::TemplateRegistry;

const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// Failure while building a router from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Cors(#[from] CorsError),
}

/// Mutable registration surface.
pub struct Router {
    routes: RouteTable<Handler>,
    middleware: MiddlewareChain,
    templates: Arc<TemplateRegistry>,
    max_body_size: usize,
}

impl Router {
    /// An empty router with no middleware.
    pub fn new() -> Self {
        Self {
            routes: RouteTable::new(),
            middleware: MiddlewareChain::new(),
            templates: Arc::new(TemplateRegistry::empty()),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// A router with request logging and panic recovery installed.
    pub fn with_default_middleware() -> Self {
        let mut router = Self::new();
        router.use_middleware(logger()).use_middleware(recovery());
        router
    }

    /// Default middleware plus everything `config` switches on: CORS,
    /// rate limiting, static directories and the body size limit.
    ///
    /// Order, outermost first: logger, CORS, recovery, rate limiter. CORS
    /// sits outside recovery so a 500 from a panic still carries its headers.
    pub fn from_config(config: &AppConfig) -> Result<Self, SetupError> {
        let mut router = Self::new();
        router.set_max_body_size(config.listener.max_body_size);

        router.use_middleware(logger());
        if config.cors.enabled {
            router.use_middleware(cors(&config.cors)?);
        }
        router.use_middleware(recovery());

        if config.rate_limit.enabled {
            let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
            let key = if config.rate_limit.trust_forwarded_for {
                forwarded_for_key()
            } else {
                peer_ip_key()
            };
            router.use_middleware(rate_limiter(limiter, key));
        }

        for dir in &config.static_files {
            router.serve_static(&dir.prefix, &dir.root)?;
        }

        Ok(router)
    }

    /// Append a middleware. It runs inside every middleware added before it.
    pub fn use_middleware(&mut self, middleware: Middleware) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Register `handler` for `method` and `pattern`.
    ///
    /// Registering the same shape twice keeps the later handler.
    pub fn route<H: IntoHandler>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, RouteError> {
        self.insert(method, pattern, handler.into_handler())
    }

    fn insert(&mut self, method: Method, pattern: &str, handler: Handler) -> Result<&mut Self, RouteError> {
        let replaced = self.routes.insert(method.clone(), pattern, handler)?;
        if replaced.is_some() {
            tracing::warn!(method = %method, pattern, "Route registered twice; keeping the latest handler");
        } else {
            tracing::debug!(method = %method, pattern, "Route registered");
        }
        Ok(self)
    }

    pub fn get<H: IntoHandler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.route(Method::GET, pattern, handler)
    }

    pub fn post<H: IntoHandler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.route(Method::POST, pattern, handler)
    }

    pub fn put<H: IntoHandler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.route(Method::PUT, pattern, handler)
    }

    pub fn delete<H: IntoHandler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.route(Method::DELETE, pattern, handler)
    }

    pub fn patch<H: IntoHandler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.route(Method::PATCH, pattern, handler)
    }

    pub fn options<H: IntoHandler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.route(Method::OPTIONS, pattern, handler)
    }

    /// Serve files under `root` at `GET {prefix}/*filepath`.
    pub fn serve_static(
        &mut self,
        prefix: &str,
        root: impl Into<PathBuf>,
    ) -> Result<&mut Self, RouteError> {
        let root = root.into();
        let pattern = static_pattern(prefix);
        tracing::info!(pattern = %pattern, root = %root.display(), "Serving static files");
        self.insert(Method::GET, &pattern, static_handler(prefix, root))
    }

    /// Templates available to `Context::render`.
    pub fn set_templates(&mut self, templates: Arc<TemplateRegistry>) -> &mut Self {
        self.templates = templates;
        self
    }

    pub fn templates(&self) -> &Arc<TemplateRegistry> {
        &self.templates
    }

    /// Largest request body buffered before answering 413.
    pub fn set_max_body_size(&mut self, bytes: usize) -> &mut Self {
        self.max_body_size = bytes;
        self
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Freeze routes and middleware.
    pub fn into_dispatcher(self) -> Dispatcher {
        tracing::debug!(
            routes = self.routes.len(),
            middleware = self.middleware.len(),
            "Router frozen"
        );
        Dispatcher::new(self.routes, self.middleware, self.templates, self.max_body_size)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
