//! Request dispatch.
//!
//! # Data Flow
//! ```text
//! Request<Body>
//!     → buffer body (413 over the limit, 400 on read failure)
//!     → RouteTable::search(method, path)
//!         match    → Context with bound params, route handler
//!         no match → Context without params, not-found handler
//!     → middleware chain composed around the handler
//!     → Context::into_response
//! ```
//!
//! # Design Decisions
//! - Immutable after construction, shared through `Arc` by every connection
//! - Unmatched requests run through the same middleware as matched ones

use std::error::Error as _;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use http_body_util::LengthLimitError;

use crate::http::context::Context;
use crate::http::handler::{Handler, IntoHandler};
use crate::http::middleware::MiddlewareChain;
use crate::routing::RouteTable;
use crate::templates::TemplateRegistry;

/// Frozen routes plus middleware, ready to serve.
pub struct Dispatcher {
    routes: RouteTable<Handler>,
    middleware: MiddlewareChain,
    not_found: Handler,
    templates: Arc<TemplateRegistry>,
    max_body_size: usize,
}

impl Dispatcher {
    pub(crate) fn new(
        routes: RouteTable<Handler>,
        middleware: MiddlewareChain,
        templates: Arc<TemplateRegistry>,
        max_body_size: usize,
    ) -> Self {
        Self {
            routes,
            middleware,
            not_found: not_found_handler(),
            templates,
            max_body_size,
        }
    }

    /// Serve one request.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let (parts, body) = request.into_parts();
        let body = match axum::body::to_bytes(body, self.max_body_size).await {
            Ok(bytes) => bytes,
            Err(e) if is_length_limit(&e) => {
                tracing::debug!(path = %parts.uri.path(), limit = self.max_body_size, "Request body too large");
                return (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large").into_response();
            }
            Err(e) => {
                tracing::debug!(path = %parts.uri.path(), error = %e, "Failed to read request body");
                return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
            }
        };

        let ctx = Context::new(parts, body).with_templates(self.templates.clone());
        let (handler, ctx) = match self.routes.search(ctx.method(), ctx.path()) {
            Some(matched) => {
                tracing::trace!(pattern = matched.pattern, "Route matched");
                (matched.value.clone(), ctx.with_params(matched.params))
            }
            None => {
                tracing::debug!(method = %ctx.method(), path = %ctx.path(), "No route matched");
                (self.not_found.clone(), ctx)
            }
        };

        self.middleware.compose(handler)(ctx).await.into_response()
    }

    /// Registered routes across all methods.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn templates(&self) -> &Arc<TemplateRegistry> {
        &self.templates
    }
}

fn not_found_handler() -> Handler {
    (|mut ctx: Context| async move {
        ctx.abort_with_status(StatusCode::NOT_FOUND);
        ctx
    })
    .into_handler()
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source = err.source();
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}
