//! Static file serving.
//!
//! `serve_static("/static", "public")` registers `GET /static/*filepath`;
//! the bound remainder is handed to `tower_http`'s `ServeDir`, which owns
//! path sanitising, content types, conditional and range requests.

use std::path::PathBuf;

use axum::body::Body;
use axum::http::header::{self, HeaderValue};
use axum::http::{Request, Response, StatusCode};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::http::context::Context;
use crate::http::handler::{Handler, IntoHandler};

/// Name of the wildcard parameter static routes bind.
pub const FILEPATH_PARAM: &str = "filepath";

/// Route pattern for a static prefix, e.g. `/static` → `/static/*filepath`.
pub fn static_pattern(prefix: &str) -> String {
    format!("{}/*{}", prefix.trim_end_matches('/'), FILEPATH_PARAM)
}

/// Handler serving files below `root` for the bound `filepath`.
///
/// `prefix` is the path the route is mounted at; directory redirects from
/// `ServeDir` are relative to the bound remainder and get it put back.
pub fn static_handler(prefix: &str, root: impl Into<PathBuf>) -> Handler {
    let service = ServeDir::new(root.into());
    let prefix = prefix.trim_end_matches('/').to_string();

    (move |mut ctx: Context| {
        let service = service.clone();
        let prefix = prefix.clone();
        async move {
            let uri = format!("/{}", ctx.param(FILEPATH_PARAM).unwrap_or_default());
            let mut request = match Request::builder()
                .method(ctx.method().clone())
                .uri(uri)
                .body(Body::empty())
            {
                Ok(request) => request,
                Err(e) => {
                    tracing::debug!(path = %ctx.path(), error = %e, "Unusable static file path");
                    ctx.abort_with_status(StatusCode::BAD_REQUEST);
                    return ctx;
                }
            };
            *request.headers_mut() = ctx.request_headers().clone();

            match service.oneshot(request).await {
                Ok(response) => ctx.set_response(restore_prefix(&prefix, response.map(Body::new))),
                Err(never) => match never {},
            }
            ctx
        }
    })
    .into_handler()
}

fn restore_prefix(prefix: &str, mut response: Response<Body>) -> Response<Body> {
    if !response.status().is_redirection() {
        return response;
    }
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .filter(|loc| loc.starts_with('/'))
        .map(|loc| format!("{prefix}{loc}"));
    if let Some(value) = location.and_then(|loc| HeaderValue::from_str(&loc).ok()) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    response
}
