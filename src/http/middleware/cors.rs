//! CORS middleware.
//!
//! # Design Decisions
//! - Header values are validated once when the middleware is built
//! - Preflight (`OPTIONS`) is answered here; the inner chain never sees it

use std::sync::Arc;

use axum::http::header::{self, HeaderValue, InvalidHeaderValue};
use axum::http::{Method, StatusCode};
use thiserror::Error;

use crate::config::CorsConfig;
use crate::http::context::Context;
use crate::http::handler::Handler;
use crate::http::middleware::{from_fn, Middleware};

#[derive(Debug, Error)]
#[error("invalid CORS header value for `{field}`: {source}")]
pub struct CorsError {
    field: &'static str,
    #[source]
    source: InvalidHeaderValue,
}

#[derive(Debug)]
struct CorsHeaders {
    allow_origin: HeaderValue,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
}

/// Build the CORS middleware from config.
pub fn cors(config: &CorsConfig) -> Result<Middleware, CorsError> {
    let value = |field: &'static str, text: String| {
        HeaderValue::from_str(&text).map_err(|source| CorsError { field, source })
    };

    let headers = Arc::new(CorsHeaders {
        allow_origin: value("allow_origin", config.allow_origin.clone())?,
        allow_methods: value("allow_methods", config.allow_methods.join(", "))?,
        allow_headers: value("allow_headers", config.allow_headers.join(", "))?,
    });

    Ok(from_fn(move |mut ctx: Context, next: Handler| {
        let headers = headers.clone();
        async move {
            ctx.set_header(header::ACCESS_CONTROL_ALLOW_ORIGIN, headers.allow_origin.clone());
            ctx.set_header(header::ACCESS_CONTROL_ALLOW_METHODS, headers.allow_methods.clone());
            ctx.set_header(header::ACCESS_CONTROL_ALLOW_HEADERS, headers.allow_headers.clone());

            if ctx.method() == Method::OPTIONS {
                ctx.set_status(StatusCode::OK);
                return ctx;
            }
            next(ctx).await
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::handler::IntoHandler;
    use crate::http::middleware::test_support::context;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_handler(calls: Arc<AtomicUsize>) -> Handler {
        (move |mut ctx: Context| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                ctx.string(StatusCode::OK, "handled");
                ctx
            }
        })
        .into_handler()
    }

    #[tokio::test]
    async fn test_preflight_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = cors(&CorsConfig::default()).unwrap()(counting_handler(calls.clone()));

        let ctx = handler(context(Method::OPTIONS, "/users/1")).await;
        assert_eq!(ctx.status(), StatusCode::OK);
        assert_eq!(ctx.response_headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            ctx.response_headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, PUT, DELETE, OPTIONS"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_other_methods_proceed_with_headers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = CorsConfig {
            allow_origin: "https://example.com".into(),
            ..CorsConfig::default()
        };
        let handler = cors(&config).unwrap()(counting_handler(calls.clone()));

        let ctx = handler(context(Method::GET, "/")).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            ctx.response_headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://example.com"
        );
        assert_eq!(
            ctx.response_headers()[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "Content-Type, Authorization"
        );
    }

    #[test]
    fn test_invalid_origin_rejected() {
        let config = CorsConfig {
            allow_origin: "bad\norigin".into(),
            ..CorsConfig::default()
        };
        assert!(cors(&config).is_err());
    }
}
