//! Panic recovery middleware.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use axum::http::StatusCode;
use futures_util::FutureExt;

use crate::http::context::Context;
use crate::http::handler::Handler;
use crate::http::middleware::{from_fn, Middleware};
use crate::observability::metrics;

/// Turns a panic anywhere in the inner chain into a 500 response.
///
/// Status and headers written before the inner chain was entered survive;
/// whatever the failing handler wrote does not.
pub fn recovery() -> Middleware {
    from_fn(|ctx: Context, next: Handler| async move {
        let snapshot = ctx.snapshot();

        // The call itself sits inside the async block so a handler that
        // panics before returning its future is caught too.
        match AssertUnwindSafe(async move { next(ctx).await }).catch_unwind().await {
            Ok(ctx) => ctx,
            Err(panic) => {
                let mut ctx = snapshot;
                tracing::error!(
                    method = %ctx.method(),
                    path = %ctx.path(),
                    panic = panic_message(panic.as_ref()),
                    "Handler panicked"
                );
                metrics::record_panic();
                ctx.abort_with_status(StatusCode::INTERNAL_SERVER_ERROR);
                ctx
            }
        }
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
