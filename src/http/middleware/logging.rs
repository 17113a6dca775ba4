//! Request logging middleware.

use std::time::Instant;

use crate::http::context::Context;
use crate::http::handler::Handler;
use crate::http::middleware::{from_fn, Middleware};
use crate::observability::metrics;

/// Logs method, path, protocol, final status and elapsed time once the inner
/// chain has returned.
pub fn logger() -> Middleware {
    from_fn(|ctx: Context, next: Handler| async move {
        let start = Instant::now();
        let ctx = next(ctx).await;
        let elapsed = start.elapsed();

        tracing::info!(
            method = %ctx.method(),
            path = %ctx.path(),
            version = ?ctx.version(),
            status = ctx.status().as_u16(),
            elapsed = ?elapsed,
            request_id = ctx.request_id().unwrap_or("-"),
            "Request handled"
        );
        metrics::record_request(ctx.method().as_str(), ctx.status().as_u16(), start);
        ctx
    })
}
