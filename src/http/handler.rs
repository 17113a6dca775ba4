//! Handler types.
//!
//! A handler takes the request's [`Context`] by value and hands it back once
//! the response has been written into it. Middleware wrap handlers into new
//! handlers, so both are plain shared closures.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::http::context::Context;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// A type-erased request handler.
pub type Handler = Arc<dyn Fn(Context) -> BoxFuture<Context> + Send + Sync>;

/// Conversion from async closures into [`Handler`].
///
/// ```ignore
/// router.get("/users/:id", |mut ctx: Context| async move {
///     let id = ctx.param("id").unwrap_or_default().to_string();
///     ctx.string(StatusCode::OK, format_args!("User ID: {id}"));
///     ctx
/// })?;
/// ```
pub trait IntoHandler {
    fn into_handler(self) -> Handler;
}

impl<F, Fut> IntoHandler for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Context> + Send + 'static,
{
    fn into_handler(self) -> Handler {
        Arc::new(move |ctx: Context| -> BoxFuture<Context> { Box::pin(self(ctx)) })
    }
}
