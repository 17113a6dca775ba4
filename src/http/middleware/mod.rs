//! Middleware chain.
//!
//! # Data Flow
//! ```text
//! use_middleware(A); use_middleware(B);
//! compose(H) = A(B(H))
//!
//! request  → A entry → B entry → H
//! response ← A exit  ← B exit  ←─┘
//! ```
//!
//! # Design Decisions
//! - A middleware is a function `Handler -> Handler` (decorator nesting)
//! - First registered is outermost
//! - Composing produces a new handler; later registrations never touch it

pub mod cors;
pub mod logging;
pub mod rate_limit;
pub mod recovery;

use std::future::Future;
use std::sync::Arc;

use crate::http::context::Context;
use crate::http::handler::{BoxFuture, Handler};

pub use cors::{cors, CorsError};
pub use logging::logger;
pub use rate_limit::{rate_limiter, RateLimiter};
pub use recovery::recovery;

/// Transforms a handler into another handler.
pub type Middleware = Arc<dyn Fn(Handler) -> Handler + Send + Sync>;

/// Build a middleware from an async function of the context and the next
/// handler in the chain.
pub fn from_fn<F, Fut>(f: F) -> Middleware
where
    F: Fn(Context, Handler) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Context> + Send + 'static,
{
    let f = Arc::new(f);
    Arc::new(move |next: Handler| -> Handler {
        let f = f.clone();
        Arc::new(move |ctx: Context| -> BoxFuture<Context> { Box::pin(f(ctx, next.clone())) })
    })
}

/// Ordered list of middleware.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    layers: Vec<Middleware>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `middleware`; it runs inside every middleware added before it.
    pub fn push(&mut self, middleware: Middleware) {
        self.layers.push(middleware);
    }

    /// Wrap `terminal` so the first pushed middleware is outermost.
    pub fn compose(&self, terminal: Handler) -> Handler {
        self.layers
            .iter()
            .rev()
            .fold(terminal, |inner, middleware| middleware(inner))
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
