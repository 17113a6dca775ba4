//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, tower layers: trace, request ID, timeout, body limit)
//!     → dispatcher.rs (buffer body, match route, build Context)
//!     → middleware chain (logging, recovery, CORS, rate limit, user middleware)
//!     → route handler writes status/headers/body into the Context
//!     → Context::into_response → client
//! ```

pub mod context;
pub mod dispatcher;
pub mod handler;
pub mod middleware;
pub mod request;
pub mod router;
pub mod server;
pub mod static_files;

pub use context::{BindError, Context};
pub use dispatcher::Dispatcher;
pub use handler::{BoxFuture, Handler, IntoHandler};
pub use middleware::{from_fn, Middleware, MiddlewareChain};
pub use request::X_REQUEST_ID;
pub use router::{Router, SetupError};
pub use server::HttpServer;
