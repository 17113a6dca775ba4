//! trailhead: a small HTTP routing layer on Tokio and axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                  TRAILHEAD                   │
//!                         │                                              │
//!   Client Request        │  ┌─────────┐   ┌────────────┐   ┌─────────┐  │
//!   ──────────────────────┼─▶│  http   │──▶│ dispatcher │──▶│ routing │  │
//!                         │  │ server  │   │            │◀──│  trie   │  │
//!                         │  └─────────┘   └─────┬──────┘   └─────────┘  │
//!                         │                      │                       │
//!                         │                      ▼                       │
//!                         │              ┌──────────────┐                │
//!                         │              │  middleware  │                │
//!                         │              │    chain     │                │
//!                         │              └──────┬───────┘                │
//!                         │                     ▼                        │
//!   Client Response       │              ┌──────────────┐  ┌──────────┐  │
//!   ◀─────────────────────┼──────────────│   handler    │─▶│templates │  │
//!                         │              │  (Context)   │  └──────────┘  │
//!                         │              └──────────────┘                │
//!                         │                                              │
//!                         │  config · events · lifecycle · observability │
//!                         └──────────────────────────────────────────────┘
//! ```
//!
//! ```ignore
//! let mut router = Router::with_default_middleware();
//! router.get("/users/:id", |mut ctx: Context| async move {
//!     let id = ctx.param("id").unwrap_or_default().to_string();
//!     ctx.string(StatusCode::OK, format_args!("User ID: {id}"));
//!     ctx
//! })?;
//! HttpServer::new(config, router.into_dispatcher()).run(listener, shutdown.subscribe()).await?;
//! ```

// Core subsystems
pub mod http;
pub mod routing;
pub mod templates;

// Collaborators
pub mod config;
pub mod events;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use http::{Context, Dispatcher, HttpServer, Router};
pub use lifecycle::Shutdown;
