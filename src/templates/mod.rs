//! Template rendering collaborator.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     templates.pattern (glob) → registry.rs (compile every match, keyed by file name)
//!     → Arc<TemplateRegistry> shared with the dispatcher
//!
//! Request:
//!     Context::render(status, "index.html", &data) → registry.render()
//!
//! Hot reload (optional):
//!     watcher.rs sees a file event → registry.reload() → swap under write lock
//! ```

pub mod registry;
pub mod watcher;

pub use registry::{TemplateError, TemplateRegistry};
pub use watcher::TemplateWatcher;
