//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (setup phase):
//!     (method, "/users/:id", handler)
//!     → pattern.rs (parse into literal / param / wildcard segments)
//!     → table.rs (pick the method's trie)
//!     → trie.rs (walk/create nodes, mark terminal)
//!
//! Request (serving phase):
//!     (method, "/users/42")
//!     → table.rs → trie.rs (depth-first, literal > param > wildcard)
//!     → RouteMatch { value, pattern, params: {id: "42"} } or None
//! ```
//!
//! # Design Decisions
//! - Trie per method, O(segments) lookup independent of route count
//! - Conflicts (same position, different parameter names) fail registration
//! - Same shape registered twice: last registration wins

pub mod params;
pub mod pattern;
pub mod table;
pub mod trie;

use thiserror::Error;

pub use params::PathParams;
pub use pattern::{Pattern, Segment};
pub use table::{RouteMatch, RouteTable};

/// Errors raised while registering routes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: &'static str },

    #[error("route `{pattern}` names parameter `:{name}` where `:{existing}` is already registered")]
    ParamConflict {
        pattern: String,
        name: String,
        existing: String,
    },

    #[error("route `{pattern}` names wildcard `*{name}` where `*{existing}` is already registered")]
    WildcardConflict {
        pattern: String,
        name: String,
        existing: String,
    },
}
