//! In-process publish/subscribe messaging.
//!
//! # Data Flow
//! ```text
//! publish(subject, payload)
//!     → subject's broadcast channel → every live Subscription
//!
//! request(subject, payload, timeout)
//!     → subscribe to a fresh `_INBOX.<uuid>` subject
//!     → publish with that inbox as the reply subject
//!     → responder calls respond(&msg, payload) → first reply wins
//! ```
//!
//! # Design Decisions
//! - Subjects match exactly; no wildcard subscriptions
//! - Delivery is at-most-once: no subscribers means the message is dropped
//! - A slow subscriber skips what it missed instead of blocking publishers

pub mod bus;

pub use bus::{EventBus, EventBusError, Message, Subscription};
