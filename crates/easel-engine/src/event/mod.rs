//! Ordered, token-addressed callback lists.

mod source;

pub use source::{EventSource, EventToken};
