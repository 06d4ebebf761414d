//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`users`] — Creator profiles and content download operations
//! - [`system`] — Health, events, OpenAPI, shutdown

mod system;
mod users;

// Re-export all handlers so `routes::function_name` continues to work
pub use system::*;
pub use users::*;
