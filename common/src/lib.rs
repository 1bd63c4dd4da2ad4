//! Shared building blocks for the bridge workspace.
//!
//! Every error enum in the workspace records where it was raised through
//! [`ErrorLocation`], so a message that reaches the log or the wire can be
//! traced back to its origin without a backtrace.

pub mod error;

pub use error::error_location::ErrorLocation;
