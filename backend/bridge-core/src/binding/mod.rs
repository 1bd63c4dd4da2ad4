//! Named bindings and the sources that produce them.
//!
//! A [`BindingSource`] is a single function, a map of functions, the exported
//! members of an [`Aggregate`], another source under a dotted prefix, or a
//! deferred source whose bindings are built once per session.

mod aggregate;
pub mod names;
mod source;

pub use aggregate::{Aggregate, Members};
pub use names::{CONTEXT_BINDING_NAME, READY_BINDING_NAME, validate_name};
pub use source::{BindingSource, Factory};
