//! Wire models for the bridge protocol.
//!
//! This crate contains the pure data structures exchanged between the backend
//! and the browser front end. Models have no transport logic; they only know
//! how to turn themselves into JSON text and back.
//!
//! ## Architecture
//!
//! - **models** (this crate): envelope and per-method params
//! - **bridge-core**: bindings, dispatch, transport and lifecycle built on them
//! - **bridge-demo**: application wiring everything together

pub mod envelope;
pub mod error;
pub mod method;
pub mod params;

pub use common::ErrorLocation;
pub use envelope::Envelope;
pub use error::model_error::ModelError;
pub use method::Method;
pub use params::{
    BindAnnounceParams, CallParams, CallbackCloseParams, CallbackPayload, ReadyParams,
    RefCancelParams, RetParams, TokenPayload,
};
