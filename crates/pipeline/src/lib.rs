//! Request lifecycle state machine.
//!
//! One [`Pipeline::handle`] call takes an inbound message through
//! validate → fetch → verify → deliver → cleanup. Failures of any kind are
//! absorbed here and turned into a status-message edit; the artifact
//! namespace is reclaimed exactly once on every exit path.

pub mod pipeline;
pub mod request;
pub mod validate;

pub use {
    pipeline::Pipeline,
    request::{FailureKind, RequestReport, RequestState},
};
