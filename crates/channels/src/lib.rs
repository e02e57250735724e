//! Chat-transport seam.
//!
//! The relay consumes the chat transport through the [`Delivery`] trait:
//! send a status message, edit it in place, delete it, upload a video.
//! Concrete transports (Telegram) implement it in their own crate so the
//! request pipeline stays transport-neutral and testable.

pub mod delivery;
pub mod error;

pub use {
    delivery::{Delivery, InboundMessage, MessageHandle},
    error::{Error, Result},
};
