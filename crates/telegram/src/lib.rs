//! Telegram transport for clipferry.
//!
//! Implements the delivery seam with the teloxide library and runs the
//! manual long-polling loop that feeds inbound links into the request
//! pipeline, including duplicate-poller conflict mitigation.

pub mod arbiter;
pub mod bot;
pub mod config;
pub mod delivery;

pub use {
    arbiter::ConflictArbiter,
    bot::{connect, start_polling},
    config::TelegramConfig,
    delivery::TelegramDelivery,
};
