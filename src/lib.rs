#![doc(test(attr(deny(warnings))))]

//! Recurring Core turns recurring-payment templates into concrete dated
//! instances inside a rolling window, keeps the instance store in sync without
//! duplicates, and classifies instances for display.

pub mod cli;
pub mod config;
pub mod core;
pub mod errors;
pub mod recurring;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Recurring Core tracing initialized.");
    });
}
