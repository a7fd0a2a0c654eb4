#![no_std]

extern crate chrono;
extern crate critical_section;
extern crate heapless;
extern crate libm;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

pub mod algorithm;
pub mod config;
pub mod ins;
pub mod protocol;
pub mod service;
pub mod sync;
pub mod sys;
pub mod types;

#[cfg(test)]
#[macro_use]
extern crate std;

pub use protocol::serial::gnss::{feed_byte, get_latest_fix};
pub use service::gnss::{get_snapshot, poll_tick};

/// Brings up both halves of the pipeline. Must run before the UART receive
/// interrupt is unmasked.
pub fn init(config: &config::GNSS) {
    protocol::serial::gnss::init(config);
    service::gnss::init(&config.heading);
}
