//! Utilities Module
//!
//! Common utilities used across the crate.

mod cache;
pub mod clock;
pub mod logging;
pub mod network_config;

pub use cache::*;
pub use clock::{Clock, ManualClock, SystemClock};
pub use network_config::NetworkConfig;
