//! Render backend adapters.
//!
//! - [`ResilientRenderer`]: retry wrapper that turns raw backend attempts
//!   into well-formed [`TaskResult`](crate::domain::TaskResult)s.
//! - [`ChromeBackend`] / [`PageServer`] (feature `chrome`): thin wrappers
//!   around the external browser engine and the local render page it loads.

mod resilient;

#[cfg(feature = "chrome")]
mod chrome;
#[cfg(feature = "chrome")]
mod page_server;

pub use self::resilient::ResilientRenderer;

#[cfg(feature = "chrome")]
pub use self::chrome::{ChromeBackend, ChromeBackendFactory, ChromeConfig};
#[cfg(feature = "chrome")]
pub use self::page_server::PageServer;
