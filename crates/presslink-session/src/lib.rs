//! Button session management over a pluggable driver
//!
//! This crate turns a raw vendor driver into a managed session: one
//! initialized handle at a time, at most one discovery scan, a registry
//! that deduplicates every button observation by uuid, and a dispatcher
//! that fans driver events out to whatever host is currently attached.
//!
//! ## Public API
//!
//! - [`SessionManager`]: the session itself; initialize, scan, connect,
//!   listen, forget, shutdown
//! - [`ButtonDriver`] / [`DriverHandle`]: the seam a vendor integration
//!   implements
//! - [`ButtonRegistry`]: deduplicated button observations
//! - [`EventDispatcher`] / [`EventSink`]: delivery toward the host
//! - [`SessionConfig`]: file-backed tuning knobs
//!
//! The `test-helpers` feature exposes [`test_utils`] with a scripted
//! in-memory driver for integration tests in dependent crates.

pub mod config;
pub mod dispatcher;
pub mod driver;
pub mod registry;
pub mod session;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use config::SessionConfig;
pub use dispatcher::{EventDispatcher, EventSink};
pub use driver::{ButtonDriver, DriverEvent, DriverHandle, ScanOutcome};
pub use registry::ButtonRegistry;
pub use session::{ScanSession, SessionManager};
