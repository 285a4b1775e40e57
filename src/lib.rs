//! presslink - BLE button session bridge
//!
//! Exposes a vendor button driver to a host application runtime: commands
//! come in through [`ButtonService::invoke`] (or [`ButtonService::handle`]),
//! notifications go out through an attached [`EventSink`] as
//! `callListener {method, data}` envelopes.

pub mod commands;
pub mod service;

pub use commands::Command;
pub use service::{ButtonService, ErrorReply};

// The layered crates' key types, re-exported for embedders
pub use presslink_core::{
    Button, ButtonEvent, ConnectionState, Error, Notification, Result,
};
pub use presslink_session::{
    ButtonDriver, DriverEvent, DriverHandle, EventSink, SessionConfig, SessionManager,
};
