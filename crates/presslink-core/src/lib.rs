//! # presslink-core - Core Domain Types
//!
//! Foundation crate for presslink. Provides the button model, session events,
//! the host wire encoding, error handling, and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Button Model (`button`)
//! - [`Button`] - One physical button peripheral, keyed by driver uuid
//! - [`ConnectionState`] - Disconnected / Connecting / Connected
//! - [`BatteryReading`] - Battery percentage, timestamp, and millivolts
//!
//! ### Events (`events`)
//! - [`ButtonEvent`] - Everything the session layer can tell the host
//! - [`ClickEvent`], [`Press`], [`ClickKind`] - Actuation model
//! - `EVENT_*` - Numeric wire ids for the notification envelope
//!
//! ### Wire Encoding (`wire`)
//! - [`ButtonSnapshot`] - Host-facing JSON shape of one button
//! - [`ClickPayload`], [`UpDownPayload`] - Event payload shapes
//! - [`Notification`] - The `{method, data}` envelope
//! - [`sanitize()`] - Defangs device-provided strings before encoding
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with host wire codes
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use presslink_core::prelude::*;
//! ```

pub mod button;
pub mod error;
pub mod events;
pub mod logging;
pub mod wire;

/// Prelude for common imports used throughout all presslink crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use button::{BatteryReading, Button, ConnectionState};
pub use error::{Error, Result, ResultExt};
pub use events::{
    ButtonEvent, ClickEvent, ClickKind, Press, EVENT_BUTTON_FOUND, EVENT_BUTTON_UP_DOWN,
    EVENT_CLICK, EVENT_CONNECTED, EVENT_CONNECTION_LOST, EVENT_DISCOVERED, EVENT_ERROR,
    EVENT_PAIRED_BUTTON_FOUND, EVENT_RECONNECTED, EVENT_SCAN_STARTED, EVENT_SCAN_STOPPED,
};
pub use wire::{sanitize, ButtonSnapshot, ClickPayload, Notification, UpDownPayload};
