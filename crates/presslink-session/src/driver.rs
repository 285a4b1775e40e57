//! The seam between the session layer and the vendor Bluetooth stack
//!
//! A production driver wraps the vendor SDK; tests use the scripted fake in
//! `test_utils`. The vendor's callback interfaces are redesigned into a
//! [`DriverEvent`] channel: the driver owns its own tasks and pushes events,
//! and the session layer never runs inside a radio callback.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use presslink_core::prelude::*;
use presslink_core::{BatteryReading, Button, Press};

/// Result of a finished scan session
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// A new button was paired and verified
    Found(Button),

    /// The driver gave up; codes are vendor-defined
    Failed { code: i32, sub_code: i32 },
}

/// Asynchronous reports pushed by an opened driver
///
/// Variants that concern one button carry the driver's current snapshot of
/// it, so the registry converges even when an earlier event was missed.
#[derive(Debug, Clone)]
pub enum DriverEvent {
    /// A scan re-encountered an already paired button
    PairedButtonFound(Button),

    /// An unpaired button was sighted at this address
    Discovered { bd_addr: String },

    /// The scanner began the pairing handshake with a new button
    ScanConnecting,

    /// The scan finished, successfully or not
    ScanCompleted(ScanOutcome),

    /// A listened button was pressed
    Clicked { button: Button, press: Press },

    /// Raw switch edge from a listened button
    UpOrDown { button: Button, down: bool },

    /// A paired button re-established its connection
    Reconnected { button: Button },

    /// A paired button dropped its connection
    ConnectionLost { button: Button },
}

/// Factory for opened driver sessions
///
/// `open` brings up the radio stack and installs the event channel. It fails
/// with [`Error::CriticalEnvironment`] when the platform cannot host a
/// session at all (no adapter, missing permissions).
#[async_trait]
pub trait ButtonDriver: Send + Sync {
    async fn open(&self, events: mpsc::Sender<DriverEvent>) -> Result<Arc<dyn DriverHandle>>;
}

/// One opened driver session
///
/// Operations dispatch onto the driver's own executor and must not block;
/// completion of the long-lived ones (scans, connects) arrives as
/// [`DriverEvent`]s. Dropping the last handle releases the radio stack.
#[async_trait]
pub trait DriverHandle: Send + Sync {
    /// Begin scanning for new buttons; progress and completion arrive as events
    async fn start_scan(&self) -> Result<()>;

    /// Stop an in-flight scan; stopping with none active is a no-op
    async fn stop_scan(&self) -> Result<()>;

    /// The driver's authoritative set of paired buttons
    async fn known_buttons(&self) -> Result<Vec<Button>>;

    /// Look up one paired button by its transport address
    async fn button_by_address(&self, bd_addr: &str) -> Result<Option<Button>>;

    /// Ask the peripheral to establish a connection
    async fn connect(&self, button: &Button) -> Result<()>;

    /// Drop the connection, keeping the pairing
    async fn disconnect(&self, button: &Button) -> Result<()>;

    /// Unpair: remove the button from the driver's paired set
    async fn forget(&self, button: &Button) -> Result<()>;

    /// Subscribe to clicks and connection changes for this button
    async fn add_listener(&self, button: &Button) -> Result<()>;

    /// Drop the subscription; removing a missing one is a no-op
    async fn remove_listener(&self, button: &Button) -> Result<()>;

    /// The driver's cached battery reading for this button
    async fn last_known_battery(&self, button: &Button) -> Result<Option<BatteryReading>>;
}
