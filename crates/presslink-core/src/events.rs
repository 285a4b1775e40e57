//! Session events delivered to the host notification channel
//!
//! Every event carries a numeric wire id used as the `method` field of the
//! notification envelope. Ids 100-109 are session signals; 200 is the error
//! signal. `Connecting` and `Connected` share id 102: the host protocol has a
//! single "connected" signal covering both the scan handshake and the listen
//! path.

use crate::button::Button;

// Wire ids for the notification envelope
pub const EVENT_PAIRED_BUTTON_FOUND: u32 = 100;
pub const EVENT_DISCOVERED: u32 = 101;
pub const EVENT_CONNECTED: u32 = 102;
pub const EVENT_CLICK: u32 = 103;
pub const EVENT_SCAN_STARTED: u32 = 104;
pub const EVENT_SCAN_STOPPED: u32 = 105;
pub const EVENT_BUTTON_FOUND: u32 = 106;
pub const EVENT_RECONNECTED: u32 = 107;
pub const EVENT_CONNECTION_LOST: u32 = 108;
pub const EVENT_BUTTON_UP_DOWN: u32 = 109;
pub const EVENT_ERROR: u32 = 200;

/// Classification of a single actuation
///
/// The driver resolves each press into exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickKind {
    Single,
    Double,
    Hold,
}

impl ClickKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ClickKind::Single => "single",
            ClickKind::Double => "double",
            ClickKind::Hold => "hold",
        }
    }
}

/// Raw actuation parameters as reported by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Press {
    /// True when the press was buffered on the peripheral while disconnected
    pub was_queued: bool,

    /// True when this is the last buffered press being drained
    pub last_queued: bool,

    /// When the press happened, epoch milliseconds UTC
    pub timestamp_utc: i64,

    pub kind: ClickKind,
}

/// One button actuation, resolved against the owning button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    pub uuid: String,
    pub was_queued: bool,
    pub last_queued: bool,
    pub timestamp_utc: i64,
    pub kind: ClickKind,

    /// How stale a queued press is: time between the press and the button
    /// coming back ready. Zero for live presses.
    pub age_ms: i64,
}

impl ClickEvent {
    pub fn from_press(button: &Button, press: Press) -> Self {
        let age_ms = if press.was_queued {
            button.ready_timestamp - press.timestamp_utc
        } else {
            0
        };
        Self {
            uuid: button.uuid.clone(),
            was_queued: press.was_queued,
            last_queued: press.last_queued,
            timestamp_utc: press.timestamp_utc,
            kind: press.kind,
            age_ms,
        }
    }
}

/// Everything the session layer can tell the host
#[derive(Debug, Clone, PartialEq)]
pub enum ButtonEvent {
    /// A scan session began
    ScanStarted,

    /// A scan session ended (completed, cancelled, or superseded)
    ScanStopped,

    /// A not-yet-paired button was sighted at this address
    Discovered { bd_addr: String },

    /// The scanner started the pairing handshake with a new button
    Connecting,

    /// A button reported connected outside a scan (listen path)
    Connected,

    /// A scan re-encountered a button that is already paired
    PairedButtonFound(Button),

    /// A scan completed with a newly paired button
    ButtonFound(Button),

    /// A paired button re-established its connection
    Reconnected(Button),

    /// A paired button dropped its connection
    ConnectionLost(Button),

    /// A button was pressed
    Click { button: Button, click: ClickEvent },

    /// Raw up/down edge of the button switch
    ButtonUpOrDown { button: Button, down: bool },

    /// A scan finished with a driver failure
    ScanError { code: i32, sub_code: i32 },

    /// A non-scan failure worth telling the host about
    Error { message: String },
}

impl ButtonEvent {
    /// The `method` id this event is delivered under
    pub fn event_id(&self) -> u32 {
        match self {
            ButtonEvent::ScanStarted => EVENT_SCAN_STARTED,
            ButtonEvent::ScanStopped => EVENT_SCAN_STOPPED,
            ButtonEvent::Discovered { .. } => EVENT_DISCOVERED,
            ButtonEvent::Connecting | ButtonEvent::Connected => EVENT_CONNECTED,
            ButtonEvent::PairedButtonFound(_) => EVENT_PAIRED_BUTTON_FOUND,
            ButtonEvent::ButtonFound(_) => EVENT_BUTTON_FOUND,
            ButtonEvent::Reconnected(_) => EVENT_RECONNECTED,
            ButtonEvent::ConnectionLost(_) => EVENT_CONNECTION_LOST,
            ButtonEvent::Click { .. } => EVENT_CLICK,
            ButtonEvent::ButtonUpOrDown { .. } => EVENT_BUTTON_UP_DOWN,
            ButtonEvent::ScanError { .. } | ButtonEvent::Error { .. } => EVENT_ERROR,
        }
    }

    /// Short human-readable description for log lines
    pub fn summary(&self) -> String {
        match self {
            ButtonEvent::ScanStarted => "scanStarted".to_string(),
            ButtonEvent::ScanStopped => "scanStopped".to_string(),
            ButtonEvent::Discovered { bd_addr } => format!("discovered ({bd_addr})"),
            ButtonEvent::Connecting => "connecting".to_string(),
            ButtonEvent::Connected => "connected".to_string(),
            ButtonEvent::PairedButtonFound(b) => {
                format!("pairedButtonFound ({})", b.display_name())
            }
            ButtonEvent::ButtonFound(b) => format!("buttonFound ({})", b.display_name()),
            ButtonEvent::Reconnected(b) => format!("reconnected ({})", b.display_name()),
            ButtonEvent::ConnectionLost(b) => format!("connectionLost ({})", b.display_name()),
            ButtonEvent::Click { button, click } => {
                format!("click ({}, {})", button.display_name(), click.kind.as_str())
            }
            ButtonEvent::ButtonUpOrDown { button, down } => {
                let edge = if *down { "down" } else { "up" };
                format!("buttonUpOrDown ({}, {edge})", button.display_name())
            }
            ButtonEvent::ScanError { code, sub_code } => {
                format!("scanError (result {code}, sub code {sub_code})")
            }
            ButtonEvent::Error { message } => format!("error ({message})"),
        }
    }
}
