//! Wire encoding of buttons, clicks, and the host notification envelope
//!
//! Snapshots keep the exact field names and declaration order the host
//! protocol expects; unknown optional fields are encoded as `null`, never
//! omitted. Device-provided strings are sanitized before they reach a
//! payload so a hostile button name cannot break the host's JSON parsing.

use serde::{Deserialize, Serialize};

use crate::button::Button;
use crate::events::{ButtonEvent, ClickEvent, ClickKind};
use tracing::warn;

/// Strip device-provided text down to something JSON-safe
///
/// Double quotes become single quotes; carriage returns, newlines, and
/// backslashes are removed.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| match c {
            '"' => Some('\''),
            '\r' | '\n' | '\\' => None,
            other => Some(other),
        })
        .collect()
}

/// Host-facing encoding of one button
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonSnapshot {
    pub uuid: String,
    pub bd_addr: String,

    /// Epoch milliseconds when the button last became ready
    pub ready_time: i64,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub serial_no: Option<String>,

    /// Connection state as 0 (disconnected), 1 (connecting), 2 (connected)
    pub connection: u8,

    #[serde(default)]
    pub firmware_ver: Option<i32>,

    #[serde(default)]
    pub batt_perc: Option<u8>,

    #[serde(default)]
    pub batt_time: Option<i64>,

    #[serde(default)]
    pub batt_volt: Option<u32>,

    pub press_count: u32,
}

impl From<&Button> for ButtonSnapshot {
    fn from(button: &Button) -> Self {
        Self {
            uuid: button.uuid.clone(),
            bd_addr: button.bd_addr.clone(),
            ready_time: button.ready_timestamp,
            name: button.name.as_deref().map(sanitize),
            serial_no: button.serial_number.as_deref().map(sanitize),
            connection: button.connection_state.as_wire(),
            firmware_ver: button.firmware_version,
            batt_perc: button.battery.map(|b| b.percentage),
            batt_time: button.battery.map(|b| b.timestamp_utc),
            batt_volt: button.battery.map(|b| b.voltage_mv),
            press_count: button.press_count,
        }
    }
}

/// Host-facing encoding of one click
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickPayload {
    pub was_queued: bool,

    /// Milliseconds between a buffered press and the button coming back
    /// ready; zero for live presses
    pub click_age: i64,

    pub last_queued: bool,
    pub timestamp: i64,
    pub is_single_click: bool,
    pub is_double_click: bool,
    pub is_hold: bool,
    pub button: ButtonSnapshot,
}

impl ClickPayload {
    pub fn new(button: &Button, click: &ClickEvent) -> Self {
        Self {
            was_queued: click.was_queued,
            click_age: click.age_ms,
            last_queued: click.last_queued,
            timestamp: click.timestamp_utc,
            is_single_click: click.kind == ClickKind::Single,
            is_double_click: click.kind == ClickKind::Double,
            is_hold: click.kind == ClickKind::Hold,
            button: ButtonSnapshot::from(button),
        }
    }
}

/// Host-facing encoding of a raw switch edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpDownPayload {
    pub down: bool,
    pub button: ButtonSnapshot,
}

impl UpDownPayload {
    pub fn new(button: &Button, down: bool) -> Self {
        Self {
            down,
            button: ButtonSnapshot::from(button),
        }
    }
}

/// The envelope delivered to the host listener callback
///
/// `method` is the numeric event id; `data` is a payload string (JSON for
/// structured payloads, a bare string for addresses and error text) or null
/// for signal-only events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub method: u32,
    pub data: Option<String>,
}

impl Notification {
    /// Encode an event into its host envelope
    pub fn for_event(event: &ButtonEvent) -> Self {
        let method = event.event_id();
        let data = match event {
            ButtonEvent::ScanStarted
            | ButtonEvent::ScanStopped
            | ButtonEvent::Connecting
            | ButtonEvent::Connected => None,
            ButtonEvent::Discovered { bd_addr } => Some(bd_addr.clone()),
            ButtonEvent::PairedButtonFound(button)
            | ButtonEvent::ButtonFound(button)
            | ButtonEvent::Reconnected(button)
            | ButtonEvent::ConnectionLost(button) => {
                Some(encode_or_null(&ButtonSnapshot::from(button)))
            }
            ButtonEvent::Click { button, click } => {
                Some(encode_or_null(&ClickPayload::new(button, click)))
            }
            ButtonEvent::ButtonUpOrDown { button, down } => {
                Some(encode_or_null(&UpDownPayload::new(button, *down)))
            }
            ButtonEvent::ScanError { code, sub_code } => Some(format!(
                "Internal scan error with result {code}, subCode: {sub_code}"
            )),
            ButtonEvent::Error { message } => Some(message.clone()),
        };
        Self { method, data }
    }
}

/// Encode a payload, degrading to the literal `null` rather than dropping
/// the notification
fn encode_or_null<T: Serialize>(payload: &T) -> String {
    match serde_json::to_string(payload) {
        Ok(json) => json,
        Err(err) => {
            warn!("failed to encode notification payload, substituting null: {err}");
            "null".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::button::{BatteryReading, ConnectionState};
    use crate::events::{Press, EVENT_CLICK, EVENT_DISCOVERED, EVENT_SCAN_STARTED};

    fn full_button() -> Button {
        Button {
            name: Some("Kitchen".to_string()),
            serial_number: Some("BA11-123456".to_string()),
            firmware_version: Some(12),
            connection_state: ConnectionState::Connected,
            battery: Some(BatteryReading {
                percentage: 88,
                timestamp_utc: 1_700_000_000_000,
                voltage_mv: 2_950,
            }),
            press_count: 41,
            ready_timestamp: 1_700_000_100_000,
            ..Button::new("uuid-1", "80:e4:da:70:00:01")
        }
    }

    #[test]
    fn test_sanitize_replaces_quotes_and_strips_control_chars() {
        assert_eq!(sanitize("O\"Brien"), "O'Brien");
        assert_eq!(sanitize("line1\r\nline2"), "line1line2");
        assert_eq!(sanitize("back\\slash"), "backslash");
        assert_eq!(sanitize("plain name"), "plain name");
    }

    #[test]
    fn test_snapshot_field_names_and_order() {
        let snapshot = ButtonSnapshot::from(&full_button());
        let json = serde_json::to_string(&snapshot).unwrap();

        assert_eq!(
            json,
            "{\"uuid\":\"uuid-1\",\"bdAddr\":\"80:e4:da:70:00:01\",\
             \"readyTime\":1700000100000,\"name\":\"Kitchen\",\
             \"serialNo\":\"BA11-123456\",\"connection\":2,\
             \"firmwareVer\":12,\"battPerc\":88,\"battTime\":1700000000000,\
             \"battVolt\":2950,\"pressCount\":41}"
        );
    }

    #[test]
    fn test_snapshot_encodes_unknowns_as_null_not_omitted() {
        let snapshot = ButtonSnapshot::from(&Button::new("uuid-2", "80:e4:da:70:00:02"));
        let value = serde_json::to_value(&snapshot).unwrap();
        let object = value.as_object().unwrap();

        for field in ["name", "serialNo", "firmwareVer", "battPerc", "battTime", "battVolt"] {
            assert!(object.contains_key(field), "missing field {field}");
            assert!(object[field].is_null(), "field {field} should be null");
        }
        assert_eq!(object["connection"], 0);
        assert_eq!(object["pressCount"], 0);
    }

    #[test]
    fn test_snapshot_sanitizes_device_strings() {
        let mut button = full_button();
        button.name = Some("O\"Brien\n".to_string());

        let snapshot = ButtonSnapshot::from(&button);
        assert_eq!(snapshot.name.as_deref(), Some("O'Brien"));

        // The encoded form must survive a JSON round trip
        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: ButtonSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.name.as_deref(), Some("O'Brien"));
    }

    #[test]
    fn test_click_payload_booleans_are_exclusive() {
        let button = full_button();
        for (kind, single, double, hold) in [
            (ClickKind::Single, true, false, false),
            (ClickKind::Double, false, true, false),
            (ClickKind::Hold, false, false, true),
        ] {
            let press = Press {
                was_queued: false,
                last_queued: false,
                timestamp_utc: 1_700_000_050_000,
                kind,
            };
            let click = ClickEvent::from_press(&button, press);
            let payload = ClickPayload::new(&button, &click);

            assert_eq!(payload.is_single_click, single);
            assert_eq!(payload.is_double_click, double);
            assert_eq!(payload.is_hold, hold);
            assert_eq!(payload.click_age, 0);
        }
    }

    #[test]
    fn test_click_payload_age_for_queued_press() {
        let button = full_button();
        let press = Press {
            was_queued: true,
            last_queued: true,
            timestamp_utc: 1_700_000_000_000,
            kind: ClickKind::Double,
        };
        let click = ClickEvent::from_press(&button, press);
        let payload = ClickPayload::new(&button, &click);

        // ready at 1_700_000_100_000, pressed at 1_700_000_000_000
        assert_eq!(payload.click_age, 100_000);
        assert!(payload.was_queued);
        assert!(payload.last_queued);
        assert_eq!(payload.button.uuid, "uuid-1");
    }

    #[test]
    fn test_notification_signal_events_carry_null_data() {
        let note = Notification::for_event(&ButtonEvent::ScanStarted);
        assert_eq!(note.method, EVENT_SCAN_STARTED);
        assert_eq!(note.data, None);

        let json = serde_json::to_string(&note).unwrap();
        assert_eq!(json, "{\"method\":104,\"data\":null}");
    }

    #[test]
    fn test_notification_discovered_carries_bare_address() {
        let note = Notification::for_event(&ButtonEvent::Discovered {
            bd_addr: "80:e4:da:70:00:07".to_string(),
        });
        assert_eq!(note.method, EVENT_DISCOVERED);
        // Bare string, not a JSON document
        assert_eq!(note.data.as_deref(), Some("80:e4:da:70:00:07"));
    }

    #[test]
    fn test_notification_click_data_is_json() {
        let button = full_button();
        let press = Press {
            was_queued: false,
            last_queued: false,
            timestamp_utc: 1_700_000_050_000,
            kind: ClickKind::Single,
        };
        let click = ClickEvent::from_press(&button, press);
        let note = Notification::for_event(&ButtonEvent::Click { button, click });

        assert_eq!(note.method, EVENT_CLICK);
        let data = note.data.unwrap();
        let value: serde_json::Value = serde_json::from_str(&data).unwrap();
        assert_eq!(value["isSingleClick"], true);
        assert_eq!(value["button"]["uuid"], "uuid-1");
    }

    #[test]
    fn test_notification_scan_error_formats_codes() {
        let note = Notification::for_event(&ButtonEvent::ScanError {
            code: 4,
            sub_code: 13,
        });
        assert_eq!(note.method, 200);
        assert_eq!(
            note.data.as_deref(),
            Some("Internal scan error with result 4, subCode: 13")
        );
    }
}
