//! Button peripheral model shared by the registry, session manager, and wire layer

/// Connection state of a button as tracked by the registry
///
/// Wire-encoded as a small integer (`0`/`1`/`2`) in button snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    /// Integer encoding used in button snapshots
    pub fn as_wire(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
        }
    }

    /// Decode the snapshot integer back into a state
    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(ConnectionState::Disconnected),
            1 => Some(ConnectionState::Connecting),
            2 => Some(ConnectionState::Connected),
            _ => None,
        }
    }

    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// A battery reading reported by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryReading {
    /// Estimated charge, 0-100
    pub percentage: u8,

    /// When the reading was taken, epoch milliseconds UTC
    pub timestamp_utc: i64,

    /// Cell voltage in millivolts
    pub voltage_mv: u32,
}

/// One physical button peripheral
///
/// Identity is the driver-assigned `uuid`; the Bluetooth address is
/// transport-level and may change across re-pairings.
#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    /// Stable identifier assigned by the driver at pairing time
    pub uuid: String,

    /// Transport-level Bluetooth address
    pub bd_addr: String,

    /// Human-assigned name, if the driver knows one
    pub name: Option<String>,

    /// Manufacturing serial number
    pub serial_number: Option<String>,

    /// Firmware revision reported by the peripheral
    pub firmware_version: Option<i32>,

    /// Connection state as last reported by the driver
    pub connection_state: ConnectionState,

    /// Most recent battery reading, if any
    pub battery: Option<BatteryReading>,

    /// Total presses the peripheral has recorded over its lifetime
    pub press_count: u32,

    /// Epoch milliseconds when the button last became ready
    pub ready_timestamp: i64,
}

impl Button {
    /// Create a button with only its identity known
    pub fn new(uuid: impl Into<String>, bd_addr: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            bd_addr: bd_addr.into(),
            name: None,
            serial_number: None,
            firmware_version: None,
            connection_state: ConnectionState::Disconnected,
            battery: None,
            press_count: 0,
            ready_timestamp: 0,
        }
    }

    /// Fold an updated observation of the same button into this record
    ///
    /// Non-optional fields take the incoming value; optional metadata keeps
    /// the previously known value when the update carries `None`. The uuid
    /// is identity and never changes.
    pub fn merge_from(&mut self, update: Button) {
        debug_assert_eq!(self.uuid, update.uuid, "merge across button identities");

        self.bd_addr = update.bd_addr;
        if update.name.is_some() {
            self.name = update.name;
        }
        if update.serial_number.is_some() {
            self.serial_number = update.serial_number;
        }
        if update.firmware_version.is_some() {
            self.firmware_version = update.firmware_version;
        }
        if update.battery.is_some() {
            self.battery = update.battery;
        }
        self.connection_state = update.connection_state;
        self.press_count = update.press_count;
        self.ready_timestamp = update.ready_timestamp;
    }

    /// Name for log lines: the assigned name if known, else the uuid
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.uuid)
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state.is_connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_button(uuid: &str, bd_addr: &str) -> Button {
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
            ..Button::new(uuid, bd_addr)
        }
    }

    #[test]
    fn test_connection_state_wire_round_trip() {
        for state in [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
        ] {
            assert_eq!(ConnectionState::from_wire(state.as_wire()), Some(state));
        }
        assert_eq!(ConnectionState::from_wire(3), None);
    }

    #[test]
    fn test_new_button_is_disconnected() {
        let button = Button::new("uuid-1", "80:e4:da:70:00:01");
        assert_eq!(button.connection_state, ConnectionState::Disconnected);
        assert!(!button.is_connected());
        assert_eq!(button.press_count, 0);
        assert!(button.name.is_none());
    }

    #[test]
    fn test_merge_keeps_known_metadata_when_update_is_bare() {
        let mut known = sample_button("uuid-1", "80:e4:da:70:00:01");
        let update = Button {
            press_count: 42,
            ready_timestamp: 1_700_000_200_000,
            ..Button::new("uuid-1", "80:e4:da:70:00:01")
        };

        known.merge_from(update);

        assert_eq!(known.name.as_deref(), Some("Kitchen"));
        assert_eq!(known.serial_number.as_deref(), Some("BA11-123456"));
        assert_eq!(known.firmware_version, Some(12));
        assert!(known.battery.is_some());
        assert_eq!(known.press_count, 42);
        assert_eq!(known.ready_timestamp, 1_700_000_200_000);
    }

    #[test]
    fn test_merge_takes_fresh_metadata() {
        let mut known = sample_button("uuid-1", "80:e4:da:70:00:01");
        let update = Button {
            name: Some("Hallway".to_string()),
            firmware_version: Some(13),
            connection_state: ConnectionState::Disconnected,
            ..Button::new("uuid-1", "80:e4:da:70:00:02")
        };

        known.merge_from(update);

        assert_eq!(known.name.as_deref(), Some("Hallway"));
        assert_eq!(known.firmware_version, Some(13));
        // Transport address and state always track the latest observation
        assert_eq!(known.bd_addr, "80:e4:da:70:00:02");
        assert_eq!(known.connection_state, ConnectionState::Disconnected);
    }

    #[test]
    fn test_display_name_falls_back_to_uuid() {
        let named = sample_button("uuid-1", "80:e4:da:70:00:01");
        assert_eq!(named.display_name(), "Kitchen");

        let bare = Button::new("uuid-2", "80:e4:da:70:00:02");
        assert_eq!(bare.display_name(), "uuid-2");
    }
}
