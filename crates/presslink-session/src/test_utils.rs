//! Test doubles for the driver seam and the host sink
//!
//! `FakeDriver` implements the collaborator traits over shared in-memory
//! state: tests script failures, seed the paired set, push driver events,
//! and inspect the calls the session layer made. `CollectingSink` records
//! delivered notifications. Compiled for this crate's own tests and, behind
//! the `test-helpers` feature, for downstream integration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use presslink_core::{BatteryReading, Button, Error, Notification, Result};

use crate::dispatcher::EventSink;
use crate::driver::{ButtonDriver, DriverEvent, DriverHandle};

/// A paired button with predictable metadata
pub fn test_button(uuid: &str, bd_addr: &str) -> Button {
    Button {
        name: Some(format!("Button {uuid}")),
        serial_number: Some("BT01-000001".to_string()),
        firmware_version: Some(7),
        press_count: 3,
        ready_timestamp: 1_700_000_000_000,
        ..Button::new(uuid, bd_addr)
    }
}

/// One driver operation the session layer invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    StartScan,
    StopScan,
    KnownButtons,
    ButtonByAddress(String),
    Connect(String),
    Disconnect(String),
    Forget(String),
    AddListener(String),
    RemoveListener(String),
}

#[derive(Default)]
struct FakeState {
    paired: Vec<Button>,
    listeners: HashSet<String>,
    calls: Vec<DriverCall>,
    events: Option<mpsc::Sender<DriverEvent>>,
    opens: usize,
    open_failure: Option<String>,
    start_scan_failure: Option<(i32, i32)>,
    stop_scan_failure: Option<(i32, i32)>,
    forget_failure: Option<(i32, i32)>,
    remove_listener_failure: Option<(i32, i32)>,
}

/// Scripted in-memory driver
///
/// Cheap to clone; clones share state, so the test keeps one copy and hands
/// another to the session layer. Battery reads are answered from the paired
/// set and not recorded in the call log.
#[derive(Clone, Default)]
pub struct FakeDriver {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the driver's paired set
    pub fn pair(&self, button: Button) {
        self.state.lock().paired.push(button);
    }

    /// Make the next `open` fail as a critical environment error
    pub fn fail_next_open(&self, message: &str) {
        self.state.lock().open_failure = Some(message.to_string());
    }

    /// Make the next `start_scan` fail with these driver codes
    pub fn fail_next_start_scan(&self, code: i32, sub_code: i32) {
        self.state.lock().start_scan_failure = Some((code, sub_code));
    }

    /// Make the next `stop_scan` fail with these driver codes
    pub fn fail_next_stop_scan(&self, code: i32, sub_code: i32) {
        self.state.lock().stop_scan_failure = Some((code, sub_code));
    }

    /// Make the next `forget` fail with these driver codes
    pub fn fail_next_forget(&self, code: i32, sub_code: i32) {
        self.state.lock().forget_failure = Some((code, sub_code));
    }

    /// Make the next `remove_listener` fail with these driver codes
    pub fn fail_next_remove_listener(&self, code: i32, sub_code: i32) {
        self.state.lock().remove_listener_failure = Some((code, sub_code));
    }

    /// Push a driver event into the opened session
    pub async fn emit(&self, event: DriverEvent) {
        let tx = self
            .state
            .lock()
            .events
            .clone()
            .expect("driver was never opened");
        tx.send(event).await.expect("session event channel closed");
    }

    /// Driver calls made so far, in order
    pub fn calls(&self) -> Vec<DriverCall> {
        self.state.lock().calls.clone()
    }

    pub fn opens(&self) -> usize {
        self.state.lock().opens
    }

    pub fn is_listening(&self, uuid: &str) -> bool {
        self.state.lock().listeners.contains(uuid)
    }

    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    pub fn paired(&self) -> Vec<Button> {
        self.state.lock().paired.clone()
    }
}

#[async_trait]
impl ButtonDriver for FakeDriver {
    async fn open(&self, events: mpsc::Sender<DriverEvent>) -> Result<Arc<dyn DriverHandle>> {
        let mut state = self.state.lock();
        if let Some(message) = state.open_failure.take() {
            return Err(Error::critical(message));
        }
        state.opens += 1;
        state.events = Some(events);
        Ok(Arc::new(FakeHandle {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeHandle {
    state: Arc<Mutex<FakeState>>,
}

#[async_trait]
impl DriverHandle for FakeHandle {
    async fn start_scan(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(DriverCall::StartScan);
        match state.start_scan_failure.take() {
            Some((code, sub_code)) => Err(Error::driver(code, sub_code)),
            None => Ok(()),
        }
    }

    async fn stop_scan(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(DriverCall::StopScan);
        match state.stop_scan_failure.take() {
            Some((code, sub_code)) => Err(Error::driver(code, sub_code)),
            None => Ok(()),
        }
    }

    async fn known_buttons(&self) -> Result<Vec<Button>> {
        let mut state = self.state.lock();
        state.calls.push(DriverCall::KnownButtons);
        // The vendor list never carries battery; `last_known_battery` does
        Ok(state
            .paired
            .iter()
            .cloned()
            .map(|mut button| {
                button.battery = None;
                button
            })
            .collect())
    }

    async fn button_by_address(&self, bd_addr: &str) -> Result<Option<Button>> {
        let mut state = self.state.lock();
        state
            .calls
            .push(DriverCall::ButtonByAddress(bd_addr.to_string()));
        Ok(state
            .paired
            .iter()
            .find(|b| b.bd_addr == bd_addr)
            .cloned())
    }

    async fn connect(&self, button: &Button) -> Result<()> {
        self.state
            .lock()
            .calls
            .push(DriverCall::Connect(button.uuid.clone()));
        Ok(())
    }

    async fn disconnect(&self, button: &Button) -> Result<()> {
        self.state
            .lock()
            .calls
            .push(DriverCall::Disconnect(button.uuid.clone()));
        Ok(())
    }

    async fn forget(&self, button: &Button) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(DriverCall::Forget(button.uuid.clone()));
        if let Some((code, sub_code)) = state.forget_failure.take() {
            // A refused forget leaves the pairing in place
            return Err(Error::driver(code, sub_code));
        }
        state.paired.retain(|b| b.uuid != button.uuid);
        state.listeners.remove(&button.uuid);
        Ok(())
    }

    async fn add_listener(&self, button: &Button) -> Result<()> {
        let mut state = self.state.lock();
        state
            .calls
            .push(DriverCall::AddListener(button.uuid.clone()));
        state.listeners.insert(button.uuid.clone());
        Ok(())
    }

    async fn remove_listener(&self, button: &Button) -> Result<()> {
        let mut state = self.state.lock();
        state
            .calls
            .push(DriverCall::RemoveListener(button.uuid.clone()));
        if let Some((code, sub_code)) = state.remove_listener_failure.take() {
            return Err(Error::driver(code, sub_code));
        }
        state.listeners.remove(&button.uuid);
        Ok(())
    }

    async fn last_known_battery(&self, button: &Button) -> Result<Option<BatteryReading>> {
        let state = self.state.lock();
        Ok(state
            .paired
            .iter()
            .find(|b| b.uuid == button.uuid)
            .and_then(|b| b.battery))
    }
}

/// Sink that records every delivered notification
#[derive(Default)]
pub struct CollectingSink {
    notes: Mutex<Vec<Notification>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        self.notes.lock().clone()
    }

    /// Just the event ids, in delivery order
    pub fn methods(&self) -> Vec<u32> {
        self.notes.lock().iter().map(|n| n.method).collect()
    }

    pub fn clear(&self) {
        self.notes.lock().clear();
    }

    /// Wait until at least `count` notifications have arrived
    ///
    /// Panics after two seconds; dispatch is in-process and should be fast.
    pub async fn wait_for(&self, count: usize) -> Vec<Notification> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            {
                let notes = self.notes.lock();
                if notes.len() >= count {
                    return notes.clone();
                }
            }
            if tokio::time::Instant::now() >= deadline {
                let got = self.notes.lock().len();
                panic!("timed out waiting for {count} notifications, got {got}");
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl EventSink for CollectingSink {
    async fn notify(&self, notification: Notification) {
        self.notes.lock().push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_driver_records_calls_in_order() {
        let driver = FakeDriver::new();
        let (tx, _rx) = mpsc::channel(8);
        let handle = driver.open(tx).await.unwrap();

        let button = test_button("uuid-1", "80:e4:da:70:00:01");
        handle.start_scan().await.unwrap();
        handle.connect(&button).await.unwrap();
        handle.stop_scan().await.unwrap();

        assert_eq!(
            driver.calls(),
            vec![
                DriverCall::StartScan,
                DriverCall::Connect("uuid-1".to_string()),
                DriverCall::StopScan,
            ]
        );
    }

    #[tokio::test]
    async fn test_fake_driver_forget_unpairs_and_unsubscribes() {
        let driver = FakeDriver::new();
        let button = test_button("uuid-1", "80:e4:da:70:00:01");
        driver.pair(button.clone());

        let (tx, _rx) = mpsc::channel(8);
        let handle = driver.open(tx).await.unwrap();
        handle.add_listener(&button).await.unwrap();
        assert!(driver.is_listening("uuid-1"));

        handle.forget(&button).await.unwrap();
        assert!(driver.paired().is_empty());
        assert!(!driver.is_listening("uuid-1"));
    }

    #[tokio::test]
    async fn test_fake_driver_scripted_failures_fire_once() {
        let driver = FakeDriver::new();
        let (tx, _rx) = mpsc::channel(8);
        let handle = driver.open(tx).await.unwrap();

        driver.fail_next_start_scan(4, 13);
        let err = handle.start_scan().await.unwrap_err();
        assert!(matches!(err, Error::Driver { code: 4, sub_code: 13 }));

        // Scripted failure is consumed
        handle.start_scan().await.unwrap();
    }

    #[tokio::test]
    async fn test_fake_driver_open_failure() {
        let driver = FakeDriver::new();
        driver.fail_next_open("no bluetooth adapter");

        let (tx, _rx) = mpsc::channel(8);
        let err = driver.open(tx).await.unwrap_err();
        assert!(matches!(err, Error::CriticalEnvironment { .. }));
        assert_eq!(driver.opens(), 0);
    }

    #[tokio::test]
    async fn test_collecting_sink_wait_for() {
        let sink = Arc::new(CollectingSink::new());

        let writer = Arc::clone(&sink);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer
                .notify(Notification {
                    method: 104,
                    data: None,
                })
                .await;
        });

        let notes = sink.wait_for(1).await;
        assert_eq!(notes[0].method, 104);
    }
}
