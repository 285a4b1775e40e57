//! The session manager: driver lifecycle, scan sessions, and subscriptions
//!
//! One `SessionManager` owns one driver. `initialize` opens the driver
//! handle and spawns the event pump; every other operation requires the
//! open handle and fails with `NotInitialized` without it. State lives
//! behind one coarse lock that is never held across a driver call: the
//! handle is cloned out first, so a stalled radio can never wedge a host
//! command that only touches bookkeeping.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use presslink_core::prelude::*;
use presslink_core::{Button, ButtonEvent, ClickEvent, ConnectionState};

use crate::config::SessionConfig;
use crate::dispatcher::EventDispatcher;
use crate::driver::{ButtonDriver, DriverEvent, DriverHandle, ScanOutcome};
use crate::registry::ButtonRegistry;

/// One in-flight discovery operation
///
/// At most one exists at a time; being present is what "a scan is active"
/// means.
#[derive(Debug, Clone)]
pub struct ScanSession {
    pub started_at: DateTime<Utc>,
}

impl ScanSession {
    fn begin() -> Self {
        Self {
            started_at: Utc::now(),
        }
    }
}

#[derive(Default)]
struct ManagerState {
    handle: Option<Arc<dyn DriverHandle>>,
    scan: Option<ScanSession>,
    subscriptions: HashSet<String>,
    pump: Option<JoinHandle<()>>,
}

/// Owns the driver lifecycle and serializes session state transitions
pub struct SessionManager {
    driver: Box<dyn ButtonDriver>,
    registry: Arc<ButtonRegistry>,
    dispatcher: EventDispatcher,
    state: Arc<Mutex<ManagerState>>,
}

impl SessionManager {
    pub fn new(driver: Box<dyn ButtonDriver>, dispatcher: EventDispatcher) -> Self {
        Self {
            driver,
            registry: Arc::new(ButtonRegistry::new()),
            dispatcher,
            state: Arc::new(Mutex::new(ManagerState::default())),
        }
    }

    pub fn registry(&self) -> &ButtonRegistry {
        &self.registry
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().handle.is_some()
    }

    pub fn scan_active(&self) -> bool {
        self.state.lock().scan.is_some()
    }

    pub fn scan_session(&self) -> Option<ScanSession> {
        self.state.lock().scan.clone()
    }

    pub fn is_subscribed(&self, uuid: &str) -> bool {
        self.state.lock().subscriptions.contains(uuid)
    }

    pub fn subscription_count(&self) -> usize {
        self.state.lock().subscriptions.len()
    }

    /// Open the driver and start pumping its events
    ///
    /// Fails with `AlreadyInitialized` while a handle is open, and with
    /// whatever the driver reports (typically `CriticalEnvironment`) when
    /// the platform cannot host a session.
    pub async fn initialize(&self, config: &SessionConfig) -> Result<()> {
        if self.state.lock().handle.is_some() {
            return Err(Error::AlreadyInitialized);
        }

        let (events_tx, events_rx) = mpsc::channel(config.effective_capacity());
        let handle = self.driver.open(events_tx).await?;

        let mut state = self.state.lock();
        if state.handle.is_some() {
            // Lost an initialize race; the winner's session stays and the
            // handle we just opened is released on drop
            return Err(Error::AlreadyInitialized);
        }
        state.handle = Some(handle);
        state.pump = Some(tokio::spawn(pump(
            events_rx,
            Arc::clone(&self.registry),
            self.dispatcher.clone(),
            Arc::clone(&self.state),
        )));
        info!("button session initialized");
        Ok(())
    }

    /// Tear the session down: stop scanning, drop every subscription,
    /// release the driver handle
    ///
    /// Always safe to call again; a second call reports `NotInitialized`.
    pub async fn shutdown(&self) -> Result<()> {
        let handle = self.handle()?;

        // The scan teardown signals stop exactly like an explicit cancel
        self.dispatcher.emit(ButtonEvent::ScanStopped);
        if let Err(err) = handle.stop_scan().await {
            warn!("failed to stop scan during shutdown: {err}");
            self.dispatcher.emit(ButtonEvent::Error {
                message: format!("Failed to stop scan while releasing the session: {err}"),
            });
        }

        // Per-button listener failures are reported, not fatal
        let subscribed: Vec<String> = {
            let state = self.state.lock();
            state.subscriptions.iter().cloned().collect()
        };
        for uuid in subscribed {
            let Some(button) = self.registry.get(&uuid) else {
                continue;
            };
            if let Err(err) = handle.remove_listener(&button).await {
                warn!("failed to remove listener for {uuid}: {err}");
                self.dispatcher.emit(ButtonEvent::Error {
                    message: format!("Failed to remove listener for {uuid}: {err}"),
                });
            }
        }

        let mut state = self.state.lock();
        state.handle = None;
        state.scan = None;
        state.subscriptions.clear();
        if let Some(pump) = state.pump.take() {
            pump.abort();
        }
        drop(state);

        info!("button session shut down");
        Ok(())
    }

    /// Begin a discovery session, superseding any scan already running
    ///
    /// The superseded scan gets its terminal `ScanStopped` before the new
    /// session's `ScanStarted`; the start signal always precedes the new
    /// session's discovery events.
    pub async fn start_scan(&self) -> Result<()> {
        let handle = self.handle()?;

        let superseded = self.state.lock().scan.take();
        if superseded.is_some() {
            self.dispatcher.emit(ButtonEvent::ScanStopped);
            if let Err(err) = handle.stop_scan().await {
                warn!("failed to stop superseded scan: {err}");
                self.dispatcher.emit(ButtonEvent::Error {
                    message: format!("Failed to stop the previous scan: {err}"),
                });
            }
        }

        self.state.lock().scan = Some(ScanSession::begin());
        self.dispatcher.emit(ButtonEvent::ScanStarted);

        if let Err(err) = handle.start_scan().await {
            self.state.lock().scan = None;
            // This session still terminates with exactly one stop signal
            self.dispatcher.emit(ButtonEvent::ScanStopped);
            return Err(err);
        }
        debug!("scan started");
        Ok(())
    }

    /// Stop the active scan
    ///
    /// Cancelling is idempotent: the stop signal goes out even when no
    /// scan is running, and cancelling twice is harmless.
    pub async fn cancel_scan(&self) -> Result<()> {
        let handle = self.handle()?;

        self.dispatcher.emit(ButtonEvent::ScanStopped);
        self.state.lock().scan = None;

        if let Err(err) = handle.stop_scan().await {
            warn!("failed to stop scan: {err}");
            self.dispatcher.emit(ButtonEvent::Error {
                message: format!("Failed to stop the scan: {err}"),
            });
            return Err(err);
        }
        Ok(())
    }

    /// Every button the driver still claims, merged through the registry
    ///
    /// The driver owns membership; the registry only caches. Battery is
    /// refreshed through the driver's accessor on the way through.
    pub async fn list_all(&self) -> Result<Vec<Button>> {
        let handle = self.handle()?;
        let known = handle.known_buttons().await?;

        let mut merged = Vec::with_capacity(known.len());
        for mut button in known {
            match handle.last_known_battery(&button).await {
                Ok(Some(battery)) => button.battery = Some(battery),
                Ok(None) => {}
                Err(err) => debug!("battery read failed for {}: {err}", button.uuid),
            }
            let uuid = button.uuid.clone();
            self.registry.upsert(button);
            if let Some(snapshot) = self.registry.get(&uuid) {
                merged.push(snapshot);
            }
        }
        Ok(merged)
    }

    /// Look one button up by transport address
    ///
    /// The driver answer is authoritative; on a miss the registry may still
    /// know the address from an earlier observation.
    pub async fn list_by_address(&self, bd_addr: &str) -> Result<Option<Button>> {
        let handle = self.handle()?;
        match handle.button_by_address(bd_addr).await? {
            Some(button) => {
                let uuid = button.uuid.clone();
                self.registry.upsert(button);
                Ok(self.registry.get(&uuid))
            }
            None => Ok(self.registry.get_by_address(bd_addr)),
        }
    }

    /// Ask a known button to connect
    pub async fn connect(&self, uuid: &str) -> Result<()> {
        let handle = self.handle()?;
        let button = self.known(uuid)?;

        handle.connect(&button).await?;
        self.registry.mark_connecting(uuid);
        debug!("connect requested for {uuid}");
        Ok(())
    }

    /// Drop a known button's connection, keeping the pairing
    pub async fn disconnect(&self, uuid: &str) -> Result<()> {
        let handle = self.handle()?;
        let button = self.known(uuid)?;

        handle.disconnect(&button).await?;
        self.registry
            .set_connection_state(uuid, ConnectionState::Disconnected);
        debug!("disconnect requested for {uuid}");
        Ok(())
    }

    /// Unpair a button everywhere: subscription, driver pairing, registry
    ///
    /// The forget supersedes the subscription, so a refused listener
    /// removal is logged and skipped. The registry entry goes last: when
    /// the driver refuses the forget, the button stays known and the call
    /// can be retried.
    pub async fn forget(&self, uuid: &str) -> Result<()> {
        let handle = self.handle()?;
        let button = self.known(uuid)?;

        if let Err(err) = handle.remove_listener(&button).await {
            warn!("failed to remove listener while forgetting {uuid}: {err}");
        }
        self.state.lock().subscriptions.remove(uuid);

        handle.forget(&button).await?;
        self.registry.remove(uuid);
        info!("forgot button {uuid}");
        Ok(())
    }

    /// Subscribe to a known button's clicks and connection changes
    ///
    /// A disconnected button is asked to connect first, and the host is
    /// told `Connected` as soon as the attempt is underway, before the
    /// handshake completes; the registry keeps the honest `Connecting`
    /// state until the driver confirms. Listening twice is idempotent:
    /// any prior subscription is removed before the new one is added.
    pub async fn listen(&self, uuid: &str) -> Result<()> {
        let handle = self.handle()?;
        let button = self.known(uuid)?;

        if button.connection_state == ConnectionState::Disconnected {
            handle.connect(&button).await?;
            self.registry.mark_connecting(uuid);
            self.dispatcher.emit(ButtonEvent::Connected);
        }

        handle.remove_listener(&button).await?;
        handle.add_listener(&button).await?;
        self.state.lock().subscriptions.insert(uuid.to_string());
        debug!("listening to {uuid}");
        Ok(())
    }

    /// Drop a known button's subscription; no-op when none exists
    pub async fn stop_listening(&self, uuid: &str) -> Result<()> {
        let handle = self.handle()?;
        let button = self.known(uuid)?;

        handle.remove_listener(&button).await?;
        self.state.lock().subscriptions.remove(uuid);
        debug!("stopped listening to {uuid}");
        Ok(())
    }

    /// Clone the open handle out of the lock, or `NotInitialized`
    fn handle(&self) -> Result<Arc<dyn DriverHandle>> {
        self.state.lock().handle.clone().ok_or(Error::NotInitialized)
    }

    /// Registry lookup that turns absence into `UnknownButton`
    fn known(&self, uuid: &str) -> Result<Button> {
        self.registry
            .get(uuid)
            .ok_or_else(|| Error::unknown_button(uuid))
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        // Without this, the pump would keep the state (and through it the
        // driver handle) alive after the manager is gone
        let mut state = self.state.lock();
        if let Some(pump) = state.pump.take() {
            pump.abort();
        }
        state.handle = None;
    }
}

/// Consume driver events: converge the registry, then notify the host
async fn pump(
    mut events: mpsc::Receiver<DriverEvent>,
    registry: Arc<ButtonRegistry>,
    dispatcher: EventDispatcher,
    state: Arc<Mutex<ManagerState>>,
) {
    while let Some(event) = events.recv().await {
        match event {
            DriverEvent::PairedButtonFound(button) => {
                let snapshot = absorb(&registry, button);
                dispatcher.emit(ButtonEvent::PairedButtonFound(snapshot));
            }
            DriverEvent::Discovered { bd_addr } => {
                dispatcher.emit(ButtonEvent::Discovered { bd_addr });
            }
            DriverEvent::ScanConnecting => {
                dispatcher.emit(ButtonEvent::Connecting);
            }
            DriverEvent::ScanCompleted(outcome) => {
                let was_active = state.lock().scan.take().is_some();
                if !was_active {
                    // Completion of a cancelled scan: keep the state
                    // convergence, skip the signals
                    match outcome {
                        ScanOutcome::Found(button) => {
                            debug!("stale scan completion for {}", button.uuid);
                            registry.upsert(button);
                        }
                        ScanOutcome::Failed { code, sub_code } => {
                            debug!("stale scan failure ignored ({code}/{sub_code})");
                        }
                    }
                    continue;
                }

                // The stop signal precedes the terminal result
                dispatcher.emit(ButtonEvent::ScanStopped);
                match outcome {
                    ScanOutcome::Found(button) => {
                        let snapshot = absorb(&registry, button);
                        dispatcher.emit(ButtonEvent::ButtonFound(snapshot));
                    }
                    ScanOutcome::Failed { code, sub_code } => {
                        warn!("scan failed with result {code}, sub code {sub_code}");
                        dispatcher.emit(ButtonEvent::ScanError { code, sub_code });
                    }
                }
            }
            DriverEvent::Clicked { button, press } => {
                let snapshot = absorb(&registry, button);
                let click = ClickEvent::from_press(&snapshot, press);
                dispatcher.emit(ButtonEvent::Click {
                    button: snapshot,
                    click,
                });
            }
            DriverEvent::UpOrDown { button, down } => {
                let snapshot = absorb(&registry, button);
                dispatcher.emit(ButtonEvent::ButtonUpOrDown {
                    button: snapshot,
                    down,
                });
            }
            DriverEvent::Reconnected { button } => {
                let uuid = button.uuid.clone();
                registry.upsert(button);
                registry.set_connection_state(&uuid, ConnectionState::Connected);
                match registry.get(&uuid) {
                    Some(snapshot) => dispatcher.emit(ButtonEvent::Reconnected(snapshot)),
                    None => debug!("reconnect for forgotten button {uuid}"),
                }
            }
            DriverEvent::ConnectionLost { button } => {
                let uuid = button.uuid.clone();
                registry.upsert(button);
                registry.set_connection_state(&uuid, ConnectionState::Disconnected);
                match registry.get(&uuid) {
                    Some(snapshot) => dispatcher.emit(ButtonEvent::ConnectionLost(snapshot)),
                    None => debug!("connection loss for forgotten button {uuid}"),
                }
            }
        }
    }
    debug!("driver event channel closed, pump finished");
}

/// Upsert an observation and hand back the merged record
fn absorb(registry: &ButtonRegistry, button: Button) -> Button {
    let uuid = button.uuid.clone();
    registry.upsert(button.clone());
    registry.get(&uuid).unwrap_or(button)
}
