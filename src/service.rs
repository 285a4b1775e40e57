//! The host-facing service: command dispatch and reply encoding

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use presslink_core::prelude::*;
use presslink_core::{Button, ButtonSnapshot};
use presslink_session::{
    ButtonDriver, EventDispatcher, EventSink, SessionConfig, SessionManager,
};

use crate::commands::Command;

/// The error triple handed back over the host channel
///
/// Mirrors the channel's native error result: a short stable `code`, a
/// human-readable `message`, optional `details`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReply {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl From<&Error> for ErrorReply {
    fn from(err: &Error) -> Self {
        let details = match err {
            Error::InvalidArguments { detail, .. } => Some(detail.clone()),
            Error::Driver { code, sub_code } => {
                Some(format!("result {code}, sub code {sub_code}"))
            }
            _ => None,
        };
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            details,
        }
    }
}

/// One button service per host channel
///
/// Owns the session manager and the dispatcher; the host attaches its
/// sink to receive `callListener` notifications and calls [`invoke`]
/// (or [`handle`], which pre-shapes errors) for commands.
///
/// Must be created inside a tokio runtime.
///
/// [`invoke`]: ButtonService::invoke
/// [`handle`]: ButtonService::handle
pub struct ButtonService {
    manager: SessionManager,
    dispatcher: EventDispatcher,
    config: SessionConfig,
}

impl ButtonService {
    /// Service with configuration from the default config file
    pub fn new(driver: Box<dyn ButtonDriver>) -> Self {
        Self::with_config(driver, SessionConfig::load_default())
    }

    pub fn with_config(driver: Box<dyn ButtonDriver>, config: SessionConfig) -> Self {
        let dispatcher = EventDispatcher::new();
        let manager = SessionManager::new(driver, dispatcher.clone());
        Self {
            manager,
            dispatcher,
            config,
        }
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// Attach the host sink that receives every notification
    pub fn attach_host(&self, sink: Arc<dyn EventSink>) {
        self.dispatcher.attach(sink);
    }

    /// Detach the host sink; subsequent notifications are dropped
    pub fn detach_host(&self) {
        self.dispatcher.detach();
    }

    pub fn is_host_attached(&self) -> bool {
        self.dispatcher.is_attached()
    }

    /// Dispatch one host command
    ///
    /// Argument validation happens before any state check, so malformed
    /// arguments report `InvalidArguments` even while uninitialized.
    pub async fn invoke(&self, method: &str, args: Option<&Value>) -> Result<Value> {
        let command = Command::parse(method, args)?;
        debug!("invoke {}", command.method());

        match command {
            Command::Initialize => {
                self.manager.initialize(&self.config).await?;
                Ok(Value::Bool(true))
            }
            Command::Dispose => {
                self.manager.shutdown().await?;
                Ok(Value::Bool(true))
            }
            Command::StartButtonScan => {
                self.manager.start_scan().await?;
                Ok(Value::Bool(true))
            }
            Command::StopButtonScan => {
                self.manager.cancel_scan().await?;
                Ok(Value::Bool(true))
            }
            Command::GetButtons => {
                let buttons = self.manager.list_all().await?;
                let mut snapshots = Vec::with_capacity(buttons.len());
                for button in &buttons {
                    snapshots.push(Value::String(encode_snapshot(button)?));
                }
                Ok(Value::Array(snapshots))
            }
            Command::GetButtonsByAddr { bd_addr } => {
                match self.manager.list_by_address(&bd_addr).await? {
                    Some(button) => Ok(Value::String(encode_snapshot(&button)?)),
                    // An unknown address is an empty reply, not an error
                    None => Ok(Value::String(String::new())),
                }
            }
            Command::StartListenToButton { uuid } => {
                self.manager.listen(&uuid).await?;
                Ok(Value::Bool(true))
            }
            Command::StopListenToButton { uuid } => {
                self.manager.stop_listening(&uuid).await?;
                Ok(Value::Bool(true))
            }
            Command::ConnectButton { uuid } => {
                self.manager.connect(&uuid).await?;
                Ok(Value::Bool(true))
            }
            Command::DisconnectButton { uuid } => {
                self.manager.disconnect(&uuid).await?;
                Ok(Value::Bool(true))
            }
            Command::ForgetButton { uuid } => {
                self.manager.forget(&uuid).await?;
                Ok(Value::Bool(true))
            }
        }
    }

    /// [`invoke`], with failures pre-shaped for the host channel
    ///
    /// [`invoke`]: ButtonService::invoke
    pub async fn handle(
        &self,
        method: &str,
        args: Option<&Value>,
    ) -> std::result::Result<Value, ErrorReply> {
        self.invoke(method, args).await.map_err(|err| {
            warn!("{method} failed: {err}");
            ErrorReply::from(&err)
        })
    }
}

fn encode_snapshot(button: &Button) -> Result<String> {
    Ok(serde_json::to_string(&ButtonSnapshot::from(button))?)
}
