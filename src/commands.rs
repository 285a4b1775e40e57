//! Host command vocabulary and argument validation

use serde_json::Value;

use presslink_core::prelude::*;

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_DISPOSE: &str = "dispose";
pub const METHOD_START_BUTTON_SCAN: &str = "startButtonScan";
pub const METHOD_STOP_BUTTON_SCAN: &str = "stopButtonScan";
pub const METHOD_GET_BUTTONS: &str = "getButtons";
pub const METHOD_GET_BUTTONS_BY_ADDR: &str = "getButtonsByAddr";
pub const METHOD_START_LISTEN_TO_BUTTON: &str = "startListenToButton";
pub const METHOD_STOP_LISTEN_TO_BUTTON: &str = "stopListenToButton";
pub const METHOD_CONNECT_BUTTON: &str = "connectButton";
pub const METHOD_DISCONNECT_BUTTON: &str = "disconnectButton";
pub const METHOD_FORGET_BUTTON: &str = "forgetButton";

/// Callback method invoked on the host for every outgoing notification
pub const METHOD_CALL_LISTENER: &str = "callListener";

/// A validated host command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Initialize,
    Dispose,
    StartButtonScan,
    StopButtonScan,
    GetButtons,
    GetButtonsByAddr { bd_addr: String },
    StartListenToButton { uuid: String },
    StopListenToButton { uuid: String },
    ConnectButton { uuid: String },
    DisconnectButton { uuid: String },
    ForgetButton { uuid: String },
}

impl Command {
    /// Validate a raw method call into a command
    ///
    /// Single-argument methods take a JSON array holding exactly one
    /// string; anything else is `InvalidArguments`, as is a method name
    /// nobody recognizes. Methods without arguments ignore whatever was
    /// passed.
    pub fn parse(method: &str, args: Option<&Value>) -> Result<Self> {
        match method {
            METHOD_INITIALIZE => Ok(Command::Initialize),
            METHOD_DISPOSE => Ok(Command::Dispose),
            METHOD_START_BUTTON_SCAN => Ok(Command::StartButtonScan),
            METHOD_STOP_BUTTON_SCAN => Ok(Command::StopButtonScan),
            METHOD_GET_BUTTONS => Ok(Command::GetButtons),
            METHOD_GET_BUTTONS_BY_ADDR => Ok(Command::GetButtonsByAddr {
                bd_addr: single_string(method, args)?,
            }),
            METHOD_START_LISTEN_TO_BUTTON => Ok(Command::StartListenToButton {
                uuid: single_string(method, args)?,
            }),
            METHOD_STOP_LISTEN_TO_BUTTON => Ok(Command::StopListenToButton {
                uuid: single_string(method, args)?,
            }),
            METHOD_CONNECT_BUTTON => Ok(Command::ConnectButton {
                uuid: single_string(method, args)?,
            }),
            METHOD_DISCONNECT_BUTTON => Ok(Command::DisconnectButton {
                uuid: single_string(method, args)?,
            }),
            METHOD_FORGET_BUTTON => Ok(Command::ForgetButton {
                uuid: single_string(method, args)?,
            }),
            other => Err(Error::invalid_arguments(
                "unknown method",
                format!("no handler for '{other}'"),
            )),
        }
    }

    /// The method name this command answers to
    pub fn method(&self) -> &'static str {
        match self {
            Command::Initialize => METHOD_INITIALIZE,
            Command::Dispose => METHOD_DISPOSE,
            Command::StartButtonScan => METHOD_START_BUTTON_SCAN,
            Command::StopButtonScan => METHOD_STOP_BUTTON_SCAN,
            Command::GetButtons => METHOD_GET_BUTTONS,
            Command::GetButtonsByAddr { .. } => METHOD_GET_BUTTONS_BY_ADDR,
            Command::StartListenToButton { .. } => METHOD_START_LISTEN_TO_BUTTON,
            Command::StopListenToButton { .. } => METHOD_STOP_LISTEN_TO_BUTTON,
            Command::ConnectButton { .. } => METHOD_CONNECT_BUTTON,
            Command::DisconnectButton { .. } => METHOD_DISCONNECT_BUTTON,
            Command::ForgetButton { .. } => METHOD_FORGET_BUTTON,
        }
    }
}

/// Unwrap the `["value"]` argument shape the host sends
fn single_string(method: &str, args: Option<&Value>) -> Result<String> {
    let items = match args {
        Some(Value::Array(items)) => items,
        _ => {
            return Err(Error::invalid_arguments(
                format!("{method} expects a single-element argument list"),
                format!("got {}", describe(args)),
            ))
        }
    };
    if items.len() != 1 {
        return Err(Error::invalid_arguments(
            format!("{method} expects a single-element argument list"),
            format!("got {} elements", items.len()),
        ));
    }
    match &items[0] {
        Value::String(value) => Ok(value.clone()),
        other => Err(Error::invalid_arguments(
            format!("{method} expects a string argument"),
            format!("got {}", describe(Some(other))),
        )),
    }
}

fn describe(value: Option<&Value>) -> &'static str {
    match value {
        None => "nothing",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "a boolean",
        Some(Value::Number(_)) => "a number",
        Some(Value::String(_)) => "a string",
        Some(Value::Array(_)) => "an array",
        Some(Value::Object(_)) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_no_arg_methods() {
        assert_eq!(
            Command::parse(METHOD_INITIALIZE, None).unwrap(),
            Command::Initialize
        );
        assert_eq!(
            Command::parse(METHOD_START_BUTTON_SCAN, None).unwrap(),
            Command::StartButtonScan
        );
        // Arguments to a no-arg method are ignored, not rejected
        assert_eq!(
            Command::parse(METHOD_DISPOSE, Some(&json!(["extra"]))).unwrap(),
            Command::Dispose
        );
    }

    #[test]
    fn test_parse_single_string_methods() {
        assert_eq!(
            Command::parse(METHOD_CONNECT_BUTTON, Some(&json!(["uuid-a"]))).unwrap(),
            Command::ConnectButton {
                uuid: "uuid-a".to_string()
            }
        );
        assert_eq!(
            Command::parse(METHOD_GET_BUTTONS_BY_ADDR, Some(&json!(["80:e4:da:70:00:01"])))
                .unwrap(),
            Command::GetButtonsByAddr {
                bd_addr: "80:e4:da:70:00:01".to_string()
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_argument_shapes() {
        for args in [
            None,
            Some(json!(null)),
            Some(json!("bare string")),
            Some(json!([])),
            Some(json!(["a", "b"])),
            Some(json!([42])),
            Some(json!({ "uuid": "a" })),
        ] {
            let err = Command::parse(METHOD_FORGET_BUTTON, args.as_ref()).unwrap_err();
            assert!(
                matches!(err, Error::InvalidArguments { .. }),
                "args {args:?} should be invalid"
            );
        }
    }

    #[test]
    fn test_parse_rejects_unknown_method() {
        let err = Command::parse("selfDestruct", None).unwrap_err();
        assert!(matches!(err, Error::InvalidArguments { .. }));
        assert_eq!(err.code(), "INVALID_ARGUMENTS");
    }

    #[test]
    fn test_method_round_trips() {
        let command = Command::parse(METHOD_STOP_LISTEN_TO_BUTTON, Some(&json!(["u"]))).unwrap();
        assert_eq!(command.method(), METHOD_STOP_LISTEN_TO_BUTTON);
        assert_eq!(Command::Initialize.method(), METHOD_INITIALIZE);
    }
}
