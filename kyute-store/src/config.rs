use crate::{error::Error, value::Value};

/// What to do with actions dispatched after the action stream has terminated.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminatedDispatch {
    /// Return `Error::Terminated`.
    #[default]
    Reject,
    /// Log a warning and drop the action.
    Ignore,
}

/// Store configuration.
///
/// ```json
/// {
///     "initial_state": { "counter": 10 },
///     "dispatch_after_termination": "ignore"
/// }
/// ```
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// State before the `INIT` action is folded.
    pub initial_state: Value,
    pub dispatch_after_termination: TerminatedDispatch,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            initial_state: Value::map(),
            dispatch_after_termination: TerminatedDispatch::default(),
        }
    }
}

impl StoreConfig {
    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<StoreConfig, Error> {
        let config: StoreConfig = serde_json::from_str(json).map_err(|err| Error::Config(err.to_string()))?;
        if !matches!(config.initial_state, Value::Map(_)) {
            return Err(Error::Config(format!(
                "initial_state must be an object, got {}",
                config.initial_state.type_name()
            )));
        }
        Ok(config)
    }
}
