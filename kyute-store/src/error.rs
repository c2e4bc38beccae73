use kyute_common::Atom;
use std::{error::Error as StdError, fmt, rc::Rc};

/// Lifecycle of a stream: active until it receives a terminal signal.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Lifecycle {
    /// Accepting values.
    Active,
    /// Terminated by an error.
    Erred,
    /// Terminated normally.
    Completed,
}

impl Lifecycle {
    pub fn is_terminated(self) -> bool {
        self != Lifecycle::Active
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Lifecycle::Active => f.write_str("active"),
            Lifecycle::Erred => f.write_str("terminated with an error"),
            Lifecycle::Completed => f.write_str("completed"),
        }
    }
}

/// An `anyhow::Error` that can be delivered to several observers.
#[derive(Clone)]
pub struct SharedError(Rc<anyhow::Error>);

impl SharedError {
    pub fn new(error: anyhow::Error) -> SharedError {
        SharedError(Rc::new(error))
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

impl From<anyhow::Error> for SharedError {
    fn from(error: anyhow::Error) -> Self {
        SharedError::new(error)
    }
}

impl fmt::Debug for SharedError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for SharedError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl StdError for SharedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

/// Errors produced by the store, its streams and its selectors.
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    /// The primary selector argument was neither a property name nor a function.
    #[error("unexpected type '{found}' in select operator, expected 'string' or 'function'")]
    UnexpectedSelectorType { found: &'static str },
    /// A mapping function was followed by additional path keys.
    #[error("a mapping function cannot be followed by path keys (got {extra} extra key(s))")]
    MapFnWithPath { extra: usize },
    /// An action was dispatched with an empty type.
    #[error("actions must have a non-empty type")]
    UntypedAction,
    /// A registered reducer failed while folding an action.
    #[error("reducer `{key}` failed while handling `{action}`: {source}")]
    Reducer {
        key: Atom,
        action: Atom,
        #[source]
        source: SharedError,
    },
    /// A failure was signalled on the action stream.
    #[error("action stream failed: {0}")]
    Upstream(#[source] SharedError),
    /// An action was dispatched after the action stream was terminated.
    #[error("cannot dispatch: the action stream has {0}")]
    Terminated(Lifecycle),
    /// Invalid store configuration.
    #[error("invalid store configuration: {0}")]
    Config(String),
}
