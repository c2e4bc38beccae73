use crate::value::{Map, Value};
use kyute_common::{Atom, Data};
use std::{fmt, rc::Rc};

/// Type of the action dispatched when a store is created.
pub const INIT: &str = "@kyute/store/init";

/// Type of the action dispatched after reducers were added to or removed from a store.
///
/// Its `features` field lists the affected reducer keys.
pub const UPDATE: &str = "@kyute/store/update-reducers";

#[derive(Clone, serde::Serialize, serde::Deserialize)]
struct ActionRecord {
    #[serde(rename = "type")]
    kind: Atom,
    #[serde(flatten)]
    payload: Map,
}

/// An immutable record describing an intent to change the state.
///
/// Actions are reference-counted: clones refer to the same record, and `Data::same` compares
/// them by identity, not by content.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(from = "ActionRecord", into = "ActionRecord")]
pub struct Action(Rc<ActionRecord>);

impl Action {
    /// Creates an action of the specified type with no payload.
    pub fn new(kind: impl Into<Atom>) -> Action {
        Action(Rc::new(ActionRecord {
            kind: kind.into(),
            payload: Map::new(),
        }))
    }

    /// Adds a payload field. Only meant to be used while building the action.
    #[must_use]
    pub fn with(mut self, field: impl Into<Atom>, value: impl Into<Value>) -> Action {
        Rc::make_mut(&mut self.0).payload.insert(field.into(), value.into());
        self
    }

    /// Returns the type of the action.
    pub fn kind(&self) -> &Atom {
        &self.0.kind
    }

    /// Returns whether this action is of the specified type.
    pub fn is(&self, kind: &str) -> bool {
        self.0.kind == kind
    }

    /// Returns a payload field, or `Value::Undefined`.
    pub fn get(&self, field: &str) -> Value {
        self.0.payload.get(field).cloned().unwrap_or_default()
    }

    pub fn payload(&self) -> &Map {
        &self.0.payload
    }
}

impl From<ActionRecord> for Action {
    fn from(record: ActionRecord) -> Self {
        Action(Rc::new(record))
    }
}

impl From<Action> for ActionRecord {
    fn from(action: Action) -> Self {
        Rc::try_unwrap(action.0).unwrap_or_else(|rc| (*rc).clone())
    }
}

impl Data for Action {
    fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut s = f.debug_struct("Action");
        s.field("type", &self.0.kind.as_str());
        for (k, v) in self.0.payload.iter() {
            s.field(k.as_str(), v);
        }
        s.finish()
    }
}
