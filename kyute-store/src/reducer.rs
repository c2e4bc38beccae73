//! Reducers and the reducer registry.
use crate::{
    action::Action,
    error::{Error, SharedError},
    value::{Map, Value},
};
use kyute_common::{Atom, Data};
use std::{fmt, rc::Rc};
use tracing::{debug, error};

/// Folds an action into a state slice.
///
/// Receives `Value::Undefined` when the slice doesn't exist yet, in which case it must return the
/// initial slice. It must return the previous slice itself (not a copy) when the action doesn't
/// concern it.
pub type Reducer = Rc<dyn Fn(&Value, &Action) -> anyhow::Result<Value>>;

/// Folds an action into the whole state tree.
pub type RootReducer = Rc<dyn Fn(&Value, &Action) -> Result<Value, Error>>;

/// Wraps the root reducer to add behavior around it.
pub type MetaReducer = Rc<dyn Fn(RootReducer) -> RootReducer>;

/// Creates a reducer from a closure.
pub fn reducer_fn(f: impl Fn(&Value, &Action) -> anyhow::Result<Value> + 'static) -> Reducer {
    Rc::new(f)
}

/// Creates a meta-reducer from a closure.
pub fn meta_reducer_fn(f: impl Fn(RootReducer) -> RootReducer + 'static) -> MetaReducer {
    Rc::new(f)
}

#[derive(Clone)]
struct Entry {
    key: Atom,
    reducer: Reducer,
    initial_state: Option<Value>,
}

/// Combines keyed reducers into a root reducer.
///
/// The resulting state is a map with exactly one entry per reducer key. If no slice changed and
/// no key was added or removed, the previous state is returned as-is.
fn combine(entries: Rc<[Entry]>) -> RootReducer {
    Rc::new(move |state: &Value, action: &Action| {
        let empty = Map::new();
        let prev = state.as_map().unwrap_or(&empty);
        let mut next = Map::new();
        let mut changed = !matches!(state, Value::Map(_)) || prev.len() != entries.len();

        for entry in entries.iter() {
            let prev_slice = match prev.get(&entry.key) {
                Some(slice) => slice.clone(),
                None => {
                    changed = true;
                    entry.initial_state.clone().unwrap_or_default()
                }
            };
            let next_slice = (entry.reducer)(&prev_slice, action).map_err(|err| {
                error!(key = %entry.key, action = %action.kind(), "reducer failed: {err:#}");
                Error::Reducer {
                    key: entry.key.clone(),
                    action: action.kind().clone(),
                    source: SharedError::new(err),
                }
            })?;
            changed |= !next_slice.same(&prev_slice);
            next.insert(entry.key.clone(), next_slice);
        }

        if changed {
            Ok(next.into())
        } else {
            Ok(state.clone())
        }
    })
}

/// The set of reducers of a store.
///
/// Reducers are kept in registration order, which is also the order in which they run.
/// Every change to the set bumps the generation counter and rebuilds the root reducer.
pub struct ReducerRegistry {
    entries: Vec<Entry>,
    meta_reducers: Vec<MetaReducer>,
    generation: u64,
    root: RootReducer,
}

impl fmt::Debug for ReducerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ReducerRegistry")
            .field("keys", &self.entries.iter().map(|e| e.key.as_str()).collect::<Vec<_>>())
            .field("meta_reducers", &self.meta_reducers.len())
            .field("generation", &self.generation)
            .finish()
    }
}

impl Default for ReducerRegistry {
    fn default() -> Self {
        ReducerRegistry::new(Vec::new())
    }
}

impl ReducerRegistry {
    /// Creates an empty registry with the specified meta-reducers.
    ///
    /// The first meta-reducer is the outermost one.
    pub fn new(meta_reducers: Vec<MetaReducer>) -> ReducerRegistry {
        let mut registry = ReducerRegistry {
            entries: Vec::new(),
            meta_reducers,
            generation: 0,
            root: combine(Rc::from(Vec::new())),
        };
        registry.rebuild();
        registry
    }

    fn rebuild(&mut self) {
        let combined = combine(self.entries.iter().cloned().collect());
        self.root = self
            .meta_reducers
            .iter()
            .rev()
            .fold(combined, |reducer, meta| meta(reducer));
    }

    /// Returns the current root reducer.
    pub fn root(&self) -> RootReducer {
        self.root.clone()
    }

    /// Incremented every time the set of reducers changes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn keys(&self) -> impl Iterator<Item = &Atom> + '_ {
        self.entries.iter().map(|e| &e.key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, key: Atom, reducer: Reducer, initial_state: Option<Value>) {
        let entry = Entry {
            key: key.clone(),
            reducer,
            initial_state,
        };
        if let Some(existing) = self.entries.iter_mut().find(|e| e.key == key) {
            debug!(%key, "replacing reducer");
            *existing = entry;
        } else {
            debug!(%key, "adding reducer");
            self.entries.push(entry);
        }
    }

    /// Registers a reducer, replacing any reducer previously registered under the same key.
    pub fn add(&mut self, key: impl Into<Atom>, reducer: Reducer) {
        self.add_many([(key.into(), reducer, None)]);
    }

    /// Registers a reducer whose slice starts at `initial_state` instead of `Undefined`.
    pub fn add_with_initial_state(&mut self, key: impl Into<Atom>, reducer: Reducer, initial_state: Value) {
        self.add_many([(key.into(), reducer, Some(initial_state))]);
    }

    /// Registers several reducers at once. Bumps the generation once.
    pub fn add_many(&mut self, reducers: impl IntoIterator<Item = (Atom, Reducer, Option<Value>)>) {
        for (key, reducer, initial_state) in reducers {
            self.insert(key, reducer, initial_state);
        }
        self.generation += 1;
        self.rebuild();
    }

    /// Unregisters reducers. Returns the keys that were actually registered, in the order
    /// they were requested.
    pub fn remove_many<'a>(&mut self, keys: impl IntoIterator<Item = &'a str>) -> Vec<Atom> {
        let mut removed = Vec::new();
        for key in keys {
            if let Some(index) = self.entries.iter().position(|e| e.key == key) {
                debug!(%key, "removing reducer");
                removed.push(self.entries.remove(index).key);
            }
        }
        if !removed.is_empty() {
            self.generation += 1;
            self.rebuild();
        }
        removed
    }

    /// Unregisters the reducer at `key`. Returns whether it existed.
    pub fn remove(&mut self, key: &str) -> bool {
        !self.remove_many([key]).is_empty()
    }
}
