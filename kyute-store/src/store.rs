use crate::{
    action::{Action, INIT, UPDATE},
    config::StoreConfig,
    error::{Error, Lifecycle},
    reducer::{MetaReducer, Reducer, ReducerRegistry},
    select::{Path, SelectorArg},
    sink::ActionSink,
    state::State,
    stream::{Observable, Subject},
    value::Value,
};
use kyute_common::{Atom, Data};
use std::{cell::RefCell, fmt, rc::Rc};
use tracing::{debug, warn};

/// Builds a [`Store`].
#[derive(Default)]
pub struct StoreBuilder {
    config: StoreConfig,
    reducers: Vec<(Atom, Reducer, Option<Value>)>,
    meta_reducers: Vec<MetaReducer>,
}

impl StoreBuilder {
    pub fn new() -> StoreBuilder {
        StoreBuilder::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: StoreConfig) -> StoreBuilder {
        self.config = config;
        self
    }

    /// Sets the state before the `INIT` action.
    #[must_use]
    pub fn initial_state(mut self, state: Value) -> StoreBuilder {
        self.config.initial_state = state;
        self
    }

    #[must_use]
    pub fn reducer(mut self, key: impl Into<Atom>, reducer: Reducer) -> StoreBuilder {
        self.reducers.push((key.into(), reducer, None));
        self
    }

    #[must_use]
    pub fn reducer_with_initial_state(mut self, key: impl Into<Atom>, reducer: Reducer, initial_state: Value) -> StoreBuilder {
        self.reducers.push((key.into(), reducer, Some(initial_state)));
        self
    }

    /// Adds a meta-reducer. Meta-reducers added first wrap the ones added later.
    #[must_use]
    pub fn meta_reducer(mut self, meta_reducer: MetaReducer) -> StoreBuilder {
        self.meta_reducers.push(meta_reducer);
        self
    }

    /// Creates the store and dispatches the `INIT` action.
    pub fn build(self) -> Store {
        let mut registry = ReducerRegistry::new(self.meta_reducers);
        if !self.reducers.is_empty() {
            registry.add_many(self.reducers);
        }
        let registry = Rc::new(RefCell::new(registry));

        let actions = Subject::new();
        let state = State::new(self.config.initial_state, registry.clone(), &actions.as_observable());
        let sink = ActionSink::new(actions, state.clone(), self.config.dispatch_after_termination);
        let store = Store { sink, state, registry };

        debug!(reducers = store.registry.borrow().len(), "store created");
        if let Err(err) = store.dispatch(Action::new(INIT)) {
            warn!("failed to dispatch {INIT}: {err}");
        }
        store
    }
}

/// A reactive state container.
///
/// Actions dispatched to the store are folded by the registered reducers into a single state tree,
/// with one slice per reducer key. Observers subscribe to projections of the state with the
/// `select` methods, which only emit when the selected value changes.
///
/// A `Store` combines two capabilities that can be handed out separately:
/// the read-only [`State`] and the write-only [`ActionSink`]. Clones share the same state.
#[derive(Clone)]
pub struct Store {
    sink: ActionSink,
    state: State,
    registry: Rc<RefCell<ReducerRegistry>>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state)
            .field("registry", &*self.registry.borrow())
            .finish()
    }
}

impl Default for Store {
    fn default() -> Self {
        Store::new(StoreConfig::default())
    }
}

impl Store {
    /// Creates a store without reducers.
    pub fn new(config: StoreConfig) -> Store {
        StoreBuilder::new().with_config(config).build()
    }

    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    //----------------------------------------------------------------------------------------------
    // Actions

    /// Dispatches an action. See [`ActionSink::dispatch`].
    pub fn dispatch(&self, action: Action) -> Result<(), Error> {
        self.sink.dispatch(action)
    }

    /// Terminates the action stream with an error.
    pub fn signal_failure(&self, error: anyhow::Error) {
        self.sink.signal_failure(error)
    }

    /// Completes the action stream.
    pub fn signal_completion(&self) {
        self.sink.signal_completion()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.sink.lifecycle()
    }

    /// Returns the write-only side of the store.
    pub fn sink(&self) -> ActionSink {
        self.sink.clone()
    }

    /// Returns the stream of dispatched actions. See [`ActionSink::actions`].
    pub fn actions(&self) -> Observable<Action> {
        self.sink.actions()
    }

    /// Returns the stream of actions, emitted after the state they produced.
    pub fn scanned_actions(&self) -> Observable<Action> {
        self.state.scanned_actions()
    }

    //----------------------------------------------------------------------------------------------
    // Reducers

    fn reducers_updated(&self, keys: Vec<Atom>) -> Result<(), Error> {
        let features: Vec<Value> = keys.into_iter().map(Value::from).collect();
        self.sink.dispatch(Action::new(UPDATE).with("features", features))
    }

    /// Registers a reducer under `key`, replacing any previous reducer for that key.
    ///
    /// The slice appears in the state emitted right after the registration.
    pub fn add_reducer(&self, key: impl Into<Atom>, reducer: Reducer) -> Result<(), Error> {
        self.add_reducers([(key.into(), reducer)])
    }

    /// Same as `add_reducer`, but the slice starts at `initial_state` instead of `Undefined`.
    pub fn add_reducer_with_initial_state(&self, key: impl Into<Atom>, reducer: Reducer, initial_state: Value) -> Result<(), Error> {
        if !self.sink.ensure_active()? {
            return Ok(());
        }
        let key = key.into();
        self.registry
            .borrow_mut()
            .add_with_initial_state(key.clone(), reducer, initial_state);
        self.reducers_updated(vec![key])
    }

    /// Registers several reducers, with a single state update.
    pub fn add_reducers<K: Into<Atom>>(&self, reducers: impl IntoIterator<Item = (K, Reducer)>) -> Result<(), Error> {
        if !self.sink.ensure_active()? {
            return Ok(());
        }
        let reducers: Vec<_> = reducers.into_iter().map(|(k, r)| (k.into(), r, None)).collect();
        let keys = reducers.iter().map(|(k, _, _)| k.clone()).collect();
        self.registry.borrow_mut().add_many(reducers);
        self.reducers_updated(keys)
    }

    /// Unregisters the reducer at `key`.
    ///
    /// The slice is absent from the state emitted right after the removal. Does nothing if there
    /// is no reducer at `key`.
    pub fn remove_reducer(&self, key: &str) -> Result<(), Error> {
        self.remove_reducers([key])
    }

    /// Unregisters several reducers, with a single state update.
    ///
    /// The `features` field of the `UPDATE` action only lists the keys that were registered.
    pub fn remove_reducers<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> Result<(), Error> {
        if !self.sink.ensure_active()? {
            return Ok(());
        }
        let removed = self.registry.borrow_mut().remove_many(keys);
        if removed.is_empty() {
            return Ok(());
        }
        self.reducers_updated(removed)
    }

    /// Incremented every time reducers are added or removed.
    pub fn reducer_generation(&self) -> u64 {
        self.registry.borrow().generation()
    }

    //----------------------------------------------------------------------------------------------
    // State

    /// Returns the read-only side of the store.
    pub fn state(&self) -> State {
        self.state.clone()
    }

    /// Returns the current state.
    pub fn snapshot(&self) -> Value {
        self.state.snapshot()
    }

    /// Projects the state with a path or a mapping function.
    ///
    /// Fails immediately if `first` is neither a property name nor a function, or if a function
    /// is followed by path keys.
    pub fn select(&self, first: impl Into<SelectorArg>, rest: &[&str]) -> Result<Observable<Value>, Error> {
        self.state.as_observable().select(first, rest)
    }

    /// Projects the state with an arbitrary-length path.
    pub fn select_path(&self, path: impl Into<Path>) -> Observable<Value> {
        self.state.as_observable().select_path(path)
    }

    pub fn select1(&self, key: impl Into<Atom>) -> Observable<Value> {
        self.state.as_observable().select1(key)
    }

    pub fn select2(&self, key1: impl Into<Atom>, key2: impl Into<Atom>) -> Observable<Value> {
        self.state.as_observable().select2(key1, key2)
    }

    pub fn select3(&self, key1: impl Into<Atom>, key2: impl Into<Atom>, key3: impl Into<Atom>) -> Observable<Value> {
        self.state.as_observable().select3(key1, key2, key3)
    }

    /// Projects the state with a pure function.
    pub fn select_with<U: Data>(&self, f: impl Fn(&Value) -> U + 'static) -> Observable<U> {
        self.state.as_observable().select_with(f)
    }
}
