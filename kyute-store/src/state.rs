//! The state of a store.
use crate::{
    action::Action,
    error::{Error, Lifecycle},
    reducer::ReducerRegistry,
    stream::{BehaviorSubject, Observable, Observer, Subject, Subscription},
    value::Value,
};
use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    fmt,
    rc::{Rc, Weak},
};
use tracing::{trace, trace_span};

struct StateInner {
    registry: Rc<RefCell<ReducerRegistry>>,
    value: BehaviorSubject<Value>,
    scanned: Subject<Action>,
    pending: RefCell<VecDeque<Action>>,
    folding: Cell<bool>,
}

impl StateInner {
    /// Folds an action, and every action dispatched while folding it, in order.
    fn enqueue(&self, action: Action) {
        self.pending.borrow_mut().push_back(action);
        if self.folding.replace(true) {
            // dispatched from an observer: will be folded once the current emission returns
            trace!("fold in progress, action queued");
            return;
        }

        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(action) = next else { break };
            if self.value.lifecycle().is_terminated() {
                self.pending.borrow_mut().clear();
                break;
            }

            let _span = trace_span!("fold", action = %action.kind()).entered();
            let root = self.registry.borrow().root();
            let current = self.value.value();
            match root(&current, &action) {
                Ok(state) => {
                    trace!("emitting new state");
                    self.value.next(state);
                    self.scanned.next(&action);
                }
                Err(err) => {
                    self.pending.borrow_mut().clear();
                    self.value.error(err.clone());
                    self.scanned.error(err);
                    break;
                }
            }
        }

        self.folding.set(false);
    }
}

struct ActionObserver(Weak<StateInner>);

impl Observer<Action> for ActionObserver {
    fn next(&self, action: &Action) {
        if let Some(inner) = self.0.upgrade() {
            inner.enqueue(action.clone());
        }
    }

    fn error(&self, error: &Error) {
        if let Some(inner) = self.0.upgrade() {
            inner.value.error(error.clone());
            inner.scanned.error(error.clone());
        }
    }

    fn complete(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.value.complete();
            inner.scanned.complete();
        }
    }
}

/// Read-only view of the state of a store.
///
/// The state stream replays the current state to new subscribers, then emits after every action,
/// even if the state didn't change. Use the `select` family of methods to observe changes of
/// a part of the state.
#[derive(Clone)]
pub struct State {
    inner: Rc<StateInner>,
    _actions: Subscription,
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("State")
            .field("value", &self.inner.value.value())
            .field("lifecycle", &self.lifecycle())
            .finish_non_exhaustive()
    }
}

impl State {
    /// Creates the state and starts folding `actions` with the reducers in `registry`.
    pub(crate) fn new(initial: Value, registry: Rc<RefCell<ReducerRegistry>>, actions: &Observable<Action>) -> State {
        let inner = Rc::new(StateInner {
            registry,
            value: BehaviorSubject::new(initial),
            scanned: Subject::new(),
            pending: RefCell::new(VecDeque::new()),
            folding: Cell::new(false),
        });
        let actions = actions.subscribe(ActionObserver(Rc::downgrade(&inner)));
        State {
            inner,
            _actions: actions,
        }
    }

    /// Returns the stream of state snapshots.
    pub fn as_observable(&self) -> Observable<Value> {
        self.inner.value.as_observable()
    }

    /// Returns the current state.
    pub fn snapshot(&self) -> Value {
        self.inner.value.value()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.value.lifecycle()
    }

    /// Returns the stream of actions, emitted after the state they produced.
    pub fn scanned_actions(&self) -> Observable<Action> {
        self.inner.scanned.as_observable()
    }
}
