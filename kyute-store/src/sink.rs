use crate::{
    action::Action,
    config::TerminatedDispatch,
    error::{Error, Lifecycle, SharedError},
    state::State,
    stream::{Observable, Subject},
};
use std::fmt;
use tracing::{trace, warn};

/// Write-only side of a store: pushes actions and terminal signals into the action stream.
#[derive(Clone)]
pub struct ActionSink {
    actions: Subject<Action>,
    state: State,
    policy: TerminatedDispatch,
}

impl fmt::Debug for ActionSink {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ActionSink")
            .field("lifecycle", &self.lifecycle())
            .field("policy", &self.policy)
            .finish()
    }
}

impl ActionSink {
    pub(crate) fn new(actions: Subject<Action>, state: State, policy: TerminatedDispatch) -> ActionSink {
        ActionSink { actions, state, policy }
    }

    /// Returns the stream of dispatched actions.
    ///
    /// The state subscribes to the action stream first, so observers of this stream see each
    /// action after it has been folded: reading the state from the callback gives the state the
    /// action produced. Unlike `State::scanned_actions`, this stream also carries the action that
    /// made a reducer fail.
    pub fn actions(&self) -> Observable<Action> {
        self.actions.as_observable()
    }

    /// Returns `Erred` or `Completed` once either the action stream or the state stream has
    /// terminated (a failing reducer terminates the state stream).
    pub fn lifecycle(&self) -> Lifecycle {
        match self.actions.lifecycle() {
            Lifecycle::Active => self.state.lifecycle(),
            terminated => terminated,
        }
    }

    /// Checks that actions can still be dispatched.
    ///
    /// Returns `Ok(false)` if the sink has terminated and the policy is to ignore dispatches.
    pub(crate) fn ensure_active(&self) -> Result<bool, Error> {
        match self.lifecycle() {
            Lifecycle::Active => Ok(true),
            lifecycle => match self.policy {
                TerminatedDispatch::Reject => Err(Error::Terminated(lifecycle)),
                TerminatedDispatch::Ignore => {
                    warn!("action stream has {lifecycle}, dispatch ignored");
                    Ok(false)
                }
            },
        }
    }

    /// Pushes an action into the action stream.
    ///
    /// Reducers and observers run synchronously before this returns. Fails if the action has an
    /// empty type, or (depending on the configured policy) if the stream has terminated.
    pub fn dispatch(&self, action: Action) -> Result<(), Error> {
        if action.kind().is_empty() {
            return Err(Error::UntypedAction);
        }
        if !self.ensure_active()? {
            return Ok(());
        }
        trace!(action = %action.kind(), "dispatch");
        self.actions.next(&action);
        Ok(())
    }

    /// Terminates the action stream with an error. The state stream and every projection of it
    /// terminate with `Error::Upstream`.
    pub fn signal_failure(&self, error: anyhow::Error) {
        warn!("action stream failed: {error:#}");
        self.actions.error(Error::Upstream(SharedError::new(error)));
    }

    /// Completes the action stream. The state stream and every projection of it complete.
    pub fn signal_completion(&self) {
        trace!("action stream completed");
        self.actions.complete();
    }
}
