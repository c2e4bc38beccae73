//! Single-threaded push streams.
//!
//! An [`Observable`] is a recipe for producing values: each call to `subscribe` runs the recipe
//! again for the new subscriber. [`Subject`] and [`BehaviorSubject`] are the hot, multicast
//! sources that the store is built from.
//!
//! Everything runs synchronously on the calling thread: emitting a value runs every downstream
//! observer before `next` returns.
mod operators;
mod subject;

pub use subject::{BehaviorSubject, Subject};

use crate::error::Error;
use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};
use tracing::warn;

/// Receives the signals of a stream.
pub trait Observer<T> {
    fn next(&self, value: &T);
    fn error(&self, error: &Error);
    fn complete(&self);
}

//--------------------------------------------------------------------------------------------------
// Closure observer

/// An observer built from closures.
pub struct ObserverFn<T> {
    next: Box<dyn Fn(&T)>,
    error: Option<Box<dyn Fn(&Error)>>,
    complete: Option<Box<dyn Fn()>>,
}

impl<T> ObserverFn<T> {
    pub fn new(next: impl Fn(&T) + 'static) -> ObserverFn<T> {
        ObserverFn {
            next: Box::new(next),
            error: None,
            complete: None,
        }
    }

    #[must_use]
    pub fn on_error(mut self, f: impl Fn(&Error) + 'static) -> ObserverFn<T> {
        self.error = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_complete(mut self, f: impl Fn() + 'static) -> ObserverFn<T> {
        self.complete = Some(Box::new(f));
        self
    }
}

impl<T> Observer<T> for ObserverFn<T> {
    fn next(&self, value: &T) {
        (self.next)(value)
    }

    fn error(&self, error: &Error) {
        if let Some(ref f) = self.error {
            f(error)
        } else {
            warn!("unhandled stream error: {error}");
        }
    }

    fn complete(&self) {
        if let Some(ref f) = self.complete {
            f()
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Subscriber

struct SubscriberInner<T> {
    observer: Box<dyn Observer<T>>,
    closed: Cell<bool>,
    teardowns: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl<T> SubscriberInner<T> {
    fn close(&self) {
        if self.closed.replace(true) {
            return;
        }
        // teardowns may add other teardowns, which then run immediately since we're closed
        let teardowns = self.teardowns.take();
        for teardown in teardowns {
            teardown();
        }
    }
}

/// Observer wrapper handed to producers.
///
/// Once closed (by a terminal signal or by unsubscription), a subscriber ignores every signal.
pub struct Subscriber<T> {
    inner: Rc<SubscriberInner<T>>,
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Subscriber {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Subscriber<T> {
    fn new(observer: Box<dyn Observer<T>>) -> Subscriber<T> {
        Subscriber {
            inner: Rc::new(SubscriberInner {
                observer,
                closed: Cell::new(false),
                teardowns: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn next(&self, value: &T) {
        if !self.inner.closed.get() {
            self.inner.observer.next(value);
        }
    }

    pub fn error(&self, error: &Error) {
        if !self.inner.closed.get() {
            // close first, so that the observer can't receive anything after the error
            self.inner.close();
            self.inner.observer.error(error);
        }
    }

    pub fn complete(&self) {
        if !self.inner.closed.get() {
            self.inner.close();
            self.inner.observer.complete();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    /// Registers a function to run when this subscriber is closed.
    ///
    /// Runs it immediately if the subscriber is already closed.
    pub fn add_teardown(&self, teardown: impl FnOnce() + 'static) {
        if self.inner.closed.get() {
            teardown();
        } else {
            self.inner.teardowns.borrow_mut().push(Box::new(teardown));
        }
    }

    /// Returns whether both subscribers wrap the same observer.
    pub fn ptr_eq(&self, other: &Subscriber<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns a handle that can be used to cancel this subscriber.
    pub fn subscription(&self) -> Subscription {
        Subscription {
            inner: self.inner.clone(),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Subscription

trait Unsubscribe {
    fn unsubscribe(&self);
    fn is_closed(&self) -> bool;
}

impl<T> Unsubscribe for SubscriberInner<T> {
    fn unsubscribe(&self) {
        self.close()
    }

    fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

/// Handle to an active subscription.
///
/// Dropping the handle does *not* cancel the subscription: call `unsubscribe`.
#[must_use = "dropping a subscription doesn't cancel it; keep it to call `unsubscribe`"]
#[derive(Clone)]
pub struct Subscription {
    inner: Rc<dyn Unsubscribe>,
}

impl Subscription {
    /// Stops the delivery of signals and releases the resources held by the subscription.
    ///
    /// Can be called at any time, including from within the subscription's own observer.
    /// Subsequent calls do nothing.
    pub fn unsubscribe(&self) {
        self.inner.unsubscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Subscription").field("closed", &self.is_closed()).finish()
    }
}

//--------------------------------------------------------------------------------------------------
// Observable

/// A stream of values of type `T`.
pub struct Observable<T> {
    subscribe_fn: Rc<dyn Fn(Subscriber<T>)>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Observable {
            subscribe_fn: self.subscribe_fn.clone(),
        }
    }
}

impl<T> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Observable").finish_non_exhaustive()
    }
}

impl<T: 'static> Observable<T> {
    /// Creates an observable from a function that is called for each new subscriber.
    pub fn new(subscribe: impl Fn(Subscriber<T>) + 'static) -> Observable<T> {
        Observable {
            subscribe_fn: Rc::new(subscribe),
        }
    }

    /// Subscribes an observer to this stream.
    pub fn subscribe(&self, observer: impl Observer<T> + 'static) -> Subscription {
        let subscriber = Subscriber::new(Box::new(observer));
        (self.subscribe_fn)(subscriber.clone());
        subscriber.subscription()
    }

    /// Subscribes a closure receiving the values of this stream.
    ///
    /// Errors are logged.
    pub fn subscribe_fn(&self, next: impl Fn(&T) + 'static) -> Subscription {
        self.subscribe(ObserverFn::new(next))
    }
}
