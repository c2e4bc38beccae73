use crate::{
    error::{Error, Lifecycle},
    stream::{Observable, Subscriber},
};
use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

enum Status {
    Active,
    Erred(Error),
    Completed,
}

impl Status {
    fn lifecycle(&self) -> Lifecycle {
        match self {
            Status::Active => Lifecycle::Active,
            Status::Erred(_) => Lifecycle::Erred,
            Status::Completed => Lifecycle::Completed,
        }
    }
}

struct SubjectInner<T> {
    observers: RefCell<Vec<Subscriber<T>>>,
    status: RefCell<Status>,
}

/// A hot stream that multicasts the values pushed into it.
///
/// Observers receive the values in subscription order. Subscribers that join after the subject
/// terminated immediately receive the terminal signal.
pub struct Subject<T> {
    inner: Rc<SubjectInner<T>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Subject {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Subject")
            .field("observers", &self.inner.observers.borrow().len())
            .field("lifecycle", &self.inner.status.borrow().lifecycle())
            .finish()
    }
}

impl<T: 'static> Default for Subject<T> {
    fn default() -> Self {
        Subject::new()
    }
}

impl<T: 'static> Subject<T> {
    pub fn new() -> Subject<T> {
        Subject {
            inner: Rc::new(SubjectInner {
                observers: RefCell::new(Vec::new()),
                status: RefCell::new(Status::Active),
            }),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.status.borrow().lifecycle()
    }

    /// Number of active observers.
    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    /// Emits a value to all current observers. Does nothing if the subject has terminated.
    pub fn next(&self, value: &T) {
        if self.lifecycle().is_terminated() {
            return;
        }
        // observers may subscribe or unsubscribe while we're emitting: iterate over a snapshot
        let observers = self.inner.observers.borrow().clone();
        for observer in observers.iter() {
            observer.next(value);
        }
    }

    /// Terminates the subject with an error.
    pub fn error(&self, error: Error) {
        if self.lifecycle().is_terminated() {
            return;
        }
        *self.inner.status.borrow_mut() = Status::Erred(error.clone());
        let observers = self.inner.observers.take();
        for observer in observers.iter() {
            observer.error(&error);
        }
    }

    /// Terminates the subject normally.
    pub fn complete(&self) {
        if self.lifecycle().is_terminated() {
            return;
        }
        *self.inner.status.borrow_mut() = Status::Completed;
        let observers = self.inner.observers.take();
        for observer in observers.iter() {
            observer.complete();
        }
    }

    /// Adds an observer, or delivers the terminal signal if the subject has terminated.
    fn add(&self, subscriber: Subscriber<T>) {
        let terminal = match &*self.inner.status.borrow() {
            Status::Active => None,
            Status::Erred(error) => Some(Some(error.clone())),
            Status::Completed => Some(None),
        };
        match terminal {
            None => {}
            Some(Some(error)) => return subscriber.error(&error),
            Some(None) => return subscriber.complete(),
        }

        if subscriber.is_closed() {
            return;
        }
        self.inner.observers.borrow_mut().push(subscriber.clone());
        let weak: Weak<SubjectInner<T>> = Rc::downgrade(&self.inner);
        let this = subscriber.clone();
        subscriber.add_teardown(move || {
            if let Some(inner) = weak.upgrade() {
                inner.observers.borrow_mut().retain(|s| !s.ptr_eq(&this));
            }
        });
    }

    /// Returns the read side of this subject.
    pub fn as_observable(&self) -> Observable<T> {
        let subject = self.clone();
        Observable::new(move |subscriber| subject.add(subscriber))
    }
}

//--------------------------------------------------------------------------------------------------

/// A subject that holds a current value, and replays it to new subscribers.
pub struct BehaviorSubject<T> {
    subject: Subject<T>,
    value: Rc<RefCell<T>>,
}

impl<T> Clone for BehaviorSubject<T> {
    fn clone(&self) -> Self {
        BehaviorSubject {
            subject: self.subject.clone(),
            value: self.value.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for BehaviorSubject<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BehaviorSubject")
            .field("value", &*self.value.borrow())
            .field("subject", &self.subject)
            .finish()
    }
}

impl<T: Clone + 'static> BehaviorSubject<T> {
    pub fn new(initial: T) -> BehaviorSubject<T> {
        BehaviorSubject {
            subject: Subject::new(),
            value: Rc::new(RefCell::new(initial)),
        }
    }

    /// Returns the current value.
    pub fn value(&self) -> T {
        self.value.borrow().clone()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.subject.lifecycle()
    }

    pub fn observer_count(&self) -> usize {
        self.subject.observer_count()
    }

    /// Replaces the current value and emits it.
    pub fn next(&self, value: T) {
        if self.lifecycle().is_terminated() {
            return;
        }
        *self.value.borrow_mut() = value.clone();
        self.subject.next(&value);
    }

    pub fn error(&self, error: Error) {
        self.subject.error(error)
    }

    pub fn complete(&self) {
        self.subject.complete()
    }

    /// Returns the read side of this subject.
    ///
    /// Each subscriber first receives the current value, then every subsequent one.
    pub fn as_observable(&self) -> Observable<T> {
        let this = self.clone();
        Observable::new(move |subscriber: Subscriber<T>| {
            this.subject.add(subscriber.clone());
            if this.lifecycle() == Lifecycle::Active && !subscriber.is_closed() {
                let current = this.value();
                subscriber.next(&current);
            }
        })
    }
}
