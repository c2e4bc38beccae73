//! Stream operators.
use crate::{
    error::Error,
    stream::{Observable, Observer, Subscriber},
};
use kyute_common::Data;
use std::{cell::RefCell, rc::Rc};

/// Forwards the terminal signals of an upstream to a downstream subscriber, and lets the
/// operator decide what to do with the values.
struct Forward<U, F> {
    downstream: Subscriber<U>,
    on_next: F,
}

impl<T, U: 'static, F> Observer<T> for Forward<U, F>
where
    F: Fn(&Subscriber<U>, &T),
{
    fn next(&self, value: &T) {
        (self.on_next)(&self.downstream, value)
    }

    fn error(&self, error: &Error) {
        self.downstream.error(error)
    }

    fn complete(&self) {
        self.downstream.complete()
    }
}

impl<T: 'static> Observable<T> {
    /// Creates an observable that subscribes to `self` for each of its subscribers, and passes the
    /// upstream values to `on_next` along with the downstream subscriber.
    ///
    /// `make_on_next` is called once per subscription, so that operators can keep
    /// per-subscription state.
    fn lift<U: 'static, F>(&self, make_on_next: impl Fn() -> F + 'static) -> Observable<U>
    where
        F: Fn(&Subscriber<U>, &T) + 'static,
    {
        let source = self.clone();
        Observable::new(move |downstream: Subscriber<U>| {
            let upstream = source.subscribe(Forward {
                downstream: downstream.clone(),
                on_next: make_on_next(),
            });
            downstream.add_teardown(move || upstream.unsubscribe());
        })
    }

    /// Applies a function to each value.
    pub fn map<U: 'static>(&self, f: impl Fn(&T) -> U + 'static) -> Observable<U> {
        let f = Rc::new(f);
        self.lift(move || {
            let f = f.clone();
            move |downstream: &Subscriber<U>, value: &T| downstream.next(&f(value))
        })
    }

    /// Only forwards the values for which `predicate` returns true.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + 'static) -> Observable<T> {
        let predicate = Rc::new(predicate);
        self.lift(move || {
            let predicate = predicate.clone();
            move |downstream: &Subscriber<T>, value: &T| {
                if predicate(value) {
                    downstream.next(value)
                }
            }
        })
    }
}

impl<T: Data> Observable<T> {
    /// Suppresses values that are the `same` as the previous one.
    ///
    /// The first value is always forwarded.
    pub fn distinct_until_changed(&self) -> Observable<T> {
        self.lift(|| {
            let last: RefCell<Option<T>> = RefCell::new(None);
            move |downstream: &Subscriber<T>, value: &T| {
                {
                    let mut last = last.borrow_mut();
                    if let Some(ref last) = *last {
                        if last.same(value) {
                            return;
                        }
                    }
                    *last = Some(value.clone());
                }
                downstream.next(value)
            }
        })
    }
}
