//! Memoized selectors.
//!
//! A memoized selector combines one or more *input* selectors with a *projector*. The projector
//! only runs when the state argument changed and at least one of the inputs changed, as
//! determined by `Data::same`. This makes expensive derivations cheap to re-evaluate on every
//! state transition.
use kyute_common::Data;
use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};
use tracing::trace;

struct Cached<S, I, T> {
    state: S,
    inputs: I,
    result: T,
}

struct MemoInner<S, I, T> {
    inputs: Box<dyn Fn(&S) -> I>,
    projector: Box<dyn Fn(&I) -> T>,
    cached: RefCell<Option<Cached<S, I, T>>>,
    recomputations: Cell<usize>,
}

/// A selector that caches its last result.
///
/// `S` is the state type, `T` the result. Clones share the same cache.
pub struct Memoized<S, T> {
    call_fn: Rc<dyn Fn(&S) -> T>,
    release_fn: Rc<dyn Fn()>,
    recomputations_fn: Rc<dyn Fn() -> usize>,
}

impl<S, T> Clone for Memoized<S, T> {
    fn clone(&self) -> Self {
        Memoized {
            call_fn: self.call_fn.clone(),
            release_fn: self.release_fn.clone(),
            recomputations_fn: self.recomputations_fn.clone(),
        }
    }
}

impl<S, T> fmt::Debug for Memoized<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("recomputations", &(self.recomputations_fn)())
            .finish_non_exhaustive()
    }
}

impl<S: Data, T: Clone + 'static> Memoized<S, T> {
    fn from_parts<I: Data>(inputs: impl Fn(&S) -> I + 'static, projector: impl Fn(&I) -> T + 'static) -> Memoized<S, T> {
        let inner = Rc::new(MemoInner {
            inputs: Box::new(inputs),
            projector: Box::new(projector),
            cached: RefCell::new(None),
            recomputations: Cell::new(0),
        });

        let call_inner = inner.clone();
        let release_inner = inner.clone();
        Memoized {
            call_fn: Rc::new(move |state: &S| call_inner.call(state)),
            release_fn: Rc::new(move || {
                release_inner.cached.take();
            }),
            recomputations_fn: Rc::new(move || inner.recomputations.get()),
        }
    }

    /// Evaluates the selector.
    pub fn call(&self, state: &S) -> T {
        (self.call_fn)(state)
    }

    /// Forgets the cached result.
    pub fn release(&self) {
        (self.release_fn)()
    }

    /// Number of times the projector has run.
    pub fn recomputations(&self) -> usize {
        (self.recomputations_fn)()
    }

    /// Converts into a plain function, e.g. for `Observable::select_with`.
    pub fn into_fn(self) -> impl Fn(&S) -> T + 'static {
        move |state: &S| self.call(state)
    }
}

impl<S: Data, I: Data, T: Clone + 'static> MemoInner<S, I, T> {
    fn call(&self, state: &S) -> T {
        if let Some(cached) = &*self.cached.borrow() {
            if cached.state.same(state) {
                return cached.result.clone();
            }
        }

        let inputs = (self.inputs)(state);
        {
            let mut cached = self.cached.borrow_mut();
            if let Some(cached) = &mut *cached {
                if cached.inputs.same(&inputs) {
                    trace!("memoized selector: inputs unchanged");
                    cached.state = state.clone();
                    return cached.result.clone();
                }
            }
        }

        let result = (self.projector)(&inputs);
        self.recomputations.set(self.recomputations.get() + 1);
        *self.cached.borrow_mut() = Some(Cached {
            state: state.clone(),
            inputs,
            result: result.clone(),
        });
        result
    }
}

/// Creates a memoized selector from one input selector.
pub fn memoize<S, A, T>(input: impl Fn(&S) -> A + 'static, projector: impl Fn(&A) -> T + 'static) -> Memoized<S, T>
where
    S: Data,
    A: Data,
    T: Clone + 'static,
{
    Memoized::from_parts(move |s: &S| (input(s),), move |(a,): &(A,)| projector(a))
}

/// Creates a memoized selector from two input selectors.
pub fn memoize2<S, A, B, T>(
    a: impl Fn(&S) -> A + 'static,
    b: impl Fn(&S) -> B + 'static,
    projector: impl Fn(&A, &B) -> T + 'static,
) -> Memoized<S, T>
where
    S: Data,
    A: Data,
    B: Data,
    T: Clone + 'static,
{
    Memoized::from_parts(move |s: &S| (a(s), b(s)), move |(a, b): &(A, B)| projector(a, b))
}

/// Creates a memoized selector from three input selectors.
pub fn memoize3<S, A, B, C, T>(
    a: impl Fn(&S) -> A + 'static,
    b: impl Fn(&S) -> B + 'static,
    c: impl Fn(&S) -> C + 'static,
    projector: impl Fn(&A, &B, &C) -> T + 'static,
) -> Memoized<S, T>
where
    S: Data,
    A: Data,
    B: Data,
    C: Data,
    T: Clone + 'static,
{
    Memoized::from_parts(
        move |s: &S| (a(s), b(s), c(s)),
        move |(a, b, c): &(A, B, C)| projector(a, b, c),
    )
}
