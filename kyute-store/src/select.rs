//! Projections of a state stream.
//!
//! A selector is either a *path*, a sequence of property names looked up from the root of the
//! state, or a pure *mapping function* of the state. Selecting on a stream produces a derived
//! stream of the selected value, which only emits when that value changes (see
//! [`Data::same`](kyute_common::Data::same)). Derived streams are ordinary observables, so they
//! can be selected on again.
use crate::{error::Error, stream::Observable, value::Value};
use kyute_common::{Atom, Data};
use smallvec::SmallVec;
use std::{convert::Infallible, fmt, rc::Rc, str::FromStr};

/// A sequence of property names.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(SmallVec<[Atom; 4]>);

impl Path {
    pub fn new() -> Path {
        Path(SmallVec::new())
    }

    pub fn keys(&self) -> &[Atom] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends a property name.
    #[must_use]
    pub fn join(mut self, key: impl Into<Atom>) -> Path {
        self.0.push(key.into());
        self
    }

    /// Concatenates two paths.
    #[must_use]
    pub fn concat(mut self, other: &Path) -> Path {
        self.0.extend(other.0.iter().cloned());
        self
    }

    /// Looks up the path in `root`.
    ///
    /// Returns `Value::Undefined` as soon as a property is missing.
    pub fn resolve(&self, root: &Value) -> Value {
        let mut current = root;
        for key in self.0.iter() {
            match current.get(key) {
                Some(child) => current = child,
                None => return Value::Undefined,
            }
        }
        current.clone()
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Path({self})")
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(key)?;
        }
        Ok(())
    }
}

/// Parses a dot-separated path. Empty segments are ignored.
impl FromStr for Path {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.split('.').filter(|k| !k.is_empty()).collect())
    }
}

impl<K: Into<Atom>> FromIterator<K> for Path {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Path(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> From<&'a [&'a str]> for Path {
    fn from(keys: &'a [&'a str]) -> Self {
        keys.iter().copied().collect()
    }
}

impl<const N: usize> From<[&str; N]> for Path {
    fn from(keys: [&str; N]) -> Self {
        keys.into_iter().collect()
    }
}

impl From<Vec<Atom>> for Path {
    fn from(keys: Vec<Atom>) -> Self {
        Path(keys.into())
    }
}

//--------------------------------------------------------------------------------------------------

/// Mapping function over a dynamic state.
pub type MapFn = Rc<dyn Fn(&Value) -> Value>;

/// Primary argument of [`select`].
///
/// Hosts that build selectors from dynamic input (configuration, scripting) can pass arbitrary
/// values: anything that isn't a string is rejected when the selector is built.
#[derive(Clone)]
pub enum SelectorArg {
    /// First property name of a path.
    Key(Atom),
    /// Mapping function.
    Map(MapFn),
    /// Anything else. Always rejected.
    Other(Value),
}

impl SelectorArg {
    /// Wraps a mapping function.
    pub fn map(f: impl Fn(&Value) -> Value + 'static) -> SelectorArg {
        SelectorArg::Map(Rc::new(f))
    }

    /// Javascript `typeof` name of the argument, as reported in errors.
    fn type_name(&self) -> &'static str {
        match self {
            SelectorArg::Key(_) => "string",
            SelectorArg::Map(_) => "function",
            SelectorArg::Other(Value::Null | Value::List(_)) => "object",
            SelectorArg::Other(value) => value.type_name(),
        }
    }
}

impl fmt::Debug for SelectorArg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SelectorArg::Key(key) => f.debug_tuple("Key").field(key).finish(),
            SelectorArg::Map(_) => f.write_str("Map(..)"),
            SelectorArg::Other(value) => f.debug_tuple("Other").field(value).finish(),
        }
    }
}

impl From<&str> for SelectorArg {
    fn from(key: &str) -> Self {
        SelectorArg::Key(key.into())
    }
}

impl From<String> for SelectorArg {
    fn from(key: String) -> Self {
        SelectorArg::Key(key.into())
    }
}

impl From<Atom> for SelectorArg {
    fn from(key: Atom) -> Self {
        SelectorArg::Key(key)
    }
}

impl From<MapFn> for SelectorArg {
    fn from(f: MapFn) -> Self {
        SelectorArg::Map(f)
    }
}

impl From<Value> for SelectorArg {
    fn from(value: Value) -> Self {
        match value {
            Value::Str(s) => SelectorArg::Key(Atom::from(&*s)),
            other => SelectorArg::Other(other),
        }
    }
}

/// A validated selector.
#[derive(Clone)]
pub enum Selector {
    Path(Path),
    Map(MapFn),
}

impl Selector {
    /// Builds a selector from a primary argument and additional path keys.
    ///
    /// Fails if `first` is neither a key nor a function, or if a function is followed by keys.
    pub fn new<K: Into<Atom>>(first: impl Into<SelectorArg>, rest: impl IntoIterator<Item = K>) -> Result<Selector, Error> {
        match first.into() {
            SelectorArg::Key(key) => {
                let path = std::iter::once(key).chain(rest.into_iter().map(Into::into)).collect();
                Ok(Selector::Path(path))
            }
            SelectorArg::Map(f) => {
                let extra = rest.into_iter().count();
                if extra > 0 {
                    return Err(Error::MapFnWithPath { extra });
                }
                Ok(Selector::Map(f))
            }
            other => Err(Error::UnexpectedSelectorType {
                found: other.type_name(),
            }),
        }
    }

    /// Evaluates the selector on a state snapshot.
    pub fn apply(&self, state: &Value) -> Value {
        match self {
            Selector::Path(path) => path.resolve(state),
            Selector::Map(f) => f(state),
        }
    }

    /// Returns the derived, change-suppressed stream of the selected value.
    pub fn project(&self, source: &Observable<Value>) -> Observable<Value> {
        let selector = self.clone();
        source.map(move |state| selector.apply(state)).distinct_until_changed()
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Selector::Path(path) => fmt::Debug::fmt(path, f),
            Selector::Map(_) => f.write_str("Map(..)"),
        }
    }
}

impl From<Path> for Selector {
    fn from(path: Path) -> Self {
        Selector::Path(path)
    }
}

/// Builds a selector, to be applied later to a stream with [`Selector::project`].
///
/// This fails immediately, without subscribing to anything, if the arguments are invalid.
pub fn select(first: impl Into<SelectorArg>, rest: &[&str]) -> Result<Selector, Error> {
    Selector::new(first, rest.iter().copied())
}

//--------------------------------------------------------------------------------------------------

impl<T: Clone + 'static> Observable<T> {
    /// Projects each value with a pure function, and suppresses unchanged results.
    pub fn select_with<U: Data>(&self, f: impl Fn(&T) -> U + 'static) -> Observable<U> {
        self.map(f).distinct_until_changed()
    }
}

impl Observable<Value> {
    /// Projects the state with a path or a mapping function.
    ///
    /// See [`Selector::new`] for the possible errors.
    pub fn select(&self, first: impl Into<SelectorArg>, rest: &[&str]) -> Result<Observable<Value>, Error> {
        Ok(select(first, rest)?.project(self))
    }

    /// Projects the state with an arbitrary-length path.
    pub fn select_path(&self, path: impl Into<Path>) -> Observable<Value> {
        Selector::Path(path.into()).project(self)
    }

    /// Projects the value of a property.
    pub fn select1(&self, key: impl Into<Atom>) -> Observable<Value> {
        self.select_path(Path::new().join(key))
    }

    /// Projects the value at `key1.key2`.
    pub fn select2(&self, key1: impl Into<Atom>, key2: impl Into<Atom>) -> Observable<Value> {
        self.select_path(Path::new().join(key1).join(key2))
    }

    /// Projects the value at `key1.key2.key3`.
    pub fn select3(&self, key1: impl Into<Atom>, key2: impl Into<Atom>, key3: impl Into<Atom>) -> Observable<Value> {
        self.select_path(Path::new().join(key1).join(key2).join(key3))
    }
}

#[cfg(test)]
mod tests {
    use super::{select, Path, Selector, SelectorArg};
    use crate::{error::Error, stream::BehaviorSubject, value::Value};
    use serde_json::json;
    use std::{cell::RefCell, rc::Rc};

    fn collect(obs: &crate::stream::Observable<Value>) -> (Rc<RefCell<Vec<Value>>>, crate::stream::Subscription) {
        let values = Rc::new(RefCell::new(Vec::new()));
        let sink = values.clone();
        let sub = obs.subscribe_fn(move |v| sink.borrow_mut().push(v.clone()));
        (values, sub)
    }

    #[test]
    fn parse_and_display_paths() {
        let path: Path = "a.b..c".parse().unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.to_string(), "a.b.c");
        assert_eq!(Path::from(["a", "b"]).concat(&Path::from(["c"])), path);
    }

    #[test]
    fn rejects_non_string_non_function() {
        let err = select(Value::Int(42), &[]).unwrap_err();
        assert!(matches!(err, Error::UnexpectedSelectorType { found: "number" }));
        assert_eq!(
            err.to_string(),
            "unexpected type 'number' in select operator, expected 'string' or 'function'"
        );
        let err = select(Value::map(), &["x"]).unwrap_err();
        assert!(matches!(err, Error::UnexpectedSelectorType { found: "object" }));
        for arg in [Value::Null, Value::from(vec![Value::Int(1)])] {
            let err = select(arg, &[]).unwrap_err();
            assert!(matches!(err, Error::UnexpectedSelectorType { found: "object" }));
        }
        let err = select(Value::Bool(true), &[]).unwrap_err();
        assert!(matches!(err, Error::UnexpectedSelectorType { found: "boolean" }));
    }

    #[test]
    fn rejects_function_with_path() {
        let err = select(SelectorArg::map(|s| s.clone()), &["a"]).unwrap_err();
        assert!(matches!(err, Error::MapFnWithPath { extra: 1 }));
    }

    #[test]
    fn string_values_are_keys() {
        let selector = select(Value::from("a"), &["b"]).unwrap();
        let state = Value::from_json(json!({"a": {"b": 5}}));
        assert_eq!(selector.apply(&state), Value::Int(5));
    }

    #[test]
    fn missing_intermediates_resolve_to_undefined() {
        let state = BehaviorSubject::new(Value::from_json(json!({"a": null})));
        let (values, _sub) = collect(&state.as_observable().select3("a", "b", "c"));
        state.next(Value::from_json(json!({"a": {"b": {"c": 3}}})));
        state.next(Value::from_json(json!({})));
        assert_eq!(*values.borrow(), vec![Value::Undefined, Value::Int(3), Value::Undefined]);
    }

    #[test]
    fn function_selectors() {
        let state = BehaviorSubject::new(Value::from_json(json!({"items": [1, 2, 3]})));
        let count = Selector::Map(Rc::new(|s: &Value| {
            Value::from(s.property("items").as_list().map(|l| l.len() as i64).unwrap_or(0))
        }));
        let (values, _sub) = collect(&count.project(&state.as_observable()));
        state.next(Value::from_json(json!({"items": [4, 5, 6]})));
        state.next(Value::from_json(json!({"items": [4]})));
        assert_eq!(*values.borrow(), vec![Value::Int(3), Value::Int(1)]);
    }
}
