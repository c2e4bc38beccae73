use crate::Data;
use std::{borrow::Borrow, fmt, ops::Deref};
use string_cache::DefaultAtom;

/// Interned strings. Typically used for names and string identifiers.
///
/// Property names in a state tree, reducer keys and action types are all atoms: comparing two
/// atoms is a pointer comparison in most cases.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Atom(DefaultAtom);

impl Atom {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Atom {
    type Target = DefaultAtom;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<str> for Atom {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Atom {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Data for Atom {
    fn same(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> From<T> for Atom
where
    DefaultAtom: From<T>,
{
    fn from(value: T) -> Self {
        Atom(DefaultAtom::from(value))
    }
}

impl PartialEq<str> for Atom {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl<'a> PartialEq<&'a str> for Atom {
    fn eq(&self, other: &&'a str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
