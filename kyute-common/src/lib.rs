//! Basic types shared by kyute crates.

mod atom;
mod data;

pub use crate::{
    atom::Atom,
    data::Data,
};
