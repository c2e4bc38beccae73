//! Reactive state container.
//!
//! A [`Store`] holds a single immutable state tree, made of one slice per registered reducer.
//! Dispatched [actions](Action) are folded by the reducers into a new tree, which is pushed to
//! every subscribed projection. Projections (`select*`) only emit when the value they select
//! actually changed, according to [`Data::same`].
//!
//! ```
//! use kyute_store::{reducer_fn, Action, Store, Value};
//!
//! let store = Store::builder()
//!     .reducer(
//!         "counter",
//!         reducer_fn(|state, action| {
//!             let count = state.as_i64().unwrap_or(0);
//!             Ok(if action.is("INC") { Value::Int(count + 1) } else { Value::Int(count) })
//!         }),
//!     )
//!     .build();
//!
//! let _sub = store.select1("counter").subscribe_fn(|v| println!("counter: {v:?}"));
//! store.dispatch(Action::new("INC")).unwrap();
//! assert_eq!(store.snapshot().property("counter"), Value::Int(1));
//! ```
mod action;
mod config;
mod error;
mod memo;
mod reducer;
mod select;
mod sink;
mod state;
mod store;
pub mod stream;
mod value;

pub use action::{Action, INIT, UPDATE};
pub use config::{StoreConfig, TerminatedDispatch};
pub use error::{Error, Lifecycle, SharedError};
pub use kyute_common::{Atom, Data};
pub use memo::{memoize, memoize2, memoize3, Memoized};
pub use reducer::{meta_reducer_fn, reducer_fn, MetaReducer, Reducer, ReducerRegistry, RootReducer};
pub use select::{select, MapFn, Path, Selector, SelectorArg};
pub use sink::ActionSink;
pub use state::State;
pub use store::{Store, StoreBuilder};
pub use value::{Map, Value};
