//! Request-path routing: choose a usable endpoint for an operation

mod selector;

pub use selector::{FirstPick, PickStrategy, RandomPick, Selector};
