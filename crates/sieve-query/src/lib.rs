//! Projection and filter definitions.
//!
//! Paths are normalized once (`a[0].b` becomes `a.0.b`) and indexed into a
//! [`PathIndex`] trie so the engine can classify each field in constant
//! time while it walks a document.

mod compare;
mod error;
mod eval;
mod expression;
mod index;
mod parse_filter;
mod path;
mod projection;

pub use compare::{compare, values_equal};
pub use error::QueryError;
pub use eval::ValueMap;
pub use expression::{Condition, Expression, Filter};
pub use index::{PathIndex, PathNode};
pub use path::{normalize_path, split_path};
pub use projection::{Mode, Projection};
