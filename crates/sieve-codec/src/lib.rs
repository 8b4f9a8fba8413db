//! Streaming BSON codec used by the projection engine.
//!
//! The [`Reader`] walks a document forward without materializing it, the
//! [`Writer`] appends a new document with back-patched container lengths
//! and O(1) mark/rewind, and [`Value`] is the materialized form used when
//! a value has to be inspected (filter evaluation, fixtures).

mod element;
mod error;
mod reader;
mod sink;
mod source;
mod value;
mod writer;

pub use bson::spec::ElementType;
pub use element::is_container;
pub use error::CodecError;
pub use reader::{DEFAULT_MAX_DEPTH, Reader};
pub use sink::{CellSink, Sink};
pub use source::Source;
pub use value::{Document, Value};
pub use writer::{Mark, MarkGuard, Writer};
