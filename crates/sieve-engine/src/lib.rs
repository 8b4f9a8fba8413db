//! Single-pass projection and filtering over raw BSON.
//!
//! ```
//! use bson::rawdoc;
//! use sieve_engine::{Filter, Projection, Projector};
//!
//! let doc = rawdoc! { "name": "Ada", "age": 36_i32, "email": "ada@example.com" };
//! let projection = Projection::inclusive(["name"]).unwrap();
//! let filter = Filter::parse(&rawdoc! { "age": { "$gte": 18_i32 } }).unwrap();
//!
//! let out = Projector::new()
//!     .project(doc.as_bytes(), Some(&projection), Some(&filter))
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(out, rawdoc! { "name": "Ada" }.into_bytes());
//! ```

mod config;
mod error;
mod projector;
mod walker;

pub use config::ProjectorConfig;
pub use error::EngineError;
pub use projector::Projector;
pub use sieve_query::{Filter, Mode, Projection};
