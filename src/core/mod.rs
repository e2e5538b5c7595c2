//! Core NFS-e domain: types, field normalization, service aggregation,
//! batch construction, and municipality business rules.
//!
//! Everything here is pure computation — no I/O, no XML. The ABRASF wire
//! formats live in the `xml` module.

mod aggregate;
mod builder;
mod error;
mod normalize;
mod rules;
mod schema;
mod types;

pub use aggregate::*;
pub use builder::*;
pub use error::*;
pub use normalize::*;
pub use rules::*;
pub use schema::*;
pub use types::*;
