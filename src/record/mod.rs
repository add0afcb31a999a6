//! Raw upstream records and the resolved cells they flatten into.
//!
//! The ERP query API returns loosely-shaped JSON: a relational field may
//! arrive as a nested object, an `[id, label]` pair, a bare id, or the
//! boolean `false` when unset. [`RawValue`] closes that set of shapes into
//! one enum so the resolver can match on it exhaustively.

mod cell;
mod value;

pub use cell::Cell;
pub use value::{RawRecord, RawValue, Scalar};
