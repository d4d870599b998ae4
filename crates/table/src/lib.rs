//! Chained hash table used to index registry state.
//!
//! # Role
//!
//! [`IndexedTable`] maps keys to values through a bucket array whose length is
//! always a power of two. Hashing and key equality are supplied per table by a
//! [`KeyStrategy`], so the same structure can index by value, by pointer
//! identity, or by any caller-defined notion of sameness.
//!
//! # Invariants
//!
//! - `len()` always equals the number of live entries.
//! - Absent keys (see [`KeyStrategy::is_absent`]) hash to zero and share bucket zero.
//! - The table doubles once `len()` exceeds `capacity * 0.75`, until
//!   [`MAXIMUM_CAPACITY`]; beyond that chains simply grow.
//! - A [`Cursor`] is fail-fast: once the table is structurally modified by
//!   anything other than the cursor itself, it yields nothing further.

mod cursor;
mod error;
mod strategy;
mod table;

pub use cursor::Cursor;
pub use error::TableError;
pub use strategy::{ByAddress, FnStrategy, FxStrategy, KeyStrategy, Nullable};
pub use table::{DEFAULT_INITIAL_CAPACITY, IndexedTable, LOAD_FACTOR, MAXIMUM_CAPACITY};
