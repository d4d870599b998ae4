use std::collections::TryReserveError;

/// Errors surfaced by [`crate::IndexedTable`] and [`crate::Cursor`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
	/// Growing the bucket array or a chain could not be satisfied.
	#[error("table allocation failed: {0}")]
	Alloc(#[from] TryReserveError),

	/// The table was structurally modified behind the cursor's back.
	#[error("concurrent modification: cursor expected mod count {expected}, table is at {actual}")]
	ConcurrentModification { expected: u64, actual: u64 },

	/// `Cursor::remove` was called without a preceding successful `next`.
	#[error("cursor has no current entry")]
	NoCurrentEntry,
}
