use crate::error::TableError;
use crate::strategy::KeyStrategy;
use crate::table::IndexedTable;

/// Detached, fail-fast position within an [`IndexedTable`].
///
/// A cursor does not borrow its table, so the table can be mutated between
/// steps. It captures the table's modification counter when created and stops
/// yielding entries as soon as the counter moves for any reason other than
/// [`Cursor::remove`]. Stepping a cursor against a table other than the one
/// that created it is a logic error.
#[derive(Debug, Clone)]
pub struct Cursor {
	expected: u64,
	bucket: usize,
	pos: usize,
	current: Option<(usize, usize)>,
}

impl Cursor {
	pub(crate) fn new(expected: u64) -> Self {
		Self {
			expected,
			bucket: 0,
			pos: 0,
			current: None,
		}
	}

	/// Returns true once the table has been structurally modified behind this cursor.
	pub fn is_stale<K, V, S>(&self, table: &IndexedTable<K, V, S>) -> bool {
		table.mod_count != self.expected
	}

	/// Advances to the next entry, or returns `None` when exhausted or stale.
	pub fn next<'t, K, V, S>(&mut self, table: &'t IndexedTable<K, V, S>) -> Option<(&'t K, &'t V)> {
		if self.is_stale(table) {
			self.current = None;
			return None;
		}
		while let Some(chain) = table.buckets.get(self.bucket) {
			if let Some(entry) = chain.get(self.pos) {
				self.current = Some((self.bucket, self.pos));
				self.pos += 1;
				return Some((&entry.key, &entry.value));
			}
			self.bucket += 1;
			self.pos = 0;
		}
		self.current = None;
		None
	}

	/// Removes the entry last returned by [`Cursor::next`] and keeps the cursor valid.
	pub fn remove<K, V, S: KeyStrategy<K>>(&mut self, table: &mut IndexedTable<K, V, S>) -> Result<(K, V), TableError> {
		if self.is_stale(table) {
			return Err(TableError::ConcurrentModification {
				expected: self.expected,
				actual: table.mod_count,
			});
		}
		let (bucket, pos) = self.current.take().ok_or(TableError::NoCurrentEntry)?;
		let entry = table.remove_at(bucket, pos);
		self.expected = table.mod_count;
		// The successor shifted into the removed slot.
		self.pos = pos;
		Ok((entry.key, entry.value))
	}
}
