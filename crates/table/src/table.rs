use std::fmt;

use crate::cursor::Cursor;
use crate::error::TableError;
use crate::strategy::{FxStrategy, KeyStrategy};

/// Bucket count of a table built with [`IndexedTable::new`].
pub const DEFAULT_INITIAL_CAPACITY: usize = 16;
/// Fraction of the bucket count that may be occupied before the table doubles.
pub const LOAD_FACTOR: f32 = 0.75;
/// Upper bound on the bucket count. Past it, chains grow instead.
pub const MAXIMUM_CAPACITY: usize = 1 << 30;

pub(crate) struct Entry<K, V> {
	pub(crate) hash: u32,
	pub(crate) key: K,
	pub(crate) value: V,
}

/// Chained hash table with an injectable [`KeyStrategy`].
///
/// Iteration order follows bucket order and is unspecified; it may change after
/// any resize. Callers needing a stable order must snapshot and sort.
pub struct IndexedTable<K, V, S = FxStrategy> {
	pub(crate) buckets: Vec<Vec<Entry<K, V>>>,
	pub(crate) len: usize,
	threshold: usize,
	max_capacity: usize,
	pub(crate) mod_count: u64,
	strategy: S,
}

impl<K, V> IndexedTable<K, V, FxStrategy>
where
	FxStrategy: KeyStrategy<K>,
{
	/// Creates an empty table with [`DEFAULT_INITIAL_CAPACITY`] buckets.
	pub fn new() -> Self {
		Self::with_strategy(FxStrategy)
	}

	/// Creates an empty table with at least `capacity` buckets (rounded up to a power of two).
	pub fn with_capacity(capacity: usize) -> Self {
		Self::with_capacity_and_strategy(capacity, FxStrategy)
	}
}

impl<K, V> Default for IndexedTable<K, V, FxStrategy>
where
	FxStrategy: KeyStrategy<K>,
{
	fn default() -> Self {
		Self::new()
	}
}

impl<K, V, S: KeyStrategy<K>> IndexedTable<K, V, S> {
	pub fn with_strategy(strategy: S) -> Self {
		Self::with_capacity_and_strategy(DEFAULT_INITIAL_CAPACITY, strategy)
	}

	pub fn with_capacity_and_strategy(capacity: usize, strategy: S) -> Self {
		Self::with_limits(capacity, MAXIMUM_CAPACITY, strategy)
	}

	/// Builds a table whose bucket count never exceeds `max_capacity`.
	pub(crate) fn with_limits(capacity: usize, max_capacity: usize, strategy: S) -> Self {
		let max_capacity = max_capacity.clamp(1, MAXIMUM_CAPACITY).next_power_of_two();
		let capacity = capacity.clamp(1, max_capacity).next_power_of_two();
		let mut buckets = Vec::with_capacity(capacity);
		buckets.resize_with(capacity, Vec::new);
		Self {
			buckets,
			len: 0,
			threshold: threshold_for(capacity, max_capacity),
			max_capacity,
			mod_count: 0,
			strategy,
		}
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.len
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Current number of buckets.
	#[inline]
	pub fn capacity(&self) -> usize {
		self.buckets.len()
	}

	/// Structural modification counter. Bumped by insertions, removals and `clear`,
	/// but not by replacing the value of an existing key.
	#[inline]
	pub fn mod_count(&self) -> u64 {
		self.mod_count
	}

	#[inline]
	pub fn strategy(&self) -> &S {
		&self.strategy
	}

	pub fn get(&self, key: &K) -> Option<&V> {
		let (_, bucket, pos) = self.locate(key);
		pos.map(|pos| &self.buckets[bucket][pos].value)
	}

	pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
		let (_, bucket, pos) = self.locate(key);
		pos.map(|pos| &mut self.buckets[bucket][pos].value)
	}

	pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
		let (_, bucket, pos) = self.locate(key);
		pos.map(|pos| {
			let entry = &self.buckets[bucket][pos];
			(&entry.key, &entry.value)
		})
	}

	#[inline]
	pub fn contains_key(&self, key: &K) -> bool {
		self.locate(key).2.is_some()
	}

	/// Linear scan over every value.
	pub fn contains_value(&self, value: &V) -> bool
	where
		V: PartialEq,
	{
		self.values().any(|v| v == value)
	}

	/// Inserts or replaces, returning the previous value.
	///
	/// # Panics
	///
	/// Panics if growing the table fails; use [`Self::try_put`] to observe that instead.
	pub fn put(&mut self, key: K, value: V) -> Option<V> {
		match self.try_put(key, value) {
			Ok(previous) => previous,
			Err(err) => panic!("IndexedTable::put: {err}"),
		}
	}

	/// Inserts or replaces, returning the previous value.
	///
	/// On [`TableError::Alloc`] the key and value are dropped and no entry is added.
	pub fn try_put(&mut self, key: K, value: V) -> Result<Option<V>, TableError> {
		let (hash, bucket, pos) = self.locate(&key);
		if let Some(pos) = pos {
			return Ok(Some(std::mem::replace(&mut self.buckets[bucket][pos].value, value)));
		}

		let bucket = if self.len + 1 > self.threshold {
			self.try_grow()?;
			index_for(hash, self.buckets.len())
		} else {
			bucket
		};

		let chain = &mut self.buckets[bucket];
		chain.try_reserve(1)?;
		chain.push(Entry { hash, key, value });
		self.len += 1;
		self.mod_count += 1;
		Ok(None)
	}

	/// Returns the value for `key`, inserting `make()` first if the key is missing.
	pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> V) -> Result<&mut V, TableError> {
		let (hash, bucket, pos) = self.locate(&key);
		let (bucket, pos) = match pos {
			Some(pos) => (bucket, pos),
			None => {
				self.try_put(key, make())?;
				let bucket = index_for(hash, self.buckets.len());
				(bucket, self.buckets[bucket].len() - 1)
			}
		};
		Ok(&mut self.buckets[bucket][pos].value)
	}

	pub fn remove(&mut self, key: &K) -> Option<V> {
		self.remove_entry(key).map(|(_, value)| value)
	}

	pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
		let (_, bucket, pos) = self.locate(key);
		let entry = self.remove_at(bucket, pos?);
		Some((entry.key, entry.value))
	}

	/// Keeps only the entries for which `keep` returns true.
	pub fn retain(&mut self, mut keep: impl FnMut(&K, &mut V) -> bool) {
		let before = self.len;
		for chain in &mut self.buckets {
			chain.retain_mut(|entry| keep(&entry.key, &mut entry.value));
		}
		self.len = self.buckets.iter().map(Vec::len).sum();
		if self.len != before {
			self.mod_count += 1;
		}
	}

	pub fn clear(&mut self) {
		self.mod_count += 1;
		for chain in &mut self.buckets {
			chain.clear();
		}
		self.len = 0;
	}

	pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
		self.buckets.iter().flatten().map(|entry| (&entry.key, &entry.value))
	}

	pub fn keys(&self) -> impl Iterator<Item = &K> {
		self.buckets.iter().flatten().map(|entry| &entry.key)
	}

	pub fn values(&self) -> impl Iterator<Item = &V> {
		self.buckets.iter().flatten().map(|entry| &entry.value)
	}

	pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
		self.buckets.iter_mut().flatten().map(|entry| &mut entry.value)
	}

	/// Starts a detached fail-fast cursor at the first bucket.
	pub fn cursor(&self) -> Cursor {
		Cursor::new(self.mod_count)
	}

	pub(crate) fn remove_at(&mut self, bucket: usize, pos: usize) -> Entry<K, V> {
		let entry = self.buckets[bucket].remove(pos);
		self.len -= 1;
		self.mod_count += 1;
		entry
	}

	fn hash_of(&self, key: &K) -> u32 {
		if self.strategy.is_absent(key) {
			0
		} else {
			spread(self.strategy.hash(key))
		}
	}

	fn locate(&self, key: &K) -> (u32, usize, Option<usize>) {
		let hash = self.hash_of(key);
		let bucket = index_for(hash, self.buckets.len());
		let pos = self.buckets[bucket]
			.iter()
			.position(|entry| entry.hash == hash && self.strategy.eq(&entry.key, key));
		(hash, bucket, pos)
	}

	/// Doubles the bucket array, keeping the relative order of every chain.
	///
	/// All memory is reserved before any entry moves, so a failure leaves the table untouched.
	fn try_grow(&mut self) -> Result<(), TableError> {
		let old_capacity = self.buckets.len();
		if old_capacity >= self.max_capacity {
			self.threshold = usize::MAX;
			return Ok(());
		}
		let new_capacity = old_capacity * 2;

		let mut counts: Vec<usize> = Vec::new();
		counts.try_reserve_exact(new_capacity)?;
		counts.resize(new_capacity, 0);
		for entry in self.buckets.iter().flatten() {
			counts[index_for(entry.hash, new_capacity)] += 1;
		}

		let mut buckets: Vec<Vec<Entry<K, V>>> = Vec::new();
		buckets.try_reserve_exact(new_capacity)?;
		for count in counts {
			let mut chain = Vec::new();
			chain.try_reserve_exact(count)?;
			buckets.push(chain);
		}

		for chain in std::mem::take(&mut self.buckets) {
			for entry in chain {
				buckets[index_for(entry.hash, new_capacity)].push(entry);
			}
		}

		self.buckets = buckets;
		self.threshold = threshold_for(new_capacity, self.max_capacity);
		Ok(())
	}
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for IndexedTable<K, V, S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map()
			.entries(self.buckets.iter().flatten().map(|entry| (&entry.key, &entry.value)))
			.finish()
	}
}

fn threshold_for(capacity: usize, max_capacity: usize) -> usize {
	if capacity >= max_capacity {
		usize::MAX
	} else {
		(capacity as f32 * LOAD_FACTOR).ceil() as usize
	}
}

/// Spreads low-entropy hashes (addresses, small integers) across the low bits
/// that select a bucket.
#[inline]
fn spread(mut h: u32) -> u32 {
	h = h.wrapping_add(!(h << 9));
	h ^= h.rotate_right(14);
	h = h.wrapping_add(h << 4);
	h ^= h.rotate_right(10);
	h
}

#[inline]
fn index_for(hash: u32, capacity: usize) -> usize {
	hash as usize & (capacity - 1)
}
