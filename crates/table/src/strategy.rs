//! Key hashing and equality strategies.

use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use rustc_hash::FxHasher;

/// Hashing and equality policy for the keys of an [`crate::IndexedTable`].
///
/// Implementations must be consistent: keys that compare equal must hash
/// equally, and an absent key must never compare equal to a present one.
pub trait KeyStrategy<K: ?Sized> {
	/// Raw hash of `key`. The table applies its own bit spreading on top.
	fn hash(&self, key: &K) -> u32;

	/// Returns true when both keys address the same entry.
	fn eq(&self, a: &K, b: &K) -> bool;

	/// Returns true for the "null" key, which always lives in bucket zero.
	fn is_absent(&self, _key: &K) -> bool {
		false
	}
}

/// Default strategy: `Hash` + `Eq` through `FxHasher`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FxStrategy;

impl<K: Hash + Eq + ?Sized> KeyStrategy<K> for FxStrategy {
	#[inline]
	fn hash(&self, key: &K) -> u32 {
		let mut hasher = FxHasher::default();
		key.hash(&mut hasher);
		fold(hasher.finish())
	}

	#[inline]
	fn eq(&self, a: &K, b: &K) -> bool {
		a == b
	}
}

/// Identity strategy for shared pointers: hashes the address, compares with `Arc::ptr_eq`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ByAddress;

impl<T: ?Sized> KeyStrategy<Arc<T>> for ByAddress {
	#[inline]
	fn hash(&self, key: &Arc<T>) -> u32 {
		fold(Arc::as_ptr(key).cast::<()>() as usize as u64)
	}

	#[inline]
	fn eq(&self, a: &Arc<T>, b: &Arc<T>) -> bool {
		Arc::ptr_eq(a, b)
	}
}

/// Lifts a strategy over `K` to `Option<K>`, treating `None` as the absent key.
#[derive(Debug, Default, Clone, Copy)]
pub struct Nullable<S>(pub S);

impl<K, S: KeyStrategy<K>> KeyStrategy<Option<K>> for Nullable<S> {
	fn hash(&self, key: &Option<K>) -> u32 {
		key.as_ref().map_or(0, |k| self.0.hash(k))
	}

	fn eq(&self, a: &Option<K>, b: &Option<K>) -> bool {
		match (a, b) {
			(Some(a), Some(b)) => self.0.eq(a, b),
			(None, None) => true,
			_ => false,
		}
	}

	fn is_absent(&self, key: &Option<K>) -> bool {
		key.is_none()
	}
}

/// Strategy assembled from a pair of closures.
pub struct FnStrategy<K: ?Sized, H, E> {
	hash: H,
	eq: E,
	_key: PhantomData<fn(&K)>,
}

impl<K: ?Sized, H, E> FnStrategy<K, H, E>
where
	H: Fn(&K) -> u32,
	E: Fn(&K, &K) -> bool,
{
	pub fn new(hash: H, eq: E) -> Self {
		Self {
			hash,
			eq,
			_key: PhantomData,
		}
	}
}

impl<K: ?Sized, H, E> KeyStrategy<K> for FnStrategy<K, H, E>
where
	H: Fn(&K) -> u32,
	E: Fn(&K, &K) -> bool,
{
	fn hash(&self, key: &K) -> u32 {
		(self.hash)(key)
	}

	fn eq(&self, a: &K, b: &K) -> bool {
		(self.eq)(a, b)
	}
}

#[inline]
fn fold(h: u64) -> u32 {
	(h ^ (h >> 32)) as u32
}
