use std::fmt;

/// Opaque identity of an installed bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BundleId(pub u64);

impl fmt::Display for BundleId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "bundle#{}", self.0)
	}
}

/// Registry-scoped service id. Strictly increasing, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceId(u64);

impl ServiceId {
	#[inline]
	pub(crate) const fn new(raw: u64) -> Self {
		Self(raw)
	}

	#[inline]
	pub const fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for ServiceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Identity of one handed-out [`crate::ServiceReference`].
///
/// Every lookup mints fresh references, so two references to the same
/// registration never share a `ReferenceId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferenceId(u64);

impl ReferenceId {
	#[inline]
	pub(crate) const fn new(raw: u64) -> Self {
		Self(raw)
	}

	#[inline]
	pub const fn get(self) -> u64 {
		self.0
	}
}
