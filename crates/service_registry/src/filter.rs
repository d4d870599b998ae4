use crate::Properties;

/// Predicate used to narrow service lookups.
///
/// Filters see a properties snapshot and run after the registry lock is
/// released, so they may call back into the registry.
pub trait Filter {
	fn matches(&self, properties: &Properties) -> bool;
}

impl<F> Filter for F
where
	F: Fn(&Properties) -> bool,
{
	#[inline]
	fn matches(&self, properties: &Properties) -> bool {
		self(properties)
	}
}

/// Matches registrations whose property `key` equals `value` exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyEquals {
	key: String,
	value: String,
}

impl PropertyEquals {
	pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			key: key.into(),
			value: value.into(),
		}
	}
}

impl Filter for PropertyEquals {
	fn matches(&self, properties: &Properties) -> bool {
		properties.get(&self.key) == Some(self.value.as_str())
	}
}
