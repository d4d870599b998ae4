use std::collections::BTreeMap;
use std::collections::btree_map;

/// Property key holding the name a service was published under.
pub const OBJECTCLASS: &str = "objectClass";
/// Property key holding the decimal service id.
pub const SERVICE_ID: &str = "service.id";

/// Ordered string-to-string property set attached to a registration.
///
/// Values handed out by the registry are always point-in-time copies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties(BTreeMap<String, String>);

impl Properties {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder-style insert.
	pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.insert(key, value);
		self
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.0.get(key).map(String::as_str)
	}

	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
		self.0.insert(key.into(), value.into())
	}

	pub fn remove(&mut self, key: &str) -> Option<String> {
		self.0.remove(key)
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.0.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/// Overwrites the keys the registry owns.
	pub(crate) fn stamp(&mut self, name: &str, id: crate::ServiceId) {
		self.insert(OBJECTCLASS, name);
		self.insert(SERVICE_ID, id.to_string());
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}
}

impl<'a> IntoIterator for &'a Properties {
	type Item = (&'a String, &'a String);
	type IntoIter = btree_map::Iter<'a, String, String>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}
