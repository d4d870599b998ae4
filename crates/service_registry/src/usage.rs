//! Usage-count ledger.
//!
//! One entry per `(consuming bundle, reference)` pair, holding the number of
//! unmatched `get_service` calls and the resolved object cached for that pair.
//! Entries are flushed the moment their count reaches zero, and a bundle's
//! slot disappears with its last entry. The ledger is only ever touched with
//! the registry lock held.

use keel_table::{IndexedTable, TableError};

use crate::{BundleId, ReferenceId, ServiceObject, ServiceReference, ServiceRegistration};

pub(crate) struct UsageCount {
	reference: ServiceReference,
	count: u32,
	service: Option<ServiceObject>,
}

/// Outcome of caching a freshly resolved object.
pub(crate) enum Store {
	/// The object is now cached for the pair.
	Kept(ServiceObject),
	/// Another caller cached an object first; `redundant` should go back to its producer.
	Existing { cached: ServiceObject, redundant: ServiceObject },
	/// The entry was flushed while the object was being resolved.
	Missing(ServiceObject),
}

/// Outcome of releasing one usage.
pub(crate) enum Released {
	NotFound,
	Decremented(u32),
	/// The entry is gone; carries the cached object, if any.
	Flushed(Option<ServiceObject>),
}

pub(crate) struct Ledger {
	in_use: IndexedTable<BundleId, Vec<UsageCount>>,
}

impl Ledger {
	pub(crate) fn with_capacity(capacity: usize) -> Self {
		Self {
			in_use: IndexedTable::with_capacity(capacity),
		}
	}

	fn entry(&self, bundle: BundleId, reference: ReferenceId) -> Option<&UsageCount> {
		self.in_use.get(&bundle)?.iter().find(|u| u.reference.id() == reference)
	}

	fn entry_mut(&mut self, bundle: BundleId, reference: ReferenceId) -> Option<&mut UsageCount> {
		self.in_use.get_mut(&bundle)?.iter_mut().find(|u| u.reference.id() == reference)
	}

	/// Finds or creates the entry for the pair and counts one more use.
	///
	/// Returns the cached object, if one was already resolved.
	pub(crate) fn acquire(&mut self, bundle: BundleId, reference: &ServiceReference) -> Result<Option<ServiceObject>, TableError> {
		let usages = self.in_use.get_or_insert_with(bundle, Vec::new)?;
		let pos = match usages.iter().position(|u| u.reference.id() == reference.id()) {
			Some(pos) => pos,
			None => {
				usages.push(UsageCount {
					reference: reference.clone(),
					count: 0,
					service: None,
				});
				usages.len() - 1
			}
		};
		let usage = &mut usages[pos];
		usage.count = usage.count.saturating_add(1);
		Ok(usage.service.clone())
	}

	pub(crate) fn store(&mut self, bundle: BundleId, reference: ReferenceId, service: ServiceObject) -> Store {
		let Some(usage) = self.entry_mut(bundle, reference) else {
			return Store::Missing(service);
		};
		match &usage.service {
			Some(cached) => Store::Existing {
				cached: cached.clone(),
				redundant: service,
			},
			None => {
				usage.service = Some(service.clone());
				Store::Kept(service)
			}
		}
	}

	/// Counts one use fewer. Flushes the entry when the count reaches zero, or
	/// unconditionally when `force` is set.
	pub(crate) fn release(&mut self, bundle: BundleId, reference: ReferenceId, force: bool) -> Released {
		let Some(usage) = self.entry_mut(bundle, reference) else {
			return Released::NotFound;
		};
		usage.count = usage.count.saturating_sub(1);
		if !force && usage.count > 0 {
			return Released::Decremented(usage.count);
		}
		let service = usage.service.take();
		self.flush(bundle, reference);
		Released::Flushed(service)
	}

	fn flush(&mut self, bundle: BundleId, reference: ReferenceId) {
		let Some(usages) = self.in_use.get_mut(&bundle) else {
			return;
		};
		usages.retain(|u| u.reference.id() != reference);
		if usages.is_empty() {
			self.in_use.remove(&bundle);
		}
	}

	pub(crate) fn count(&self, bundle: BundleId, reference: ReferenceId) -> Option<u32> {
		self.entry(bundle, reference).map(|u| u.count)
	}

	pub(crate) fn references_in_use(&self, bundle: BundleId) -> Vec<ServiceReference> {
		self.in_use
			.get(&bundle)
			.map(|usages| usages.iter().map(|u| u.reference.clone()).collect())
			.unwrap_or_default()
	}

	pub(crate) fn using_bundles(&self, reference: ReferenceId) -> Vec<BundleId> {
		self.in_use
			.iter()
			.filter(|(_, usages)| usages.iter().any(|u| u.reference.id() == reference))
			.map(|(bundle, _)| *bundle)
			.collect()
	}

	/// Every `(bundle, reference)` pair holding usage of any reference to `registration`.
	pub(crate) fn holders_of(&self, registration: &ServiceRegistration) -> Vec<(BundleId, ReferenceId)> {
		self.in_use
			.iter()
			.flat_map(|(bundle, usages)| {
				usages
					.iter()
					.filter(move |u| u.reference.refers_to(registration))
					.map(move |u| (*bundle, u.reference.id()))
			})
			.collect()
	}

	/// Number of live entries across all bundles.
	#[cfg(test)]
	pub(crate) fn len(&self) -> usize {
		self.in_use.values().map(Vec::len).sum()
	}
}
