//! Published-service records.
//!
//! # Invariants
//!
//! - `id` is assigned once by the registry and never changes.
//! - State only moves forward: `Active -> Unregistering -> Invalid`.
//! - Property replacement never touches `id` or state.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::service::ServiceSource;
use crate::{BundleId, Properties, ServiceId, ServiceObject};

/// Lifecycle phase of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RegistrationState {
	/// Registered and visible to lookups.
	Active = 0,
	/// Removed from the lookup indexes; listeners are being told. Still valid.
	Unregistering = 1,
	/// Terminal. No reference derived from it yields a service again.
	Invalid = 2,
}

impl RegistrationState {
	fn from_u8(raw: u8) -> Self {
		match raw {
			0 => Self::Active,
			1 => Self::Unregistering,
			_ => Self::Invalid,
		}
	}
}

pub(crate) struct RegistrationInner {
	id: ServiceId,
	name: Box<str>,
	bundle: BundleId,
	source: ServiceSource,
	properties: RwLock<Properties>,
	state: AtomicU8,
}

/// Publisher-side handle to one published service.
///
/// Cloning the handle does not duplicate the registration. Equality is
/// identity: two handles are equal only if they share the same registration,
/// so equal ids from different registries never compare equal.
#[derive(Clone)]
pub struct ServiceRegistration {
	inner: Arc<RegistrationInner>,
}

impl ServiceRegistration {
	pub(crate) fn new(id: ServiceId, name: &str, bundle: BundleId, source: ServiceSource, properties: Option<Properties>) -> Self {
		let mut properties = properties.unwrap_or_default();
		properties.stamp(name, id);
		Self {
			inner: Arc::new(RegistrationInner {
				id,
				name: name.into(),
				bundle,
				source,
				properties: RwLock::new(properties),
				state: AtomicU8::new(RegistrationState::Active as u8),
			}),
		}
	}

	pub(crate) fn from_inner(inner: Arc<RegistrationInner>) -> Self {
		Self { inner }
	}

	#[inline]
	pub fn id(&self) -> ServiceId {
		self.inner.id
	}

	#[inline]
	pub fn name(&self) -> &str {
		&self.inner.name
	}

	/// Bundle that published the service.
	#[inline]
	pub fn bundle(&self) -> BundleId {
		self.inner.bundle
	}

	pub fn is_factory(&self) -> bool {
		matches!(self.inner.source, ServiceSource::Factory(_))
	}

	/// Point-in-time copy of the current properties.
	pub fn properties(&self) -> Properties {
		self.inner.properties.read().clone()
	}

	pub fn property(&self, key: &str) -> Option<String> {
		self.inner.properties.read().get(key).map(str::to_owned)
	}

	pub fn state(&self) -> RegistrationState {
		RegistrationState::from_u8(self.inner.state.load(Ordering::Acquire))
	}

	/// True until the registration has been fully unregistered.
	#[inline]
	pub fn is_valid(&self) -> bool {
		self.state() != RegistrationState::Invalid
	}

	pub(crate) fn downgrade(&self) -> Weak<RegistrationInner> {
		Arc::downgrade(&self.inner)
	}

	/// `Active -> Unregistering`. Returns false if the registration already left `Active`.
	pub(crate) fn begin_unregister(&self) -> bool {
		self.inner
			.state
			.compare_exchange(
				RegistrationState::Active as u8,
				RegistrationState::Unregistering as u8,
				Ordering::AcqRel,
				Ordering::Acquire,
			)
			.is_ok()
	}

	pub(crate) fn invalidate(&self) {
		self.inner.state.store(RegistrationState::Invalid as u8, Ordering::Release);
	}

	/// Swaps in new properties (re-stamping the registry-owned keys) and returns the old set.
	pub(crate) fn replace_properties(&self, mut properties: Properties) -> Properties {
		properties.stamp(self.name(), self.id());
		std::mem::replace(&mut *self.inner.properties.write(), properties)
	}

	/// Produces the object `bundle` should see. Must be called without the registry lock.
	pub(crate) fn resolve(&self, bundle: BundleId) -> Option<ServiceObject> {
		match &self.inner.source {
			ServiceSource::Object(service) => Some(Arc::clone(service)),
			ServiceSource::Factory(factory) => factory.get_service(bundle, self),
		}
	}

	/// Returns an instance to its factory. Must be called without the registry lock.
	pub(crate) fn release(&self, bundle: BundleId, service: ServiceObject) {
		if let ServiceSource::Factory(factory) = &self.inner.source {
			factory.unget_service(bundle, self, service);
		}
	}
}

impl PartialEq for ServiceRegistration {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}
}

impl Eq for ServiceRegistration {}

impl std::hash::Hash for ServiceRegistration {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.inner.id.hash(state);
	}
}

impl fmt::Debug for ServiceRegistration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ServiceRegistration")
			.field("id", &self.inner.id)
			.field("name", &self.inner.name)
			.field("bundle", &self.inner.bundle)
			.field("state", &self.state())
			.finish()
	}
}
