use std::fmt;
use std::sync::Weak;

use crate::registration::RegistrationInner;
use crate::{BundleId, Properties, ReferenceId, ServiceId, ServiceRegistration};

/// Consumer-side handle to a registration.
///
/// Holds the registration weakly: a reference never keeps a registration
/// alive. Once the registration is invalid or destroyed every accessor
/// degrades to `None`/`false`.
#[derive(Clone)]
pub struct ServiceReference {
	id: ReferenceId,
	service_id: ServiceId,
	registration: Weak<RegistrationInner>,
}

impl ServiceReference {
	pub(crate) fn new(id: ReferenceId, registration: &ServiceRegistration) -> Self {
		Self {
			id,
			service_id: registration.id(),
			registration: registration.downgrade(),
		}
	}

	#[inline]
	pub fn id(&self) -> ReferenceId {
		self.id
	}

	#[inline]
	pub fn service_id(&self) -> ServiceId {
		self.service_id
	}

	/// The backing registration while it is still valid.
	pub(crate) fn registration(&self) -> Option<ServiceRegistration> {
		self.upgrade().filter(ServiceRegistration::is_valid)
	}

	/// The backing registration in any state, unless it was already destroyed.
	pub(crate) fn upgrade(&self) -> Option<ServiceRegistration> {
		self.registration.upgrade().map(ServiceRegistration::from_inner)
	}

	/// True if this reference was minted for `registration` itself.
	pub(crate) fn refers_to(&self, registration: &ServiceRegistration) -> bool {
		Weak::ptr_eq(&self.registration, &registration.downgrade())
	}

	pub fn is_valid(&self) -> bool {
		self.registration().is_some()
	}

	pub fn name(&self) -> Option<String> {
		self.registration().map(|r| r.name().to_owned())
	}

	/// Publishing bundle.
	pub fn bundle(&self) -> Option<BundleId> {
		self.registration().map(|r| r.bundle())
	}

	pub fn properties(&self) -> Option<Properties> {
		self.registration().map(|r| r.properties())
	}

	pub fn property(&self, key: &str) -> Option<String> {
		self.registration()?.property(key)
	}
}

impl PartialEq for ServiceReference {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for ServiceReference {}

impl fmt::Debug for ServiceReference {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ServiceReference")
			.field("id", &self.id)
			.field("service_id", &self.service_id)
			.field("valid", &self.is_valid())
			.finish()
	}
}
