use std::any::Any;
use std::sync::Arc;

use crate::{BundleId, ServiceRegistration};

/// Type-erased service instance.
pub type ServiceObject = Arc<dyn Any + Send + Sync>;

/// Recovers the concrete type of a service object.
pub fn downcast_service<T: Any + Send + Sync>(service: ServiceObject) -> Option<Arc<T>> {
	service.downcast::<T>().ok()
}

/// Publisher-supplied producer of per-bundle service instances.
///
/// Both methods are invoked with the registry lock released and may call back
/// into the registry.
pub trait ServiceFactory: Send + Sync {
	/// Produces the instance `bundle` will see, or `None` if none is available.
	fn get_service(&self, bundle: BundleId, registration: &ServiceRegistration) -> Option<ServiceObject>;

	/// Receives back an instance once `bundle` no longer uses it.
	fn unget_service(&self, _bundle: BundleId, _registration: &ServiceRegistration, _service: ServiceObject) {}
}

impl<F> ServiceFactory for F
where
	F: Fn(BundleId, &ServiceRegistration) -> Option<ServiceObject> + Send + Sync,
{
	fn get_service(&self, bundle: BundleId, registration: &ServiceRegistration) -> Option<ServiceObject> {
		self(bundle, registration)
	}
}

/// What a registration hands out.
#[derive(Clone)]
pub(crate) enum ServiceSource {
	Object(ServiceObject),
	Factory(Arc<dyn ServiceFactory>),
}
