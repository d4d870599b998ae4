use crate::{Properties, ServiceRegistration};

/// Registry transition that produced a [`ServiceEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceEventKind {
	/// The registration became visible to lookups.
	Registered,
	/// The registration's properties were replaced.
	Modified,
	/// The registration left the lookup indexes and is about to be invalidated.
	Unregistering,
}

/// Notification delivered to the owning runtime.
///
/// Events are dispatched with the registry lock released, so the registry
/// may already have moved on by the time a sink observes one.
#[derive(Debug, Clone)]
pub struct ServiceEvent {
	pub kind: ServiceEventKind,
	pub registration: ServiceRegistration,
	/// Previous properties, set for [`ServiceEventKind::Modified`] only.
	pub old_properties: Option<Properties>,
}

/// Receiver of registry events, supplied by the owning runtime.
pub trait ServiceEventSink: Send + Sync {
	fn service_changed(&self, event: &ServiceEvent);
}

impl<F> ServiceEventSink for F
where
	F: Fn(&ServiceEvent) + Send + Sync,
{
	fn service_changed(&self, event: &ServiceEvent) {
		self(event)
	}
}
