use std::sync::Arc;

use parking_lot::Mutex;

use super::ServiceRegistry;
use crate::{BundleId, LISTENER_HOOK_SERVICE, RegistrationState, ServiceEvent, ServiceEventKind, ServiceObject};

const PUBLISHER: BundleId = BundleId(1);
const CONSUMER: BundleId = BundleId(2);

fn object(tag: &'static str) -> ServiceObject {
	Arc::new(tag)
}

/// Invariant: service ids are strictly increasing and never reused, even
/// across withdrawals.
pub(crate) fn inv_ids_strictly_increasing() {
	let registry = ServiceRegistry::new();
	let mut last = None;
	for round in 0..20 {
		let registration = registry
			.register_service(PUBLISHER, "Counter", object("counter"), None)
			.unwrap();
		if let Some(last) = last {
			assert!(registration.id() > last, "id {} did not advance past {last}", registration.id());
		}
		last = Some(registration.id());
		if round % 3 == 0 {
			registry.unregister_service(PUBLISHER, &registration).unwrap();
		}
	}
	assert_eq!(last.map(|id| id.get()), Some(20));
}

#[cfg_attr(test, test)]
pub(crate) fn test_ids_strictly_increasing() {
	inv_ids_strictly_increasing()
}

/// Invariant: a second unregistration is a no-op and fires nothing.
pub(crate) fn inv_unregister_idempotent() {
	let events = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&events);
	let registry =
		ServiceRegistry::new().with_event_sink(move |event: &ServiceEvent| sink.lock().push(event.kind));

	let registration = registry.register_service(PUBLISHER, "Printer", object("p"), None).unwrap();
	assert!(registry.unregister_service(PUBLISHER, &registration).unwrap());
	assert!(!registry.unregister_service(PUBLISHER, &registration).unwrap());
	assert_eq!(registry.unregister_services(PUBLISHER), 0);

	assert_eq!(
		*events.lock(),
		vec![ServiceEventKind::Registered, ServiceEventKind::Unregistering]
	);
	assert_eq!(registration.state(), RegistrationState::Invalid);
}

#[cfg_attr(test, test)]
pub(crate) fn test_unregister_idempotent() {
	inv_unregister_idempotent()
}

/// Invariant: once withdrawn, a registration is never found again and
/// references obtained earlier never yield an object.
pub(crate) fn inv_unregistered_not_found() {
	let registry = ServiceRegistry::new();
	let registration = registry.register_service(PUBLISHER, "Printer", object("p"), None).unwrap();
	let reference = registry.get_service_reference("Printer").unwrap();

	registry.unregister_service(PUBLISHER, &registration).unwrap();

	assert!(registry.get_service_references(Some("Printer"), None).is_empty());
	assert!(registry.get_service_reference("Printer").is_none());
	assert!(registry.get_registered_services(PUBLISHER).is_empty());
	assert!(registry.get_service(CONSUMER, &reference).is_none());
	assert!(!reference.is_valid());
	assert!(reference.properties().is_none());
	assert_eq!(registry.usage_count(CONSUMER, &reference), None);
}

#[cfg_attr(test, test)]
pub(crate) fn test_unregistered_not_found() {
	inv_unregistered_not_found()
}

/// Invariant: N gets followed by N ungets leave no ledger entry, and the
/// (N+1)th unget reports nothing to release.
pub(crate) fn inv_usage_round_trip() {
	let registry = ServiceRegistry::new();
	registry.register_service(PUBLISHER, "Printer", object("p"), None).unwrap();
	let reference = registry.get_service_reference("Printer").unwrap();

	for n in 1..=5u32 {
		for _ in 0..n {
			assert!(registry.get_service(CONSUMER, &reference).is_some());
		}
		assert_eq!(registry.usage_count(CONSUMER, &reference), Some(n));
		for _ in 0..n {
			assert!(registry.unget_service(CONSUMER, &reference));
		}
		assert!(!registry.unget_service(CONSUMER, &reference));
		assert_eq!(registry.usage_count(CONSUMER, &reference), None);
		assert_eq!(registry.ledger_len(), 0);
		assert!(registry.get_services_in_use(CONSUMER).is_empty());
	}
}

#[cfg_attr(test, test)]
pub(crate) fn test_usage_round_trip() {
	inv_usage_round_trip()
}

/// Invariant: the hooks index holds exactly the Active listener-hook registrations.
pub(crate) fn inv_listener_hook_index() {
	let registry = ServiceRegistry::new();
	let hook_a = registry
		.register_service(PUBLISHER, LISTENER_HOOK_SERVICE, object("a"), None)
		.unwrap();
	registry.register_service(PUBLISHER, "Printer", object("p"), None).unwrap();
	let hook_b = registry
		.register_service(CONSUMER, LISTENER_HOOK_SERVICE, object("b"), None)
		.unwrap();

	let ids = |registry: &ServiceRegistry| {
		let mut ids: Vec<_> = registry.get_listener_hooks().iter().map(|r| r.service_id()).collect();
		ids.sort();
		ids
	};
	assert_eq!(ids(&registry), vec![hook_a.id(), hook_b.id()]);

	registry.unregister_service(PUBLISHER, &hook_a).unwrap();
	assert_eq!(ids(&registry), vec![hook_b.id()]);

	registry.unregister_services(CONSUMER);
	assert!(ids(&registry).is_empty());
}

#[cfg_attr(test, test)]
pub(crate) fn test_listener_hook_index() {
	inv_listener_hook_index()
}

/// Invariant: `Unregistering` is delivered while the registration is still
/// valid but already unreachable by lookup, so a listener can release cleanly.
pub(crate) fn inv_unregistering_event_sees_valid() {
	let registry = Arc::new_cyclic(|weak: &std::sync::Weak<ServiceRegistry>| {
		let weak = weak.clone();
		ServiceRegistry::new().with_event_sink(move |event: &ServiceEvent| {
			if event.kind != ServiceEventKind::Unregistering {
				return;
			}
			let Some(registry) = weak.upgrade() else {
				return;
			};
			assert!(event.registration.is_valid());
			assert_eq!(event.registration.state(), RegistrationState::Unregistering);
			assert!(registry.get_service_references(Some("Printer"), None).is_empty());
			for reference in registry.get_services_in_use(CONSUMER) {
				assert!(reference.is_valid());
				while registry.unget_service(CONSUMER, &reference) {}
			}
		})
	});

	let registration = registry.register_service(PUBLISHER, "Printer", object("p"), None).unwrap();
	let reference = registry.get_service_reference("Printer").unwrap();
	registry.get_service(CONSUMER, &reference).unwrap();
	registry.get_service(CONSUMER, &reference).unwrap();

	registry.unregister_service(PUBLISHER, &registration).unwrap();
	assert!(!registration.is_valid());
	assert_eq!(registry.ledger_len(), 0);
}

#[cfg_attr(test, test)]
pub(crate) fn test_unregistering_event_sees_valid() {
	inv_unregistering_event_sees_valid()
}
