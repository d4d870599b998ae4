//! Service registry orchestrator.
//!
//! # Role
//!
//! [`ServiceRegistry`] ties registrations, references and the usage ledger
//! together behind a single reentrant lock, and reports every registration
//! transition to the owning runtime through a [`ServiceEventSink`].
//!
//! # Mental Model
//!
//! 1. **Publish:** a bundle registers an object or a factory under a name. The
//!    registration is indexed by publishing bundle (and in the hooks index when
//!    published under the listener-hook name), then `Registered` fires.
//! 2. **Find:** lookups scan Active registrations and mint a fresh
//!    [`ServiceReference`] per hit.
//! 3. **Bind:** `get_service` counts a use for the `(bundle, reference)` pair
//!    and resolves the object outside the lock; `unget_service` releases it.
//! 4. **Withdraw:** unregistration is two-phase. The registration leaves the
//!    indexes under the lock, `Unregistering` fires with the lock released,
//!    then leftover usage is drained and the registration turns Invalid.
//!
//! # Invariants
//!
//! - Service ids are strictly increasing and never reused.
//!   - Enforced in: [`ServiceRegistry::register_service`].
//!   - Tested by: `invariants::test_ids_strictly_increasing`
//!   - Failure symptom: two registrations answer to the same `service.id`.
//!
//! - Unregistering twice is a no-op the second time.
//!   - Enforced in: `ServiceRegistration::begin_unregister` (compare-exchange).
//!   - Tested by: `invariants::test_unregister_idempotent`
//!   - Failure symptom: duplicate `Unregistering` events.
//!
//! - A withdrawn registration is never found again and never yields an object.
//!   - Enforced in: [`ServiceRegistry::unregister_service`], [`ServiceRegistry::get_service`] (re-check after resolution).
//!   - Tested by: `invariants::test_unregistered_not_found`
//!   - Failure symptom: consumers bind to a service whose publisher is gone.
//!
//! - N gets followed by N ungets leave no ledger entry behind.
//!   - Enforced in: `Ledger::release`.
//!   - Tested by: `invariants::test_usage_round_trip`
//!   - Failure symptom: cached objects outlive every consumer.
//!
//! - The hooks index holds exactly the Active listener-hook registrations.
//!   - Enforced in: [`ServiceRegistry::register_service`], [`ServiceRegistry::unregister_service`].
//!   - Tested by: `invariants::test_listener_hook_index`
//!   - Failure symptom: listener dispatch consults withdrawn hooks.
//!
//! - `Unregistering` is observed while the registration is still valid.
//!   - Enforced in: [`ServiceRegistry::unregister_service`].
//!   - Tested by: `invariants::test_unregistering_event_sees_valid`
//!   - Failure symptom: listeners cannot release their usage cleanly.
//!
//! # Concurrency
//!
//! Every index and ledger mutation happens with the lock held. Events,
//! factory calls and factory releases happen with the lock released, so any
//! of them may call back into the registry. Filters are evaluated on
//! property snapshots after the lock is released, so they may call back too.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use keel_table::IndexedTable;
use parking_lot::ReentrantMutex;

use crate::service::ServiceSource;
use crate::usage::{Ledger, Released, Store};
use crate::{
	BundleId, ConfigError, Filter, Properties, ReferenceId, RegistrationState, RegistryConfig, RegistryError, Result,
	ServiceEvent, ServiceEventKind, ServiceEventSink, ServiceFactory, ServiceObject, ServiceReference,
	ServiceRegistration,
};

#[cfg(test)]
mod invariants;

struct RegistryState {
	/// Registrations by publishing bundle, in registration order per bundle.
	registrations: IndexedTable<BundleId, Vec<ServiceRegistration>>,
	/// Active registrations published under the listener-hook name.
	listener_hooks: Vec<ServiceRegistration>,
	ledger: Ledger,
	next_service_id: u64,
}

impl RegistryState {
	fn active(&self) -> impl Iterator<Item = &ServiceRegistration> {
		self.registrations
			.values()
			.flatten()
			.filter(|r| r.state() == RegistrationState::Active)
	}

	/// True if `registration` is one of this registry's Active registrations.
	fn is_indexed(&self, registration: &ServiceRegistration) -> bool {
		self.registrations
			.get(&registration.bundle())
			.is_some_and(|owned| owned.contains(registration))
	}

	fn unindex(&mut self, registration: &ServiceRegistration) {
		let bundle = registration.bundle();
		if let Some(owned) = self.registrations.get_mut(&bundle) {
			owned.retain(|r| r != registration);
			if owned.is_empty() {
				self.registrations.remove(&bundle);
			}
		}
		self.listener_hooks.retain(|r| r != registration);
	}
}

/// Concurrent publish/find/bind registry shared by every bundle of a runtime.
pub struct ServiceRegistry {
	config: RegistryConfig,
	state: ReentrantMutex<RefCell<RegistryState>>,
	next_reference_id: AtomicU64,
	sink: Option<Arc<dyn ServiceEventSink>>,
}

impl Default for ServiceRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl ServiceRegistry {
	/// Creates a registry with the default configuration and no event sink.
	pub fn new() -> Self {
		Self::build(RegistryConfig::default())
	}

	pub fn with_config(config: RegistryConfig) -> Result<Self, ConfigError> {
		config.validate()?;
		Ok(Self::build(config))
	}

	/// Routes registry events to `sink`.
	pub fn with_event_sink(mut self, sink: impl ServiceEventSink + 'static) -> Self {
		self.sink = Some(Arc::new(sink));
		self
	}

	fn build(config: RegistryConfig) -> Self {
		let state = RegistryState {
			registrations: IndexedTable::with_capacity(config.initial_capacity),
			listener_hooks: Vec::new(),
			ledger: Ledger::with_capacity(config.initial_capacity),
			next_service_id: config.first_service_id,
		};
		Self {
			config,
			state: ReentrantMutex::new(RefCell::new(state)),
			next_reference_id: AtomicU64::new(1),
			sink: None,
		}
	}

	pub fn config(&self) -> &RegistryConfig {
		&self.config
	}

	fn with_state<R>(&self, f: impl FnOnce(&mut RegistryState) -> R) -> R {
		let guard = self.state.lock();
		let mut state = guard.borrow_mut();
		f(&mut state)
	}

	fn read_state<R>(&self, f: impl FnOnce(&RegistryState) -> R) -> R {
		let guard = self.state.lock();
		let state = guard.borrow();
		f(&state)
	}

	fn mint_reference(&self, registration: &ServiceRegistration) -> ServiceReference {
		let id = self.next_reference_id.fetch_add(1, Ordering::Relaxed);
		ServiceReference::new(ReferenceId::new(id), registration)
	}

	fn notify(&self, kind: ServiceEventKind, registration: &ServiceRegistration, old_properties: Option<Properties>) {
		let Some(sink) = &self.sink else {
			return;
		};
		sink.service_changed(&ServiceEvent {
			kind,
			registration: registration.clone(),
			old_properties,
		});
	}

	/// Publishes `service` under `name` on behalf of `bundle`.
	pub fn register_service(
		&self,
		bundle: BundleId,
		name: &str,
		service: ServiceObject,
		properties: Option<Properties>,
	) -> Result<ServiceRegistration> {
		self.register(bundle, name, ServiceSource::Object(service), properties)
	}

	/// Publishes a factory under `name`; every consuming bundle gets its own instance.
	pub fn register_service_factory(
		&self,
		bundle: BundleId,
		name: &str,
		factory: Arc<dyn ServiceFactory>,
		properties: Option<Properties>,
	) -> Result<ServiceRegistration> {
		self.register(bundle, name, ServiceSource::Factory(factory), properties)
	}

	fn register(
		&self,
		bundle: BundleId,
		name: &str,
		source: ServiceSource,
		properties: Option<Properties>,
	) -> Result<ServiceRegistration> {
		if name.trim().is_empty() {
			return Err(RegistryError::EmptyServiceName);
		}

		let registration = self.with_state(|state| -> Result<ServiceRegistration> {
			let id = crate::ServiceId::new(state.next_service_id);
			let registration = ServiceRegistration::new(id, name, bundle, source, properties);
			state
				.registrations
				.get_or_insert_with(bundle, Vec::new)?
				.push(registration.clone());
			if name == self.config.listener_hook_service {
				state.listener_hooks.push(registration.clone());
			}
			state.next_service_id += 1;
			Ok(registration)
		})?;

		tracing::debug!(
			service = %registration.id(),
			name,
			%bundle,
			factory = registration.is_factory(),
			"service registered"
		);
		self.notify(ServiceEventKind::Registered, &registration, None);
		Ok(registration)
	}

	/// Withdraws `registration`. Only its publisher may do so.
	///
	/// Returns `Ok(false)` if the registration was already withdrawn or was
	/// never published through this registry.
	pub fn unregister_service(&self, bundle: BundleId, registration: &ServiceRegistration) -> Result<bool> {
		if registration.bundle() != bundle {
			return Err(RegistryError::NotOwner {
				service: registration.id(),
				owner: registration.bundle(),
				caller: bundle,
			});
		}
		Ok(self.withdraw(registration))
	}

	/// Withdraws everything `bundle` published. Returns how many registrations were withdrawn.
	pub fn unregister_services(&self, bundle: BundleId) -> usize {
		let owned = self.read_state(|state| state.registrations.get(&bundle).cloned().unwrap_or_default());
		owned.iter().filter(|registration| self.withdraw(registration)).count()
	}

	fn withdraw(&self, registration: &ServiceRegistration) -> bool {
		let started = self.with_state(|state| {
			if !state.is_indexed(registration) || !registration.begin_unregister() {
				return false;
			}
			state.unindex(registration);
			true
		});
		if !started {
			tracing::trace!(service = %registration.id(), "service not registered here");
			return false;
		}

		self.notify(ServiceEventKind::Unregistering, registration, None);

		let (released, reclaimed) = self.with_state(|state| {
			let mut released = Vec::new();
			let mut reclaimed = 0usize;
			for (holder, reference) in state.ledger.holders_of(registration) {
				loop {
					match state.ledger.release(holder, reference, false) {
						Released::NotFound => break,
						Released::Decremented(_) => reclaimed += 1,
						Released::Flushed(service) => {
							reclaimed += 1;
							released.extend(service.map(|service| (holder, service)));
							break;
						}
					}
				}
			}
			registration.invalidate();
			(released, reclaimed)
		});

		if reclaimed > 0 {
			tracing::warn!(
				service = %registration.id(),
				reclaimed,
				"reclaimed usage not released before unregistration"
			);
		}
		for (holder, service) in released {
			registration.release(holder, service);
		}
		tracing::debug!(service = %registration.id(), bundle = %registration.bundle(), "service unregistered");
		true
	}

	/// References to every Active registration matching `name` and `filter`.
	///
	/// `None` matches everything. Order follows the internal scan and is not
	/// stable across registrations. The filter sees a properties snapshot
	/// taken under the lock and runs after it is released.
	pub fn get_service_references(&self, name: Option<&str>, filter: Option<&dyn Filter>) -> Vec<ServiceReference> {
		let candidates: Vec<(ServiceRegistration, Properties)> = self.read_state(|state| {
			state
				.active()
				.filter(|r| name.is_none_or(|name| r.name() == name))
				.map(|r| (r.clone(), r.properties()))
				.collect()
		});
		candidates
			.into_iter()
			.filter(|(_, properties)| filter.is_none_or(|filter| filter.matches(properties)))
			.map(|(registration, _)| self.mint_reference(&registration))
			.collect()
	}

	/// Reference to the Active registration named `name` with the lowest service id.
	pub fn get_service_reference(&self, name: &str) -> Option<ServiceReference> {
		let first = self.read_state(|state| state.active().filter(|r| r.name() == name).min_by_key(|r| r.id()).cloned());
		first.map(|r| self.mint_reference(&r))
	}

	/// References to everything `bundle` currently publishes, in registration order.
	pub fn get_registered_services(&self, bundle: BundleId) -> Vec<ServiceReference> {
		let owned = self.read_state(|state| state.registrations.get(&bundle).cloned().unwrap_or_default());
		owned.iter().filter(|r| r.is_valid()).map(|r| self.mint_reference(r)).collect()
	}

	/// References `bundle` currently holds usage on.
	pub fn get_services_in_use(&self, bundle: BundleId) -> Vec<ServiceReference> {
		self.read_state(|state| state.ledger.references_in_use(bundle))
	}

	/// References to the Active registrations published under the listener-hook name.
	pub fn get_listener_hooks(&self) -> Vec<ServiceReference> {
		let hooks = self.read_state(|state| state.listener_hooks.clone());
		hooks.iter().map(|r| self.mint_reference(r)).collect()
	}

	/// Bundles holding nonzero usage of `reference`.
	pub fn get_using_bundles(&self, reference: &ServiceReference) -> Vec<BundleId> {
		self.read_state(|state| state.ledger.using_bundles(reference.id()))
	}

	pub fn usage_count(&self, bundle: BundleId, reference: &ServiceReference) -> Option<u32> {
		self.read_state(|state| state.ledger.count(bundle, reference.id()))
	}

	/// Number of Active registrations.
	pub fn registration_count(&self) -> usize {
		self.read_state(|state| state.active().count())
	}

	/// Binds `bundle` to the service behind `reference` and counts one use.
	///
	/// Returns `None` when the registration is invalid, when the factory
	/// produced nothing, or when the registration was withdrawn while the
	/// object was being resolved. Each successful call must be matched by an
	/// [`unget_service`](Self::unget_service).
	pub fn get_service(&self, bundle: BundleId, reference: &ServiceReference) -> Option<ServiceObject> {
		let registration = reference.registration()?;

		let acquired = self.with_state(|state| {
			registration
				.is_valid()
				.then(|| state.ledger.acquire(bundle, reference))
		})?;
		let cached = match acquired {
			Ok(cached) => cached,
			Err(err) => {
				tracing::warn!(%bundle, service = %registration.id(), %err, "usage ledger could not grow");
				return None;
			}
		};

		let fresh = cached.is_none();
		let service = match cached {
			Some(service) => Some(service),
			None => registration.resolve(bundle),
		};
		if service.is_none() {
			tracing::warn!(%bundle, service = %registration.id(), "service factory produced no object");
		}

		let (result, released) = self.with_state(|state| {
			let valid = registration.is_valid();
			match service {
				Some(service) if valid && !fresh => (Some(service), Vec::new()),
				Some(service) if valid => match state.ledger.store(bundle, reference.id(), service) {
					Store::Kept(service) => (Some(service), Vec::new()),
					Store::Existing { cached, redundant } => (Some(cached), vec![redundant]),
					Store::Missing(service) => (None, vec![service]),
				},
				service => {
					// Withdrawn mid-resolution, or nothing was produced.
					let mut released: Vec<ServiceObject> = service.filter(|_| fresh).into_iter().collect();
					if let Released::Flushed(Some(cached)) = state.ledger.release(bundle, reference.id(), !valid) {
						released.push(cached);
					}
					(None, released)
				}
			}
		});

		for service in released {
			registration.release(bundle, service);
		}
		tracing::trace!(%bundle, service = %registration.id(), reference = reference.id().get(), bound = result.is_some(), "get service");
		result
	}

	/// Releases one use of `reference` by `bundle`.
	///
	/// Returns false when `bundle` held no usage of it, so callers can drain
	/// with `while registry.unget_service(..) {}`.
	pub fn unget_service(&self, bundle: BundleId, reference: &ServiceReference) -> bool {
		let registration = reference.upgrade();
		let outcome = self.with_state(|state| {
			let force = registration.as_ref().is_none_or(|r| !r.is_valid());
			state.ledger.release(bundle, reference.id(), force)
		});

		match outcome {
			Released::NotFound => false,
			Released::Decremented(count) => {
				tracing::trace!(%bundle, service = %reference.service_id(), count, "unget service");
				true
			}
			Released::Flushed(service) => {
				tracing::trace!(%bundle, service = %reference.service_id(), "usage flushed");
				if let (Some(registration), Some(service)) = (registration, service) {
					registration.release(bundle, service);
				}
				true
			}
		}
	}

	/// Releases every use `bundle` holds.
	pub fn unget_services(&self, bundle: BundleId) {
		for reference in self.get_services_in_use(bundle) {
			while self.unget_service(bundle, &reference) {}
		}
	}

	/// Replaces the properties of `registration` and fires `Modified`.
	///
	/// The registry-owned keys are re-stamped. Returns false, and fires
	/// nothing, once the registration has started unregistering.
	pub fn set_service_properties(&self, registration: &ServiceRegistration, properties: Properties) -> bool {
		let old = self.with_state(|state| {
			state
				.is_indexed(registration)
				.then(|| registration.replace_properties(properties))
		});
		let Some(old) = old else {
			return false;
		};
		tracing::debug!(service = %registration.id(), "service properties replaced");
		self.service_properties_modified(registration, old);
		true
	}

	/// Fires `Modified` for `registration` carrying `old_properties`.
	pub fn service_properties_modified(&self, registration: &ServiceRegistration, old_properties: Properties) {
		self.notify(ServiceEventKind::Modified, registration, Some(old_properties));
	}

	#[cfg(test)]
	fn ledger_len(&self) -> usize {
		self.read_state(|state| state.ledger.len())
	}
}

impl fmt::Debug for ServiceRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ServiceRegistry")
			.field("config", &self.config)
			.field("registrations", &self.registration_count())
			.field("sink", &self.sink.is_some())
			.finish()
	}
}
