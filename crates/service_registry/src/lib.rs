//! Dynamic service registry for bundle runtimes.
//!
//! Bundles publish services under a name with a set of string properties,
//! other bundles look them up by name and filter, bind to them with
//! [`ServiceRegistry::get_service`] and release them with
//! [`ServiceRegistry::unget_service`]. The registry tracks usage per
//! consuming bundle so it can reclaim everything when a publisher withdraws.
//!
//! ```
//! use std::sync::Arc;
//!
//! use keel_service_registry::{BundleId, Properties, ServiceRegistry, downcast_service};
//!
//! let registry = ServiceRegistry::new();
//! let printer = BundleId(1);
//! let consumer = BundleId(2);
//!
//! let registration = registry
//! 	.register_service(printer, "Printer", Arc::new(String::from("lp0")), Some(Properties::new().with("id", "A")))
//! 	.unwrap();
//!
//! let reference = registry.get_service_reference("Printer").unwrap();
//! let service = registry.get_service(consumer, &reference).unwrap();
//! assert_eq!(downcast_service::<String>(service).unwrap().as_str(), "lp0");
//!
//! assert!(registry.unget_service(consumer, &reference));
//! assert!(registry.unregister_service(printer, &registration).unwrap());
//! assert!(registry.get_service(consumer, &reference).is_none());
//! ```

mod config;
mod error;
mod event;
mod filter;
mod ids;
mod properties;
mod reference;
mod registration;
mod registry;
mod service;
mod usage;

pub use config::{LISTENER_HOOK_SERVICE, RegistryConfig};
pub use error::{ConfigError, RegistryError, Result};
pub use event::{ServiceEvent, ServiceEventKind, ServiceEventSink};
pub use filter::{Filter, PropertyEquals};
pub use ids::{BundleId, ReferenceId, ServiceId};
pub use properties::{OBJECTCLASS, Properties, SERVICE_ID};
pub use reference::ServiceReference;
pub use registration::{RegistrationState, ServiceRegistration};
pub use registry::ServiceRegistry;
pub use service::{ServiceFactory, ServiceObject, downcast_service};
