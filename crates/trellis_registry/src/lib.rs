//! Type-directed dependency registry for Trellis.
//!
//! Providers are registered once with the capabilities they satisfy and are
//! resolved by capability on demand:
//!
//! - [`capability`] - identifiers for capability and provider types
//! - [`provider`] - [`ProviderDescriptor`], its [`Scope`] and the shared-instance cache
//! - [`registry`] - the [`DependencyRegistry`] set and its resolver
//! - [`inject`] - construction-time autowiring through [`Autowired`] and [`Injector`]
//! - [`error`] - [`RegistryError`]
//!
//! # Resolution Policy
//!
//! Resolving a capability looks at every provider that declared it. Exactly
//! one match resolves; no match is "absent" (`Ok(None)`), which callers treat
//! as an unsatisfied dependency rather than a failure; two or more matches is
//! [`RegistryError::AmbiguousDependency`]. Registration order never breaks
//! ties.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_registry::prelude::*;
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! struct FixedClock;
//! impl Clock for FixedClock {
//!     fn now(&self) -> u64 { 42 }
//! }
//!
//! let registry = DependencyRegistry::new();
//! registry.add(ProviderDescriptor::shared(|_| FixedClock).implements::<dyn Clock>(|c| c));
//!
//! let clock: Arc<dyn Clock> = registry.get::<dyn Clock>("example").unwrap().unwrap();
//! assert_eq!(clock.now(), 42);
//! ```

pub mod capability;
pub mod error;
pub mod inject;
pub mod provider;
pub mod registry;

pub use capability::{CapabilityId, ProviderId};
pub use error::RegistryError;
pub use inject::{Autowired, DependencySlot, Injector, ResolvedSlots, Slots};
pub use provider::{InstanceCell, ProviderBuilder, ProviderDescriptor, Scope};
pub use registry::DependencyRegistry;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::capability::{CapabilityId, ProviderId};
    pub use crate::error::RegistryError;
    pub use crate::inject::{Autowired, Injector, ResolvedSlots, Slots};
    pub use crate::provider::{ProviderDescriptor, Scope};
    pub use crate::registry::DependencyRegistry;
}
