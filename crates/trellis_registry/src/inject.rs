//! Construction-time dependency injection.
//!
//! A type that implements [`Autowired`] declares named dependency slots, each
//! asking for one capability. When the type is constructed through an
//! [`Injector`], every slot is resolved against the registry in declaration
//! order:
//!
//! - exactly one provider: the slot is filled with its instance;
//! - no provider: the slot is left unset, and [`Autowired::assemble`] decides
//!   whether that is acceptable (see [`ResolvedSlots::take`] and
//!   [`ResolvedSlots::require`]);
//! - several providers: construction fails with
//!   [`RegistryError::AmbiguousDependency`] naming the type being built.
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
//!     fn now(&self) -> u64 { 7 }
//! }
//!
//! struct Scheduler {
//!     clock: Arc<dyn Clock>,
//!     audit: Option<Arc<dyn core::fmt::Debug + Send + Sync>>,
//! }
//!
//! impl Autowired for Scheduler {
//!     fn slots(slots: &mut Slots) {
//!         slots
//!             .slot::<dyn Clock>("clock")
//!             .slot::<dyn core::fmt::Debug + Send + Sync>("audit");
//!     }
//!
//!     fn assemble(resolved: &mut ResolvedSlots) -> Result<Self, RegistryError> {
//!         Ok(Self {
//!             clock: resolved.require("clock")?,
//!             audit: resolved.take("audit"),
//!         })
//!     }
//! }
//!
//! let registry = DependencyRegistry::new();
//! registry.add(ProviderDescriptor::shared(|_| FixedClock).implements::<dyn Clock>(|c| c));
//!
//! let scheduler = registry.injector().construct::<Scheduler>().unwrap();
//! assert_eq!(scheduler.clock.now(), 7);
//! assert!(scheduler.audit.is_none());
//! ```

use core::any::type_name;
use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::capability::{CapabilityId, ProviderId};
use crate::error::RegistryError;
use crate::provider::{ErasedCapability, ProviderDescriptor};
use crate::registry::DependencyRegistry;

/// Requester name used when resolution does not happen on behalf of a provider.
const ROOT_REQUESTER: &str = "<registry>";

// ─────────────────────────────────────────────────────────────────────────────
// Autowired
// ─────────────────────────────────────────────────────────────────────────────

/// A type whose dependencies are filled in by the registry at construction.
pub trait Autowired: Sized {
    /// Declares this type's dependency slots, in resolution order.
    fn slots(slots: &mut Slots);

    /// Builds the value from the resolved slots.
    ///
    /// # Errors
    ///
    /// Typically [`RegistryError::Unsatisfied`] from
    /// [`ResolvedSlots::require`] when a mandatory slot was left unset.
    fn assemble(resolved: &mut ResolvedSlots) -> Result<Self, RegistryError>;
}

/// One declared dependency slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencySlot {
    /// Slot name, unique within its declaring type.
    pub name: &'static str,
    /// The capability the slot asks for.
    pub capability: CapabilityId,
}

/// Ordered list of slots declared by an [`Autowired`] type.
#[derive(Debug, Default)]
pub struct Slots {
    slots: Vec<DependencySlot>,
}

impl Slots {
    /// Declares a slot named `name` asking for capability `C`.
    ///
    /// Redeclaring a name replaces the earlier declaration in place.
    pub fn slot<C: ?Sized + Send + Sync + 'static>(&mut self, name: &'static str) -> &mut Self {
        let slot = DependencySlot {
            name,
            capability: CapabilityId::of::<C>(),
        };
        match self.slots.iter_mut().find(|existing| existing.name == name) {
            Some(existing) => *existing = slot,
            None => self.slots.push(slot),
        }
        self
    }

    /// Returns the declared slots in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &DependencySlot> {
        self.slots.iter()
    }

    /// Returns the number of declared slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no slots are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Slot values produced by an [`Injector`], consumed by [`Autowired::assemble`].
pub struct ResolvedSlots {
    requester: &'static str,
    declared: HashMap<&'static str, CapabilityId>,
    values: HashMap<&'static str, ErasedCapability>,
}

impl fmt::Debug for ResolvedSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set: Vec<_> = self.values.keys().copied().collect();
        set.sort_unstable();
        f.debug_struct("ResolvedSlots")
            .field("requester", &self.requester)
            .field("set", &set)
            .finish_non_exhaustive()
    }
}

impl ResolvedSlots {
    fn new(requester: &'static str) -> Self {
        Self {
            requester,
            declared: HashMap::new(),
            values: HashMap::new(),
        }
    }

    /// Takes the value of slot `name`, or `None` if the slot was left unset.
    ///
    /// Also `None` when `C` differs from the capability the slot declared.
    pub fn take<C: ?Sized + Send + Sync + 'static>(&mut self, name: &str) -> Option<Arc<C>> {
        let value = self.values.remove(name)?;
        value.downcast::<Arc<C>>().ok().map(|boxed| *boxed)
    }

    /// Takes the value of slot `name`, failing if it was left unset.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Unsatisfied`] if the slot has no value.
    pub fn require<C: ?Sized + Send + Sync + 'static>(
        &mut self,
        name: &'static str,
    ) -> Result<Arc<C>, RegistryError> {
        self.take::<C>(name).ok_or_else(|| RegistryError::Unsatisfied {
            requester: self.requester.to_owned(),
            slot: name,
            capability: self
                .declared
                .get(name)
                .map_or_else(type_name::<C>, CapabilityId::type_name),
        })
    }

    /// Returns `true` if slot `name` holds a value that has not been taken.
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Returns the name of the type being assembled.
    #[must_use]
    pub fn requester(&self) -> &'static str {
        self.requester
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Injector
// ─────────────────────────────────────────────────────────────────────────────

/// Resolves and materializes dependencies against a [`DependencyRegistry`].
///
/// Provider constructors receive an injector that remembers which providers
/// are currently being constructed, so a provider that (transitively)
/// depends on itself fails with [`RegistryError::CircularDependency`]
/// instead of recursing.
pub struct Injector<'a> {
    registry: &'a DependencyRegistry,
    path: Vec<ProviderId>,
}

impl fmt::Debug for Injector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("path", &self.path_names())
            .finish_non_exhaustive()
    }
}

impl<'a> Injector<'a> {
    pub(crate) fn new(registry: &'a DependencyRegistry) -> Self {
        Self {
            registry,
            path: Vec::new(),
        }
    }

    /// Returns the registry this injector resolves against.
    #[must_use]
    pub fn registry(&self) -> &'a DependencyRegistry {
        self.registry
    }

    /// Returns the provider currently being constructed, if any.
    #[must_use]
    pub fn current(&self) -> Option<ProviderId> {
        self.path.last().copied()
    }

    /// Resolves capability `C` on behalf of the provider being constructed.
    ///
    /// # Errors
    ///
    /// Returns an error if resolution is ambiguous, the graph is circular, or
    /// construction fails.
    pub fn get<C: ?Sized + Send + Sync + 'static>(&self) -> Result<Option<Arc<C>>, RegistryError> {
        let requester = self.current().map_or(ROOT_REQUESTER, |id| id.type_name());
        self.get_for::<C>(requester)
    }

    /// Resolves capability `C`, naming `requester` in diagnostics.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_for<C: ?Sized + Send + Sync + 'static>(
        &self,
        requester: &str,
    ) -> Result<Option<Arc<C>>, RegistryError> {
        let capability = CapabilityId::of::<C>();
        let Some(descriptor) = self.registry.resolve(capability, requester)? else {
            return Ok(None);
        };
        let erased = self.materialize(&descriptor, capability)?;
        erased
            .downcast::<Arc<C>>()
            .map(|boxed| Some(*boxed))
            .map_err(|_| RegistryError::CapabilityMismatch {
                provider: descriptor.name(),
                capability: capability.type_name(),
            })
    }

    /// Constructs `T` by resolving each of its declared slots.
    ///
    /// `T` itself need not be registered.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AmbiguousDependency`] if any slot matches
    /// several providers, any error from materializing a slot's provider, or
    /// whatever [`Autowired::assemble`] returns.
    pub fn construct<T: Autowired + 'static>(&self) -> Result<T, RegistryError> {
        let requester = type_name::<T>();
        let mut slots = Slots::default();
        T::slots(&mut slots);

        let mut resolved = ResolvedSlots::new(requester);
        for slot in slots.iter() {
            resolved.declared.insert(slot.name, slot.capability);
            match self.registry.resolve(slot.capability, requester)? {
                Some(descriptor) => {
                    let value = self.materialize(&descriptor, slot.capability)?;
                    resolved.values.insert(slot.name, value);
                }
                None => tracing::debug!(
                    requester,
                    slot = slot.name,
                    capability = slot.capability.type_name(),
                    "no provider, slot left unset"
                ),
            }
        }

        T::assemble(&mut resolved)
    }

    /// Produces an instance of `descriptor` cast to `capability`.
    fn materialize(
        &self,
        descriptor: &ProviderDescriptor,
        capability: CapabilityId,
    ) -> Result<ErasedCapability, RegistryError> {
        let id = descriptor.id();
        if self.path.contains(&id) {
            let mut path = self.path_names();
            path.push(id.type_name());
            return Err(RegistryError::CircularDependency { path });
        }

        let mut path = self.path.clone();
        path.push(id);
        let child = Injector {
            registry: self.registry,
            path,
        };

        let instance = descriptor.instantiate(&child)?;
        descriptor.cast(instance, capability)
    }

    fn path_names(&self) -> Vec<&'static str> {
        self.path.iter().map(ProviderId::type_name).collect()
    }
}
