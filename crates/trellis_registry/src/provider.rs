//! Provider descriptors and instance scoping.
//!
//! A [`ProviderDescriptor`] couples a concrete provider type with:
//!
//! - the capabilities it satisfies, each with a cast from the concrete type
//!   to the capability type (declared through
//!   [`implements`](ProviderBuilder::implements));
//! - a [`Scope`] deciding whether every resolution shares one instance or gets
//!   a fresh one;
//! - a constructor, which receives an [`Injector`] so providers can depend on
//!   other providers.
//!
//! A provider always satisfies its own concrete type.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_registry::prelude::*;
//!
//! trait Store: Send + Sync {}
//! trait ReadOnlyStore: Send + Sync {}
//!
//! struct MemoryStore;
//! impl Store for MemoryStore {}
//! impl ReadOnlyStore for MemoryStore {}
//!
//! let descriptor: ProviderDescriptor = ProviderDescriptor::factory(|_| MemoryStore)
//!     .implements::<dyn Store>(|s| s)
//!     .implements::<dyn ReadOnlyStore>(|s| s)
//!     .into();
//!
//! assert_eq!(descriptor.scope(), Scope::Factory);
//! assert!(descriptor.satisfies(CapabilityId::of::<dyn Store>()));
//! assert!(descriptor.satisfies(CapabilityId::of::<MemoryStore>()));
//! ```

use core::any::Any;
use core::fmt;
use core::marker::PhantomData;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::capability::{CapabilityId, ProviderId};
use crate::error::RegistryError;
use crate::inject::{Autowired, Injector};

/// Type-erased provider instance.
pub type SharedInstance = Arc<dyn Any + Send + Sync>;

/// Type-erased `Arc<C>` produced by casting an instance to capability `C`.
pub(crate) type ErasedCapability = Box<dyn Any + Send + Sync>;

type Constructor =
    Box<dyn Fn(&Injector<'_>) -> Result<SharedInstance, RegistryError> + Send + Sync>;

type Caster = Box<dyn Fn(SharedInstance) -> Option<ErasedCapability> + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// Scope
// ─────────────────────────────────────────────────────────────────────────────

/// How a provider is instantiated when it is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// One instance, created on first resolution and shared afterwards.
    #[default]
    Shared,
    /// A new instance for every resolution.
    Factory,
}

// ─────────────────────────────────────────────────────────────────────────────
// InstanceCell
// ─────────────────────────────────────────────────────────────────────────────

/// Cache owning the single instance of a [`Scope::Shared`] provider.
///
/// The lock is held while the instance is constructed, so concurrent first
/// resolutions construct exactly once and the losers receive the winner's
/// instance.
#[derive(Default)]
pub struct InstanceCell {
    slot: Mutex<Option<SharedInstance>>,
}

impl InstanceCell {
    /// Creates an empty cell.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Creates a cell that already holds `instance`.
    #[must_use]
    pub fn with_instance(instance: SharedInstance) -> Self {
        Self {
            slot: Mutex::new(Some(instance)),
        }
    }

    /// Returns the cached instance, constructing it with `create` if the cell
    /// is empty.
    ///
    /// A failed construction leaves the cell empty, so a later call retries.
    ///
    /// # Errors
    ///
    /// Returns whatever `create` returns on failure.
    pub fn get_or_create(
        &self,
        create: impl FnOnce() -> Result<SharedInstance, RegistryError>,
    ) -> Result<SharedInstance, RegistryError> {
        let mut slot = self.slot.lock();
        if let Some(instance) = slot.as_ref() {
            return Ok(Arc::clone(instance));
        }
        let instance = create()?;
        *slot = Some(Arc::clone(&instance));
        Ok(instance)
    }

    /// Returns the cached instance without constructing one.
    #[must_use]
    pub fn get(&self) -> Option<SharedInstance> {
        self.slot.lock().clone()
    }

    /// Returns `true` once an instance has been cached.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.slot.lock().is_some()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ProviderDescriptor
// ─────────────────────────────────────────────────────────────────────────────

/// A registered provider: concrete type, capabilities, scope and constructor.
///
/// Build one through [`shared`](Self::shared), [`factory`](Self::factory),
/// [`instance`](Self::instance) or [`autowired`](Self::autowired), then
/// declare capabilities on the returned [`ProviderBuilder`].
pub struct ProviderDescriptor {
    id: ProviderId,
    scope: Scope,
    constructor: Constructor,
    capabilities: HashMap<CapabilityId, Caster>,
    cell: InstanceCell,
}

impl fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("id", &self.id.type_name())
            .field("scope", &self.scope)
            .field("capabilities", &self.capability_names())
            .finish_non_exhaustive()
    }
}

impl ProviderDescriptor {
    /// A provider constructed once, on first resolution.
    pub fn shared<T, F>(constructor: F) -> ProviderBuilder<T>
    where
        T: Send + Sync + 'static,
        F: Fn(&Injector<'_>) -> T + Send + Sync + 'static,
    {
        Self::try_shared(move |injector| Ok(constructor(injector)))
    }

    /// A provider constructed anew for every resolution.
    pub fn factory<T, F>(constructor: F) -> ProviderBuilder<T>
    where
        T: Send + Sync + 'static,
        F: Fn(&Injector<'_>) -> T + Send + Sync + 'static,
    {
        Self::try_factory(move |injector| Ok(constructor(injector)))
    }

    /// Fallible form of [`shared`](Self::shared).
    pub fn try_shared<T, F>(constructor: F) -> ProviderBuilder<T>
    where
        T: Send + Sync + 'static,
        F: Fn(&Injector<'_>) -> Result<T, RegistryError> + Send + Sync + 'static,
    {
        ProviderBuilder::new(Scope::Shared, erase(constructor), InstanceCell::new())
    }

    /// Fallible form of [`factory`](Self::factory).
    pub fn try_factory<T, F>(constructor: F) -> ProviderBuilder<T>
    where
        T: Send + Sync + 'static,
        F: Fn(&Injector<'_>) -> Result<T, RegistryError> + Send + Sync + 'static,
    {
        ProviderBuilder::new(Scope::Factory, erase(constructor), InstanceCell::new())
    }

    /// A provider backed by an already constructed, shared value.
    pub fn instance<T>(value: T) -> ProviderBuilder<T>
    where
        T: Send + Sync + 'static,
    {
        let instance: SharedInstance = Arc::new(value);
        let cell = InstanceCell::with_instance(Arc::clone(&instance));
        ProviderBuilder::new(
            Scope::Shared,
            Box::new(move |_| Ok(Arc::clone(&instance))),
            cell,
        )
    }

    /// A provider whose own dependencies are injected through [`Autowired`].
    pub fn autowired<T>(scope: Scope) -> ProviderBuilder<T>
    where
        T: Autowired + Send + Sync + 'static,
    {
        ProviderBuilder::new(
            scope,
            erase(|injector: &Injector<'_>| injector.construct::<T>()),
            InstanceCell::new(),
        )
    }

    /// Returns the provider's identity.
    #[must_use]
    pub fn id(&self) -> ProviderId {
        self.id
    }

    /// Returns the provider's type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.id.type_name()
    }

    /// Returns the provider's scope.
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Returns `true` if this provider satisfies `capability`.
    #[must_use]
    pub fn satisfies(&self, capability: CapabilityId) -> bool {
        self.capabilities.contains_key(&capability)
    }

    /// Returns every capability this provider satisfies.
    pub fn capabilities(&self) -> impl Iterator<Item = CapabilityId> + '_ {
        self.capabilities.keys().copied()
    }

    /// Returns `true` if this is a shared provider whose instance exists.
    #[must_use]
    pub fn is_instantiated(&self) -> bool {
        self.cell.is_initialized()
    }

    fn capability_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.capabilities.keys().map(CapabilityId::type_name).collect();
        names.sort_unstable();
        names
    }

    /// Produces an instance according to the provider's scope.
    pub(crate) fn instantiate(
        &self,
        injector: &Injector<'_>,
    ) -> Result<SharedInstance, RegistryError> {
        match self.scope {
            Scope::Shared => self.cell.get_or_create(|| (self.constructor)(injector)),
            Scope::Factory => (self.constructor)(injector),
        }
    }

    /// Casts an instance to `capability`, yielding a boxed `Arc<C>`.
    pub(crate) fn cast(
        &self,
        instance: SharedInstance,
        capability: CapabilityId,
    ) -> Result<ErasedCapability, RegistryError> {
        let mismatch = || RegistryError::CapabilityMismatch {
            provider: self.name(),
            capability: capability.type_name(),
        };
        let caster = self.capabilities.get(&capability).ok_or_else(mismatch)?;
        caster(instance).ok_or_else(mismatch)
    }
}

fn erase<T, F>(constructor: F) -> Constructor
where
    T: Send + Sync + 'static,
    F: Fn(&Injector<'_>) -> Result<T, RegistryError> + Send + Sync + 'static,
{
    Box::new(move |injector| constructor(injector).map(|value| Arc::new(value) as SharedInstance))
}

fn caster<T, C>(cast: fn(Arc<T>) -> Arc<C>) -> Caster
where
    T: Send + Sync + 'static,
    C: ?Sized + Send + Sync + 'static,
{
    Box::new(move |instance: SharedInstance| {
        let concrete = instance.downcast::<T>().ok()?;
        Some(Box::new(cast(concrete)) as ErasedCapability)
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// ProviderBuilder
// ─────────────────────────────────────────────────────────────────────────────

/// Typed builder returned by the [`ProviderDescriptor`] constructors.
///
/// Converts into a [`ProviderDescriptor`] via [`build`](Self::build) or `Into`.
#[must_use = "a provider does nothing until it is added to a registry"]
pub struct ProviderBuilder<T> {
    descriptor: ProviderDescriptor,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ProviderBuilder<T> {
    fn new(scope: Scope, constructor: Constructor, cell: InstanceCell) -> Self {
        let id = ProviderId::of::<T>();
        let mut capabilities = HashMap::new();
        capabilities.insert(id.as_capability(), caster::<T, T>(|this| this));

        Self {
            descriptor: ProviderDescriptor {
                id,
                scope,
                constructor,
                capabilities,
                cell,
            },
            _marker: PhantomData,
        }
    }

    /// Declares that `T` satisfies capability `C`.
    ///
    /// `cast` is normally the identity closure `|t| t`, which the compiler
    /// turns into an unsizing coercion from `Arc<T>` to `Arc<dyn Trait>`; it
    /// only compiles if `T` really implements the trait.
    pub fn implements<C>(mut self, cast: fn(Arc<T>) -> Arc<C>) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.descriptor
            .capabilities
            .insert(CapabilityId::of::<C>(), caster::<T, C>(cast));
        self
    }

    /// Finishes the descriptor.
    pub fn build(self) -> ProviderDescriptor {
        self.descriptor
    }
}

impl<T: Send + Sync + 'static> From<ProviderBuilder<T>> for ProviderDescriptor {
    fn from(builder: ProviderBuilder<T>) -> Self {
        builder.build()
    }
}
