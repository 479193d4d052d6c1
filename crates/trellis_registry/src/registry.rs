//! The provider set and its resolver.

use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use trellis_system::api::API;

use crate::capability::{CapabilityId, ProviderId};
use crate::error::RegistryError;
use crate::inject::Injector;
use crate::provider::ProviderDescriptor;

/// Set of registered providers, resolvable by capability.
///
/// Holds at most one descriptor per concrete provider type. Registration and
/// resolution may happen concurrently from any thread; resolution scans a
/// consistent view of the set taken under a read lock, and the lock is
/// released before any provider is constructed.
///
/// Registered as an [`API`] by the core registry plugin so that plugins can
/// contribute providers during build.
#[derive(Default)]
pub struct DependencyRegistry {
    providers: RwLock<HashMap<ProviderId, Arc<ProviderDescriptor>>>,
}

impl API for DependencyRegistry {}

impl fmt::Debug for DependencyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyRegistry")
            .field("providers", &self.provider_names())
            .finish()
    }
}

impl DependencyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider.
    ///
    /// Returns `false` and leaves the registry untouched if a provider of the
    /// same concrete type is already registered.
    pub fn add(&self, descriptor: impl Into<ProviderDescriptor>) -> bool {
        let descriptor = descriptor.into();
        let id = descriptor.id();
        let mut providers = self.providers.write();
        if providers.contains_key(&id) {
            tracing::debug!(provider = id.type_name(), "provider already registered");
            return false;
        }
        tracing::debug!(
            provider = id.type_name(),
            scope = ?descriptor.scope(),
            "registered provider"
        );
        providers.insert(id, Arc::new(descriptor));
        true
    }

    /// Registers a shared provider for `T` with no capabilities beyond its own
    /// type.
    pub fn register_shared<T, F>(&self, constructor: F) -> bool
    where
        T: Send + Sync + 'static,
        F: Fn(&Injector<'_>) -> T + Send + Sync + 'static,
    {
        self.add(ProviderDescriptor::shared(constructor))
    }

    /// Registers a factory provider for `T` with no capabilities beyond its
    /// own type.
    pub fn register_factory<T, F>(&self, constructor: F) -> bool
    where
        T: Send + Sync + 'static,
        F: Fn(&Injector<'_>) -> T + Send + Sync + 'static,
    {
        self.add(ProviderDescriptor::factory(constructor))
    }

    /// Resolves `capability` to its single provider.
    ///
    /// `requester` names whoever asked, for diagnostics only.
    ///
    /// Returns `Ok(None)` when no provider satisfies the capability.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AmbiguousDependency`] when two or more
    /// providers satisfy it, listing all of them sorted by name.
    pub fn resolve(
        &self,
        capability: CapabilityId,
        requester: &str,
    ) -> Result<Option<Arc<ProviderDescriptor>>, RegistryError> {
        let mut matches: Vec<Arc<ProviderDescriptor>> = {
            let providers = self.providers.read();
            providers
                .values()
                .filter(|descriptor| descriptor.satisfies(capability))
                .cloned()
                .collect()
        };

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            _ => {
                let mut candidates: Vec<&'static str> =
                    matches.iter().map(|descriptor| descriptor.name()).collect();
                candidates.sort_unstable();
                tracing::warn!(
                    requester,
                    capability = capability.type_name(),
                    candidates = ?candidates,
                    "ambiguous dependency"
                );
                Err(RegistryError::AmbiguousDependency {
                    requester: requester.to_owned(),
                    capability: capability.type_name(),
                    candidates,
                })
            }
        }
    }

    /// Typed form of [`resolve`](Self::resolve).
    ///
    /// # Errors
    ///
    /// See [`resolve`](Self::resolve).
    pub fn resolve_type<C: ?Sized + 'static>(
        &self,
        requester: &str,
    ) -> Result<Option<Arc<ProviderDescriptor>>, RegistryError> {
        self.resolve(CapabilityId::of::<C>(), requester)
    }

    /// Resolves capability `C` and materializes an instance of it.
    ///
    /// # Errors
    ///
    /// Returns an error if resolution is ambiguous or construction fails.
    pub fn get<C: ?Sized + Send + Sync + 'static>(
        &self,
        requester: &str,
    ) -> Result<Option<Arc<C>>, RegistryError> {
        self.injector().get_for::<C>(requester)
    }

    /// Returns an injector rooted at this registry.
    #[must_use]
    pub fn injector(&self) -> Injector<'_> {
        Injector::new(self)
    }

    /// Returns `true` if provider type `T` is registered.
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.providers.read().contains_key(&ProviderId::of::<T>())
    }

    /// Returns the number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    /// Returns `true` if no providers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }

    /// Returns the type names of all registered providers, sorted.
    #[must_use]
    pub fn provider_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .providers
            .read()
            .keys()
            .map(ProviderId::type_name)
            .collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Scope;

    trait Store: Send + Sync {
        fn label(&self) -> &'static str;
    }

    struct MemoryStore;
    impl Store for MemoryStore {
        fn label(&self) -> &'static str {
            "memory"
        }
    }

    struct DiskStore;
    impl Store for DiskStore {
        fn label(&self) -> &'static str {
            "disk"
        }
    }

    #[test]
    fn add_is_idempotent_per_provider_type() {
        let registry = DependencyRegistry::new();
        assert!(registry.add(ProviderDescriptor::shared(|_| MemoryStore)));
        assert!(!registry.add(ProviderDescriptor::factory(|_| MemoryStore)));
        assert_eq!(registry.len(), 1);

        let descriptor = registry
            .resolve_type::<MemoryStore>("test")
            .unwrap()
            .unwrap();
        assert_eq!(descriptor.scope(), Scope::Shared);
    }

    #[test]
    fn resolve_absent_is_none() {
        let registry = DependencyRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.resolve_type::<dyn Store>("test").unwrap().is_none());
    }

    #[test]
    fn resolve_single_match() {
        let registry = DependencyRegistry::new();
        registry.add(ProviderDescriptor::shared(|_| MemoryStore).implements::<dyn Store>(|s| s));

        let descriptor = registry.resolve_type::<dyn Store>("test").unwrap().unwrap();
        assert_eq!(descriptor.id(), ProviderId::of::<MemoryStore>());
    }

    #[test]
    fn resolve_multiple_matches_is_ambiguous() {
        let registry = DependencyRegistry::new();
        registry.add(ProviderDescriptor::shared(|_| MemoryStore).implements::<dyn Store>(|s| s));
        registry.add(ProviderDescriptor::shared(|_| DiskStore).implements::<dyn Store>(|s| s));

        let err = registry.resolve_type::<dyn Store>("Consumer").unwrap_err();
        let RegistryError::AmbiguousDependency {
            requester,
            candidates,
            ..
        } = err
        else {
            panic!("expected ambiguity, got {err:?}");
        };
        assert_eq!(requester, "Consumer");
        assert_eq!(candidates.len(), 2);
        assert!(candidates.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn concrete_type_stays_resolvable_when_trait_is_ambiguous() {
        let registry = DependencyRegistry::new();
        registry.add(ProviderDescriptor::shared(|_| MemoryStore).implements::<dyn Store>(|s| s));
        registry.add(ProviderDescriptor::shared(|_| DiskStore).implements::<dyn Store>(|s| s));

        let disk = registry.get::<DiskStore>("test").unwrap().unwrap();
        assert_eq!(disk.label(), "disk");
    }

    #[test]
    fn get_materializes_through_capability() {
        let registry = DependencyRegistry::new();
        registry.add(ProviderDescriptor::shared(|_| DiskStore).implements::<dyn Store>(|s| s));

        let store = registry.get::<dyn Store>("test").unwrap().unwrap();
        assert_eq!(store.label(), "disk");
        assert!(registry.contains::<DiskStore>());
        assert!(!registry.contains::<MemoryStore>());
    }

    #[test]
    fn provider_names_are_sorted() {
        let registry = DependencyRegistry::new();
        registry.add(ProviderDescriptor::shared(|_| MemoryStore));
        registry.add(ProviderDescriptor::shared(|_| DiskStore));

        let names = registry.provider_names();
        assert_eq!(names.len(), 2);
        assert!(names[0] < names[1]);
    }
}
