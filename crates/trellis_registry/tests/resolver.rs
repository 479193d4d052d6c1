//! Property tests for the resolution policy.
//!
//! Four provider types may each be registered, and each registered one may or
//! may not declare the `Role` capability. Resolving `Role` must be absent,
//! unique, or ambiguous exactly according to how many declared it.

use std::sync::Arc;

use proptest::prelude::*;
use trellis_registry::prelude::*;

trait Role: Send + Sync {}

macro_rules! providers {
    ($($name:ident),*) => {
        $(
            struct $name;
            impl Role for $name {}
        )*
    };
}

providers!(Alpha, Beta, Gamma, Delta);

#[derive(Debug, Clone, Copy)]
enum Registration {
    Absent,
    Plain,
    WithRole,
}

fn registration() -> impl Strategy<Value = Registration> {
    prop_oneof![
        Just(Registration::Absent),
        Just(Registration::Plain),
        Just(Registration::WithRole),
    ]
}

fn register<T: Role + 'static>(
    registry: &DependencyRegistry,
    how: Registration,
    make: fn() -> T,
) -> Option<ProviderId> {
    match how {
        Registration::Absent => None,
        Registration::Plain => {
            registry.add(ProviderDescriptor::shared(move |_| make()));
            None
        }
        Registration::WithRole => {
            registry.add(ProviderDescriptor::shared(move |_| make()).implements::<dyn Role>(|r| r));
            Some(ProviderId::of::<T>())
        }
    }
}

proptest! {
    #[test]
    fn resolution_matches_declared_count(
        regs in proptest::array::uniform4(registration())
    ) {
        let registry = DependencyRegistry::new();
        let declared: Vec<ProviderId> = [
            register(&registry, regs[0], || Alpha),
            register(&registry, regs[1], || Beta),
            register(&registry, regs[2], || Gamma),
            register(&registry, regs[3], || Delta),
        ]
        .into_iter()
        .flatten()
        .collect();

        let result = registry.resolve_type::<dyn Role>("prop");
        match declared.len() {
            0 => {
                prop_assert!(matches!(result, Ok(None)));
            }
            1 => {
                let descriptor = result.unwrap().unwrap();
                prop_assert_eq!(descriptor.id(), declared[0]);
            }
            n => {
                let Err(RegistryError::AmbiguousDependency { candidates, .. }) = result else {
                    return Err(TestCaseError::fail("expected ambiguity"));
                };
                prop_assert_eq!(candidates.len(), n);
                let mut sorted = candidates.clone();
                sorted.sort_unstable();
                prop_assert_eq!(candidates, sorted);
            }
        }
    }

    #[test]
    fn registration_order_never_breaks_ties(swap in any::<bool>()) {
        let registry = DependencyRegistry::new();
        if swap {
            register(&registry, Registration::WithRole, || Beta);
            register(&registry, Registration::WithRole, || Alpha);
        } else {
            register(&registry, Registration::WithRole, || Alpha);
            register(&registry, Registration::WithRole, || Beta);
        }

        let err = registry.resolve_type::<dyn Role>("prop").unwrap_err();
        let RegistryError::AmbiguousDependency { candidates, .. } = err else {
            return Err(TestCaseError::fail("expected ambiguity"));
        };
        prop_assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn concrete_type_always_resolves_once_registered(how in registration()) {
        let registry = DependencyRegistry::new();
        let registered = !matches!(how, Registration::Absent);
        register(&registry, how, || Gamma);

        let resolved = registry.resolve_type::<Gamma>("prop").unwrap();
        prop_assert_eq!(resolved.is_some(), registered);
    }
}

/// A concrete configuration type, and a provider that also stands in for it.
struct Settings;

struct TunedSettings;

fn settings_from_tuned(_: Arc<TunedSettings>) -> Arc<Settings> {
    Arc::new(Settings)
}

#[test]
fn type_and_provider_declaring_it_are_ambiguous() {
    let registry = DependencyRegistry::new();
    registry.add(ProviderDescriptor::shared(|_| Settings));
    registry.add(
        ProviderDescriptor::shared(|_| TunedSettings).implements(settings_from_tuned),
    );

    let err = registry.resolve_type::<Settings>("test").unwrap_err();
    let RegistryError::AmbiguousDependency { candidates, .. } = err else {
        panic!("expected ambiguity, got {err:?}");
    };
    assert_eq!(candidates.len(), 2);
    assert!(candidates[0].ends_with("::Settings"));
    assert!(candidates[1].ends_with("::TunedSettings"));
}

#[test]
fn declaring_provider_alone_resolves_to_itself() {
    let registry = DependencyRegistry::new();
    registry.add(
        ProviderDescriptor::shared(|_| TunedSettings).implements(settings_from_tuned),
    );

    let tuned = registry.resolve_type::<TunedSettings>("test").unwrap().unwrap();
    assert!(tuned.name().ends_with("::TunedSettings"));

    let as_settings = registry.resolve_type::<Settings>("test").unwrap().unwrap();
    assert_eq!(as_settings.id(), tuned.id());
}
