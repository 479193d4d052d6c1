//! Identifiers for capability and provider types.
//!
//! A capability is whatever a consumer asks for, usually a trait object type
//! such as `dyn Clock`. A provider is the concrete type registered to satisfy
//! one or more capabilities.

use core::any::TypeId;
use core::fmt;

/// Identifier for a requested capability type.
///
/// Accepts unsized types, so `CapabilityId::of::<dyn Clock>()` is the usual
/// way to name a trait-object capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapabilityId {
    type_id: TypeId,
    type_name: &'static str,
}

impl CapabilityId {
    /// Creates a `CapabilityId` for the given type.
    #[must_use]
    pub fn of<C: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            type_name: core::any::type_name::<C>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// Identity of a registered provider: its concrete type.
///
/// The registry holds at most one provider per `ProviderId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderId {
    type_id: TypeId,
    type_name: &'static str,
}

impl ProviderId {
    /// Creates a `ProviderId` for the given concrete type.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The capability under which the provider can be requested by its own
    /// concrete type.
    #[must_use]
    pub fn as_capability(&self) -> CapabilityId {
        CapabilityId {
            type_id: self.type_id,
            type_name: self.type_name,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Marker {}

    #[test]
    fn capability_id_accepts_trait_objects() {
        let id = CapabilityId::of::<dyn Marker>();
        assert_eq!(id, CapabilityId::of::<dyn Marker>());
        assert_eq!(id.type_id(), TypeId::of::<dyn Marker>());
        assert!(id.type_name().contains("Marker"));
    }

    #[test]
    fn provider_id_maps_to_its_own_capability() {
        let provider = ProviderId::of::<String>();
        assert_eq!(provider.as_capability(), CapabilityId::of::<String>());
        assert_ne!(provider.as_capability(), CapabilityId::of::<dyn Marker>());
    }

    #[test]
    fn display_uses_type_name() {
        let id = ProviderId::of::<String>();
        assert_eq!(id.to_string(), core::any::type_name::<String>());
    }
}
