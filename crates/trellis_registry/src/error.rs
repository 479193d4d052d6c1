//! Error types for dependency registration and resolution.

/// Boxed error produced by user code inside a provider constructor.
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// Errors that can occur while resolving or materializing dependencies.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Two or more registered providers satisfy the requested capability.
    #[error(
        "ambiguous dependency in {requester}: {capability} is satisfied by {}",
        .candidates.join(", ")
    )]
    AmbiguousDependency {
        /// The type (or other context) that asked for the capability.
        requester: String,
        /// The requested capability.
        capability: &'static str,
        /// Every provider that qualified, sorted by name.
        candidates: Vec<&'static str>,
    },

    /// A required slot had no provider.
    #[error("unsatisfied dependency in {requester}: no provider for slot '{slot}' ({capability})")]
    Unsatisfied {
        /// The type being constructed.
        requester: String,
        /// The slot name.
        slot: &'static str,
        /// The capability the slot asked for.
        capability: &'static str,
    },

    /// Materializing a provider required materializing itself.
    #[error("circular dependency: {}", .path.join(" -> "))]
    CircularDependency {
        /// Providers on the construction path, ending with the repeated one.
        path: Vec<&'static str>,
    },

    /// A provider constructor reported a failure.
    #[error("provider {provider} failed to construct: {source}")]
    ConstructionFailed {
        /// The provider that failed.
        provider: &'static str,
        /// The underlying error.
        #[source]
        source: BoxError,
    },

    /// A provider's declared capability cast produced the wrong type.
    #[error("provider {provider} did not produce {capability} (this is a bug)")]
    CapabilityMismatch {
        /// The provider.
        provider: &'static str,
        /// The capability it was asked for.
        capability: &'static str,
    },
}

impl RegistryError {
    /// Creates a [`ConstructionFailed`](Self::ConstructionFailed) for provider `T`.
    pub fn construction<T: 'static>(source: impl Into<BoxError>) -> Self {
        Self::ConstructionFailed {
            provider: core::any::type_name::<T>(),
            source: source.into(),
        }
    }
}
