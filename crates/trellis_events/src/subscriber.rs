//! Subscriber identities.

use core::fmt;

/// Key under which callbacks are subscribed.
///
/// Every subscription belongs to exactly one identity, and unsubscribing
/// works per identity. Identities are visited during dispatch in the order
/// they first subscribed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubscriberId {
    /// Shared identity for free-standing callbacks.
    Standalone,
    /// Caller-chosen identity.
    Named(String),
    /// Generated identity for one bound observer instance.
    Instance {
        /// Type name of the observer.
        type_name: &'static str,
        /// Unique id of this instance.
        id: String,
    },
}

impl SubscriberId {
    /// A caller-chosen identity.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// A fresh identity for an instance of `T`, distinct from every other.
    #[must_use]
    pub fn instance<T: ?Sized + 'static>() -> Self {
        Self::Instance {
            type_name: core::any::type_name::<T>(),
            id: nanoid::nanoid!(),
        }
    }

    /// Returns `true` for the standalone sentinel.
    #[must_use]
    pub fn is_standalone(&self) -> bool {
        matches!(self, Self::Standalone)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standalone => f.write_str("<standalone>"),
            Self::Named(name) => f.write_str(name),
            Self::Instance { type_name, id } => write!(f, "{type_name}#{id}"),
        }
    }
}

impl From<&str> for SubscriberId {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for SubscriberId {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget;

    #[test]
    fn instance_ids_are_unique() {
        let a = SubscriberId::instance::<Widget>();
        let b = SubscriberId::instance::<Widget>();
        assert_ne!(a, b);
        assert!(a.to_string().contains("Widget#"));
    }

    #[test]
    fn named_ids_compare_by_name() {
        assert_eq!(SubscriberId::from("inst"), SubscriberId::named("inst"));
        assert_eq!(SubscriberId::named("inst").to_string(), "inst");
        assert!(SubscriberId::Standalone.is_standalone());
    }
}
