//! Event marker trait and event type identifiers.
//!
//! Any `'static + Send + Sync` type becomes an event by implementing the
//! [`Event`] marker trait. Dispatch is keyed by the event's exact type: a
//! subscription for `A` never fires for a `B`, even when `B` wraps or converts
//! into `A`.

use core::any::{Any, TypeId};
use core::fmt;

use downcast_rs::{DowncastSync, impl_downcast};
use variadics_please::all_tuples;

/// Marker trait for values that can be posted on an
/// [`EventBus`](crate::bus::EventBus).
///
/// `&dyn Event` can be downcast back to the concrete type with
/// [`downcast_ref`](trait.Event.html#method.downcast_ref).
///
/// # Example
///
/// ```
/// use trellis_events::event::Event;
///
/// struct UserLoggedIn {
///     user: String,
/// }
///
/// impl Event for UserLoggedIn {}
///
/// let event: &dyn Event = &UserLoggedIn { user: "ada".into() };
/// assert_eq!(event.downcast_ref::<UserLoggedIn>().unwrap().user, "ada");
/// ```
pub trait Event: DowncastSync {}

impl_downcast!(sync Event);

/// Identifier for an event type.
///
/// Accepts any `'static` type so that erased callers can name arbitrary
/// types; the bus rejects ids that do not belong to a declared [`Event`] type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventTypeId {
    type_id: TypeId,
    type_name: &'static str,
}

impl EventTypeId {
    /// Creates an `EventTypeId` for the given type.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
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
}

impl fmt::Display for EventTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// A declared event type: its id plus a view from `&dyn Any` to `&dyn Event`.
///
/// The view lets erased values be dispatched once their type is known to be
/// an event.
#[derive(Debug, Clone, Copy)]
pub struct EventDescriptor {
    id: EventTypeId,
    view: fn(&dyn Any) -> Option<&dyn Event>,
}

impl EventDescriptor {
    /// Describes event type `E`.
    #[must_use]
    pub fn of<E: Event>() -> Self {
        Self {
            id: EventTypeId::of::<E>(),
            view: view_as::<E>,
        }
    }

    /// Returns the event type's id.
    #[must_use]
    pub fn id(&self) -> EventTypeId {
        self.id
    }

    /// Views `value` as an event if it has this descriptor's type.
    #[must_use]
    pub fn view<'a>(&self, value: &'a dyn Any) -> Option<&'a dyn Event> {
        (self.view)(value)
    }
}

fn view_as<E: Event>(value: &dyn Any) -> Option<&dyn Event> {
    value.downcast_ref::<E>().map(|event| event as &dyn Event)
}

// ─────────────────────────────────────────────────────────────────────────────
// IntoEventTypes
// ─────────────────────────────────────────────────────────────────────────────

/// A single event type or a tuple of event types.
///
/// Used where one handler covers several events, e.g.
/// [`InterestTable::on_any`](crate::observer::InterestTable::on_any).
pub trait IntoEventTypes {
    /// Returns a descriptor per event type, in tuple order.
    fn event_types() -> Vec<EventDescriptor>;
}

impl<E: Event> IntoEventTypes for E {
    fn event_types() -> Vec<EventDescriptor> {
        vec![EventDescriptor::of::<E>()]
    }
}

macro_rules! impl_into_event_types_for_tuple {
    ($($E:ident),*) => {
        impl<$($E: Event),*> IntoEventTypes for ($($E,)*) {
            fn event_types() -> Vec<EventDescriptor> {
                vec![$(EventDescriptor::of::<$E>()),*]
            }
        }
    };
}

all_tuples!(impl_into_event_types_for_tuple, 2, 16, E);

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping;
    impl Event for Ping {}

    struct Pong(u8);
    impl Event for Pong {}

    #[test]
    fn event_type_id_is_exact() {
        assert_eq!(EventTypeId::of::<Ping>(), EventTypeId::of::<Ping>());
        assert_ne!(EventTypeId::of::<Ping>(), EventTypeId::of::<Pong>());
        assert!(EventTypeId::of::<Ping>().to_string().ends_with("Ping"));
    }

    #[test]
    fn descriptor_views_only_its_own_type() {
        let descriptor = EventDescriptor::of::<Pong>();
        let pong = Pong(3);

        let viewed = descriptor.view(&pong).unwrap();
        assert_eq!(viewed.downcast_ref::<Pong>().unwrap().0, 3);
        assert!(descriptor.view(&Ping).is_none());
    }

    #[test]
    fn tuples_list_types_in_order() {
        let ids: Vec<_> = <(Pong, Ping)>::event_types()
            .iter()
            .map(EventDescriptor::id)
            .collect();
        assert_eq!(ids, [EventTypeId::of::<Pong>(), EventTypeId::of::<Ping>()]);
        assert_eq!(<Ping as IntoEventTypes>::event_types().len(), 1);
    }
}
