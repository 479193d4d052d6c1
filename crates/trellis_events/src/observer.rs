//! Declarative subscriptions for observer types.
//!
//! A type implementing [`Observer`] lists which of its methods handle which
//! events in an [`InterestTable`]. The [`ObserverBinder`] builds that table
//! once per type and, for every instance it binds, subscribes each
//! (method, event type) pair under a fresh [`SubscriberId::Instance`]. Two
//! instances of one type therefore have independent subscriptions.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use trellis_events::prelude::*;
//!
//! struct Opened;
//! impl Event for Opened {}
//! struct Closed;
//! impl Event for Closed {}
//!
//! #[derive(Default)]
//! struct Counter {
//!     opened: AtomicUsize,
//!     changes: AtomicUsize,
//! }
//!
//! impl Counter {
//!     fn on_opened(&self, _: &Opened) {
//!         self.opened.fetch_add(1, Ordering::SeqCst);
//!     }
//!
//!     fn on_change(&self) {
//!         self.changes.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! impl Observer for Counter {
//!     fn interests(table: &mut InterestTable<Self>) {
//!         table
//!             .on("on_opened", Self::on_opened)
//!             .on_signal::<(Opened, Closed), _>("on_change", Self::on_change);
//!     }
//! }
//!
//! let bus = EventBus::new();
//! let binder = ObserverBinder::new();
//! let counter = binder.bind(&bus, Arc::new(Counter::default())).unwrap();
//!
//! bus.post(&Opened).unwrap();
//! bus.post(&Closed).unwrap();
//!
//! assert_eq!(counter.opened.load(Ordering::SeqCst), 1);
//! assert_eq!(counter.changes.load(Ordering::SeqCst), 2);
//! ```

use core::any::{Any, TypeId, type_name};
use core::fmt;
use core::ops::Deref;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use trellis_system::api::API;

use crate::bus::EventBus;
use crate::callback::{CallArg, Callback, CallbackOutput};
use crate::error::{CallbackError, EventError};
use crate::event::{Event, EventDescriptor, EventTypeId, IntoEventTypes};
use crate::subscriber::SubscriberId;

/// Erased observer method: receives the instance and the call arguments.
pub type MethodHandler<T> =
    Arc<dyn Fn(&T, &[CallArg<'_>]) -> Result<(), CallbackError> + Send + Sync>;

/// A type whose methods subscribe to events when an instance is bound.
pub trait Observer: Send + Sync + Sized + 'static {
    /// Declares which methods handle which events.
    fn interests(table: &mut InterestTable<Self>);
}

// ─────────────────────────────────────────────────────────────────────────────
// InterestTable
// ─────────────────────────────────────────────────────────────────────────────

/// One declared (method, event type) pair.
pub struct Interest<T> {
    method: &'static str,
    event: EventDescriptor,
    arity: usize,
    handler: MethodHandler<T>,
}

impl<T> Interest<T> {
    /// Returns the method name.
    #[must_use]
    pub fn method(&self) -> &'static str {
        self.method
    }

    /// Returns the event type.
    #[must_use]
    pub fn event_type(&self) -> EventTypeId {
        self.event.id()
    }

    /// Returns the calling convention the method uses.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl<T> fmt::Debug for Interest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interest")
            .field("method", &self.method)
            .field("event", &self.event.id().type_name())
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// The event interests of observer type `T`, in declaration order.
pub struct InterestTable<T> {
    interests: Vec<Interest<T>>,
}

impl<T> fmt::Debug for InterestTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.interests).finish()
    }
}

impl<T: Observer> InterestTable<T> {
    fn new() -> Self {
        Self {
            interests: Vec::new(),
        }
    }

    /// Handles event `E` with `method`.
    ///
    /// `method` may take `(&self)`, `(&self, &E)` or
    /// `(&self, &SubscriberId, &E)`.
    pub fn on<E: Event, M>(
        &mut self,
        name: &'static str,
        method: impl IntoMethod<T, E, M>,
    ) -> &mut Self {
        let (arity, handler) = method.into_method();
        self.interests.push(Interest {
            method: name,
            event: EventDescriptor::of::<E>(),
            arity,
            handler,
        });
        self
    }

    /// Handles every event type in `Es` with one method receiving the erased
    /// event.
    pub fn on_any<Es, R>(
        &mut self,
        name: &'static str,
        method: impl Fn(&T, &dyn Event) -> R + Send + Sync + 'static,
    ) -> &mut Self
    where
        Es: IntoEventTypes,
        R: CallbackOutput,
    {
        let handler: MethodHandler<T> =
            Arc::new(move |this: &T, args: &[CallArg<'_>]| match args {
                [CallArg::Event(event)] => method(this, *event).into_result(),
                _ => Err(mismatch(name, args)),
            });
        self.push_all::<Es>(name, 1, &handler);
        self
    }

    /// Handles every event type in `Es` with a method that takes no event.
    pub fn on_signal<Es, R>(
        &mut self,
        name: &'static str,
        method: impl Fn(&T) -> R + Send + Sync + 'static,
    ) -> &mut Self
    where
        Es: IntoEventTypes,
        R: CallbackOutput,
    {
        let handler: MethodHandler<T> =
            Arc::new(move |this: &T, args: &[CallArg<'_>]| match args {
                [] => method(this).into_result(),
                _ => Err(mismatch(name, args)),
            });
        self.push_all::<Es>(name, 0, &handler);
        self
    }

    fn push_all<Es: IntoEventTypes>(
        &mut self,
        name: &'static str,
        arity: usize,
        handler: &MethodHandler<T>,
    ) {
        for event in Es::event_types() {
            self.interests.push(Interest {
                method: name,
                event,
                arity,
                handler: Arc::clone(handler),
            });
        }
    }
}

impl<T> InterestTable<T> {
    /// Iterates over the declared interests.
    pub fn iter(&self) -> impl Iterator<Item = &Interest<T>> {
        self.interests.iter()
    }

    /// Returns the number of (method, event type) pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interests.len()
    }

    /// Returns `true` if no interests are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interests.is_empty()
    }
}

fn mismatch(method: &'static str, args: &[CallArg<'_>]) -> CallbackError {
    format!("method {method} received unexpected arguments {args:?}").into()
}

// ─────────────────────────────────────────────────────────────────────────────
// IntoMethod
// ─────────────────────────────────────────────────────────────────────────────

/// Conversion of observer methods into erased handlers for event type `E`.
///
/// Mirrors [`IntoCallback`](crate::callback::IntoCallback) with a leading
/// `&T` receiver.
pub trait IntoMethod<T, E: Event, Marker>: Send + Sync + 'static {
    /// Returns the method's arity and erased handler.
    fn into_method(self) -> (usize, MethodHandler<T>);
}

/// Marker for `Fn(&T) -> R` methods.
pub struct ReceiverOnly;

/// Marker for `Fn(&T, &E) -> R` methods.
pub struct ReceiverAndEvent;

/// Marker for `Fn(&T, &SubscriberId, &E) -> R` methods.
pub struct ReceiverSubscriberAndEvent;

impl<T, E, F, R> IntoMethod<T, E, (ReceiverOnly, R)> for F
where
    T: 'static,
    E: Event,
    F: Fn(&T) -> R + Send + Sync + 'static,
    R: CallbackOutput,
{
    fn into_method(self) -> (usize, MethodHandler<T>) {
        let handler: MethodHandler<T> =
            Arc::new(move |this: &T, args: &[CallArg<'_>]| match args {
                [] => self(this).into_result(),
                _ => Err(mismatch(type_name::<F>(), args)),
            });
        (0, handler)
    }
}

impl<T, E, F, R> IntoMethod<T, E, (ReceiverAndEvent, R)> for F
where
    T: 'static,
    E: Event,
    F: Fn(&T, &E) -> R + Send + Sync + 'static,
    R: CallbackOutput,
{
    fn into_method(self) -> (usize, MethodHandler<T>) {
        let handler: MethodHandler<T> =
            Arc::new(move |this: &T, args: &[CallArg<'_>]| match args {
                [CallArg::Event(event)] => match event.downcast_ref::<E>() {
                    Some(event) => self(this, event).into_result(),
                    None => Err(mismatch(type_name::<F>(), args)),
                },
                _ => Err(mismatch(type_name::<F>(), args)),
            });
        (1, handler)
    }
}

impl<T, E, F, R> IntoMethod<T, E, (ReceiverSubscriberAndEvent, R)> for F
where
    T: 'static,
    E: Event,
    F: Fn(&T, &SubscriberId, &E) -> R + Send + Sync + 'static,
    R: CallbackOutput,
{
    fn into_method(self) -> (usize, MethodHandler<T>) {
        let handler: MethodHandler<T> =
            Arc::new(move |this: &T, args: &[CallArg<'_>]| match args {
                [CallArg::Subscriber(subscriber), CallArg::Event(event)] => {
                    match event.downcast_ref::<E>() {
                        Some(event) => self(this, *subscriber, event).into_result(),
                        None => Err(mismatch(type_name::<F>(), args)),
                    }
                }
                _ => Err(mismatch(type_name::<F>(), args)),
            });
        (2, handler)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ObserverBinder
// ─────────────────────────────────────────────────────────────────────────────

/// Subscribes observer instances according to their type's interests.
///
/// Interest tables are built on first use of each type and cached.
#[derive(Default)]
pub struct ObserverBinder {
    tables: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl API for ObserverBinder {}

impl fmt::Debug for ObserverBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverBinder")
            .field("cached_types", &self.tables.read().len())
            .finish()
    }
}

impl ObserverBinder {
    /// Creates a binder with an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the interest table for `T`, building it on first use.
    pub fn interests<T: Observer>(&self) -> Arc<InterestTable<T>> {
        let type_id = TypeId::of::<T>();
        let cached = self.tables.read().get(&type_id).cloned();
        let erased = match cached {
            Some(table) => table,
            None => {
                let mut table = InterestTable::new();
                T::interests(&mut table);
                tracing::debug!(
                    observer = type_name::<T>(),
                    interests = table.len(),
                    "built interest table"
                );
                let table: Arc<dyn Any + Send + Sync> = Arc::new(table);
                Arc::clone(self.tables.write().entry(type_id).or_insert(table))
            }
        };

        match erased.downcast::<InterestTable<T>>() {
            Ok(table) => table,
            Err(_) => unreachable!("interest tables are keyed by their observer's TypeId"),
        }
    }

    /// Subscribes `instance` on `bus` under a fresh identity, once per
    /// declared (method, event type) pair.
    ///
    /// All pairs are subscribed as one step, so a concurrent post sees the
    /// instance either not at all or fully bound. The bus holds the instance
    /// until it is unbound.
    ///
    /// # Errors
    ///
    /// Propagates [`EventBus::subscribe_batch`] failures, in which case
    /// nothing is subscribed. Interest event types are declared on the bus
    /// first, so none are expected.
    pub fn bind<T: Observer>(
        &self,
        bus: &EventBus,
        instance: Arc<T>,
    ) -> Result<Observed<T>, EventError> {
        let table = self.interests::<T>();
        let id = SubscriberId::instance::<T>();

        let callbacks: Vec<_> = table
            .iter()
            .map(|interest| {
                let event_type = bus.declare_type(interest.event);
                let this = Arc::clone(&instance);
                let handler = Arc::clone(&interest.handler);
                let callback = Callback::raw(
                    format!("{}::{}", type_name::<T>(), interest.method),
                    interest.arity,
                    move |args| handler(&*this, args),
                );
                (event_type, callback)
            })
            .collect();
        bus.subscribe_batch(id.clone(), callbacks)?;

        tracing::debug!(subscriber = %id, interests = table.len(), "bound observer");
        Ok(Observed { id, instance })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Observed
// ─────────────────────────────────────────────────────────────────────────────

/// A bound observer instance.
///
/// Dereferences to the instance. Dropping the handle does not unsubscribe;
/// call [`unbind`](Self::unbind).
pub struct Observed<T> {
    id: SubscriberId,
    instance: Arc<T>,
}

impl<T> Observed<T> {
    /// Returns the identity the instance is subscribed under.
    #[must_use]
    pub fn id(&self) -> &SubscriberId {
        &self.id
    }

    /// Returns the shared instance.
    #[must_use]
    pub fn instance(&self) -> &Arc<T> {
        &self.instance
    }

    /// Removes all of the instance's subscriptions from `bus`, returning the
    /// number removed.
    pub fn unbind(self, bus: &EventBus) -> usize {
        bus.unsubscribe_all(&self.id)
    }
}

impl<T> Deref for Observed<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.instance
    }
}

impl<T> fmt::Debug for Observed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observed")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Started;
    impl Event for Started {}

    struct Stopped;
    impl Event for Stopped {}

    #[derive(Default)]
    struct Recorder {
        log: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn started(&self, _: &Started) {
            self.log.lock().push("started".into());
        }

        fn who(&self, id: &SubscriberId, _: &Stopped) {
            self.log.lock().push(format!("stopped by {id}"));
        }

        fn any(&self, event: &dyn Event) {
            let name = if event.is::<Started>() { "any:started" } else { "any:other" };
            self.log.lock().push(name.into());
        }
    }

    impl Observer for Recorder {
        fn interests(table: &mut InterestTable<Self>) {
            table
                .on("started", Self::started)
                .on("who", Self::who)
                .on_any::<(Started, Stopped), _>("any", Self::any);
        }
    }

    #[test]
    fn table_lists_each_method_event_pair() {
        let binder = ObserverBinder::new();
        let table = binder.interests::<Recorder>();

        let pairs: Vec<_> = table
            .iter()
            .map(|i| (i.method(), i.event_type(), i.arity()))
            .collect();
        assert_eq!(
            pairs,
            [
                ("started", EventTypeId::of::<Started>(), 1),
                ("who", EventTypeId::of::<Stopped>(), 2),
                ("any", EventTypeId::of::<Started>(), 1),
                ("any", EventTypeId::of::<Stopped>(), 1),
            ]
        );
    }

    #[test]
    fn tables_are_cached_per_type() {
        let binder = ObserverBinder::new();
        let a = binder.interests::<Recorder>();
        let b = binder.interests::<Recorder>();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn bound_instance_receives_its_events() {
        let bus = EventBus::new();
        let binder = ObserverBinder::new();
        let recorder = binder.bind(&bus, Arc::new(Recorder::default())).unwrap();

        assert_eq!(bus.post(&Started).unwrap(), 2);
        assert_eq!(bus.post(&Stopped).unwrap(), 2);

        let log = recorder.log.lock().clone();
        assert_eq!(log[0], "started");
        assert_eq!(log[1], "any:started");
        assert_eq!(log[2], format!("stopped by {}", recorder.id()));
        assert_eq!(log[3], "any:other");
    }

    #[test]
    fn unbind_removes_every_subscription() {
        let bus = EventBus::new();
        let binder = ObserverBinder::new();
        let recorder = binder.bind(&bus, Arc::new(Recorder::default())).unwrap();
        let instance = Arc::clone(recorder.instance());

        assert_eq!(recorder.unbind(&bus), 4);
        assert_eq!(bus.post(&Started).unwrap(), 0);
        assert!(instance.log.lock().is_empty());
        assert_eq!(Arc::strong_count(&instance), 1);
    }
}
