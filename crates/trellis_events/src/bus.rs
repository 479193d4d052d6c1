//! The event bus.

use core::any::{Any, TypeId};
use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use trellis_system::api::API;

use crate::callback::{CallArg, Callback, IntoCallback};
use crate::error::EventError;
use crate::event::{Event, EventDescriptor, EventTypeId};
use crate::subscriber::SubscriberId;
use crate::table::SubscriptionTable;

/// Thread-safe publish/subscribe dispatcher.
///
/// # Dispatch
///
/// [`post`](Self::post) visits subscriber identities in first-subscription
/// order and, for each, invokes the callbacks registered for the event's
/// exact type in subscription order. Each callback is called according to
/// its [arity](crate::callback).
///
/// The first failing callback stops dispatch and its error is returned;
/// callbacks after it are not invoked.
///
/// # Concurrency
///
/// The table sits behind one read/write lock. `post` copies the matching
/// callbacks out under the read lock and invokes them after releasing it, so:
///
/// - subscriptions and unsubscriptions racing with a post are never seen
///   half-applied; they take effect from the next post;
/// - callbacks may subscribe, unsubscribe or post on the same bus.
///
/// # Event catalog
///
/// The bus remembers every event type it has seen through a typed call or
/// [`declare`](Self::declare). Erased entry points
/// ([`subscribe_dynamic`](Self::subscribe_dynamic),
/// [`unsubscribe`](Self::unsubscribe) with an event type, and
/// [`post_dynamic`](Self::post_dynamic)) reject types outside the catalog.
///
/// # Example
///
/// ```
/// use trellis_events::prelude::*;
///
/// struct Saved {
///     path: String,
/// }
/// impl Event for Saved {}
///
/// let bus = EventBus::new();
/// bus.subscribe("audit", |event: &Saved| assert_eq!(event.path, "a.txt"));
/// bus.subscribe("audit", |who: &SubscriberId, _: &Saved| assert_eq!(who.to_string(), "audit"));
///
/// assert_eq!(bus.post(&Saved { path: "a.txt".into() }).unwrap(), 2);
/// ```
#[derive(Default)]
pub struct EventBus {
    table: RwLock<SubscriptionTable>,
    catalog: RwLock<HashMap<TypeId, EventDescriptor>>,
}

impl API for EventBus {}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("callbacks", &self.subscription_count())
            .field("event_types", &self.catalog.read().len())
            .finish()
    }
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Catalog
    // ─────────────────────────────────────────────────────────────────────

    /// Adds event type `E` to the catalog.
    pub fn declare<E: Event>(&self) -> EventTypeId {
        self.declare_type(EventDescriptor::of::<E>())
    }

    /// Adds an event type to the catalog from its descriptor.
    pub fn declare_type(&self, descriptor: EventDescriptor) -> EventTypeId {
        let id = descriptor.id();
        if !self.catalog.read().contains_key(&id.type_id()) {
            self.catalog
                .write()
                .entry(id.type_id())
                .or_insert(descriptor);
        }
        id
    }

    /// Returns `true` if `event_type` is in the catalog.
    #[must_use]
    pub fn is_declared(&self, event_type: EventTypeId) -> bool {
        self.catalog.read().contains_key(&event_type.type_id())
    }

    fn ensure_declared(&self, event_type: EventTypeId) -> Result<(), EventError> {
        if self.is_declared(event_type) {
            Ok(())
        } else {
            Err(EventError::InvalidEventType {
                type_name: event_type.type_name(),
            })
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Subscription
    // ─────────────────────────────────────────────────────────────────────

    /// Subscribes a typed callback for events of type `E` under `subscriber`.
    ///
    /// Subscribing is append-only: the same callback subscribed twice runs
    /// twice.
    pub fn subscribe<E: Event, M>(
        &self,
        subscriber: impl Into<SubscriberId>,
        callback: impl IntoCallback<E, M>,
    ) {
        let event_type = self.declare::<E>();
        self.insert(subscriber.into(), event_type, callback.into_callback());
    }

    /// Subscribes a typed callback under [`SubscriberId::Standalone`].
    pub fn subscribe_standalone<E: Event, M>(&self, callback: impl IntoCallback<E, M>) {
        self.subscribe(SubscriberId::Standalone, callback);
    }

    /// Subscribes an erased callback for `event_type` under `subscriber`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidEventType`] if `event_type` is not a
    /// declared event.
    pub fn subscribe_dynamic(
        &self,
        subscriber: impl Into<SubscriberId>,
        event_type: EventTypeId,
        callback: Callback,
    ) -> Result<(), EventError> {
        self.ensure_declared(event_type)?;
        self.insert(subscriber.into(), event_type, callback);
        Ok(())
    }

    /// Subscribes several erased callbacks under one identity as a single
    /// step: a concurrent post sees either none or all of them.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidEventType`] if any event type is not
    /// declared; nothing is subscribed in that case.
    pub fn subscribe_batch(
        &self,
        subscriber: impl Into<SubscriberId>,
        callbacks: impl IntoIterator<Item = (EventTypeId, Callback)>,
    ) -> Result<usize, EventError> {
        let subscriber = subscriber.into();
        let callbacks: Vec<_> = callbacks.into_iter().collect();
        for (event_type, _) in &callbacks {
            self.ensure_declared(*event_type)?;
        }

        let count = callbacks.len();
        let mut table = self.table.write();
        for (event_type, callback) in callbacks {
            tracing::debug!(
                subscriber = %subscriber,
                event = event_type.type_name(),
                callback = callback.name(),
                arity = callback.arity(),
                "subscribed"
            );
            table.insert(subscriber.clone(), event_type, Arc::new(callback));
        }
        Ok(count)
    }

    fn insert(&self, subscriber: SubscriberId, event_type: EventTypeId, callback: Callback) {
        tracing::debug!(
            subscriber = %subscriber,
            event = event_type.type_name(),
            callback = callback.name(),
            arity = callback.arity(),
            "subscribed"
        );
        self.table
            .write()
            .insert(subscriber, event_type, Arc::new(callback));
    }

    /// Removes subscriptions of `subscriber`: all of them when `event_type`
    /// is `None`, otherwise only those for that event type.
    ///
    /// Returns the number of callbacks removed. Unknown identities and
    /// missing buckets are not errors.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidEventType`] if `event_type` is set and is
    /// not a declared event.
    pub fn unsubscribe(
        &self,
        subscriber: &SubscriberId,
        event_type: Option<EventTypeId>,
    ) -> Result<usize, EventError> {
        let removed = match event_type {
            None => self.table.write().remove_subscriber(subscriber),
            Some(event_type) => {
                self.ensure_declared(event_type)?;
                self.table.write().remove_bucket(subscriber, event_type)
            }
        };
        tracing::debug!(
            subscriber = %subscriber,
            event = event_type.map(|e| e.type_name()),
            removed,
            "unsubscribed"
        );
        Ok(removed)
    }

    /// Removes every subscription of `subscriber`.
    pub fn unsubscribe_all(&self, subscriber: &SubscriberId) -> usize {
        let removed = self.table.write().remove_subscriber(subscriber);
        tracing::debug!(subscriber = %subscriber, removed, "unsubscribed");
        removed
    }

    /// Removes the subscriptions of `subscriber` for event type `E`.
    pub fn unsubscribe_event<E: Event>(&self, subscriber: &SubscriberId) -> usize {
        let event_type = EventTypeId::of::<E>();
        let removed = self.table.write().remove_bucket(subscriber, event_type);
        tracing::debug!(
            subscriber = %subscriber,
            event = event_type.type_name(),
            removed,
            "unsubscribed"
        );
        removed
    }

    // ─────────────────────────────────────────────────────────────────────
    // Dispatch
    // ─────────────────────────────────────────────────────────────────────

    /// Delivers `event` to every callback subscribed to its type.
    ///
    /// Returns the number of callbacks invoked; zero when nobody listens.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::CallbackFailed`] for the first callback that
    /// fails, or [`EventError::UnsupportedCallbackSignature`] for the first
    /// callback with an arity other than 0, 1 or 2. Dispatch stops there.
    pub fn post<E: Event>(&self, event: &E) -> Result<usize, EventError> {
        let event_type = self.declare::<E>();
        self.dispatch(event_type, event)
    }

    /// Erased form of [`post`](Self::post).
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidEvent`] if `event`'s type is not a
    /// declared event, otherwise as [`post`](Self::post).
    pub fn post_dynamic(&self, event: &dyn Any) -> Result<usize, EventError> {
        let type_id = Any::type_id(event);
        let descriptor = self
            .catalog
            .read()
            .get(&type_id)
            .copied()
            .ok_or(EventError::InvalidEvent { type_id })?;
        let view = descriptor
            .view(event)
            .ok_or(EventError::InvalidEvent { type_id })?;
        self.dispatch(descriptor.id(), view)
    }

    fn dispatch(&self, event_type: EventTypeId, event: &dyn Event) -> Result<usize, EventError> {
        let plan = self.table.read().dispatch_plan(event_type);
        if plan.is_empty() {
            tracing::trace!(event = event_type.type_name(), "no subscribers");
            return Ok(0);
        }

        for (subscriber, callback) in &plan {
            tracing::trace!(
                subscriber = %subscriber,
                event = event_type.type_name(),
                callback = callback.name(),
                "invoking callback"
            );

            let result = match callback.arity() {
                0 => callback.invoke(&[]),
                1 => callback.invoke(&[CallArg::Event(event)]),
                2 => callback.invoke(&[CallArg::Subscriber(subscriber), CallArg::Event(event)]),
                arity => {
                    tracing::warn!(
                        callback = callback.name(),
                        arity,
                        "unsupported callback signature"
                    );
                    return Err(EventError::UnsupportedCallbackSignature {
                        callback: callback.name().to_owned(),
                        arity,
                    });
                }
            };

            if let Err(source) = result {
                tracing::warn!(
                    subscriber = %subscriber,
                    event = event_type.type_name(),
                    callback = callback.name(),
                    error = %source,
                    "callback failed"
                );
                return Err(EventError::CallbackFailed {
                    callback: callback.name().to_owned(),
                    subscriber: subscriber.clone(),
                    source,
                });
            }
        }

        Ok(plan.len())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Introspection
    // ─────────────────────────────────────────────────────────────────────

    /// Returns the total number of subscribed callbacks.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.table.read().callback_count()
    }

    /// Returns the number of subscriber identities.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.table.read().subscriber_count()
    }

    /// Returns `true` if `subscriber` has any subscription, or one for
    /// `event_type` when given.
    #[must_use]
    pub fn is_subscribed(&self, subscriber: &SubscriberId, event_type: Option<EventTypeId>) -> bool {
        self.table.read().contains(subscriber, event_type)
    }

    /// Returns the subscriber identities in dispatch order.
    #[must_use]
    pub fn subscribers(&self) -> Vec<SubscriberId> {
        self.table.read().subscribers().cloned().collect()
    }
}
