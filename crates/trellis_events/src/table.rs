//! The subscription table.

use std::sync::Arc;

use hashbrown::HashMap;
use indexmap::IndexMap;

use crate::callback::Callback;
use crate::event::EventTypeId;
use crate::subscriber::SubscriberId;

/// Callbacks grouped by subscriber identity, then by event type.
///
/// Identities iterate in the order they first subscribed; callbacks within a
/// bucket iterate in subscription order. An identity disappears once its
/// last bucket is removed, so resubscribing places it at the end.
///
/// The table itself is not synchronized; [`EventBus`](crate::bus::EventBus)
/// guards it with a lock.
#[derive(Debug, Default)]
pub struct SubscriptionTable {
    entries: IndexMap<SubscriberId, HashMap<EventTypeId, Vec<Arc<Callback>>>>,
}

/// One pending callback invocation.
pub type Dispatch = (SubscriberId, Arc<Callback>);

impl SubscriptionTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `callback` to the bucket for (`subscriber`, `event_type`).
    ///
    /// Duplicates are kept; subscribing the same callback twice invokes it
    /// twice.
    pub fn insert(
        &mut self,
        subscriber: SubscriberId,
        event_type: EventTypeId,
        callback: Arc<Callback>,
    ) {
        self.entries
            .entry(subscriber)
            .or_default()
            .entry(event_type)
            .or_default()
            .push(callback);
    }

    /// Removes every bucket of `subscriber`, returning how many callbacks
    /// were dropped.
    pub fn remove_subscriber(&mut self, subscriber: &SubscriberId) -> usize {
        self.entries
            .shift_remove(subscriber)
            .map_or(0, |buckets| buckets.values().map(Vec::len).sum())
    }

    /// Removes one bucket of `subscriber`, returning how many callbacks were
    /// dropped.
    pub fn remove_bucket(&mut self, subscriber: &SubscriberId, event_type: EventTypeId) -> usize {
        let Some(buckets) = self.entries.get_mut(subscriber) else {
            return 0;
        };
        let removed = buckets.remove(&event_type).as_ref().map_or(0, Vec::len);
        if buckets.is_empty() {
            self.entries.shift_remove(subscriber);
        }
        removed
    }

    /// Collects, in dispatch order, every callback subscribed to
    /// `event_type`.
    #[must_use]
    pub fn dispatch_plan(&self, event_type: EventTypeId) -> Vec<Dispatch> {
        self.entries
            .iter()
            .filter_map(|(subscriber, buckets)| {
                buckets.get(&event_type).map(|bucket| (subscriber, bucket))
            })
            .flat_map(|(subscriber, bucket)| {
                bucket
                    .iter()
                    .map(move |callback| (subscriber.clone(), Arc::clone(callback)))
            })
            .collect()
    }

    /// Returns `true` if `subscriber` has any bucket, or the given one when
    /// `event_type` is set.
    #[must_use]
    pub fn contains(&self, subscriber: &SubscriberId, event_type: Option<EventTypeId>) -> bool {
        match (self.entries.get(subscriber), event_type) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(buckets), Some(event_type)) => buckets.contains_key(&event_type),
        }
    }

    /// Returns the total number of subscribed callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.entries
            .values()
            .flat_map(HashMap::values)
            .map(Vec::len)
            .sum()
    }

    /// Returns the number of subscriber identities.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over identities in dispatch order.
    pub fn subscribers(&self) -> impl Iterator<Item = &SubscriberId> {
        self.entries.keys()
    }

    /// Returns `true` if nothing is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
