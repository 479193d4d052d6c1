//! Error types for subscription and dispatch.

use core::any::TypeId;

use crate::subscriber::SubscriberId;

/// Boxed error returned by a failing callback.
pub type CallbackError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// Errors that can occur while subscribing or posting.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// An erased subscription named a type that is not a declared event.
    #[error("{type_name} is not a declared event type")]
    InvalidEventType {
        /// The offending type.
        type_name: &'static str,
    },

    /// An erased post carried a value whose type is not declared on the bus.
    ///
    /// The type may be a valid [`Event`](crate::event::Event) that has simply
    /// never been declared, subscribed to or posted typed on this bus.
    #[error(
        "posted value's type ({type_id:?}) is not declared on this bus; \
         declare it with `EventBus::declare` or subscribe to it before posting it erased"
    )]
    InvalidEvent {
        /// Runtime type of the posted value.
        type_id: TypeId,
    },

    /// A callback declared an arity outside the supported calling conventions.
    #[error("callback {callback} has unsupported arity {arity} (expected 0, 1 or 2)")]
    UnsupportedCallbackSignature {
        /// The callback's name.
        callback: String,
        /// The declared arity.
        arity: usize,
    },

    /// A callback returned an error; dispatch stopped at it.
    #[error("callback {callback} failed for subscriber {subscriber}: {source}")]
    CallbackFailed {
        /// The callback's name.
        callback: String,
        /// The identity it was subscribed under.
        subscriber: SubscriberId,
        /// The callback's error.
        #[source]
        source: CallbackError,
    },
}
