//! Concurrent publish/subscribe dispatch for Trellis.
//!
//! - [`event`] - the [`Event`] marker trait and event type identifiers
//! - [`subscriber`] - [`SubscriberId`], the key subscriptions are grouped by
//! - [`callback`] - [`Callback`] and the 0/1/2-argument calling conventions
//! - [`table`] - the ordered [`SubscriptionTable`]
//! - [`bus`] - the thread-safe [`EventBus`]
//! - [`observer`] - declarative subscriptions via [`Observer`] and [`ObserverBinder`]
//! - [`error`] - [`EventError`]
//!
//! # Example
//!
//! ```
//! use trellis_events::prelude::*;
//!
//! struct Deployed {
//!     version: u32,
//! }
//! impl Event for Deployed {}
//!
//! let bus = EventBus::new();
//! bus.subscribe_standalone(|event: &Deployed| assert_eq!(event.version, 3));
//! bus.subscribe::<Deployed, _>("pager", || {});
//!
//! assert_eq!(bus.post(&Deployed { version: 3 }).unwrap(), 2);
//!
//! bus.unsubscribe(&SubscriberId::named("pager"), None).unwrap();
//! assert_eq!(bus.post(&Deployed { version: 3 }).unwrap(), 1);
//! ```

pub mod bus;
pub mod callback;
pub mod error;
pub mod event;
pub mod observer;
pub mod subscriber;
pub mod table;

pub use bus::EventBus;
pub use callback::{CallArg, Callback, CallbackOutput, IntoCallback};
pub use error::{CallbackError, EventError};
pub use event::{Event, EventDescriptor, EventTypeId, IntoEventTypes};
pub use observer::{InterestTable, IntoMethod, Observed, Observer, ObserverBinder};
pub use subscriber::SubscriberId;
pub use table::SubscriptionTable;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::bus::EventBus;
    pub use crate::callback::{CallArg, Callback, IntoCallback};
    pub use crate::error::{CallbackError, EventError};
    pub use crate::event::{Event, EventTypeId};
    pub use crate::observer::{InterestTable, Observed, Observer, ObserverBinder};
    pub use crate::subscriber::SubscriberId;
}
