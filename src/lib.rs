//! A type-directed dependency registry and a concurrent event bus.
//!
//! Trellis bundles the two runtime services that lightweight application
//! frameworks tend to carry:
//!
//! - [`registry`] - providers registered by capability and resolved with
//!   explicit ambiguity detection, plus construction-time autowiring
//! - [`events`] - a publish/subscribe bus with 0, 1 and 2 parameter callback
//!   conventions and declarative observer binding
//!
//! Both are plain values. An [`App`](system::app::App) composition root owns
//! them through plugins, see [`core_plugins::DefaultPlugins`].
//!
//! # Example
//!
//! ```
//! use trellis::prelude::*;
//!
//! struct Started;
//! impl Event for Started {}
//!
//! let mut app = App::new();
//! app.add_plugins(DefaultPlugins.build().disable::<TracingPlugin>());
//! app.finish();
//!
//! let bus = app.api::<EventBus>().expect("EventsPlugin installs the bus");
//! bus.subscribe_standalone(|_: &Started| {});
//! assert_eq!(bus.post(&Started).unwrap(), 1);
//! ```

/// Composition root: plugins, APIs and the application lifecycle.
pub use trellis_system as system;

/// Dependency registry, resolver and autowiring.
pub use trellis_registry as registry;

/// Event bus, subscription table and observer binding.
pub use trellis_events as events;

/// Infrastructure plugins (tracing, registry, events).
pub use trellis_core_plugins as core_plugins;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use trellis_core_plugins::{
        DefaultPlugins, EventsPlugin, MinimalPlugins, RegistryPlugin, TracingConfig,
        TracingFormat, TracingPlugin,
    };
    pub use trellis_events::prelude::*;
    pub use trellis_registry::prelude::*;
    pub use trellis_system::prelude::*;
}
