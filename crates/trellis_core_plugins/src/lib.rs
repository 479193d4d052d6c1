//! Core infrastructure plugins for Trellis.
//!
//! - [`TracingPlugin`] - logging and observability via the `tracing` crate
//! - [`RegistryPlugin`] - installs the [`DependencyRegistry`](trellis_registry::DependencyRegistry)
//! - [`EventsPlugin`] - installs the [`EventBus`](trellis_events::EventBus) and
//!   [`ObserverBinder`](trellis_events::ObserverBinder)
//! - [`DefaultPlugins`] - all of the above
//! - [`MinimalPlugins`] - the services without tracing
//!
//! # Example
//!
//! ```
//! use trellis_system::app::App;
//! use trellis_system::plugin::PluginGroup;
//! use trellis_core_plugins::{MinimalPlugins, TracingPlugin};
//! use tracing::Level;
//!
//! App::new()
//!     .add_plugins(MinimalPlugins.build())
//!     .add_plugins(TracingPlugin::default().with_level(Level::DEBUG))
//!     .finish();
//! ```

mod events_plugin;
mod registry_plugin;
mod tracing_plugin;

pub use events_plugin::EventsPlugin;
pub use registry_plugin::RegistryPlugin;
pub use tracing_plugin::{TracingConfig, TracingFormat, TracingPlugin};

use trellis_system::plugin::{PluginGroup, PluginGroupBuilder};

/// Default plugins for most Trellis applications.
///
/// Includes:
/// - [`TracingPlugin`] - Logging and observability
/// - [`RegistryPlugin`] - Dependency registry
/// - [`EventsPlugin`] - Event bus and observer binder
///
/// # Customization
///
/// ```
/// use trellis_system::app::App;
/// use trellis_system::plugin::PluginGroup;
/// use trellis_core_plugins::{DefaultPlugins, TracingPlugin};
///
/// App::new()
///     .add_plugins(DefaultPlugins.build().disable::<TracingPlugin>())
///     .finish();
/// ```
pub struct DefaultPlugins;

impl PluginGroup for DefaultPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::new()
            .add(TracingPlugin::default())
            .add(RegistryPlugin)
            .add(EventsPlugin)
    }
}

/// Minimal plugins for headless or testing scenarios.
///
/// Does not include tracing, making it suitable for unit tests that don't
/// need logging output.
pub struct MinimalPlugins;

impl PluginGroup for MinimalPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::new().add(RegistryPlugin).add(EventsPlugin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plugins_builds() {
        let builder = DefaultPlugins.build();
        assert_eq!(builder.len(), 3);
        assert!(builder.contains::<TracingPlugin>());
    }

    #[test]
    fn minimal_plugins_builds() {
        let builder = MinimalPlugins.build();
        assert_eq!(builder.len(), 2);
        assert!(!builder.contains::<TracingPlugin>());
    }
}
