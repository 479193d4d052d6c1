//! Plugin system for composing an application.
//!
//! Plugins are the unit of composition: each one installs services into the
//! [`App`] during `build()`, wires them to each other during `ready()`, and
//! releases what it owns during `cleanup()`.
//!
//! # Example
//!
//! ```
//! use trellis_system::app::App;
//! use trellis_system::plugin::{Plugin, PluginId};
//!
//! struct LoggingPlugin;
//! impl Plugin for LoggingPlugin {
//!     fn build(&self, _app: &mut App) {}
//! }
//!
//! struct ServicesPlugin;
//!
//! impl Plugin for ServicesPlugin {
//!     fn build(&self, _app: &mut App) {}
//!
//!     fn dependencies(&self) -> Vec<PluginId> {
//!         vec![PluginId::of::<LoggingPlugin>()]
//!     }
//! }
//!
//! App::new()
//!     .add_plugins(ServicesPlugin)
//!     .add_plugins(LoggingPlugin)
//!     .finish();
//! ```

use core::any::TypeId;

use crate::app::App;

// ─────────────────────────────────────────────────────────────────────────────
// PluginId
// ─────────────────────────────────────────────────────────────────────────────

/// Unique identifier for a plugin type.
///
/// Used to declare dependencies between plugins and to detect duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PluginId {
    type_id: TypeId,
    type_name: &'static str,
}

impl PluginId {
    /// Creates a `PluginId` for the given plugin type.
    #[must_use]
    pub fn of<P: Plugin>() -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            type_name: core::any::type_name::<P>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the plugin's type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugin Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A unit of application composition.
///
/// # Lifecycle
///
/// 1. `build()` - in dependency order; install APIs
/// 2. `ready()` - in dependency order; every API from every plugin exists
/// 3. `cleanup()` - in reverse dependency order, on [`App::cleanup`]
pub trait Plugin: Send + Sync + 'static {
    /// Installs this plugin's services into the app.
    fn build(&self, app: &mut App);

    /// Called once every plugin has been built.
    ///
    /// Use this to wire services installed by other plugins, e.g. registering
    /// providers into a registry that a dependency installed.
    fn ready(&self, _app: &mut App) {}

    /// Called on shutdown, dependents before their dependencies.
    fn cleanup(&self, _app: &mut App) {}

    /// Returns the plugin's name, used in diagnostics.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    /// Plugins that must be built before this one.
    fn dependencies(&self) -> Vec<PluginId> {
        Vec::new()
    }

    /// Whether adding this plugin twice is a configuration error.
    fn is_unique(&self) -> bool {
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugins Trait (for add_plugins polymorphism)
// ─────────────────────────────────────────────────────────────────────────────

/// Anything that can be passed to [`App::add_plugins`]: a single plugin or a
/// [`PluginGroupBuilder`].
pub trait Plugins {
    /// Adds the plugin(s) to the app.
    fn add_to_app(self, app: &mut App);
}

impl<P: Plugin> Plugins for P {
    fn add_to_app(self, app: &mut App) {
        // Capture the id while the concrete type is still known.
        app.add_plugin_boxed(PluginId::of::<P>(), Box::new(self));
    }
}

impl Plugins for PluginGroupBuilder {
    fn add_to_app(self, app: &mut App) {
        for boxed in self.plugins {
            app.add_plugin_boxed(boxed.id, boxed.plugin);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PluginGroup
// ─────────────────────────────────────────────────────────────────────────────

/// A named bundle of plugins.
///
/// ```
/// use trellis_system::app::App;
/// use trellis_system::plugin::{Plugin, PluginGroup, PluginGroupBuilder};
///
/// struct A;
/// impl Plugin for A { fn build(&self, _app: &mut App) {} }
/// struct B;
/// impl Plugin for B { fn build(&self, _app: &mut App) {} }
///
/// struct Bundle;
/// impl PluginGroup for Bundle {
///     fn build(self) -> PluginGroupBuilder {
///         PluginGroupBuilder::new().add(A).add(B)
///     }
/// }
///
/// App::new().add_plugins(Bundle.build().disable::<B>()).finish();
/// ```
pub trait PluginGroup {
    /// Expands the group into a builder that can still be customized.
    fn build(self) -> PluginGroupBuilder;
}

pub(crate) struct BoxedPlugin {
    pub(crate) id: PluginId,
    pub(crate) plugin: Box<dyn Plugin>,
}

/// Ordered, editable list of plugins produced by a [`PluginGroup`].
#[derive(Default)]
pub struct PluginGroupBuilder {
    pub(crate) plugins: Vec<BoxedPlugin>,
}

impl PluginGroupBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    /// Appends a plugin.
    #[must_use]
    #[expect(
        clippy::should_implement_trait,
        reason = "This is a builder method, not std::ops::Add"
    )]
    pub fn add<P: Plugin>(mut self, plugin: P) -> Self {
        self.plugins.push(BoxedPlugin {
            id: PluginId::of::<P>(),
            plugin: Box::new(plugin),
        });
        self
    }

    /// Replaces the plugin of type `P` in place, or appends it if absent.
    ///
    /// Useful for swapping in a differently configured instance of a default
    /// plugin without changing the group's order.
    #[must_use]
    pub fn set<P: Plugin>(mut self, plugin: P) -> Self {
        let id = PluginId::of::<P>();
        let boxed = BoxedPlugin {
            id,
            plugin: Box::new(plugin),
        };
        match self.plugins.iter().position(|p| p.id == id) {
            Some(index) => self.plugins[index] = boxed,
            None => self.plugins.push(boxed),
        }
        self
    }

    /// Removes the plugin of type `P`, if present.
    #[must_use]
    pub fn disable<P: Plugin>(mut self) -> Self {
        let id = PluginId::of::<P>();
        self.plugins.retain(|p| p.id != id);
        self
    }

    /// Returns whether the builder holds a plugin of type `P`.
    #[must_use]
    pub fn contains<P: Plugin>(&self) -> bool {
        let id = PluginId::of::<P>();
        self.plugins.iter().any(|p| p.id == id)
    }

    /// Returns the number of plugins in the builder.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` if the builder is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
