//! Composition root for an application.
//!
//! The [`App`] owns the application's long-lived services (APIs) and the
//! plugins that install them. It replaces ambient, process-wide state: a
//! program constructs one `App` at start-up, adds plugins, calls
//! [`finish()`](App::finish), and passes references to the resulting APIs to
//! the code that needs them.
//!
//! ```
//! use trellis_system::api::API;
//! use trellis_system::app::App;
//! use trellis_system::plugin::{Plugin, PluginId};
//!
//! #[derive(Default)]
//! struct Counter { hits: std::sync::atomic::AtomicUsize }
//! impl API for Counter {}
//!
//! struct CounterPlugin;
//! impl Plugin for CounterPlugin {
//!     fn build(&self, app: &mut App) {
//!         app.insert_api(Counter::default());
//!     }
//! }
//!
//! struct UsesCounter;
//! impl Plugin for UsesCounter {
//!     fn build(&self, _app: &mut App) {}
//!
//!     fn ready(&self, app: &mut App) {
//!         let counter = app.api::<Counter>().expect("CounterPlugin is a dependency");
//!         counter.hits.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
//!     }
//!
//!     fn dependencies(&self) -> Vec<PluginId> {
//!         vec![PluginId::of::<CounterPlugin>()]
//!     }
//! }
//!
//! let mut app = App::new();
//! app.add_plugins(UsesCounter).add_plugins(CounterPlugin).finish();
//! ```
//!
//! # Lifecycle
//!
//! 1. **Dependency resolution** - plugins are topologically sorted
//! 2. **Build** - `plugin.build()` in dependency order
//! 3. **Ready** - `plugin.ready()` in dependency order
//! 4. **Cleanup** - `plugin.cleanup()` in reverse order, on demand

use core::any::{Any, TypeId};
use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};

use crate::api::API;
use crate::plugin::{Plugin, PluginId, Plugins};

/// Type-erased API for dynamic storage.
type BoxedAPI = Box<dyn Any + Send + Sync>;

/// Build state of the app. Progresses `NotStarted` → `Building` → `Built`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum BuildState {
    #[default]
    NotStarted,
    Building,
    Built,
}

struct PluginEntry {
    id: PluginId,
    plugin: Box<dyn Plugin>,
    name: String,
}

/// The application composition root.
///
/// Holds every API installed by plugins and drives the plugin lifecycle.
pub struct App {
    apis: HashMap<TypeId, BoxedAPI>,

    /// Plugins added before `finish()`, in insertion order.
    pending_plugins: Vec<PluginEntry>,

    /// Plugins that have been built, in dependency order.
    built_plugins: Vec<PluginEntry>,

    plugin_ids: HashSet<PluginId>,

    build_state: BuildState,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Creates an app with no plugins and no APIs.
    #[must_use]
    pub fn new() -> Self {
        Self {
            apis: HashMap::new(),
            pending_plugins: Vec::new(),
            built_plugins: Vec::new(),
            plugin_ids: HashSet::new(),
            build_state: BuildState::NotStarted,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Plugin Management
    // ─────────────────────────────────────────────────────────────────────────

    /// Adds a plugin or a [`PluginGroupBuilder`](crate::plugin::PluginGroupBuilder).
    ///
    /// # Panics
    ///
    /// Panics if a unique plugin is added twice.
    pub fn add_plugins<P: Plugins>(&mut self, plugins: P) -> &mut Self {
        plugins.add_to_app(self);
        self
    }

    pub(crate) fn add_plugin_boxed(&mut self, id: PluginId, plugin: Box<dyn Plugin>) {
        let name = plugin.name().to_string();

        if plugin.is_unique() && self.plugin_ids.contains(&id) {
            panic!(
                "Plugin '{}' is unique and was already added.\n\
                 If you intended to add this plugin multiple times, \
                 return `false` from `is_unique()`.",
                name
            );
        }
        self.plugin_ids.insert(id);

        let entry = PluginEntry { id, plugin, name };

        // Plugins added from another plugin's build()/ready() are built on
        // the spot; their dependencies must already be built.
        if self.build_state == BuildState::Building {
            tracing::debug!(plugin = %entry.name, "building late plugin");
            entry.plugin.build(self);
            self.built_plugins.push(entry);
        } else {
            self.pending_plugins.push(entry);
        }
    }

    /// Returns `true` if a plugin of type `P` has been added.
    #[must_use]
    pub fn has_plugin<P: Plugin>(&self) -> bool {
        let id = PluginId::of::<P>();
        self.pending_plugins
            .iter()
            .chain(self.built_plugins.iter())
            .any(|entry| entry.id == id)
    }

    /// Returns whether [`finish()`](Self::finish) has completed.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.build_state == BuildState::Built
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API Access
    // ─────────────────────────────────────────────────────────────────────────

    /// Inserts an API, returning the previous one of the same type.
    pub fn insert_api<A: API>(&mut self, api: A) -> Option<A> {
        tracing::debug!(api = core::any::type_name::<A>(), "inserting api");
        self.apis
            .insert(TypeId::of::<A>(), Box::new(api))
            .and_then(|old| old.downcast::<A>().ok())
            .map(|boxed| *boxed)
    }

    /// Returns a shared reference to an API, or `None` if it was never
    /// inserted.
    #[must_use]
    pub fn api<A: API>(&self) -> Option<&A> {
        self.apis
            .get(&TypeId::of::<A>())
            .and_then(|boxed| boxed.downcast_ref::<A>())
    }

    /// Returns a mutable reference to an API.
    #[must_use]
    pub fn api_mut<A: API>(&mut self) -> Option<&mut A> {
        self.apis
            .get_mut(&TypeId::of::<A>())
            .and_then(|boxed| boxed.downcast_mut::<A>())
    }

    /// Returns `true` if an API of type `A` exists.
    #[must_use]
    pub fn contains_api<A: API>(&self) -> bool {
        self.apis.contains_key(&TypeId::of::<A>())
    }

    /// Removes an API and returns it.
    pub fn remove_api<A: API>(&mut self) -> Option<A> {
        self.apis
            .remove(&TypeId::of::<A>())
            .and_then(|old| old.downcast::<A>().ok())
            .map(|boxed| *boxed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Sorts, builds and readies every added plugin.
    ///
    /// # Panics
    ///
    /// - If a plugin's dependency was never added
    /// - If plugin dependencies form a cycle
    /// - If called more than once
    pub fn finish(&mut self) -> &mut Self {
        assert!(
            self.build_state == BuildState::NotStarted,
            "App::finish() was already called. Cannot build twice."
        );

        let sorted = self.sort_plugins_by_dependencies();

        self.build_state = BuildState::Building;
        for entry in sorted {
            tracing::debug!(plugin = %entry.name, "building plugin");
            entry.plugin.build(self);
            self.built_plugins.push(entry);
        }

        // The list is detached while plugins hold `&mut self`; anything they
        // add lands in `built_plugins` and is readied in a later round.
        let mut readied = core::mem::take(&mut self.built_plugins);
        for entry in &readied {
            entry.plugin.ready(self);
        }
        loop {
            let late = core::mem::take(&mut self.built_plugins);
            if late.is_empty() {
                break;
            }
            for entry in &late {
                entry.plugin.ready(self);
            }
            readied.extend(late);
        }
        self.built_plugins = readied;

        self.build_state = BuildState::Built;
        tracing::debug!(plugins = self.built_plugins.len(), "app built");
        self
    }

    /// Runs `cleanup()` on every built plugin, dependents first.
    pub fn cleanup(&mut self) {
        let built = core::mem::take(&mut self.built_plugins);
        for entry in built.iter().rev() {
            tracing::debug!(plugin = %entry.name, "cleaning up plugin");
            entry.plugin.cleanup(self);
        }
        self.built_plugins = built;
    }

    /// Orders pending plugins so every plugin follows its dependencies.
    ///
    /// Plugins with no ordering constraint between them keep their insertion
    /// order.
    fn sort_plugins_by_dependencies(&mut self) -> Vec<PluginEntry> {
        let pending = core::mem::take(&mut self.pending_plugins);
        let count = pending.len();

        let index_of: HashMap<PluginId, usize> = pending
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.id, index))
            .collect();

        let mut in_degree = vec![0usize; count];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];

        for (index, entry) in pending.iter().enumerate() {
            for dependency in entry.plugin.dependencies() {
                if let Some(&dep_index) = index_of.get(&dependency) {
                    dependents[dep_index].push(index);
                    in_degree[index] += 1;
                } else if !self.built_plugins.iter().any(|p| p.id == dependency) {
                    panic!(
                        "Plugin '{}' requires '{}' which was not added.\n\
                         Add {} to the app, or use a plugin group that includes it.",
                        entry.name,
                        dependency.type_name(),
                        dependency.type_name()
                    );
                }
            }
        }

        // Kahn's algorithm with a FIFO queue.
        let mut queue: VecDeque<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(count);
        while let Some(index) = queue.pop_front() {
            order.push(index);
            for &dependent in &dependents[index] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if order.len() != count {
            let in_cycle: Vec<&str> = in_degree
                .iter()
                .enumerate()
                .filter(|(_, degree)| **degree > 0)
                .map(|(index, _)| pending[index].name.as_str())
                .collect();
            panic!(
                "Circular dependency detected among plugins: {:?}\n\
                 Break the cycle by extracting shared functionality into a separate plugin.",
                in_cycle
            );
        }

        let mut slots: Vec<Option<PluginEntry>> = pending.into_iter().map(Some).collect();
        order
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect()
    }
}
