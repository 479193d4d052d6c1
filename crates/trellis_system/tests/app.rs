//! Tests for the `App` composition root: plugin ordering, lifecycle phases and
//! API storage.

use std::sync::Arc;

use parking_lot::Mutex;
use trellis_system::prelude::*;

// ─────────────────────────────────────────────────────────────────────────
// Test APIs
// ─────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Journal {
    entries: Mutex<Vec<String>>,
}

impl API for Journal {}

impl Journal {
    fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}

#[derive(Debug, PartialEq)]
struct Settings {
    value: i32,
}

impl API for Settings {}

// ─────────────────────────────────────────────────────────────────────────
// Test Plugins
// ─────────────────────────────────────────────────────────────────────────

struct JournalPlugin;
impl Plugin for JournalPlugin {
    fn build(&self, app: &mut App) {
        app.insert_api(Journal::default());
    }
}

struct RecordingPlugin(&'static str);
impl Plugin for RecordingPlugin {
    fn build(&self, app: &mut App) {
        app.api::<Journal>()
            .expect("JournalPlugin is a dependency")
            .record(format!("build:{}", self.0));
    }

    fn ready(&self, app: &mut App) {
        app.api::<Journal>()
            .expect("JournalPlugin is a dependency")
            .record(format!("ready:{}", self.0));
    }

    fn cleanup(&self, app: &mut App) {
        app.api::<Journal>()
            .expect("JournalPlugin is a dependency")
            .record(format!("cleanup:{}", self.0));
    }

    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<JournalPlugin>()]
    }

    fn is_unique(&self) -> bool {
        false
    }
}

struct SettingsPlugin;
impl Plugin for SettingsPlugin {
    fn build(&self, app: &mut App) {
        app.insert_api(Settings { value: 1 });
    }
}

struct DoublingPlugin;
impl Plugin for DoublingPlugin {
    fn build(&self, app: &mut App) {
        if let Some(settings) = app.api_mut::<Settings>() {
            settings.value *= 2;
        }
    }

    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<SettingsPlugin>()]
    }
}

struct IncrementingPlugin;
impl Plugin for IncrementingPlugin {
    fn build(&self, app: &mut App) {
        if let Some(settings) = app.api_mut::<Settings>() {
            settings.value += 10;
        }
    }

    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<DoublingPlugin>()]
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn new_app_is_empty() {
    let app = App::new();
    assert!(!app.is_built());
    assert!(!app.contains_api::<Settings>());
}

#[test]
fn insert_api_replaces_and_returns_old() {
    let mut app = App::new();
    assert!(app.insert_api(Settings { value: 1 }).is_none());

    let old = app.insert_api(Settings { value: 2 });
    assert_eq!(old, Some(Settings { value: 1 }));
    assert_eq!(app.api::<Settings>().unwrap().value, 2);
}

#[test]
fn remove_api() {
    let mut app = App::new();
    app.insert_api(Settings { value: 5 });

    assert_eq!(app.remove_api::<Settings>(), Some(Settings { value: 5 }));
    assert!(app.api::<Settings>().is_none());
    assert!(app.remove_api::<Settings>().is_none());
}

#[test]
fn plugins_build_in_dependency_order_regardless_of_insertion() {
    let mut app = App::new();
    app.add_plugins(IncrementingPlugin)
        .add_plugins(DoublingPlugin)
        .add_plugins(SettingsPlugin)
        .finish();

    // (1 * 2) + 10, not (1 + 10) * 2
    assert_eq!(app.api::<Settings>().unwrap().value, 12);
    assert!(app.is_built());
}

#[test]
fn lifecycle_phases_run_in_order() {
    let mut app = App::new();
    app.add_plugins(RecordingPlugin("a"))
        .add_plugins(RecordingPlugin("b"))
        .add_plugins(JournalPlugin)
        .finish();
    app.cleanup();

    let entries = app.api::<Journal>().unwrap().entries();
    assert_eq!(
        entries,
        vec![
            "build:a",
            "build:b",
            "ready:a",
            "ready:b",
            "cleanup:b",
            "cleanup:a"
        ]
    );
}

#[test]
fn plugin_group_is_added_in_order() {
    struct Group;
    impl PluginGroup for Group {
        fn build(self) -> PluginGroupBuilder {
            PluginGroupBuilder::new()
                .add(SettingsPlugin)
                .add(DoublingPlugin)
        }
    }

    let mut app = App::new();
    app.add_plugins(Group.build()).finish();

    assert!(app.has_plugin::<SettingsPlugin>());
    assert!(app.has_plugin::<DoublingPlugin>());
    assert_eq!(app.api::<Settings>().unwrap().value, 2);
}

#[test]
fn plugin_added_during_ready_is_built_and_readied() {
    let seen = Arc::new(Mutex::new(Vec::new()));

    struct Late(Arc<Mutex<Vec<&'static str>>>);
    impl Plugin for Late {
        fn build(&self, _app: &mut App) {
            self.0.lock().push("late:build");
        }
        fn ready(&self, _app: &mut App) {
            self.0.lock().push("late:ready");
        }
    }

    struct Spawner(Arc<Mutex<Vec<&'static str>>>);
    impl Plugin for Spawner {
        fn build(&self, _app: &mut App) {}
        fn ready(&self, app: &mut App) {
            app.add_plugins(Late(Arc::clone(&self.0)));
        }
    }

    let mut app = App::new();
    app.add_plugins(Spawner(Arc::clone(&seen))).finish();

    assert_eq!(*seen.lock(), vec!["late:build", "late:ready"]);
    assert!(app.has_plugin::<Late>());
}

#[test]
#[should_panic(expected = "already added")]
fn unique_plugin_added_twice_panics() {
    let mut app = App::new();
    app.add_plugins(SettingsPlugin).add_plugins(SettingsPlugin);
}

#[test]
#[should_panic(expected = "which was not added")]
fn missing_dependency_panics() {
    let mut app = App::new();
    app.add_plugins(DoublingPlugin).finish();
}

#[test]
#[should_panic(expected = "Circular dependency")]
fn circular_dependency_panics() {
    struct Ping;
    struct Pong;
    impl Plugin for Ping {
        fn build(&self, _app: &mut App) {}
        fn dependencies(&self) -> Vec<PluginId> {
            vec![PluginId::of::<Pong>()]
        }
    }
    impl Plugin for Pong {
        fn build(&self, _app: &mut App) {}
        fn dependencies(&self) -> Vec<PluginId> {
            vec![PluginId::of::<Ping>()]
        }
    }

    let mut app = App::new();
    app.add_plugins(Ping).add_plugins(Pong).finish();
}

#[test]
#[should_panic(expected = "already called")]
fn finish_twice_panics() {
    let mut app = App::new();
    app.finish();
    app.finish();
}
