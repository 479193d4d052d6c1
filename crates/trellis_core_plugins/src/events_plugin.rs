//! Event bus plugin.

use trellis_events::{EventBus, ObserverBinder};
use trellis_system::app::App;
use trellis_system::plugin::Plugin;

/// Installs an [`EventBus`] and an [`ObserverBinder`] as APIs.
///
/// Instances inserted before this plugin builds are kept.
///
/// # APIs Provided
///
/// | API | Description |
/// |-----|-------------|
/// | [`EventBus`] | Subscription and dispatch |
/// | [`ObserverBinder`] | Interest tables for declarative observers |
///
/// # Example
///
/// ```
/// use trellis_system::app::App;
/// use trellis_events::prelude::*;
/// use trellis_core_plugins::EventsPlugin;
///
/// struct Saved;
/// impl Event for Saved {}
///
/// let mut app = App::new();
/// app.add_plugins(EventsPlugin);
/// app.finish();
///
/// let bus = app.api::<EventBus>().unwrap();
/// bus.subscribe::<Saved, _>("audit", || {});
/// assert_eq!(bus.post(&Saved).unwrap(), 1);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct EventsPlugin;

impl Plugin for EventsPlugin {
    fn build(&self, app: &mut App) {
        if !app.contains_api::<EventBus>() {
            app.insert_api(EventBus::new());
        }
        if !app.contains_api::<ObserverBinder>() {
            app.insert_api(ObserverBinder::new());
        }
    }

    fn ready(&self, app: &mut App) {
        if let Some(bus) = app.api::<EventBus>() {
            tracing::debug!(
                subscribers = bus.subscriber_count(),
                subscriptions = bus.subscription_count(),
                "event bus ready"
            );
        }
    }

    fn cleanup(&self, app: &mut App) {
        if let Some(bus) = app.api::<EventBus>() {
            let subscribers = bus.subscribers();
            let removed: usize = subscribers.iter().map(|id| bus.unsubscribe_all(id)).sum();
            tracing::debug!(
                subscribers = subscribers.len(),
                removed,
                "event bus shutting down"
            );
        }
    }
}
