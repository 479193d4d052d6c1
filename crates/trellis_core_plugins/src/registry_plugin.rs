//! Dependency registry plugin.

use trellis_registry::DependencyRegistry;
use trellis_system::app::App;
use trellis_system::plugin::Plugin;

/// Installs a [`DependencyRegistry`] as an API.
///
/// A registry inserted before this plugin builds is kept, so applications can
/// seed providers up front. Other plugins register their providers during
/// their own `build()` through [`App::api`].
///
/// # APIs Provided
///
/// | API | Description |
/// |-----|-------------|
/// | [`DependencyRegistry`] | Provider registration and resolution |
///
/// # Example
///
/// ```
/// use trellis_system::app::App;
/// use trellis_registry::DependencyRegistry;
/// use trellis_core_plugins::RegistryPlugin;
///
/// let mut app = App::new();
/// app.add_plugins(RegistryPlugin);
/// app.finish();
///
/// let registry = app.api::<DependencyRegistry>().unwrap();
/// registry.register_shared(|_| 7_u32);
/// assert_eq!(*registry.get::<u32>("doc").unwrap().unwrap(), 7);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryPlugin;

impl Plugin for RegistryPlugin {
    fn build(&self, app: &mut App) {
        if !app.contains_api::<DependencyRegistry>() {
            app.insert_api(DependencyRegistry::new());
        }
    }

    fn ready(&self, app: &mut App) {
        if let Some(registry) = app.api::<DependencyRegistry>() {
            tracing::debug!(
                providers = registry.len(),
                names = ?registry.provider_names(),
                "dependency registry ready"
            );
        }
    }

    fn cleanup(&self, app: &mut App) {
        if let Some(registry) = app.api::<DependencyRegistry>() {
            tracing::debug!(providers = registry.len(), "dependency registry shutting down");
        }
    }
}
