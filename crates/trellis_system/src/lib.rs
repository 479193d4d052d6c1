//! The composition root for Trellis applications.
//!
//! `trellis_system` owns nothing but the plumbing that wires services
//! together:
//!
//! - [`api`] - API trait for services exposed to plugins
//! - [`plugin`] - Plugin trait and plugin groups
//! - [`app`] - The [`App`](app::App) that orders plugins and stores APIs
//!
//! The dependency registry and the event bus live in their own crates and are
//! installed into an [`App`](app::App) as APIs by plugins. Nothing here is
//! global: an application constructs one `App` at start-up and hands
//! references to its APIs to whoever needs them.
//!
//! # Example
//!
//! ```
//! use trellis_system::api::API;
//! use trellis_system::app::App;
//! use trellis_system::plugin::Plugin;
//!
//! #[derive(Default)]
//! struct Greetings { text: String }
//! impl API for Greetings {}
//!
//! struct GreetingsPlugin;
//!
//! impl Plugin for GreetingsPlugin {
//!     fn build(&self, app: &mut App) {
//!         app.insert_api(Greetings { text: "hello".into() });
//!     }
//! }
//!
//! let mut app = App::new();
//! app.add_plugins(GreetingsPlugin).finish();
//! assert_eq!(app.api::<Greetings>().unwrap().text, "hello");
//! ```

/// API trait for services exposed to plugins.
pub mod api;

/// Composition root and plugin lifecycle.
pub mod app;

/// Plugin trait for extensible functionality.
pub mod plugin;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::api::*;
    pub use crate::app::*;
    pub use crate::plugin::*;
}
