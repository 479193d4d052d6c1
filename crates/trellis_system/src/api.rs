//! API trait for services exposed through the composition root.
//!
//! An API is a long-lived service object stored in the [`App`](crate::app::App)
//! and shared by reference with every plugin and every consumer the
//! application hands it to. The dependency registry and the event bus are
//! both APIs.
//!
//! # Interior Mutability Pattern
//!
//! `App::api()` hands out `&A`, so APIs that accept registrations after the
//! build phase guard their state themselves:
//!
//! ```
//! use std::sync::RwLock;
//! use trellis_system::api::API;
//! use trellis_system::app::App;
//!
//! #[derive(Default)]
//! struct Registry {
//!     names: RwLock<Vec<String>>,
//! }
//!
//! impl API for Registry {}
//!
//! impl Registry {
//!     fn register(&self, name: &str) {
//!         self.names.write().unwrap().push(name.into());
//!     }
//! }
//!
//! let mut app = App::new();
//! app.insert_api(Registry::default());
//!
//! // No `&mut App` needed to register.
//! app.api::<Registry>().unwrap().register("first");
//! ```

/// Marker trait for services stored in an [`App`](crate::app::App).
///
/// # Implementing API
///
/// ```
/// use trellis_system::api::API;
///
/// pub struct MyService { /* ... */ }
///
/// impl API for MyService {}
/// ```
pub trait API: Send + Sync + 'static {}
