//! Callbacks and their calling conventions.
//!
//! A [`Callback`] carries a declared arity that tells the bus how to call it:
//!
//! | Arity | Arguments |
//! |-------|-----------|
//! | 0 | none |
//! | 1 | the event |
//! | 2 | the subscriber identity, then the event |
//!
//! Typed closures are converted through [`IntoCallback`], which picks the
//! arity from the closure's signature:
//!
//! ```
//! use trellis_events::prelude::*;
//!
//! struct Tick;
//! impl Event for Tick {}
//!
//! let zero = IntoCallback::<Tick, _>::into_callback(|| {});
//! let one = IntoCallback::<Tick, _>::into_callback(|_: &Tick| {});
//! let two = IntoCallback::<Tick, _>::into_callback(|_: &SubscriberId, _: &Tick| {});
//!
//! assert_eq!((zero.arity(), one.arity(), two.arity()), (0, 1, 2));
//! ```
//!
//! [`Callback::raw`] builds a callback from an erased handler and an
//! explicit arity, for adapters whose shape is only known at runtime. It is
//! the only way to obtain an arity the bus rejects.

use core::any::type_name;
use core::fmt;
use std::borrow::Cow;
use std::sync::Arc;

use crate::error::CallbackError;
use crate::event::Event;
use crate::subscriber::SubscriberId;

/// One argument passed to a callback.
#[derive(Clone, Copy)]
pub enum CallArg<'a> {
    /// The identity the callback was subscribed under.
    Subscriber(&'a SubscriberId),
    /// The event being dispatched.
    Event(&'a dyn Event),
}

impl fmt::Debug for CallArg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subscriber(id) => f.debug_tuple("Subscriber").field(id).finish(),
            Self::Event(_) => f.write_str("Event(..)"),
        }
    }
}

type Handler = dyn Fn(&[CallArg<'_>]) -> Result<(), CallbackError> + Send + Sync;

/// A named, type-erased event handler with a declared arity.
#[derive(Clone)]
pub struct Callback {
    name: Cow<'static, str>,
    arity: usize,
    handler: Arc<Handler>,
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl Callback {
    /// Creates a callback from an erased handler.
    ///
    /// The handler receives exactly `arity` arguments laid out as described
    /// in the [module docs](self).
    pub fn raw<F>(name: impl Into<Cow<'static, str>>, arity: usize, handler: F) -> Self
    where
        F: Fn(&[CallArg<'_>]) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity,
            handler: Arc::new(handler),
        }
    }

    /// Replaces the callback's name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the callback's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared arity.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Calls the handler.
    ///
    /// # Errors
    ///
    /// Returns whatever the handler returns.
    pub fn invoke(&self, args: &[CallArg<'_>]) -> Result<(), CallbackError> {
        (self.handler)(args)
    }
}

/// Arguments did not match the shape a typed callback expects.
#[derive(Debug, thiserror::Error)]
#[error("callback expected {expected}, got {got:?}")]
pub struct ArgumentMismatch {
    expected: &'static str,
    got: String,
}

impl ArgumentMismatch {
    fn new(expected: &'static str, args: &[CallArg<'_>]) -> CallbackError {
        Box::new(Self {
            expected,
            got: format!("{args:?}"),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CallbackOutput
// ─────────────────────────────────────────────────────────────────────────────

/// Return types accepted from typed callbacks.
pub trait CallbackOutput {
    /// Converts the return value into a dispatch result.
    ///
    /// # Errors
    ///
    /// Returns the callback's own error, boxed.
    fn into_result(self) -> Result<(), CallbackError>;
}

impl CallbackOutput for () {
    fn into_result(self) -> Result<(), CallbackError> {
        Ok(())
    }
}

impl<Er: Into<CallbackError>> CallbackOutput for Result<(), Er> {
    fn into_result(self) -> Result<(), CallbackError> {
        self.map_err(Into::into)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// IntoCallback
// ─────────────────────────────────────────────────────────────────────────────

/// Conversion of typed closures into [`Callback`]s for event type `E`.
///
/// The `Marker` parameter lets one closure type pick among the three
/// conventions; it is inferred and never named by callers. Zero-argument
/// closures say nothing about `E`, so they need it spelled out
/// (`bus.subscribe::<Tick, _>(id, || ..)`).
pub trait IntoCallback<E: Event, Marker>: Send + Sync + 'static {
    /// Converts this into a callback.
    fn into_callback(self) -> Callback;
}

/// Marker for `Fn() -> R` callbacks.
pub struct NoArgs;

/// Marker for `Fn(&E) -> R` callbacks.
pub struct EventOnly;

/// Marker for `Fn(&SubscriberId, &E) -> R` callbacks.
pub struct WithSubscriber;

impl<E, F, R> IntoCallback<E, (NoArgs, R)> for F
where
    E: Event,
    F: Fn() -> R + Send + Sync + 'static,
    R: CallbackOutput,
{
    fn into_callback(self) -> Callback {
        Callback::raw(type_name::<F>(), 0, move |args| match args {
            [] => self().into_result(),
            _ => Err(ArgumentMismatch::new("no arguments", args)),
        })
    }
}

impl<E, F, R> IntoCallback<E, (EventOnly, R)> for F
where
    E: Event,
    F: Fn(&E) -> R + Send + Sync + 'static,
    R: CallbackOutput,
{
    fn into_callback(self) -> Callback {
        Callback::raw(type_name::<F>(), 1, move |args| match args {
            [CallArg::Event(event)] => match event.downcast_ref::<E>() {
                Some(event) => self(event).into_result(),
                None => Err(ArgumentMismatch::new(type_name::<E>(), args)),
            },
            _ => Err(ArgumentMismatch::new(type_name::<E>(), args)),
        })
    }
}

impl<E, F, R> IntoCallback<E, (WithSubscriber, R)> for F
where
    E: Event,
    F: Fn(&SubscriberId, &E) -> R + Send + Sync + 'static,
    R: CallbackOutput,
{
    fn into_callback(self) -> Callback {
        Callback::raw(type_name::<F>(), 2, move |args| match args {
            [CallArg::Subscriber(subscriber), CallArg::Event(event)] => {
                match event.downcast_ref::<E>() {
                    Some(event) => self(*subscriber, event).into_result(),
                    None => Err(ArgumentMismatch::new(type_name::<E>(), args)),
                }
            }
            _ => Err(ArgumentMismatch::new(type_name::<E>(), args)),
        })
    }
}
