//! Tracing and observability plugin.
//!
//! Provides [`TracingPlugin`], which configures the `tracing` subscriber and
//! exposes its configuration as an API.
//!
//! # Lifecycle
//!
//! - **`build()`** inserts the [`TracingConfig`] API so other plugins can read
//!   the intended configuration while they build.
//! - **`ready()`** installs the subscriber. Deferring installation lets the
//!   rest of the app finish configuring before output starts.
//!
//! # Example
//!
//! ```
//! use trellis_system::app::App;
//! use trellis_core_plugins::{TracingConfig, TracingFormat, TracingPlugin};
//! use tracing::Level;
//!
//! let mut app = App::new();
//! app.add_plugins(
//!     TracingPlugin::default()
//!         .with_level(Level::DEBUG)
//!         .with_format(TracingFormat::Compact),
//! );
//! app.finish();
//!
//! let config = app.api::<TracingConfig>().unwrap();
//! assert_eq!(config.level, Level::DEBUG);
//! ```

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use trellis_system::api::API;
use trellis_system::app::App;
use trellis_system::plugin::Plugin;

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable multi-line output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig API
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing configuration, readable by any plugin once built.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// The configured maximum log level.
    pub level: Level,
    /// The configured output format.
    pub format: TracingFormat,
    /// The target filter, if one was set.
    pub env_filter: Option<String>,
}

impl API for TracingConfig {}

// ─────────────────────────────────────────────────────────────────────────────
// TracingPlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing and logging plugin.
///
/// # APIs Provided
///
/// | API | Description |
/// |-----|-------------|
/// | [`TracingConfig`] | Tracing configuration (read-only) |
///
/// # Environment Filter
///
/// Use `with_env_filter` to set per-target levels. An invalid filter falls
/// back to the plain level.
///
/// ```
/// use trellis_core_plugins::TracingPlugin;
///
/// TracingPlugin::default()
///     .with_env_filter("trellis_events=trace,trellis_registry=debug")
/// # ;
/// ```
#[derive(Debug, Clone)]
pub struct TracingPlugin {
    level: Level,
    format: TracingFormat,
    env_filter: Option<String>,
    span_events: bool,
}

impl Default for TracingPlugin {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingPlugin {
    /// Creates a new `TracingPlugin` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets a target filter string.
    ///
    /// Format: `target=level,target=level,...`
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    fn filter(&self) -> EnvFilter {
        match &self.env_filter {
            Some(filter) => {
                EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
            }
            None => EnvFilter::new(self.level.as_str()),
        }
    }
}

impl Plugin for TracingPlugin {
    fn build(&self, app: &mut App) {
        app.insert_api(TracingConfig {
            level: self.level,
            format: self.format,
            env_filter: self.env_filter.clone(),
        });
    }

    fn ready(&self, _app: &mut App) {
        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };

        // try_init fails if a global subscriber already exists; keep that one.
        let installed = match self.format {
            TracingFormat::Pretty => tracing_subscriber::registry()
                .with(self.filter())
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
            TracingFormat::Compact => tracing_subscriber::registry()
                .with(self.filter())
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
            TracingFormat::Json => tracing_subscriber::registry()
                .with(self.filter())
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
        };

        tracing::info!(
            level = %self.level,
            format = ?self.format,
            installed,
            "TracingPlugin initialized"
        );
    }

    fn cleanup(&self, _app: &mut App) {
        tracing::info!("TracingPlugin shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracing_format_default_is_pretty() {
        assert_eq!(TracingFormat::default(), TracingFormat::Pretty);
    }

    #[test]
    fn tracing_plugin_builder() {
        let plugin = TracingPlugin::new()
            .with_level(Level::DEBUG)
            .with_format(TracingFormat::Json)
            .with_env_filter("trellis_events=trace")
            .with_span_events(true);

        assert_eq!(plugin.level, Level::DEBUG);
        assert_eq!(plugin.format, TracingFormat::Json);
        assert_eq!(plugin.env_filter.as_deref(), Some("trellis_events=trace"));
        assert!(plugin.span_events);
    }

    #[test]
    fn invalid_filter_falls_back_to_level() {
        let plugin = TracingPlugin::new()
            .with_level(Level::WARN)
            .with_env_filter("not a [valid filter");
        assert_eq!(plugin.filter().to_string(), "warn");
    }

    #[test]
    fn tracing_plugin_inserts_config() {
        let mut app = App::new();
        app.add_plugins(TracingPlugin::default().with_format(TracingFormat::Compact));
        app.finish();

        let config = app.api::<TracingConfig>().unwrap();
        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.format, TracingFormat::Compact);
        assert!(config.env_filter.is_none());
    }
}
