//! Client bootstrap: configuration, telemetry, then [`Zhal::init`].

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;
use tracing::info;

use zhal_config::Config;

use crate::client::{InitError, Zhal};
use crate::events::EventHandler;
use crate::telemetry::{self, TelemetryError};

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the client configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when no configuration could be produced.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`]: defaults, then the config
/// file, then `ZHAL_*` variables, then command-line flags.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that hands out a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader(pub Config);

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.0.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The client failed to start.
    #[error("failed to start client: {source}")]
    Init {
        /// Underlying init error.
        #[source]
        source: InitError,
    },
}

/// Loads configuration through `loader`, installs telemetry, and starts a
/// client delivering events to `events`.
///
/// # Errors
///
/// Returns [`BootstrapError`] naming the stage that failed.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    events: Arc<dyn EventHandler>,
) -> Result<Zhal, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    let client =
        Zhal::init(&config, events).map_err(|source| BootstrapError::Init { source })?;
    info!(
        target: BOOTSTRAP_TARGET,
        busy_lease = ?config.busy_lease(),
        "bootstrap complete"
    );
    Ok(client)
}
