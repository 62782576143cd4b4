//! Configuration loader that always fails.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use zhal_config::Config;

use crate::bootstrap::ConfigLoader;

/// Loader that intentionally fails by passing an unparseable port.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("zhal"),
            OsString::from("--core-port"),
            OsString::from("not-a-port"),
        ];
        Config::load_from_iter(args)
    }
}
