//! Unit tests for the bootstrap helpers.

use std::sync::Arc;

use rstest::rstest;
use zhal_config::Config;

use crate::{BootstrapError, DiscardEvents, InitError, StaticConfigLoader, bootstrap_with};

use super::support::{FailingConfigLoader, test_config};

#[rstest]
fn bootstrap_starts_a_client() {
    let loader = StaticConfigLoader(test_config(None));

    let client = bootstrap_with(&loader, Arc::new(DiscardEvents)).expect("bootstrap");

    assert_ne!(client.receiver_addr().port(), 0);
    client.terminate().expect("terminate");
}

#[rstest]
fn bootstrap_reports_configuration_failures() {
    let error =
        bootstrap_with(&FailingConfigLoader, Arc::new(DiscardEvents)).expect_err("bad config");

    assert!(matches!(error, BootstrapError::Configuration { .. }));
}

#[rstest]
fn bootstrap_reports_init_failures() {
    let loader = StaticConfigLoader(Config {
        event_host: "   ".to_owned(),
        ..test_config(None)
    });

    let error = bootstrap_with(&loader, Arc::new(DiscardEvents)).expect_err("empty host");

    assert!(matches!(
        error,
        BootstrapError::Init {
            source: InitError::Config { .. }
        }
    ));
}
