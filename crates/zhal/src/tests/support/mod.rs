//! Shared fixtures for the behavioural suites.

mod config_loader;
mod events;
mod fake_core;
mod transport;

use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use zhal_config::Config;

pub use self::config_loader::FailingConfigLoader;
pub use self::events::RecordingEvents;
pub use self::fake_core::{FakeCore, Reply};
pub use self::transport::{ChannelTransport, Responder, Transmitted};

/// Configuration with an ephemeral receiver port and short socket timeouts.
pub fn test_config(core: Option<SocketAddr>) -> Config {
    let defaults = Config::default();
    Config {
        core_port: core.map_or(defaults.core_port, |addr| addr.port()),
        event_port: 0,
        connect_timeout_ms: 500,
        send_timeout_ms: 500,
        receive_timeout_ms: 500,
        ..defaults
    }
}

/// Polls `condition` for up to two seconds.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}
