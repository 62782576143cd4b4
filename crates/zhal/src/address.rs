//! Identifiers for end-devices and requests.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// EUI64 of a Zigbee end-device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceAddress(u64);

impl DeviceAddress {
    /// Address used for network-wide commands that target no single device.
    pub const NETWORK: Self = Self(0);

    /// Wraps a raw EUI64.
    #[must_use]
    pub const fn new(eui64: u64) -> Self {
        Self(eui64)
    }

    /// Raw EUI64 value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for DeviceAddress {
    fn from(eui64: u64) -> Self {
        Self(eui64)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{:016x}", self.0)
    }
}

impl FromStr for DeviceAddress {
    type Err = AddressParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.is_empty() || digits.len() > 16 {
            return Err(AddressParseError::Length {
                input: input.to_owned(),
            });
        }
        u64::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|source| AddressParseError::Digits {
                input: input.to_owned(),
                source,
            })
    }
}

/// Error returned when an EUI64 string cannot be parsed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    /// The string held no digits or more than sixteen.
    #[error("EUI64 '{input}' must have between 1 and 16 hex digits")]
    Length {
        /// Rejected input.
        input: String,
    },
    /// The string held non-hex characters.
    #[error("EUI64 '{input}' is not hexadecimal: {source}")]
    Digits {
        /// Rejected input.
        input: String,
        /// Parser error.
        #[source]
        source: ParseIntError,
    },
}

/// Identifier correlating a command with its asynchronous response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw identifier value as carried on the wire.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Monotonic request id source owned by one client instance.
#[derive(Debug)]
pub(crate) struct RequestIdAllocator {
    next: AtomicU64,
}

impl RequestIdAllocator {
    pub(crate) const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub(crate) fn next(&self) -> RequestId {
        RequestId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
