//! Behavioural suites for the ZigbeeCore client.

mod support;
mod unit;
