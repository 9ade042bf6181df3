//! Mock servers for adapter integration testing
//!
//! Simulates the beefweb player API so the client, entity and HTTP API can be
//! exercised end to end without a running DeaDBeeF or foobar2000.

#![allow(dead_code)]

pub mod beefweb;

pub use beefweb::{MockBeefwebServer, MockPlayer};
