//! Common test utilities for relay integration tests
//!
//! This module provides shared test infrastructure: a recording player
//! control mock, song fixtures, and a WebSocket client wrapper.

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod client;
pub mod fixtures;
pub mod mocks;

pub use client::*;
pub use fixtures::*;
pub use mocks::*;
