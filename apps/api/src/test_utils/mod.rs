//! Test utilities for integration testing.
//!
//! This module provides:
//! - Test data factories for creating valid test fixtures
//! - In-memory implementations of every port
//! - A builder for an `AppState` wired to those in-memory ports

mod app_state_builder;
mod credential_mocks;
mod entitlement_mocks;
mod factories;
mod receipt_mocks;

pub use app_state_builder::*;
pub use credential_mocks::*;
pub use entitlement_mocks::*;
pub use factories::*;
pub use rate_limit_mocks::*;
pub use receipt_mocks::*;
