//! Shared helpers for the session guard integration tests.

pub mod fixtures;
pub mod mocks;
