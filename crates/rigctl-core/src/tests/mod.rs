//! Test module for rigctl-core
//!
//! This module contains tests for:
//! - Motion control (target resolution, clamping, query-then-move)
//! - Hardware registry load, update and persist round trips
//! - Session serialization and timeouts
//! - The rig orchestrator
//! - Configuration loading, validation and defaults

// Test modules use exact float comparisons
#![allow(clippy::float_cmp)]

mod motion_tests;
