//! Unit tests for the botfleet CLI
//!
//! These tests use mocked ports or temp directories and run fast.

mod console_parser;
mod fleet_supervisor;
mod mocks;
mod property_tests;
mod registry;
