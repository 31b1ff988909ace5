//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution and
//! filesystem access.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod config;
pub mod credentials;
pub mod launcher;

pub use config::{FleetPaths, load_registry};
pub use credentials::JsonCredentialStore;
pub use launcher::{ChildProcess, ProcessLauncher};
