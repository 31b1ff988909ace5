//! botfleet chat agent: one conversational bot process.
//!
//! The binary wires a [`transport`] adapter, the [`dispatcher`] and the
//! [`engine`] together and keeps the connection alive with [`supervise`].

#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod flow;
pub mod rate_limit;
pub mod shutdown;
pub mod supervise;
pub mod transport;
