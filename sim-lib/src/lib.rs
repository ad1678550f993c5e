//! Synthetic endpoint-behaviour simulator.
//!
//! The [`engine`] decides per request how long to wait and whether
//! to fail, the [`http`] module exposes it as a small HTTP api.

#![cfg_attr(
    not(test),
    warn(clippy::print_stdout, clippy::dbg_macro),
    deny(clippy::unwrap_used, clippy::expect_used)
)]

pub mod config;
pub mod engine;
pub mod http;
pub mod utils;
