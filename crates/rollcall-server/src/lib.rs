//! # rollcall-server
//!
//! HTTP server library for the rollcall attendance system.
//!
//! This library provides the API handlers, logging setup, and shared state.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod state;
