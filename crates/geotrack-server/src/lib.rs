//! # geotrack-server
//!
//! HTTP server library for the geotrack location reporting client.
//!
//! This library provides the API handlers and state management that wire the
//! `geotrack-core` pipeline to HTTP.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod state;
