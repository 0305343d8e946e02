//! Stockroom storefront library.
//!
//! The reservation and order engine behind the storefront binary: storage
//! backends, services, and the axum routes that expose them. Built as a
//! library so the integration tests can drive it directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
