//! Stockroom Core - Shared domain types.
//!
//! This crate provides the types shared by every Stockroom component:
//! - `storefront` - Public storefront and the reservation/order engine
//! - `cli` - Migrations, seeding, and fulfilment tooling
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP. Everything that decides *whether* a mutation is allowed
//! without touching storage lives here so both storage backends share it.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, cart identity, quantities, money, statuses, and
//!   shipping rules

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
