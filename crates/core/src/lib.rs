//! Bookstore Core - Shared types library.
//!
//! This crate provides the types shared by every bookstore component:
//! - `api` - Catalog/order persistence engine and its HTTP surface
//! - `integration-tests` - Database-backed tests for the stores
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, ISBNs, kinds and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
