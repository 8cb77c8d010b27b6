//! Core types for the bookstore.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod isbn;
pub mod price;
pub mod status;

pub use id::*;
pub use isbn::{Isbn, IsbnError};
pub use price::{Price, PriceError};
pub use status::*;
