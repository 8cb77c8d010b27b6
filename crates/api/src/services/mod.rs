//! Business logic services.
//!
//! Services sit between the HTTP routes and the stores. They own the checks
//! that span more than one store call: uniqueness guards for products, and
//! validation plus catalog pricing for orders.

mod error;
pub mod orders;
pub mod products;

pub use error::ServiceError;
pub use orders::OrderService;
pub use products::{BookService, MagazineService, ProductService};
