//! Domain models for the catalog and orders.

pub mod order;
pub mod product;

pub use order::{
    CreateOrder, NewOrder, NewOrderItem, Order, OrderItem, OrderPatch, PricedItem, PricedOrder,
};
pub use product::{
    BaseProduct, Book, BookDetails, BookPatch, BookUpdate, DetailsPatch, Magazine, MagazineDetails,
    MagazinePatch, MagazineUpdate, NewBook, NewMagazine, NewProduct, Product, ProductPatch,
};
