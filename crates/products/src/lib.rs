//! `shelfpulse-products`
//!
//! **Responsibility:** Catalog master data (products). One entry per unique
//! product; batches and transactions hang off the ledger, not off this crate.

pub mod product;

pub use product::{
    DefineProduct, DiscontinueProduct, Product, ProductCommand, ProductDefined,
    ProductDiscontinued, ProductEvent, ProductId, ProductStatus, ProductUpdated, UpdateProduct,
};
