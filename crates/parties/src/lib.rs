//! `shelfpulse-parties`
//!
//! **Responsibility:** External parties the store deals with: suppliers, one
//! primary per category. The uniqueness constraint itself is enforced by the
//! supplier directory in the storage layer (cross-aggregate).

pub mod supplier;

pub use supplier::{
    RegisterSupplier, Supplier, SupplierCommand, SupplierContactUpdated, SupplierEvent,
    SupplierId, SupplierRegistered, UpdateSupplierContact,
};
