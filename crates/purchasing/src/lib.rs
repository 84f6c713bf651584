//! Purchasing domain module (purchase orders).
//!
//! Business rules for purchase orders, implemented purely as deterministic
//! domain logic (no IO, no HTTP, no storage).

pub mod order;

pub use order::{NewPurchaseOrder, PurchaseOrder, PurchaseOrderStatus};
