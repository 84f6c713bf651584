//! Persistence gateway boundary.
//!
//! Every read and write the application performs goes through one of the
//! gateway traits. Two backends implement all of them: an in-memory store
//! for tests and local runs, and Postgres.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryGateway;
pub use postgres::PostgresGateway;
pub use r#trait::{
    GatewayError, GatewayResult, Gateways, InventoryGateway, OpnameGateway, PurchaseGateway,
    TransactionGateway, UserGateway,
};
