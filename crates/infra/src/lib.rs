//! Infrastructure layer: persistence gateways, object storage, identity,
//! configuration and the application services built on them.

pub mod config;
pub mod gateway;
pub mod identity;
pub mod services;
pub mod storage;

pub use config::AppConfig;
pub use gateway::{GatewayError, Gateways};
pub use services::{ServiceError, ServiceResult, Services};
