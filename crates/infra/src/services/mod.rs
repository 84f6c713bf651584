//! Application services: orchestration over gateways, object storage and the
//! identity provider. Domain rules stay in the domain crates.

pub mod error;
pub mod items;
pub mod opname;
pub mod purchases;
pub mod transactions;
pub mod users;

use std::sync::Arc;

pub use error::{ServiceError, ServiceResult};
pub use items::ItemService;
pub use opname::OpnameService;
pub use purchases::PurchaseService;
pub use transactions::{PostingReceipt, TransactionService};
pub use users::{ProfileChanges, UserChanges, UserService};

use crate::config::AppConfig;
use crate::gateway::{GatewayResult, Gateways, InMemoryGateway, PostgresGateway};
use crate::identity::{IdentityProvider, InMemoryIdentityProvider};
use crate::storage::{InMemoryObjectStore, LocalObjectStore, ObjectStore};

/// Every service, wired against one gateway backend.
pub struct Services {
    pub items: ItemService,
    pub transactions: TransactionService,
    pub purchases: PurchaseService,
    pub opname: OpnameService,
    pub users: UserService,
    pub store: Arc<dyn ObjectStore>,
}

impl Services {
    pub fn new(
        gateways: Gateways,
        store: Arc<dyn ObjectStore>,
        identity: Arc<dyn IdentityProvider>,
        config: &AppConfig,
    ) -> Self {
        Self {
            items: ItemService::new(
                gateways.inventory.clone(),
                store.clone(),
                config.history_limit,
                config.max_image_bytes,
            ),
            transactions: TransactionService::new(
                gateways.inventory.clone(),
                gateways.transactions.clone(),
                config.page_size,
            ),
            purchases: PurchaseService::new(gateways.purchases.clone()),
            opname: OpnameService::new(gateways.inventory.clone(), gateways.opname.clone(), config.page_size),
            users: UserService::new(gateways.users.clone(), identity),
            store,
        }
    }

    /// In-memory gateway, object store and identity provider.
    pub fn in_memory(config: &AppConfig) -> Self {
        Self::new(
            Gateways::from_backend(Arc::new(InMemoryGateway::new())),
            Arc::new(InMemoryObjectStore::new(&config.bucket, &config.public_storage_url)),
            Arc::new(InMemoryIdentityProvider::new()),
            config,
        )
    }

    /// Pick backends from configuration: Postgres when a database URL is set,
    /// a local directory store when a storage directory is set.
    pub async fn from_config(config: &AppConfig) -> GatewayResult<Self> {
        let gateways = match config.database_url.as_deref() {
            Some(url) => {
                let pg = PostgresGateway::connect(url, config.database_max_connections).await?;
                pg.ensure_schema().await?;
                tracing::info!("using postgres gateway");
                Gateways::from_backend(Arc::new(pg))
            }
            None => {
                tracing::info!("no database configured; using in-memory gateway");
                Gateways::from_backend(Arc::new(InMemoryGateway::new()))
            }
        };

        let store: Arc<dyn ObjectStore> = match config.storage_dir.as_deref() {
            Some(dir) => Arc::new(LocalObjectStore::new(dir, &config.bucket, &config.public_storage_url)),
            None => Arc::new(InMemoryObjectStore::new(&config.bucket, &config.public_storage_url)),
        };

        Ok(Self::new(gateways, store, Arc::new(InMemoryIdentityProvider::new()), config))
    }
}
