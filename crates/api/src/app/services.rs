//! Service wiring shared by every handler.

use std::ops::Deref;

use estore_infra::gateway::GatewayResult;
use estore_infra::{AppConfig, Services};

/// Application services plus the configuration they were built from.
pub struct AppServices {
    services: Services,
    pub config: AppConfig,
}

impl AppServices {
    pub fn new(services: Services, config: AppConfig) -> Self {
        Self { services, config }
    }

    /// Backends chosen from configuration (Postgres / local storage when set).
    pub async fn from_config(config: AppConfig) -> GatewayResult<Self> {
        let services = Services::from_config(&config).await?;
        Ok(Self::new(services, config))
    }
}

impl Deref for AppServices {
    type Target = Services;

    fn deref(&self) -> &Self::Target {
        &self.services
    }
}
