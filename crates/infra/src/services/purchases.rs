//! Purchase order register.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use estore_core::RecordId;
use estore_purchasing::{NewPurchaseOrder, PurchaseOrder, PurchaseOrderStatus};

use crate::gateway::PurchaseGateway;

use super::error::{ServiceError, ServiceResult};

pub struct PurchaseService {
    purchases: Arc<dyn PurchaseGateway>,
}

impl PurchaseService {
    pub fn new(purchases: Arc<dyn PurchaseGateway>) -> Self {
        Self { purchases }
    }

    pub async fn list(&self) -> ServiceResult<Vec<PurchaseOrder>> {
        Ok(self.purchases.list_purchase_orders().await?)
    }

    #[instrument(skip(self, input), fields(item = %input.item), err)]
    pub async fn create(&self, input: NewPurchaseOrder) -> ServiceResult<PurchaseOrder> {
        let order = PurchaseOrder::place(input, Utc::now())?;
        self.purchases.insert_purchase_order(&order).await?;
        info!(order_id = %order.id, "purchase order placed");
        Ok(order)
    }

    #[instrument(skip(self), fields(order_id = %id, status = %status), err)]
    pub async fn update_status(&self, id: RecordId, status: PurchaseOrderStatus) -> ServiceResult<PurchaseOrder> {
        let mut order = self
            .purchases
            .get_purchase_order(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("purchase order {id}")))?;
        let current = order.status;
        order.transition(status)?;
        self.purchases.update_purchase_status(id, current, order.status).await?;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;
    use estore_inventory::ItemKey;

    fn input(qty: f64) -> NewPurchaseOrder {
        NewPurchaseOrder {
            item: ItemKey::new("M-1", "WH01").unwrap(),
            item_name: "Gasket".into(),
            quantity: qty,
            supplier: Some("ACME".into()),
            total_cost: 120.0,
        }
    }

    #[tokio::test]
    async fn orders_move_from_ordered_to_terminal_once() {
        let svc = PurchaseService::new(Arc::new(InMemoryGateway::new()));
        let order = svc.create(input(4.0)).await.unwrap();
        assert_eq!(order.status, PurchaseOrderStatus::Ordered);

        let received = svc.update_status(order.id, PurchaseOrderStatus::Received).await.unwrap();
        assert_eq!(received.status, PurchaseOrderStatus::Received);
        assert!(matches!(
            svc.update_status(order.id, PurchaseOrderStatus::Cancelled).await,
            Err(ServiceError::InvariantViolation(_))
        ));
        assert_eq!(svc.list().await.unwrap()[0].status, PurchaseOrderStatus::Received);
    }

    #[tokio::test]
    async fn invalid_orders_are_rejected() {
        let svc = PurchaseService::new(Arc::new(InMemoryGateway::new()));
        assert!(matches!(svc.create(input(0.0)).await, Err(ServiceError::Validation(_))));
        assert!(matches!(
            svc.update_status(RecordId::new(), PurchaseOrderStatus::Received).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
