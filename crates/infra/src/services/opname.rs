//! Stock-take sessions.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use estore_core::RecordId;
use estore_inventory::Page;
use estore_opname::{OpnameStats, StockOpnameItem, StockOpnameSession, plan_finalize, session_stats};

use crate::gateway::{InventoryGateway, OpnameGateway};

use super::error::{ServiceError, ServiceResult};

pub struct OpnameService {
    inventory: Arc<dyn InventoryGateway>,
    opname: Arc<dyn OpnameGateway>,
    page_size: usize,
}

impl OpnameService {
    pub fn new(inventory: Arc<dyn InventoryGateway>, opname: Arc<dyn OpnameGateway>, page_size: usize) -> Self {
        Self {
            inventory,
            opname,
            page_size,
        }
    }

    /// Open a session with one line per current stock item.
    #[instrument(skip(self, notes), err)]
    pub async fn create_session(
        &self,
        title: &str,
        notes: Option<String>,
        actor: &str,
    ) -> ServiceResult<StockOpnameSession> {
        let mut session = StockOpnameSession::open(title, actor, notes, Utc::now())?;
        let items = self.inventory.list_items().await?;
        let lines = session.snapshot(&items);
        self.opname.create_session(&session, &lines).await?;
        info!(session_id = %session.id, lines = lines.len(), "opname session opened");
        Ok(session)
    }

    pub async fn list_sessions(&self) -> ServiceResult<Vec<StockOpnameSession>> {
        Ok(self.opname.list_sessions().await?)
    }

    pub async fn get_session(&self, id: RecordId) -> ServiceResult<StockOpnameSession> {
        self.opname
            .get_session(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("opname session {id}")))
    }

    /// A 1-based page of session lines ordered by material number.
    pub async fn items_page(&self, id: RecordId, page: usize, page_size: Option<usize>) -> ServiceResult<Page<StockOpnameItem>> {
        self.get_session(id).await?;
        let page = page.max(1);
        let page_size = page_size.filter(|s| *s > 0).unwrap_or(self.page_size);
        let offset = (page - 1).saturating_mul(page_size);

        let (items, total_items) = self.opname.session_items(id, offset, page_size).await?;
        Ok(Page {
            items,
            page,
            page_size,
            total_items,
            total_pages: total_items.div_ceil(page_size),
        })
    }

    pub async fn stats(&self, id: RecordId) -> ServiceResult<OpnameStats> {
        self.get_session(id).await?;
        let lines = self.opname.all_session_items(id).await?;
        Ok(session_stats(&lines))
    }

    /// Record a physical count on a line of an open session.
    #[instrument(skip(self), fields(line_id = %line_id), err)]
    pub async fn update_count(&self, line_id: RecordId, physical_qty: f64) -> ServiceResult<StockOpnameItem> {
        let mut line = self
            .opname
            .get_session_item(line_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("opname item {line_id}")))?;
        self.get_session(line.session_id).await?.ensure_open()?;

        line.record_count(physical_qty)?;
        self.opname.update_session_item(&line).await?;
        Ok(line)
    }

    /// Apply counted quantities to stock and complete the session.
    #[instrument(skip(self), fields(session_id = %id), err)]
    pub async fn finalize(&self, id: RecordId, actor: &str) -> ServiceResult<StockOpnameSession> {
        let mut session = self.get_session(id).await?;
        let lines = self.opname.all_session_items(id).await?;
        let now = Utc::now();

        let adjustments = plan_finalize(&session, &lines, actor, now)?;
        session.complete(now)?;
        self.opname.finalize_session(&session, &adjustments).await?;

        info!(adjusted = adjustments.len(), "opname session finalized");
        Ok(session)
    }

    #[instrument(skip(self), fields(session_id = %id), err)]
    pub async fn cancel(&self, id: RecordId) -> ServiceResult<StockOpnameSession> {
        let mut session = self.get_session(id).await?;
        session.cancel(Utc::now())?;
        self.opname.update_session(&session).await?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;
    use estore_inventory::{AuditEntry, InventoryItem, ItemKey};
    use estore_opname::OpnameStatus;

    async fn seeded() -> (OpnameService, Arc<InMemoryGateway>) {
        let gw = Arc::new(InMemoryGateway::new());
        for (m, q) in [("A", 10.0), ("B", 4.0), ("C", 1.0)] {
            let mut item = InventoryItem::new(ItemKey::new(m, "WH01").unwrap(), m, Utc::now());
            item.quantity = q;
            gw.insert_item(&item, &AuditEntry::new(Utc::now(), "admin", "CREATED", "Initial Entry"))
                .await
                .unwrap();
        }
        (OpnameService::new(gw.clone(), gw.clone(), 2), gw)
    }

    #[tokio::test]
    async fn session_lifecycle_adjusts_counted_stock_only() {
        let (svc, gw) = seeded().await;
        let session = svc.create_session("Q3 count", None, "admin").await.unwrap();
        assert_eq!(session.total_items, 3);

        let page = svc.items_page(session.id, 1, None).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_items, 3);
        assert_eq!(page.total_pages, 2);

        let a = page.items.iter().find(|l| l.key.material_no == "A").unwrap();
        svc.update_count(a.id, 8.0).await.unwrap();

        let stats = svc.stats(session.id).await.unwrap();
        assert_eq!((stats.total, stats.counted, stats.variance), (3, 1, 1));

        let done = svc.finalize(session.id, "admin").await.unwrap();
        assert_eq!(done.status, OpnameStatus::Completed);
        assert!(done.closed_at.is_some());

        let a = gw.get_item(&ItemKey::new("A", "WH01").unwrap()).await.unwrap().unwrap();
        let b = gw.get_item(&ItemKey::new("B", "WH01").unwrap()).await.unwrap().unwrap();
        assert_eq!(a.quantity, 8.0);
        assert_eq!(b.quantity, 4.0);
    }

    #[tokio::test]
    async fn closed_session_rejects_counts_and_second_close() {
        let (svc, _) = seeded().await;
        let session = svc.create_session("Spot", None, "admin").await.unwrap();
        let line = svc.items_page(session.id, 1, Some(10)).await.unwrap().items[0].clone();

        svc.cancel(session.id).await.unwrap();
        assert!(matches!(
            svc.update_count(line.id, 1.0).await,
            Err(ServiceError::InvariantViolation(_))
        ));
        assert!(svc.finalize(session.id, "admin").await.is_err());
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let (svc, _) = seeded().await;
        assert!(matches!(svc.stats(RecordId::new()).await, Err(ServiceError::NotFound(_))));
    }
}
