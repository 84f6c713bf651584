//! Inbound/outbound postings and the transaction ledger views.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};

use estore_inventory::{
    DocumentNumbers, InboundRequest, InventoryItem, ItemKey, LedgerEntry, LedgerQuery, OutboundRequest,
    Page, TransactionGroup, TransactionLog, group_transactions, paginate, plan_inbound, plan_outbound,
};

use crate::gateway::{InventoryGateway, TransactionGateway};

use super::error::{ServiceError, ServiceResult};

/// Outcome of a posting: the document number used and the item after the movement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostingReceipt {
    pub document_number: String,
    pub item: InventoryItem,
}

pub struct TransactionService {
    inventory: Arc<dyn InventoryGateway>,
    transactions: Arc<dyn TransactionGateway>,
    numbers: DocumentNumbers,
    page_size: usize,
}

impl TransactionService {
    pub fn new(
        inventory: Arc<dyn InventoryGateway>,
        transactions: Arc<dyn TransactionGateway>,
        page_size: usize,
    ) -> Self {
        Self {
            inventory,
            transactions,
            numbers: DocumentNumbers::new(),
            page_size,
        }
    }

    /// Outbound and inbound detail rows merged into one list, newest first.
    /// Rows of the same date keep the gateway's newest-row-first order, so a
    /// document group takes its receiver and WBS/PO from its latest line.
    pub async fn list(&self) -> ServiceResult<Vec<TransactionLog>> {
        let mut all = self.transactions.list_outbound().await?;
        all.extend(self.transactions.list_inbound().await?);
        all.sort_by(|a, b| b.date().cmp(&a.date()));
        Ok(all)
    }

    /// One page of document groups for the given direction and search term.
    pub async fn grouped_page(&self, query: &LedgerQuery, page: usize) -> ServiceResult<Page<TransactionGroup>> {
        let all = self.list().await?;
        Ok(paginate(group_transactions(&all, query), page, self.page_size))
    }

    pub async fn ledger(&self, material_no: Option<&str>) -> ServiceResult<Vec<LedgerEntry>> {
        Ok(self.transactions.ledger_entries(material_no).await?)
    }

    async fn load_item(&self, key: &ItemKey) -> ServiceResult<InventoryItem> {
        self.inventory
            .get_item(key)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("stock item {key}")))
    }

    #[instrument(skip(self, request), fields(key = %request.key, quantity = request.quantity), err)]
    pub async fn create_outbound(&self, request: &OutboundRequest, actor: &str) -> ServiceResult<PostingReceipt> {
        let item = self.load_item(&request.key).await?;
        let posting = plan_outbound(&item, request, &self.numbers, actor, Utc::now())?;

        let updated = match self.transactions.post_outbound(&posting).await {
            Ok(updated) => updated,
            Err(err) => {
                warn!(error = %err, issue_number = %posting.record.issue_number, "outbound posting rejected");
                return Err(err.into());
            }
        };

        info!(
            issue_number = %posting.record.issue_number,
            remaining = updated.quantity,
            "outbound posted"
        );
        Ok(PostingReceipt {
            document_number: posting.record.issue_number,
            item: updated,
        })
    }

    #[instrument(skip(self, request), fields(key = %request.key, quantity = request.quantity), err)]
    pub async fn create_inbound(&self, request: &InboundRequest, actor: &str) -> ServiceResult<PostingReceipt> {
        let item = self.load_item(&request.key).await?;
        let posting = plan_inbound(&item, request, &self.numbers, actor, Utc::now())?;

        let updated = self.transactions.post_inbound(&posting).await?;

        info!(gr_number = %posting.record.gr_number, on_hand = updated.quantity, "inbound posted");
        Ok(PostingReceipt {
            document_number: posting.record.gr_number,
            item: updated,
        })
    }
}
