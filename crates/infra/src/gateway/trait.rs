use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use estore_auth::UserProfile;
use estore_core::{RecordId, UserId};
use estore_inventory::{
    AuditEntry, HistoryRecord, InboundPosting, InventoryItem, ItemKey, LedgerEntry, OutboundPosting,
    TransactionLog,
};
use estore_opname::{StockAdjustment, StockOpnameItem, StockOpnameSession};
use estore_purchasing::{PurchaseOrder, PurchaseOrderStatus};

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Persistence gateway failure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GatewayError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Unique key violation (duplicate item key, duplicate email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Outbound posting lost against the stock re-check inside the store.
    #[error("insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: f64, requested: f64 },

    /// The stored status no longer allows the write (session closed, order
    /// already received or cancelled). Nothing is written.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Stored row could not be mapped back to a domain value.
    #[error("invalid row: {0}")]
    InvalidRow(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// `stock_items` + `stock_history`.
#[async_trait]
pub trait InventoryGateway: Send + Sync {
    /// All items, most recently updated first, without history.
    async fn list_items(&self) -> GatewayResult<Vec<InventoryItem>>;

    async fn get_item(&self, key: &ItemKey) -> GatewayResult<Option<InventoryItem>>;

    /// Insert a new item together with its first history row.
    async fn insert_item(&self, item: &InventoryItem, history: &AuditEntry) -> GatewayResult<()>;

    /// Overwrite an existing item and append a history row.
    async fn update_item(&self, item: &InventoryItem, history: &AuditEntry) -> GatewayResult<()>;

    async fn delete_item(&self, key: &ItemKey) -> GatewayResult<()>;

    /// The newest `limit` history rows across all items, newest first.
    async fn recent_history(&self, limit: usize) -> GatewayResult<Vec<HistoryRecord>>;
}

/// `material_out`, `material_in` and `material_transactions`.
#[async_trait]
pub trait TransactionGateway: Send + Sync {
    /// Detail rows, newest first (date, then row id).
    async fn list_outbound(&self) -> GatewayResult<Vec<TransactionLog>>;

    /// Detail rows, newest first (date, then row id).
    async fn list_inbound(&self) -> GatewayResult<Vec<TransactionLog>>;

    /// Atomically write the detail row, the ledger row and the history row and
    /// decrement stock. Fails with `InsufficientStock` if stock no longer covers
    /// the posting; nothing is written in that case.
    async fn post_outbound(&self, posting: &OutboundPosting) -> GatewayResult<InventoryItem>;

    /// Atomically write the detail row, the ledger row and the history row and
    /// increment stock.
    async fn post_inbound(&self, posting: &InboundPosting) -> GatewayResult<InventoryItem>;

    /// Ledger rows, newest first, optionally for one material.
    async fn ledger_entries(&self, material_no: Option<&str>) -> GatewayResult<Vec<LedgerEntry>>;
}

/// `purchase_orders`.
#[async_trait]
pub trait PurchaseGateway: Send + Sync {
    /// Newest order first.
    async fn list_purchase_orders(&self) -> GatewayResult<Vec<PurchaseOrder>>;

    async fn get_purchase_order(&self, id: RecordId) -> GatewayResult<Option<PurchaseOrder>>;

    async fn insert_purchase_order(&self, order: &PurchaseOrder) -> GatewayResult<()>;

    /// Move the order from `expected` to `status`. Fails with `InvalidState`
    /// if the stored status is no longer `expected`.
    async fn update_purchase_status(
        &self,
        id: RecordId,
        expected: PurchaseOrderStatus,
        status: PurchaseOrderStatus,
    ) -> GatewayResult<()>;
}

/// `user_profiles`.
#[async_trait]
pub trait UserGateway: Send + Sync {
    async fn list_users(&self) -> GatewayResult<Vec<UserProfile>>;

    async fn get_user(&self, id: UserId) -> GatewayResult<Option<UserProfile>>;

    /// Lookup by normalized email.
    async fn find_user_by_email(&self, email: &str) -> GatewayResult<Option<UserProfile>>;

    /// Fails with `Conflict` on a duplicate email.
    async fn insert_user(&self, user: &UserProfile) -> GatewayResult<()>;

    async fn update_user(&self, user: &UserProfile) -> GatewayResult<()>;

    async fn delete_user(&self, id: UserId) -> GatewayResult<()>;
}

/// `stock_opname_sessions` + `stock_opname_items`.
#[async_trait]
pub trait OpnameGateway: Send + Sync {
    /// Newest session first.
    async fn list_sessions(&self) -> GatewayResult<Vec<StockOpnameSession>>;

    async fn get_session(&self, id: RecordId) -> GatewayResult<Option<StockOpnameSession>>;

    async fn create_session(&self, session: &StockOpnameSession, lines: &[StockOpnameItem]) -> GatewayResult<()>;

    /// Store the closing status of a session that is still open in the store;
    /// `InvalidState` otherwise.
    async fn update_session(&self, session: &StockOpnameSession) -> GatewayResult<()>;

    /// One page of lines ordered by material number, plus the total line count.
    async fn session_items(
        &self,
        session_id: RecordId,
        offset: usize,
        limit: usize,
    ) -> GatewayResult<(Vec<StockOpnameItem>, usize)>;

    async fn all_session_items(&self, session_id: RecordId) -> GatewayResult<Vec<StockOpnameItem>>;

    async fn get_session_item(&self, id: RecordId) -> GatewayResult<Option<StockOpnameItem>>;

    /// Store a count; `InvalidState` unless the line's session is open in the store.
    async fn update_session_item(&self, line: &StockOpnameItem) -> GatewayResult<()>;

    /// Atomically apply stock adjustments, append their history rows and
    /// store the closed session. `InvalidState` (and no writes) unless the
    /// session is still open in the store.
    async fn finalize_session(
        &self,
        session: &StockOpnameSession,
        adjustments: &[StockAdjustment],
    ) -> GatewayResult<()>;
}

/// Every gateway behind one backend, as trait objects.
#[derive(Clone)]
pub struct Gateways {
    pub inventory: Arc<dyn InventoryGateway>,
    pub transactions: Arc<dyn TransactionGateway>,
    pub purchases: Arc<dyn PurchaseGateway>,
    pub users: Arc<dyn UserGateway>,
    pub opname: Arc<dyn OpnameGateway>,
}

impl Gateways {
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: InventoryGateway + TransactionGateway + PurchaseGateway + UserGateway + OpnameGateway + 'static,
    {
        Self {
            inventory: backend.clone(),
            transactions: backend.clone(),
            purchases: backend.clone(),
            users: backend.clone(),
            opname: backend,
        }
    }
}
