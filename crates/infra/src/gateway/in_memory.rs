use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use estore_auth::UserProfile;
use estore_core::{DomainError, RecordId, UserId};
use estore_inventory::{
    AuditEntry, HistoryRecord, InboundPosting, InventoryItem, ItemKey, LedgerEntry, MaterialInRecord,
    MaterialOutRecord, OutboundPosting, TransactionLog,
};
use estore_opname::{OpnameStatus, StockAdjustment, StockOpnameItem, StockOpnameSession};
use estore_purchasing::{PurchaseOrder, PurchaseOrderStatus};

use super::r#trait::{
    GatewayError, GatewayResult, InventoryGateway, OpnameGateway, PurchaseGateway, TransactionGateway,
    UserGateway,
};

#[derive(Debug, Default)]
struct State {
    items: HashMap<ItemKey, InventoryItem>,
    /// Append order (oldest first).
    history: Vec<HistoryRecord>,
    /// Row id = position + 1.
    outbound: Vec<MaterialOutRecord>,
    inbound: Vec<MaterialInRecord>,
    ledger: Vec<LedgerEntry>,
    purchases: Vec<PurchaseOrder>,
    users: Vec<UserProfile>,
    sessions: Vec<StockOpnameSession>,
    lines: Vec<StockOpnameItem>,
}

/// In-memory gateway for tests/dev.
///
/// Every multi-row write happens under a single write lock, which gives the
/// same all-or-nothing behaviour the Postgres gateway gets from a transaction.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    state: RwLock<State>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> GatewayResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| GatewayError::Backend("in-memory state lock poisoned".to_string()))
    }

    fn write(&self) -> GatewayResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| GatewayError::Backend("in-memory state lock poisoned".to_string()))
    }
}

fn item_not_found(key: &ItemKey) -> GatewayError {
    GatewayError::NotFound(format!("stock item {key}"))
}

fn movement_error(err: DomainError) -> GatewayError {
    match err {
        DomainError::InsufficientStock {
            available,
            requested,
        } => GatewayError::InsufficientStock {
            available,
            requested,
        },
        other => GatewayError::Backend(other.to_string()),
    }
}

/// Index of a session that is still open; `InvalidState` once it is closed.
fn open_session(sessions: &[StockOpnameSession], id: RecordId) -> GatewayResult<usize> {
    let idx = sessions
        .iter()
        .position(|s| s.id == id)
        .ok_or_else(|| GatewayError::NotFound(format!("opname session {id}")))?;
    if sessions[idx].status != OpnameStatus::Open {
        return Err(GatewayError::InvalidState(format!(
            "opname session {id} is {}",
            sessions[idx].status
        )));
    }
    Ok(idx)
}

#[async_trait]
impl InventoryGateway for InMemoryGateway {
    async fn list_items(&self) -> GatewayResult<Vec<InventoryItem>> {
        let state = self.read()?;
        let mut items: Vec<_> = state
            .items
            .values()
            .map(|i| InventoryItem {
                history: Vec::new(),
                ..i.clone()
            })
            .collect();
        items.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(items)
    }

    async fn get_item(&self, key: &ItemKey) -> GatewayResult<Option<InventoryItem>> {
        Ok(self.read()?.items.get(key).cloned())
    }

    async fn insert_item(&self, item: &InventoryItem, history: &AuditEntry) -> GatewayResult<()> {
        let mut state = self.write()?;
        if state.items.contains_key(&item.key) {
            return Err(GatewayError::Conflict(format!("stock item {} already exists", item.key)));
        }
        state.items.insert(
            item.key.clone(),
            InventoryItem {
                history: Vec::new(),
                ..item.clone()
            },
        );
        state.history.push(HistoryRecord {
            key: item.key.clone(),
            entry: history.clone(),
        });
        Ok(())
    }

    async fn update_item(&self, item: &InventoryItem, history: &AuditEntry) -> GatewayResult<()> {
        let mut state = self.write()?;
        let slot = state.items.get_mut(&item.key).ok_or_else(|| item_not_found(&item.key))?;
        *slot = InventoryItem {
            history: Vec::new(),
            ..item.clone()
        };
        state.history.push(HistoryRecord {
            key: item.key.clone(),
            entry: history.clone(),
        });
        Ok(())
    }

    async fn delete_item(&self, key: &ItemKey) -> GatewayResult<()> {
        let mut state = self.write()?;
        state.items.remove(key).map(|_| ()).ok_or_else(|| item_not_found(key))
    }

    async fn recent_history(&self, limit: usize) -> GatewayResult<Vec<HistoryRecord>> {
        let state = self.read()?;
        Ok(state.history.iter().rev().take(limit).cloned().collect())
    }
}

#[async_trait]
impl TransactionGateway for InMemoryGateway {
    async fn list_outbound(&self) -> GatewayResult<Vec<TransactionLog>> {
        let state = self.read()?;
        Ok(state
            .outbound
            .iter()
            .enumerate()
            .rev()
            .map(|(i, r)| r.to_log(i as i64 + 1))
            .collect())
    }

    async fn list_inbound(&self) -> GatewayResult<Vec<TransactionLog>> {
        let state = self.read()?;
        Ok(state
            .inbound
            .iter()
            .enumerate()
            .rev()
            .map(|(i, r)| r.to_log(i as i64 + 1))
            .collect())
    }

    async fn post_outbound(&self, posting: &OutboundPosting) -> GatewayResult<InventoryItem> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        let item = state
            .items
            .get_mut(&posting.key)
            .ok_or_else(|| item_not_found(&posting.key))?;

        item.withdraw(posting.quantity, posting.ledger.at).map_err(movement_error)?;
        let updated = item.clone();

        state.outbound.push(posting.record.clone());
        state.ledger.push(posting.ledger.clone());
        state.history.push(HistoryRecord {
            key: posting.key.clone(),
            entry: posting.history.clone(),
        });
        Ok(updated)
    }

    async fn post_inbound(&self, posting: &InboundPosting) -> GatewayResult<InventoryItem> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        let item = state
            .items
            .get_mut(&posting.key)
            .ok_or_else(|| item_not_found(&posting.key))?;

        item.receive(posting.quantity, posting.ledger.at).map_err(movement_error)?;
        let updated = item.clone();

        state.inbound.push(posting.record.clone());
        state.ledger.push(posting.ledger.clone());
        state.history.push(HistoryRecord {
            key: posting.key.clone(),
            entry: posting.history.clone(),
        });
        Ok(updated)
    }

    async fn ledger_entries(&self, material_no: Option<&str>) -> GatewayResult<Vec<LedgerEntry>> {
        let state = self.read()?;
        Ok(state
            .ledger
            .iter()
            .rev()
            .filter(|e| material_no.is_none_or(|m| e.material_no == m))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PurchaseGateway for InMemoryGateway {
    async fn list_purchase_orders(&self) -> GatewayResult<Vec<PurchaseOrder>> {
        let mut orders = self.read()?.purchases.clone();
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date));
        Ok(orders)
    }

    async fn get_purchase_order(&self, id: RecordId) -> GatewayResult<Option<PurchaseOrder>> {
        Ok(self.read()?.purchases.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_purchase_order(&self, order: &PurchaseOrder) -> GatewayResult<()> {
        let mut state = self.write()?;
        if state.purchases.iter().any(|p| p.id == order.id) {
            return Err(GatewayError::Conflict(format!("purchase order {} already exists", order.id)));
        }
        state.purchases.push(order.clone());
        Ok(())
    }

    async fn update_purchase_status(
        &self,
        id: RecordId,
        expected: PurchaseOrderStatus,
        status: PurchaseOrderStatus,
    ) -> GatewayResult<()> {
        let mut state = self.write()?;
        let order = state
            .purchases
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| GatewayError::NotFound(format!("purchase order {id}")))?;
        if order.status != expected {
            return Err(GatewayError::InvalidState(format!(
                "purchase order {id} is {}",
                order.status
            )));
        }
        order.status = status;
        Ok(())
    }
}

#[async_trait]
impl UserGateway for InMemoryGateway {
    async fn list_users(&self) -> GatewayResult<Vec<UserProfile>> {
        let mut users = self.read()?.users.clone();
        users.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(users)
    }

    async fn get_user(&self, id: UserId) -> GatewayResult<Option<UserProfile>> {
        Ok(self.read()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> GatewayResult<Option<UserProfile>> {
        let email = estore_auth::user::normalize_email(email);
        Ok(self.read()?.users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: &UserProfile) -> GatewayResult<()> {
        let mut state = self.write()?;
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(GatewayError::Conflict(format!("email {} is already registered", user.email)));
        }
        state.users.push(user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &UserProfile) -> GatewayResult<()> {
        let mut state = self.write()?;
        if state.users.iter().any(|u| u.id != user.id && u.email == user.email) {
            return Err(GatewayError::Conflict(format!("email {} is already registered", user.email)));
        }
        let slot = state
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| GatewayError::NotFound(format!("user {}", user.id)))?;
        *slot = user.clone();
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> GatewayResult<()> {
        let mut state = self.write()?;
        let before = state.users.len();
        state.users.retain(|u| u.id != id);
        if state.users.len() == before {
            return Err(GatewayError::NotFound(format!("user {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl OpnameGateway for InMemoryGateway {
    async fn list_sessions(&self) -> GatewayResult<Vec<StockOpnameSession>> {
        let mut sessions = self.read()?.sessions.clone();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn get_session(&self, id: RecordId) -> GatewayResult<Option<StockOpnameSession>> {
        Ok(self.read()?.sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn create_session(&self, session: &StockOpnameSession, lines: &[StockOpnameItem]) -> GatewayResult<()> {
        let mut state = self.write()?;
        state.sessions.push(session.clone());
        state.lines.extend_from_slice(lines);
        Ok(())
    }

    async fn update_session(&self, session: &StockOpnameSession) -> GatewayResult<()> {
        let mut state = self.write()?;
        let idx = open_session(&state.sessions, session.id)?;
        state.sessions[idx] = session.clone();
        Ok(())
    }

    async fn session_items(
        &self,
        session_id: RecordId,
        offset: usize,
        limit: usize,
    ) -> GatewayResult<(Vec<StockOpnameItem>, usize)> {
        let all = self.all_session_items(session_id).await?;
        let total = all.len();
        Ok((all.into_iter().skip(offset).take(limit).collect(), total))
    }

    async fn all_session_items(&self, session_id: RecordId) -> GatewayResult<Vec<StockOpnameItem>> {
        let state = self.read()?;
        let mut lines: Vec<_> = state
            .lines
            .iter()
            .filter(|l| l.session_id == session_id)
            .cloned()
            .collect();
        lines.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(lines)
    }

    async fn get_session_item(&self, id: RecordId) -> GatewayResult<Option<StockOpnameItem>> {
        Ok(self.read()?.lines.iter().find(|l| l.id == id).cloned())
    }

    async fn update_session_item(&self, line: &StockOpnameItem) -> GatewayResult<()> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        let idx = state
            .lines
            .iter()
            .position(|l| l.id == line.id)
            .ok_or_else(|| GatewayError::NotFound(format!("opname item {}", line.id)))?;
        open_session(&state.sessions, state.lines[idx].session_id)?;
        state.lines[idx] = line.clone();
        Ok(())
    }

    async fn finalize_session(
        &self,
        session: &StockOpnameSession,
        adjustments: &[StockAdjustment],
    ) -> GatewayResult<()> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        let idx = open_session(&state.sessions, session.id)?;

        // Every adjustment is checked before anything is written.
        let mut counted = Vec::with_capacity(adjustments.len());
        for adj in adjustments {
            let Some(item) = state.items.get(&adj.key) else {
                tracing::warn!(key = %adj.key, "opname adjustment skipped: item no longer exists");
                continue;
            };
            let mut item = item.clone();
            item.set_counted(adj.physical_qty, adj.history.at)
                .map_err(|e| GatewayError::Backend(e.to_string()))?;
            counted.push((item, adj));
        }

        state.sessions[idx] = session.clone();
        for (item, adj) in counted {
            state.items.insert(adj.key.clone(), item);
            state.history.push(HistoryRecord {
                key: adj.key.clone(),
                entry: adj.history.clone(),
            });
        }
        Ok(())
    }
}
