use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use estore_core::{DomainError, DomainResult, Entity, RecordId};
use estore_inventory::ItemKey;

/// Purchase order status lifecycle.
///
/// `Ordered` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PurchaseOrderStatus {
    Ordered,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Ordered => "ORDERED",
            PurchaseOrderStatus::Received => "RECEIVED",
            PurchaseOrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PurchaseOrderStatus::Ordered)
    }

    pub fn can_transition_to(&self, next: PurchaseOrderStatus) -> bool {
        matches!(
            (self, next),
            (PurchaseOrderStatus::Ordered, PurchaseOrderStatus::Received)
                | (PurchaseOrderStatus::Ordered, PurchaseOrderStatus::Cancelled)
        )
    }
}

impl core::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ORDERED" => Ok(PurchaseOrderStatus::Ordered),
            "RECEIVED" => Ok(PurchaseOrderStatus::Received),
            "CANCELLED" => Ok(PurchaseOrderStatus::Cancelled),
            other => Err(DomainError::validation(format!("unknown purchase order status '{other}'"))),
        }
    }
}

/// Input for creating a purchase order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPurchaseOrder {
    #[serde(flatten)]
    pub item: ItemKey,
    pub item_name: String,
    pub quantity: f64,
    #[serde(default)]
    pub supplier: Option<String>,
    pub total_cost: f64,
}

/// A purchase order for one stock item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: RecordId,
    #[serde(flatten)]
    pub item: ItemKey,
    pub item_name: String,
    pub quantity: f64,
    pub order_date: DateTime<Utc>,
    pub status: PurchaseOrderStatus,
    pub supplier: Option<String>,
    pub total_cost: f64,
}

impl PurchaseOrder {
    /// Validate input and open a new order in `Ordered` state.
    pub fn place(input: NewPurchaseOrder, now: DateTime<Utc>) -> DomainResult<Self> {
        if input.item_name.trim().is_empty() {
            return Err(DomainError::validation("item name cannot be empty"));
        }
        if !input.quantity.is_finite() || input.quantity <= 0.0 {
            return Err(DomainError::validation("quantity must be greater than zero"));
        }
        if !input.total_cost.is_finite() || input.total_cost < 0.0 {
            return Err(DomainError::validation("total cost cannot be negative"));
        }

        Ok(Self {
            id: RecordId::new(),
            item: input.item,
            item_name: input.item_name.trim().to_string(),
            quantity: input.quantity,
            order_date: now,
            status: PurchaseOrderStatus::Ordered,
            supplier: input.supplier.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            total_cost: input.total_cost,
        })
    }

    /// Move to `next`. Re-applying the current status is a no-op.
    pub fn transition(&mut self, next: PurchaseOrderStatus) -> DomainResult<()> {
        if self.status == next {
            return Ok(());
        }
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invariant(format!(
                "purchase order cannot move from {} to {}",
                self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}

impl Entity for PurchaseOrder {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
