use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use estore_core::{DomainError, DomainResult, Entity, RecordId};
use estore_inventory::{InventoryItem, ItemKey};

/// Session lifecycle: `Open` → `Completed` | `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OpnameStatus {
    Open,
    Completed,
    Cancelled,
}

impl OpnameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpnameStatus::Open => "OPEN",
            OpnameStatus::Completed => "COMPLETED",
            OpnameStatus::Cancelled => "CANCELLED",
        }
    }
}

impl core::fmt::Display for OpnameStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpnameStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Ok(OpnameStatus::Open),
            "COMPLETED" => Ok(OpnameStatus::Completed),
            "CANCELLED" => Ok(OpnameStatus::Cancelled),
            other => Err(DomainError::validation(format!("unknown opname status '{other}'"))),
        }
    }
}

/// A counting session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockOpnameSession {
    pub id: RecordId,
    pub title: String,
    pub status: OpnameStatus,
    pub creator: String,
    pub notes: Option<String>,
    pub total_items: usize,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl StockOpnameSession {
    pub fn open(
        title: impl Into<String>,
        creator: impl Into<String>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(DomainError::validation("session title cannot be empty"));
        }
        Ok(Self {
            id: RecordId::new(),
            title,
            status: OpnameStatus::Open,
            creator: creator.into(),
            notes: notes.filter(|n| !n.trim().is_empty()),
            total_items: 0,
            created_at: now,
            closed_at: None,
        })
    }

    /// One uncounted line per stock item, recording its current quantity.
    pub fn snapshot(&mut self, items: &[InventoryItem]) -> Vec<StockOpnameItem> {
        let lines: Vec<_> = items.iter().map(|i| StockOpnameItem::snapshot(self.id, i)).collect();
        self.total_items = lines.len();
        lines
    }

    pub fn ensure_open(&self) -> DomainResult<()> {
        if self.status != OpnameStatus::Open {
            return Err(DomainError::invariant(format!(
                "opname session is {}, not OPEN",
                self.status
            )));
        }
        Ok(())
    }

    pub fn complete(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.close(OpnameStatus::Completed, now)
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.close(OpnameStatus::Cancelled, now)
    }

    fn close(&mut self, status: OpnameStatus, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_open()?;
        self.status = status;
        self.closed_at = Some(now);
        Ok(())
    }
}

impl Entity for StockOpnameSession {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// One item line inside a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockOpnameItem {
    pub id: RecordId,
    pub session_id: RecordId,
    #[serde(flatten)]
    pub key: ItemKey,
    pub material_desc: String,
    pub system_qty: f64,
    pub physical_qty: f64,
    /// `physical_qty - system_qty`
    pub variance: f64,
    pub is_counted: bool,
}

impl StockOpnameItem {
    pub fn snapshot(session_id: RecordId, item: &InventoryItem) -> Self {
        Self {
            id: RecordId::new(),
            session_id,
            key: item.key.clone(),
            material_desc: item.name.clone(),
            system_qty: item.quantity,
            physical_qty: 0.0,
            variance: 0.0,
            is_counted: false,
        }
    }

    pub fn record_count(&mut self, physical_qty: f64) -> DomainResult<()> {
        if !physical_qty.is_finite() || physical_qty < 0.0 {
            return Err(DomainError::validation("physical quantity must be a non-negative number"));
        }
        self.physical_qty = physical_qty;
        self.variance = physical_qty - self.system_qty;
        self.is_counted = true;
        Ok(())
    }

    pub fn has_variance(&self) -> bool {
        self.is_counted && self.variance != 0.0
    }
}

/// Progress counters of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpnameStats {
    pub total: usize,
    pub counted: usize,
    /// Counted with zero variance.
    pub matched: usize,
    /// Counted with non-zero variance.
    pub variance: usize,
}

pub fn session_stats(items: &[StockOpnameItem]) -> OpnameStats {
    items.iter().fold(
        OpnameStats {
            total: items.len(),
            ..OpnameStats::default()
        },
        |mut s, i| {
            if i.is_counted {
                s.counted += 1;
                if i.has_variance() {
                    s.variance += 1;
                } else {
                    s.matched += 1;
                }
            }
            s
        },
    )
}
