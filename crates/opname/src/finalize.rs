use chrono::{DateTime, Utc};
use serde::Serialize;

use estore_core::DomainResult;
use estore_inventory::{AuditEntry, ItemKey};

use crate::session::{StockOpnameItem, StockOpnameSession};

/// Stock correction produced by finalizing a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockAdjustment {
    pub key: ItemKey,
    /// New on-hand quantity.
    pub physical_qty: f64,
    pub variance: f64,
    pub history: AuditEntry,
}

/// Adjustments for every counted line of an open session.
///
/// Uncounted lines leave stock untouched. Counted lines without variance
/// still get an adjustment so the count is recorded in the item's history.
pub fn plan_finalize(
    session: &StockOpnameSession,
    items: &[StockOpnameItem],
    actor: &str,
    now: DateTime<Utc>,
) -> DomainResult<Vec<StockAdjustment>> {
    session.ensure_open()?;

    Ok(items
        .iter()
        .filter(|i| i.is_counted && i.session_id == session.id)
        .map(|i| StockAdjustment {
            key: i.key.clone(),
            physical_qty: i.physical_qty,
            variance: i.variance,
            history: AuditEntry::new(
                now,
                actor,
                "OPNAME",
                format!(
                    "{}: system {} -> physical {} (variance {:+})",
                    session.title, i.system_qty, i.physical_qty, i.variance
                ),
            ),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use estore_inventory::InventoryItem;

    #[test]
    fn only_counted_lines_are_adjusted() {
        let mut session = StockOpnameSession::open("Year end", "admin", None, Utc::now()).unwrap();
        let mut a = InventoryItem::new(ItemKey::new("A", "S").unwrap(), "A", Utc::now());
        a.quantity = 10.0;
        let b = InventoryItem::new(ItemKey::new("B", "S").unwrap(), "B", Utc::now());
        let mut lines = session.snapshot(&[a, b]);
        lines[0].record_count(8.0).unwrap();

        let plan = plan_finalize(&session, &lines, "admin", Utc::now()).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].physical_qty, 8.0);
        assert_eq!(plan[0].history.action, "OPNAME");
        assert!(plan[0].history.details.contains("variance -2"));
    }

    #[test]
    fn closed_session_cannot_be_finalized() {
        let mut session = StockOpnameSession::open("Spot", "admin", None, Utc::now()).unwrap();
        session.complete(Utc::now()).unwrap();
        assert!(plan_finalize(&session, &[], "admin", Utc::now()).is_err());
    }
}
