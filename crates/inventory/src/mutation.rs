//! Planning of inbound and outbound postings.
//!
//! A plan is computed against a snapshot of the target item and holds every
//! row the posting writes. Applying it is the gateway's job, which must do
//! so atomically and re-check stock for outbound plans.

use core::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use estore_core::DomainResult;

use crate::item::{AuditEntry, InventoryItem, ItemKey, ensure_positive};
use crate::records::{LedgerEntry, MaterialInRecord, MaterialOutRecord};
use crate::transaction::Direction;

const DEFAULT_OUTBOUND_RECEIVER: &str = "Unknown";
const DEFAULT_INBOUND_RECEIVER: &str = "Warehouse";

/// Generator for `ISS-<millis>` / `GR-<millis>` document numbers.
///
/// Numbers are strictly increasing per process: two calls within the same
/// millisecond get consecutive values.
#[derive(Debug, Default)]
pub struct DocumentNumbers {
    last: AtomicI64,
}

impl DocumentNumbers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, direction: Direction, now: DateTime<Utc>) -> String {
        let millis = now.timestamp_millis();
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(millis.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        format!("{}-{}", direction.document_prefix(), millis.max(previous + 1))
    }

    /// Use the supplied number when non-blank, otherwise generate one.
    pub fn resolve(&self, supplied: Option<&str>, direction: Direction, now: DateTime<Utc>) -> String {
        match supplied.map(str::trim).filter(|s| !s.is_empty()) {
            Some(n) => n.to_string(),
            None => self.next(direction, now),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundRequest {
    #[serde(flatten)]
    pub key: ItemKey,
    pub quantity: f64,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub issue_number: Option<String>,
    #[serde(default)]
    pub receiver: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub wbs: Option<String>,
    #[serde(default)]
    pub gl_number: Option<String>,
    #[serde(default)]
    pub gl_account: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundRequest {
    #[serde(flatten)]
    pub key: ItemKey,
    pub quantity: f64,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub gr_number: Option<String>,
    #[serde(default)]
    pub po: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub receiver: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub wbs: Option<String>,
}

/// Everything an outbound posting writes.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundPosting {
    pub key: ItemKey,
    pub quantity: f64,
    pub record: MaterialOutRecord,
    pub ledger: LedgerEntry,
    pub history: AuditEntry,
    /// On-hand quantity after the posting, as seen from the snapshot.
    pub expected_quantity: f64,
}

/// Everything an inbound posting writes.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundPosting {
    pub key: ItemKey,
    pub quantity: f64,
    pub record: MaterialInRecord,
    pub ledger: LedgerEntry,
    pub history: AuditEntry,
    pub expected_quantity: f64,
}

fn text(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

fn or_default(value: &Option<String>, fallback: &str) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}

/// Validate an outbound request against `item` and build its posting.
///
/// Fails with `InsufficientStock` when the request exceeds on-hand stock.
pub fn plan_outbound(
    item: &InventoryItem,
    request: &OutboundRequest,
    numbers: &DocumentNumbers,
    actor: &str,
    now: DateTime<Utc>,
) -> DomainResult<OutboundPosting> {
    ensure_positive(request.quantity)?;
    item.ensure_available(request.quantity)?;

    let issue_number = numbers.resolve(request.issue_number.as_deref(), Direction::Out, now);
    let receiver = or_default(&request.receiver, DEFAULT_OUTBOUND_RECEIVER);
    let remarks = text(&request.remarks);

    let record = MaterialOutRecord {
        material_no: item.key.material_no.clone(),
        material_desc: item.name.clone(),
        quantity: request.quantity,
        uom: item.uom.clone(),
        date: request.date.unwrap_or_else(|| now.date_naive()),
        sloc: item.key.sloc.clone(),
        receiver: receiver.clone(),
        remarks: remarks.clone(),
        created_at: now,
        issue_number: issue_number.clone(),
        wbs: text(&request.wbs),
        gl_number: text(&request.gl_number),
        gl_account: text(&request.gl_account),
        keterangan: remarks,
    };

    let ledger = LedgerEntry {
        material_no: item.key.material_no.clone(),
        direction: Direction::Out,
        quantity: request.quantity,
        at: now,
        reference_id: issue_number.clone(),
        remarks: format!("Outbound: {receiver}"),
    };

    let history = AuditEntry::new(
        now,
        actor,
        "OUTBOUND",
        format!("-{} {} ({issue_number}) to {receiver}", request.quantity, item.uom),
    );

    Ok(OutboundPosting {
        key: item.key.clone(),
        quantity: request.quantity,
        record,
        ledger,
        history,
        expected_quantity: item.quantity - request.quantity,
    })
}

/// Validate an inbound request and build its posting. Max stock is not checked.
pub fn plan_inbound(
    item: &InventoryItem,
    request: &InboundRequest,
    numbers: &DocumentNumbers,
    actor: &str,
    now: DateTime<Utc>,
) -> DomainResult<InboundPosting> {
    ensure_positive(request.quantity)?;

    let gr_number = numbers.resolve(request.gr_number.as_deref(), Direction::In, now);
    let receiver = or_default(&request.receiver, DEFAULT_INBOUND_RECEIVER);

    let record = MaterialInRecord {
        material_no: item.key.material_no.clone(),
        gr_number: gr_number.clone(),
        material_desc: item.name.clone(),
        quantity: request.quantity,
        sloc: item.key.sloc.clone(),
        uom: item.uom.clone(),
        remarks: text(&request.remarks),
        wbs: text(&request.wbs),
        receiver,
        date: request.date.unwrap_or_else(|| now.date_naive()),
        po: text(&request.po),
        reference: text(&request.reference),
    };

    let ledger = LedgerEntry {
        material_no: item.key.material_no.clone(),
        direction: Direction::In,
        quantity: request.quantity,
        at: now,
        reference_id: gr_number.clone(),
        remarks: format!("Inbound GR: {gr_number}"),
    };

    let history = AuditEntry::new(
        now,
        actor,
        "INBOUND",
        format!("+{} {} ({gr_number})", request.quantity, item.uom),
    );

    Ok(InboundPosting {
        key: item.key.clone(),
        quantity: request.quantity,
        record,
        ledger,
        history,
        expected_quantity: item.quantity + request.quantity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use estore_core::DomainError;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 8, 30, 0).unwrap()
    }

    fn item(qty: f64) -> InventoryItem {
        let mut i = InventoryItem::new(ItemKey::new("A", "WH01").unwrap(), "Item A", now());
        i.quantity = qty;
        i
    }

    fn outbound(qty: f64) -> OutboundRequest {
        OutboundRequest {
            key: ItemKey::new("A", "WH01").unwrap(),
            quantity: qty,
            date: None,
            issue_number: None,
            receiver: None,
            remarks: None,
            wbs: Some("WBS-1".into()),
            gl_number: None,
            gl_account: None,
        }
    }

    fn inbound(qty: f64) -> InboundRequest {
        InboundRequest {
            key: ItemKey::new("A", "WH01").unwrap(),
            quantity: qty,
            date: None,
            gr_number: Some("GR-77".into()),
            po: Some("PO-1".into()),
            reference: None,
            receiver: None,
            remarks: None,
            wbs: None,
        }
    }

    #[test]
    fn outbound_over_stock_is_rejected() {
        let numbers = DocumentNumbers::new();
        let err = plan_outbound(&item(10.0), &outbound(15.0), &numbers, "ops@example.com", now()).unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(10.0, 15.0));
    }

    #[test]
    fn outbound_plan_fills_defaults() {
        let numbers = DocumentNumbers::new();
        let p = plan_outbound(&item(10.0), &outbound(4.0), &numbers, "ops@example.com", now()).unwrap();
        assert_eq!(p.expected_quantity, 6.0);
        assert_eq!(p.record.receiver, "Unknown");
        assert_eq!(p.record.issue_number, format!("ISS-{}", now().timestamp_millis()));
        assert_eq!(p.record.date, now().date_naive());
        assert_eq!(p.ledger.remarks, "Outbound: Unknown");
        assert_eq!(p.ledger.reference_id, p.record.issue_number);
        assert_eq!(p.history.action, "OUTBOUND");
    }

    #[test]
    fn inbound_adds_quantity_and_keeps_supplied_gr() {
        let numbers = DocumentNumbers::new();
        let p = plan_inbound(&item(10.0), &inbound(5.0), &numbers, "", now()).unwrap();
        assert_eq!(p.expected_quantity, 15.0);
        assert_eq!(p.ledger.direction, Direction::In);
        assert_eq!(p.ledger.quantity, 5.0);
        assert_eq!(p.record.gr_number, "GR-77");
        assert_eq!(p.record.receiver, "Warehouse");
        assert_eq!(p.ledger.remarks, "Inbound GR: GR-77");
        assert_eq!(p.history.user, "System");
    }

    #[test]
    fn inbound_ignores_max_stock() {
        let mut i = item(10.0);
        i.max_stock = Some(10.0);
        let p = plan_inbound(&i, &inbound(5.0), &DocumentNumbers::new(), "x", now()).unwrap();
        assert_eq!(p.expected_quantity, 15.0);
    }

    #[test]
    fn zero_quantity_is_a_validation_error() {
        let numbers = DocumentNumbers::new();
        assert!(matches!(
            plan_inbound(&item(1.0), &inbound(0.0), &numbers, "x", now()),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            plan_outbound(&item(1.0), &outbound(-2.0), &numbers, "x", now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn document_numbers_are_unique_within_one_millisecond() {
        let numbers = DocumentNumbers::new();
        let a = numbers.next(Direction::Out, now());
        let b = numbers.next(Direction::Out, now());
        let c = numbers.next(Direction::In, now());
        assert_ne!(a, b);
        let ms = now().timestamp_millis();
        assert_eq!(a, format!("ISS-{ms}"));
        assert_eq!(b, format!("ISS-{}", ms + 1));
        assert_eq!(c, format!("GR-{}", ms + 2));
    }

    #[test]
    fn blank_supplied_number_is_replaced() {
        let numbers = DocumentNumbers::new();
        assert_eq!(numbers.resolve(Some(" ISS-9 "), Direction::Out, now()), "ISS-9");
        assert!(numbers.resolve(Some("  "), Direction::Out, now()).starts_with("ISS-"));
    }

    proptest! {
        /// A plan exists exactly when the request fits in stock, and then
        /// never leaves negative stock.
        #[test]
        fn outbound_never_overdraws(on_hand in 0u32..500, requested in 1u32..600) {
            let numbers = DocumentNumbers::new();
            let result = plan_outbound(
                &item(f64::from(on_hand)),
                &outbound(f64::from(requested)),
                &numbers,
                "x",
                now(),
            );
            if requested > on_hand {
                let is_insufficient = matches!(result, Err(DomainError::InsufficientStock { .. }));
                prop_assert!(is_insufficient);
            } else {
                let p = result.unwrap();
                prop_assert!(p.expected_quantity >= 0.0);
                prop_assert_eq!(p.expected_quantity, f64::from(on_hand - requested));
            }
        }
    }
}
