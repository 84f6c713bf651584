//! Inventory domain module.
//!
//! Stock master, the unified transaction ledger, document grouping and the
//! rules for inbound/outbound movements, implemented purely as deterministic
//! domain logic (no IO, no HTTP, no storage).

pub mod image;
pub mod item;
pub mod ledger;
pub mod mutation;
pub mod records;
pub mod transaction;

pub use image::{ALLOWED_IMAGE_TYPES, ImageUpload, MAX_IMAGE_BYTES, object_path_from_url};
pub use item::{
    AuditEntry, DEFAULT_CATEGORY, DEFAULT_UOM, HistoryRecord, InventoryItem, ItemCategory, ItemKey,
    attach_history,
};
pub use ledger::{
    DEFAULT_PAGE_SIZE, LedgerQuery, Page, TransactionGroup, filter_transactions,
    group_transactions, paginate,
};
pub use mutation::{
    DocumentNumbers, InboundPosting, InboundRequest, OutboundPosting, OutboundRequest,
    plan_inbound, plan_outbound,
};
pub use records::{LedgerEntry, MaterialInRecord, MaterialOutRecord};
pub use transaction::{Direction, InboundLog, OutboundLog, TransactionLine, TransactionLog};
