//! Rows written by a posting: detail records and the movement ledger entry.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::transaction::{Direction, InboundLog, OutboundLog, TransactionLine, TransactionLog};

/// `material_out` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialOutRecord {
    pub material_no: String,
    pub material_desc: String,
    pub quantity: f64,
    pub uom: String,
    pub date: NaiveDate,
    pub sloc: String,
    /// Person or department taking the goods.
    pub receiver: String,
    pub remarks: String,
    pub created_at: DateTime<Utc>,
    pub issue_number: String,
    pub wbs: String,
    pub gl_number: String,
    pub gl_account: String,
    pub keterangan: String,
}

impl MaterialOutRecord {
    /// View as a ledger line, given the row id assigned by the store.
    pub fn to_log(&self, row_id: i64) -> TransactionLog {
        TransactionLog::Outbound(OutboundLog {
            line: TransactionLine {
                id: format!("OUT-{row_id}"),
                material_no: self.material_no.clone(),
                item_name: self.material_desc.clone(),
                quantity: self.quantity,
                date: self.date,
                sloc: Some(self.sloc.clone()),
                receiver: Some(self.receiver.clone()),
                remark: Some(self.remarks.clone()),
            },
            issue_number: Some(self.issue_number.clone()),
            wbs: Some(self.wbs.clone()),
            gl_account: Some(self.gl_account.clone()),
            gl_number: Some(self.gl_number.clone()),
        })
    }
}

/// `material_in` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialInRecord {
    pub material_no: String,
    pub gr_number: String,
    pub material_desc: String,
    pub quantity: f64,
    pub sloc: String,
    pub uom: String,
    pub remarks: String,
    pub wbs: String,
    pub receiver: String,
    pub date: NaiveDate,
    pub po: String,
    pub reference: String,
}

impl MaterialInRecord {
    pub fn to_log(&self, row_id: i64) -> TransactionLog {
        TransactionLog::Inbound(InboundLog {
            line: TransactionLine {
                id: format!("IN-{row_id}"),
                material_no: self.material_no.clone(),
                item_name: self.material_desc.clone(),
                quantity: self.quantity,
                date: self.date,
                sloc: Some(self.sloc.clone()),
                receiver: Some(self.receiver.clone()),
                remark: Some(self.remarks.clone()),
            },
            gr_number: Some(self.gr_number.clone()),
            po: Some(self.po.clone()),
            reference: Some(self.reference.clone()),
            wbs: Some(self.wbs.clone()),
        })
    }
}

/// `material_transactions` row: the movement ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub material_no: String,
    pub direction: Direction,
    pub quantity: f64,
    pub at: DateTime<Utc>,
    /// Issue number or GR number.
    pub reference_id: String,
    pub remarks: String,
}
