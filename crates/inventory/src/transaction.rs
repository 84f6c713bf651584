//! Unified transaction log: one value per inbound or outbound detail row.

use core::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use estore_core::DomainError;

/// Movement direction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "OUT")]
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "IN",
            Direction::Out => "OUT",
        }
    }

    /// Group key used when a row carries no document number.
    pub fn misc_key(&self) -> &'static str {
        match self {
            Direction::In => "MISC-IN",
            Direction::Out => "MISC-OUT",
        }
    }

    /// Prefix of generated document numbers.
    pub fn document_prefix(&self) -> &'static str {
        match self {
            Direction::In => "GR",
            Direction::Out => "ISS",
        }
    }
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" => Ok(Direction::In),
            "OUT" => Ok(Direction::Out),
            other => Err(DomainError::validation(format!("direction must be IN or OUT, got '{other}'"))),
        }
    }
}

/// Fields shared by both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionLine {
    /// `IN-<row>` / `OUT-<row>`.
    pub id: String,
    pub material_no: String,
    pub item_name: String,
    pub quantity: f64,
    pub date: NaiveDate,
    pub sloc: Option<String>,
    pub receiver: Option<String>,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundLog {
    #[serde(flatten)]
    pub line: TransactionLine,
    pub gr_number: Option<String>,
    pub po: Option<String>,
    pub reference: Option<String>,
    pub wbs: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundLog {
    #[serde(flatten)]
    pub line: TransactionLine,
    pub issue_number: Option<String>,
    pub wbs: Option<String>,
    pub gl_account: Option<String>,
    pub gl_number: Option<String>,
}

/// A movement as shown in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransactionLog {
    #[serde(rename = "IN")]
    Inbound(InboundLog),
    #[serde(rename = "OUT")]
    Outbound(OutboundLog),
}

impl TransactionLog {
    pub fn direction(&self) -> Direction {
        match self {
            TransactionLog::Inbound(_) => Direction::In,
            TransactionLog::Outbound(_) => Direction::Out,
        }
    }

    pub fn line(&self) -> &TransactionLine {
        match self {
            TransactionLog::Inbound(t) => &t.line,
            TransactionLog::Outbound(t) => &t.line,
        }
    }

    pub fn quantity(&self) -> f64 {
        self.line().quantity
    }

    pub fn date(&self) -> NaiveDate {
        self.line().date
    }

    /// GR number (IN) or issue number (OUT); blank values count as absent.
    pub fn document_number(&self) -> Option<&str> {
        let n = match self {
            TransactionLog::Inbound(t) => t.gr_number.as_deref(),
            TransactionLog::Outbound(t) => t.issue_number.as_deref(),
        };
        non_blank(n)
    }

    /// Purchase order (IN) or WBS (OUT).
    pub fn secondary_reference(&self) -> Option<&str> {
        let r = match self {
            TransactionLog::Inbound(t) => t.po.as_deref(),
            TransactionLog::Outbound(t) => t.wbs.as_deref(),
        };
        non_blank(r)
    }

    pub fn receiver(&self) -> Option<&str> {
        non_blank(self.line().receiver.as_deref())
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}
