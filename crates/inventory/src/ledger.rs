//! Document-centric view over the line-item ledger.
//!
//! Rows are filtered by direction and search term, grouped by their document
//! number (issue number for OUT, GR number for IN), sorted newest first and
//! only then paginated, so a page always holds whole documents.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::transaction::{Direction, TransactionLog};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Placeholder for representative fields a group's first row leaves empty.
const NO_VALUE: &str = "-";

/// Active direction tab plus free-text search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerQuery {
    pub direction: Direction,
    pub search: String,
}

impl LedgerQuery {
    pub fn new(direction: Direction, search: impl Into<String>) -> Self {
        Self {
            direction,
            search: search.into(),
        }
    }

    fn matches(&self, tx: &TransactionLog, needle: &str) -> bool {
        if tx.direction() != self.direction {
            return false;
        }
        if needle.is_empty() {
            return true;
        }
        let line = tx.line();
        let hit = |field: Option<&str>| field.is_some_and(|v| v.to_lowercase().contains(needle));

        hit(Some(&line.item_name))
            || hit(Some(&line.material_no))
            || hit(tx.document_number())
            || hit(line.remark.as_deref())
    }
}

/// One logical document (issue or goods receipt).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionGroup {
    pub group_key: String,
    pub direction: Direction,
    pub date: NaiveDate,
    pub receiver: String,
    /// WBS for OUT, purchase order for IN.
    pub secondary_info: String,
    pub items: Vec<TransactionLog>,
    pub total_qty: f64,
    pub item_count: usize,
}

impl TransactionGroup {
    fn open(key: String, first: &TransactionLog) -> Self {
        Self {
            group_key: key,
            direction: first.direction(),
            date: first.date(),
            receiver: first.receiver().unwrap_or(NO_VALUE).to_string(),
            secondary_info: first.secondary_reference().unwrap_or(NO_VALUE).to_string(),
            items: Vec::new(),
            total_qty: 0.0,
            item_count: 0,
        }
    }

    fn push(&mut self, tx: &TransactionLog) {
        self.total_qty += tx.quantity();
        self.item_count += 1;
        self.items.push(tx.clone());
    }
}

/// Rows of the query's direction that match its search term (case-insensitive).
pub fn filter_transactions<'a>(
    transactions: &'a [TransactionLog],
    query: &LedgerQuery,
) -> Vec<&'a TransactionLog> {
    let needle = query.search.trim().to_lowercase();
    transactions
        .iter()
        .filter(|t| query.matches(t, &needle))
        .collect()
}

/// Filter, group by document number and sort groups by date (newest first).
///
/// The first row encountered for a key supplies the group's date, receiver
/// and secondary reference. Groups with equal dates keep encounter order.
pub fn group_transactions(transactions: &[TransactionLog], query: &LedgerQuery) -> Vec<TransactionGroup> {
    let mut groups: Vec<TransactionGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for tx in filter_transactions(transactions, query) {
        let key = tx
            .document_number()
            .unwrap_or(query.direction.misc_key())
            .to_string();

        let slot = match index.get(&key) {
            Some(i) => *i,
            None => {
                groups.push(TransactionGroup::open(key.clone(), tx));
                index.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[slot].push(tx);
    }

    groups.sort_by(|a, b| b.date.cmp(&a.date));
    groups
}

/// One page of an already sorted list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// Slice out a 1-based page. Page 0 is read as page 1; a page size of 0
/// falls back to [`DEFAULT_PAGE_SIZE`]. Pages past the end are empty.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let page = page.max(1);
    let page_size = if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size };
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size);

    let start = (page - 1).saturating_mul(page_size);
    let items = items.into_iter().skip(start).take(page_size).collect();

    Page {
        items,
        page,
        page_size,
        total_items,
        total_pages,
    }
}
