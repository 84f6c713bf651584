use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use estore_core::{DomainError, DomainResult, Entity, ValueObject};

/// Separator used in the string form of an [`ItemKey`].
pub const KEY_SEPARATOR: &str = ":::";

/// Composite identity of a stock item: material number within a storage location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    pub material_no: String,
    pub sloc: String,
}

impl ItemKey {
    pub fn new(material_no: impl Into<String>, sloc: impl Into<String>) -> DomainResult<Self> {
        let key = Self {
            material_no: material_no.into().trim().to_string(),
            sloc: sloc.into().trim().to_string(),
        };
        if key.material_no.is_empty() {
            return Err(DomainError::validation("material number cannot be empty"));
        }
        if key.sloc.is_empty() {
            return Err(DomainError::validation("storage location cannot be empty"));
        }
        Ok(key)
    }
}

impl ValueObject for ItemKey {}

impl core::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}{}{}", self.material_no, KEY_SEPARATOR, self.sloc)
    }
}

impl FromStr for ItemKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (material_no, sloc) = s
            .split_once(KEY_SEPARATOR)
            .ok_or_else(|| DomainError::invalid_id(format!("item id '{s}' is not <material>:::<sloc>")))?;
        ItemKey::new(material_no, sloc).map_err(|_| DomainError::invalid_id(format!("item id '{s}' has an empty part")))
    }
}

/// Operational class of a stock item.
///
/// Stored as free text; these are the values the warehouse uses today.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemCategory {
    #[serde(rename = "CHEMICAL")]
    Chemical,
    #[serde(rename = "SPARE PART")]
    SparePart,
    #[serde(rename = "PACKAGING")]
    Packaging,
    #[serde(rename = "OTHER")]
    Other,
}

impl ItemCategory {
    pub const ALL: [ItemCategory; 4] = [
        ItemCategory::Chemical,
        ItemCategory::SparePart,
        ItemCategory::Packaging,
        ItemCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::Chemical => "CHEMICAL",
            ItemCategory::SparePart => "SPARE PART",
            ItemCategory::Packaging => "PACKAGING",
            ItemCategory::Other => "OTHER",
        }
    }
}

/// Category shown when the stored value is blank.
pub const DEFAULT_CATEGORY: &str = "General";

/// Default unit of measure.
pub const DEFAULT_UOM: &str = "PCS";

/// One line of an item's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    pub user: String,
    pub action: String,
    pub details: String,
}

impl AuditEntry {
    pub fn new(
        at: DateTime<Utc>,
        user: impl Into<String>,
        action: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        let user = user.into();
        Self {
            at,
            user: if user.trim().is_empty() { "System".to_string() } else { user },
            action: action.into(),
            details: details.into(),
        }
    }
}

/// A history row as stored, carrying the key of the item it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub key: ItemKey,
    pub entry: AuditEntry,
}

/// Stock master record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    #[serde(flatten)]
    pub key: ItemKey,
    pub name: String,
    pub description: Option<String>,
    pub quantity: f64,
    pub uom: String,
    pub price: f64,
    pub price_per_unit: Option<f64>,
    pub rack_no: Option<String>,
    pub category: String,
    pub min_stock: f64,
    /// Advisory only; inbound movements never check it.
    pub max_stock: Option<f64>,
    pub pr_status: Option<String>,
    pub pr_number: Option<String>,
    pub wbs: Option<String>,
    pub is_consumable: bool,
    pub image_url: Option<String>,
    pub last_updated: DateTime<Utc>,
    /// Newest first.
    #[serde(default)]
    pub history: Vec<AuditEntry>,
}

impl InventoryItem {
    /// New item with defaults for everything except identity and name.
    pub fn new(key: ItemKey, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            key,
            name: name.into(),
            description: None,
            quantity: 0.0,
            uom: DEFAULT_UOM.to_string(),
            price: 0.0,
            price_per_unit: None,
            rack_no: None,
            category: DEFAULT_CATEGORY.to_string(),
            min_stock: 0.0,
            max_stock: None,
            pr_status: None,
            pr_number: None,
            wbs: None,
            is_consumable: false,
            image_url: None,
            last_updated: now,
            history: Vec::new(),
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("item name cannot be empty"));
        }
        if !self.quantity.is_finite() || self.quantity < 0.0 {
            return Err(DomainError::validation("quantity must be a non-negative number"));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(DomainError::validation("price must be a non-negative number"));
        }
        if self.min_stock < 0.0 {
            return Err(DomainError::validation("minimum stock cannot be negative"));
        }
        if let Some(max) = self.max_stock {
            if max < self.min_stock {
                return Err(DomainError::validation("maximum stock is below minimum stock"));
            }
        }
        Ok(())
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock
    }

    /// Check that `quantity` can be issued from this item.
    pub fn ensure_available(&self, quantity: f64) -> DomainResult<()> {
        if quantity > self.quantity {
            return Err(DomainError::insufficient_stock(self.quantity, quantity));
        }
        Ok(())
    }

    /// Decrement on-hand stock. Never goes below zero.
    pub fn withdraw(&mut self, quantity: f64, at: DateTime<Utc>) -> DomainResult<()> {
        ensure_positive(quantity)?;
        self.ensure_available(quantity)?;
        self.quantity -= quantity;
        self.last_updated = at;
        Ok(())
    }

    /// Increment on-hand stock.
    pub fn receive(&mut self, quantity: f64, at: DateTime<Utc>) -> DomainResult<()> {
        ensure_positive(quantity)?;
        self.quantity += quantity;
        self.last_updated = at;
        Ok(())
    }

    /// Overwrite on-hand stock with a counted quantity (stock-take).
    pub fn set_counted(&mut self, quantity: f64, at: DateTime<Utc>) -> DomainResult<()> {
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(DomainError::validation("counted quantity must be a non-negative number"));
        }
        self.quantity = quantity;
        self.last_updated = at;
        Ok(())
    }

    /// Category as displayed: blank values fall back to [`DEFAULT_CATEGORY`].
    pub fn display_category(&self) -> &str {
        if self.category.trim().is_empty() {
            DEFAULT_CATEGORY
        } else {
            &self.category
        }
    }
}

impl Entity for InventoryItem {
    type Id = ItemKey;

    fn id(&self) -> &Self::Id {
        &self.key
    }
}

pub(crate) fn ensure_positive(quantity: f64) -> DomainResult<()> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(DomainError::validation("quantity must be greater than zero"));
    }
    Ok(())
}

/// Attach audit history to items.
///
/// `history` must be newest first and already capped at the retrieval limit;
/// each item receives the rows matching its key in that order.
pub fn attach_history(items: &mut [InventoryItem], history: &[HistoryRecord]) {
    for item in items.iter_mut() {
        item.history = history
            .iter()
            .filter(|h| h.key == item.key)
            .map(|h| h.entry.clone())
            .collect();
    }
}
