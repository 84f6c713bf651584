use chrono::Utc;
use serde::{Deserialize, Serialize};

use estore_auth::{Action, Module, ModulePermissions, Role, module_permissions};
use estore_inventory::{DEFAULT_CATEGORY, DEFAULT_UOM, InventoryItem, ItemKey};
use estore_purchasing::PurchaseOrderStatus;

// -------------------------
// Request DTOs
// -------------------------

/// Editable attributes of a stock item.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemFields {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub uom: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub price_per_unit: Option<f64>,
    #[serde(default)]
    pub rack_no: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub min_stock: f64,
    #[serde(default)]
    pub max_stock: Option<f64>,
    #[serde(default)]
    pub pr_status: Option<String>,
    #[serde(default)]
    pub pr_number: Option<String>,
    #[serde(default)]
    pub wbs: Option<String>,
    #[serde(default)]
    pub is_consumable: bool,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ItemFields {
    pub fn into_item(self, key: ItemKey) -> InventoryItem {
        let mut item = InventoryItem::new(key, self.name.trim(), Utc::now());
        item.description = non_blank(self.description);
        item.quantity = self.quantity;
        item.uom = non_blank(self.uom).unwrap_or_else(|| DEFAULT_UOM.to_string());
        item.price = self.price;
        item.price_per_unit = self.price_per_unit;
        item.rack_no = non_blank(self.rack_no);
        item.category = non_blank(self.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        item.min_stock = self.min_stock;
        item.max_stock = self.max_stock;
        item.pr_status = non_blank(self.pr_status);
        item.pr_number = non_blank(self.pr_number);
        item.wbs = non_blank(self.wbs);
        item.is_consumable = self.is_consumable;
        item
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateItemRequest {
    #[serde(flatten)]
    pub key: ItemKey,
    #[serde(flatten)]
    pub fields: ItemFields,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemListQuery {
    #[serde(default)]
    pub low_stock: Option<bool>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImageQuery {
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionListQuery {
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LedgerQueryParams {
    #[serde(default)]
    pub material_no: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseStatusRequest {
    pub status: PurchaseOrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CountRequest {
    pub physical_qty: f64,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    pub module: String,
    pub action: Action,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct ModuleAccess {
    pub module: Module,
    pub can_access: bool,
    pub actions: &'static [Action],
}

impl ModuleAccess {
    fn new(module: Module, cell: ModulePermissions) -> Self {
        Self {
            module,
            can_access: cell.can_access,
            actions: if cell.can_access { cell.actions } else { &[] },
        }
    }
}

/// The role's full matrix row, in navigation order.
pub fn permission_row(role: Role) -> Vec<ModuleAccess> {
    Module::ALL
        .into_iter()
        .map(|m| ModuleAccess::new(m, module_permissions(role, m)))
        .collect()
}

/// Item as returned by the API: stored fields plus derived display values.
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    /// `material_no:::sloc`
    pub id: String,
    #[serde(flatten)]
    pub item: InventoryItem,
    pub display_category: String,
    pub low_stock: bool,
}

impl From<InventoryItem> for ItemResponse {
    fn from(item: InventoryItem) -> Self {
        Self {
            id: item.key.to_string(),
            display_category: item.display_category().to_string(),
            low_stock: item.is_low_stock(),
            item,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_optional_fields_fall_back_to_defaults() {
        let fields: ItemFields = serde_json::from_value(serde_json::json!({
            "name": " Bolt M8 ",
            "uom": "  ",
            "category": "",
            "rack_no": "R-1"
        }))
        .unwrap();
        let item = fields.into_item(ItemKey::new("B-8", "WH01").unwrap());
        assert_eq!(item.name, "Bolt M8");
        assert_eq!(item.uom, DEFAULT_UOM);
        assert_eq!(item.category, DEFAULT_CATEGORY);
        assert_eq!(item.rack_no.as_deref(), Some("R-1"));
    }

    #[test]
    fn closed_modules_list_no_actions() {
        let row = permission_row(Role::User);
        let users = row.iter().find(|m| m.module == Module::Users).unwrap();
        assert!(!users.can_access);
        assert!(users.actions.is_empty());
        assert_eq!(row.len(), Module::ALL.len());
    }
}
