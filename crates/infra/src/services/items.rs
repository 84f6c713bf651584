//! Stock master maintenance and item images.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use estore_inventory::{AuditEntry, ImageUpload, InventoryItem, ItemKey, attach_history, object_path_from_url};

use crate::gateway::InventoryGateway;
use crate::storage::ObjectStore;

use super::error::{ServiceError, ServiceResult};

pub struct ItemService {
    inventory: Arc<dyn InventoryGateway>,
    store: Arc<dyn ObjectStore>,
    history_limit: usize,
    max_image_bytes: usize,
}

impl ItemService {
    pub fn new(
        inventory: Arc<dyn InventoryGateway>,
        store: Arc<dyn ObjectStore>,
        history_limit: usize,
        max_image_bytes: usize,
    ) -> Self {
        Self {
            inventory,
            store,
            history_limit,
            max_image_bytes,
        }
    }

    /// All items, most recently updated first, each with the rows of the
    /// newest `history_limit` history entries that belong to it.
    pub async fn list(&self) -> ServiceResult<Vec<InventoryItem>> {
        let mut items = self.inventory.list_items().await?;
        let history = self.inventory.recent_history(self.history_limit).await?;
        attach_history(&mut items, &history);
        Ok(items)
    }

    pub async fn get(&self, key: &ItemKey) -> ServiceResult<InventoryItem> {
        let item = self
            .inventory
            .get_item(key)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("stock item {key}")))?;
        let history = self.inventory.recent_history(self.history_limit).await?;
        let mut items = [item];
        attach_history(&mut items, &history);
        let [item] = items;
        Ok(item)
    }

    #[instrument(skip(self, item), fields(key = %item.key), err)]
    pub async fn create(&self, mut item: InventoryItem, actor: &str) -> ServiceResult<InventoryItem> {
        item.validate()?;
        let now = Utc::now();
        item.last_updated = now;
        item.history.clear();

        let entry = AuditEntry::new(now, actor, "CREATED", "Initial Entry");
        self.inventory.insert_item(&item, &entry).await?;
        info!("stock item created");

        item.history = vec![entry];
        Ok(item)
    }

    /// Overwrite every editable attribute of an existing item.
    #[instrument(skip(self, item), fields(key = %item.key), err)]
    pub async fn update(&self, mut item: InventoryItem, actor: &str) -> ServiceResult<InventoryItem> {
        item.validate()?;
        let existing = self.get(&item.key).await?;
        let now = Utc::now();
        item.last_updated = now;
        if item.image_url.is_none() {
            item.image_url = existing.image_url;
        }

        let entry = AuditEntry::new(now, actor, "UPDATED", "Item details updated");
        self.inventory.update_item(&item, &entry).await?;

        item.history = existing.history;
        item.history.insert(0, entry);
        Ok(item)
    }

    #[instrument(skip(self), fields(key = %key), err)]
    pub async fn delete(&self, key: &ItemKey) -> ServiceResult<()> {
        let existing = self.get(key).await?;
        self.inventory.delete_item(key).await?;
        if let Some(url) = existing.image_url.as_deref() {
            self.remove_object(url).await;
        }
        info!("stock item deleted");
        Ok(())
    }

    /// Store a new image for the item, replacing (and deleting) any previous one.
    #[instrument(skip(self, upload, bytes), fields(key = %key, size = bytes.len()), err)]
    pub async fn set_image(
        &self,
        key: &ItemKey,
        upload: ImageUpload,
        bytes: Vec<u8>,
        actor: &str,
    ) -> ServiceResult<InventoryItem> {
        upload.validate(self.max_image_bytes)?;
        let mut item = self.get(key).await?;
        let now = Utc::now();

        let path = upload.object_path(&key.material_no, now);
        let url = self.store.upload(&path, bytes, &upload.content_type).await?;
        let previous = item.image_url.replace(url);
        item.last_updated = now;

        let entry = AuditEntry::new(now, actor, "UPDATED", "Image updated");
        self.inventory.update_item(&item, &entry).await?;
        if let Some(previous) = previous.as_deref() {
            self.remove_object(previous).await;
        }

        item.history.insert(0, entry);
        Ok(item)
    }

    #[instrument(skip(self), fields(key = %key), err)]
    pub async fn remove_image(&self, key: &ItemKey, actor: &str) -> ServiceResult<InventoryItem> {
        let mut item = self.get(key).await?;
        let Some(url) = item.image_url.take() else {
            return Ok(item);
        };
        let now = Utc::now();
        item.last_updated = now;

        let entry = AuditEntry::new(now, actor, "UPDATED", "Image removed");
        self.inventory.update_item(&item, &entry).await?;
        self.remove_object(&url).await;

        item.history.insert(0, entry);
        Ok(item)
    }

    /// Best-effort delete of the object behind a public URL. URLs outside the
    /// bucket are ignored.
    async fn remove_object(&self, url: &str) {
        let Some(path) = object_path_from_url(url, self.store.bucket()) else {
            return;
        };
        if let Err(err) = self.store.remove(path).await {
            warn!(error = %err, path, "failed to delete stored image");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;
    use crate::storage::InMemoryObjectStore;

    fn service() -> (ItemService, Arc<InMemoryObjectStore>) {
        let store = Arc::new(InMemoryObjectStore::new("inventory-images", "http://localhost/storage"));
        let svc = ItemService::new(Arc::new(InMemoryGateway::new()), store.clone(), 500, 1024);
        (svc, store)
    }

    fn item(material: &str) -> InventoryItem {
        InventoryItem::new(ItemKey::new(material, "WH01").unwrap(), "Valve", Utc::now())
    }

    #[tokio::test]
    async fn create_records_initial_history_and_rejects_duplicates() {
        let (svc, _) = service();
        let created = svc.create(item("V-1"), "admin").await.unwrap();
        assert_eq!(created.history[0].action, "CREATED");
        assert_eq!(created.history[0].details, "Initial Entry");

        let err = svc.create(item("V-1"), "admin").await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_attaches_history_newest_first() {
        let (svc, _) = service();
        let created = svc.create(item("V-1"), "admin").await.unwrap();
        let mut edit = created.clone();
        edit.rack_no = Some("R-7".into());
        svc.update(edit, "staff").await.unwrap();

        let listed = svc.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        let actions: Vec<_> = listed[0].history.iter().map(|h| h.action.as_str()).collect();
        assert_eq!(actions, ["UPDATED", "CREATED"]);
        assert_eq!(listed[0].rack_no.as_deref(), Some("R-7"));
    }

    #[tokio::test]
    async fn update_and_delete_of_missing_item_fail() {
        let (svc, _) = service();
        assert!(matches!(svc.update(item("X"), "a").await, Err(ServiceError::NotFound(_))));
        assert!(matches!(svc.delete(&item("X").key).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn image_replace_and_remove_clean_up_objects() {
        let (svc, store) = service();
        let key = svc.create(item("V-1"), "admin").await.unwrap().key;

        let first = svc
            .set_image(&key, ImageUpload::new("a.png", "image/png", 3), vec![1, 2, 3], "admin")
            .await
            .unwrap();
        assert!(first.image_url.as_deref().unwrap().contains("/inventory-images/items/V-1-"));
        assert_eq!(store.len(), 1);

        let cleared = svc.remove_image(&key, "admin").await.unwrap();
        assert!(cleared.image_url.is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn oversized_image_is_rejected_before_upload() {
        let (svc, store) = service();
        let key = svc.create(item("V-1"), "admin").await.unwrap().key;
        let err = svc
            .set_image(&key, ImageUpload::new("a.png", "image/png", 4096), vec![0; 4096], "admin")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(store.is_empty());
    }
}
