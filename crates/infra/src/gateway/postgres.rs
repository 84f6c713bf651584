//! Postgres-backed gateway.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | GatewayError |
//! |------------|----------------------|--------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (check violation) | `23514` | `Backend` |
//! | Database (other) | any | `Backend` |
//! | RowNotFound | N/A | `NotFound` |
//! | Other | N/A | `Backend` |
//!
//! ## Atomic postings
//!
//! `post_outbound`, `post_inbound` and `finalize_session` run in a single
//! transaction. The outbound stock update is conditional
//! (`quantity >= $requested`), so two concurrent issues cannot both pass
//! against the same stale quantity.
//!
//! ## Status guards
//!
//! Session and purchase-order writes carry the expected stored status in
//! their `WHERE` clause. A write that matches no row is reported as
//! `InvalidState` (row exists) or `NotFound`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};

use estore_auth::{Role, UserProfile, UserStatus};
use estore_core::{RecordId, UserId};
use estore_inventory::{
    AuditEntry, Direction, HistoryRecord, InboundPosting, InventoryItem, ItemKey, LedgerEntry,
    MaterialInRecord, MaterialOutRecord, OutboundPosting, TransactionLog,
};
use estore_opname::{OpnameStatus, StockAdjustment, StockOpnameItem, StockOpnameSession};
use estore_purchasing::{PurchaseOrder, PurchaseOrderStatus};

use super::r#trait::{
    GatewayError, GatewayResult, InventoryGateway, OpnameGateway, PurchaseGateway, TransactionGateway,
    UserGateway,
};

const SCHEMA: &str = include_str!("../../migrations/0001_estore_schema.sql");

macro_rules! item_columns {
    () => {
        "material_no, sloc, name, description, quantity, uom, price, price_per_unit, rack_no, \
         category, min_stock, max_stock, pr_status, pr_number, wbs, is_consumable, image_url, last_updated"
    };
}

macro_rules! session_columns {
    () => {
        "id, title, status, creator, notes, total_items, created_at, closed_at"
    };
}

macro_rules! line_columns {
    () => {
        "id, session_id, material_no, sloc, material_desc, system_qty, physical_qty, variance, is_counted"
    };
}

/// Gateway over a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PostgresGateway {
    pool: Arc<PgPool>,
}

impl PostgresGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> GatewayResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create missing tables and indexes.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> GatewayResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn begin(&self) -> GatewayResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(|e| map_sqlx_error("begin_transaction", e))
    }

    /// Why a session write guarded on `status = 'OPEN'` matched no row.
    async fn session_write_refused(&self, id: RecordId) -> GatewayError {
        let stored: Result<Option<String>, _> =
            sqlx::query_scalar("SELECT status FROM stock_opname_sessions WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&*self.pool)
                .await;
        match stored {
            Ok(Some(status)) => GatewayError::InvalidState(format!("opname session {id} is {status}")),
            Ok(None) => GatewayError::NotFound(format!("opname session {id}")),
            Err(e) => map_sqlx_error("session_status", e),
        }
    }
}

fn col<'r, T>(row: &'r PgRow, name: &str) -> GatewayResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get::<T, _>(name)
        .map_err(|e| GatewayError::InvalidRow(format!("column {name}: {e}")))
}

fn parsed<T>(row: &PgRow, name: &str) -> GatewayResult<T>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    let raw: String = col(row, name)?;
    raw.parse()
        .map_err(|e: T::Err| GatewayError::InvalidRow(format!("column {name}: {e}")))
}

fn row_key(row: &PgRow) -> GatewayResult<ItemKey> {
    ItemKey::new(col::<String>(row, "material_no")?, col::<String>(row, "sloc")?)
        .map_err(|e| GatewayError::InvalidRow(e.to_string()))
}

fn item_from_row(row: &PgRow) -> GatewayResult<InventoryItem> {
    Ok(InventoryItem {
        key: row_key(row)?,
        name: col(row, "name")?,
        description: col(row, "description")?,
        quantity: col(row, "quantity")?,
        uom: col(row, "uom")?,
        price: col(row, "price")?,
        price_per_unit: col(row, "price_per_unit")?,
        rack_no: col(row, "rack_no")?,
        category: col(row, "category")?,
        min_stock: col(row, "min_stock")?,
        max_stock: col(row, "max_stock")?,
        pr_status: col(row, "pr_status")?,
        pr_number: col(row, "pr_number")?,
        wbs: col(row, "wbs")?,
        is_consumable: col(row, "is_consumable")?,
        image_url: col(row, "image_url")?,
        last_updated: col(row, "last_updated")?,
        history: Vec::new(),
    })
}

fn out_from_row(row: &PgRow) -> GatewayResult<TransactionLog> {
    let record = MaterialOutRecord {
        material_no: col(row, "material_no")?,
        material_desc: col(row, "material_desc")?,
        quantity: col(row, "quantity")?,
        uom: col(row, "uom")?,
        date: col::<NaiveDate>(row, "date")?,
        sloc: col(row, "sloc")?,
        receiver: col(row, "receiver")?,
        remarks: col(row, "remarks")?,
        created_at: col(row, "created_at")?,
        issue_number: col(row, "issue_number")?,
        wbs: col(row, "wbs")?,
        gl_number: col(row, "gl_number")?,
        gl_account: col(row, "gl_account")?,
        keterangan: col(row, "keterangan")?,
    };
    Ok(record.to_log(col(row, "id")?))
}

fn in_from_row(row: &PgRow) -> GatewayResult<TransactionLog> {
    let record = MaterialInRecord {
        material_no: col(row, "material_no")?,
        gr_number: col(row, "gr_number")?,
        material_desc: col(row, "material_desc")?,
        quantity: col(row, "quantity")?,
        sloc: col(row, "sloc")?,
        uom: col(row, "uom")?,
        remarks: col(row, "remarks")?,
        wbs: col(row, "wbs")?,
        receiver: col(row, "receiver")?,
        date: col::<NaiveDate>(row, "date")?,
        po: col(row, "po")?,
        reference: col(row, "reference")?,
    };
    Ok(record.to_log(col(row, "id")?))
}

fn purchase_from_row(row: &PgRow) -> GatewayResult<PurchaseOrder> {
    Ok(PurchaseOrder {
        id: RecordId::from_uuid(col(row, "id")?),
        item: row_key(row)?,
        item_name: col(row, "item_name")?,
        quantity: col(row, "quantity")?,
        order_date: col(row, "order_date")?,
        status: parsed::<PurchaseOrderStatus>(row, "status")?,
        supplier: col(row, "supplier")?,
        total_cost: col(row, "total_cost")?,
    })
}

fn user_from_row(row: &PgRow) -> GatewayResult<UserProfile> {
    Ok(UserProfile {
        id: UserId::from_uuid(col(row, "id")?),
        name: col(row, "name")?,
        email: col(row, "email")?,
        role: parsed::<Role>(row, "role")?,
        status: parsed::<UserStatus>(row, "status")?,
        last_active: col(row, "last_active")?,
        avatar: col(row, "avatar")?,
    })
}

fn session_from_row(row: &PgRow) -> GatewayResult<StockOpnameSession> {
    Ok(StockOpnameSession {
        id: RecordId::from_uuid(col(row, "id")?),
        title: col(row, "title")?,
        status: parsed::<OpnameStatus>(row, "status")?,
        creator: col(row, "creator")?,
        notes: col(row, "notes")?,
        total_items: col::<i64>(row, "total_items")?.max(0) as usize,
        created_at: col(row, "created_at")?,
        closed_at: col(row, "closed_at")?,
    })
}

fn line_from_row(row: &PgRow) -> GatewayResult<StockOpnameItem> {
    Ok(StockOpnameItem {
        id: RecordId::from_uuid(col(row, "id")?),
        session_id: RecordId::from_uuid(col(row, "session_id")?),
        key: row_key(row)?,
        material_desc: col(row, "material_desc")?,
        system_qty: col(row, "system_qty")?,
        physical_qty: col(row, "physical_qty")?,
        variance: col(row, "variance")?,
        is_counted: col(row, "is_counted")?,
    })
}

async fn insert_history(
    tx: &mut Transaction<'static, Postgres>,
    key: &ItemKey,
    entry: &AuditEntry,
) -> GatewayResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_history (material_no, sloc, at, user_name, action, details)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(&key.material_no)
    .bind(&key.sloc)
    .bind(entry.at)
    .bind(&entry.user)
    .bind(&entry.action)
    .bind(&entry.details)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_history", e))?;
    Ok(())
}

async fn insert_ledger(tx: &mut Transaction<'static, Postgres>, entry: &LedgerEntry) -> GatewayResult<()> {
    sqlx::query(
        r#"
        INSERT INTO material_transactions (material_no, type, quantity, at, reference_id, remarks)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(&entry.material_no)
    .bind(entry.direction.as_str())
    .bind(entry.quantity)
    .bind(entry.at)
    .bind(&entry.reference_id)
    .bind(&entry.remarks)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_ledger", e))?;
    Ok(())
}

#[async_trait]
impl InventoryGateway for PostgresGateway {
    #[instrument(skip(self), fields(row_count = tracing::field::Empty), err)]
    async fn list_items(&self) -> GatewayResult<Vec<InventoryItem>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            item_columns!(),
            " FROM stock_items ORDER BY last_updated DESC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_items", e))?;

        Span::current().record("row_count", rows.len());
        rows.iter().map(item_from_row).collect()
    }

    #[instrument(skip(self), fields(key = %key), err)]
    async fn get_item(&self, key: &ItemKey) -> GatewayResult<Option<InventoryItem>> {
        let row = sqlx::query(concat!(
            "SELECT ",
            item_columns!(),
            " FROM stock_items WHERE material_no = $1 AND sloc = $2"
        ))
        .bind(&key.material_no)
        .bind(&key.sloc)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_item", e))?;

        row.as_ref().map(item_from_row).transpose()
    }

    #[instrument(skip(self, item, history), fields(key = %item.key), err)]
    async fn insert_item(&self, item: &InventoryItem, history: &AuditEntry) -> GatewayResult<()> {
        let mut tx = self.begin().await?;
        sqlx::query(concat!(
            "INSERT INTO stock_items (",
            item_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"
        ))
        .bind(&item.key.material_no)
        .bind(&item.key.sloc)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(&item.uom)
        .bind(item.price)
        .bind(item.price_per_unit)
        .bind(&item.rack_no)
        .bind(&item.category)
        .bind(item.min_stock)
        .bind(item.max_stock)
        .bind(&item.pr_status)
        .bind(&item.pr_number)
        .bind(&item.wbs)
        .bind(item.is_consumable)
        .bind(&item.image_url)
        .bind(item.last_updated)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_item", e))?;

        insert_history(&mut tx, &item.key, history).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self, item, history), fields(key = %item.key), err)]
    async fn update_item(&self, item: &InventoryItem, history: &AuditEntry) -> GatewayResult<()> {
        let mut tx = self.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE stock_items SET
                name = $3, description = $4, quantity = $5, uom = $6, price = $7,
                price_per_unit = $8, rack_no = $9, category = $10, min_stock = $11,
                max_stock = $12, pr_status = $13, pr_number = $14, wbs = $15,
                is_consumable = $16, image_url = $17, last_updated = $18
            WHERE material_no = $1 AND sloc = $2
            "#,
        )
        .bind(&item.key.material_no)
        .bind(&item.key.sloc)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(&item.uom)
        .bind(item.price)
        .bind(item.price_per_unit)
        .bind(&item.rack_no)
        .bind(&item.category)
        .bind(item.min_stock)
        .bind(item.max_stock)
        .bind(&item.pr_status)
        .bind(&item.pr_number)
        .bind(&item.wbs)
        .bind(item.is_consumable)
        .bind(&item.image_url)
        .bind(item.last_updated)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_item", e))?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(GatewayError::NotFound(format!("stock item {}", item.key)));
        }

        insert_history(&mut tx, &item.key, history).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self), fields(key = %key), err)]
    async fn delete_item(&self, key: &ItemKey) -> GatewayResult<()> {
        let result = sqlx::query("DELETE FROM stock_items WHERE material_no = $1 AND sloc = $2")
            .bind(&key.material_no)
            .bind(&key.sloc)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::NotFound(format!("stock item {key}")));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn recent_history(&self, limit: usize) -> GatewayResult<Vec<HistoryRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT material_no, sloc, at, user_name, action, details
            FROM stock_history
            ORDER BY at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("recent_history", e))?;

        rows.iter()
            .map(|row| {
                Ok(HistoryRecord {
                    key: row_key(row)?,
                    entry: AuditEntry::new(
                        col::<DateTime<Utc>>(row, "at")?,
                        col::<String>(row, "user_name")?,
                        col::<String>(row, "action")?,
                        col::<String>(row, "details")?,
                    ),
                })
            })
            .collect()
    }
}

#[async_trait]
impl TransactionGateway for PostgresGateway {
    #[instrument(skip(self), err)]
    async fn list_outbound(&self) -> GatewayResult<Vec<TransactionLog>> {
        let rows = sqlx::query("SELECT * FROM material_out ORDER BY date DESC, id DESC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_outbound", e))?;
        rows.iter().map(out_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn list_inbound(&self) -> GatewayResult<Vec<TransactionLog>> {
        let rows = sqlx::query("SELECT * FROM material_in ORDER BY date DESC, id DESC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_inbound", e))?;
        rows.iter().map(in_from_row).collect()
    }

    #[instrument(
        skip(self, posting),
        fields(key = %posting.key, quantity = posting.quantity, issue_number = %posting.record.issue_number),
        err
    )]
    async fn post_outbound(&self, posting: &OutboundPosting) -> GatewayResult<InventoryItem> {
        let mut tx = self.begin().await?;

        let row = sqlx::query(concat!(
            "UPDATE stock_items SET quantity = quantity - $3, last_updated = $4 ",
            "WHERE material_no = $1 AND sloc = $2 AND quantity >= $3 RETURNING ",
            item_columns!()
        ))
        .bind(&posting.key.material_no)
        .bind(&posting.key.sloc)
        .bind(posting.quantity)
        .bind(posting.ledger.at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("decrement_stock", e))?;

        let Some(row) = row else {
            let available: Option<f64> =
                sqlx::query_scalar("SELECT quantity FROM stock_items WHERE material_no = $1 AND sloc = $2")
                    .bind(&posting.key.material_no)
                    .bind(&posting.key.sloc)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("read_stock", e))?;
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(match available {
                Some(available) => GatewayError::InsufficientStock {
                    available,
                    requested: posting.quantity,
                },
                None => GatewayError::NotFound(format!("stock item {}", posting.key)),
            });
        };
        let updated = item_from_row(&row)?;

        let r = &posting.record;
        sqlx::query(
            r#"
            INSERT INTO material_out (
                material_no, material_desc, quantity, uom, date, sloc, receiver, remarks,
                created_at, issue_number, wbs, gl_number, gl_account, keterangan
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(&r.material_no)
        .bind(&r.material_desc)
        .bind(r.quantity)
        .bind(&r.uom)
        .bind(r.date)
        .bind(&r.sloc)
        .bind(&r.receiver)
        .bind(&r.remarks)
        .bind(r.created_at)
        .bind(&r.issue_number)
        .bind(&r.wbs)
        .bind(&r.gl_number)
        .bind(&r.gl_account)
        .bind(&r.keterangan)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_material_out", e))?;

        insert_ledger(&mut tx, &posting.ledger).await?;
        insert_history(&mut tx, &posting.key, &posting.history).await?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(updated)
    }

    #[instrument(
        skip(self, posting),
        fields(key = %posting.key, quantity = posting.quantity, gr_number = %posting.record.gr_number),
        err
    )]
    async fn post_inbound(&self, posting: &InboundPosting) -> GatewayResult<InventoryItem> {
        let mut tx = self.begin().await?;

        let row = sqlx::query(concat!(
            "UPDATE stock_items SET quantity = quantity + $3, last_updated = $4 ",
            "WHERE material_no = $1 AND sloc = $2 RETURNING ",
            item_columns!()
        ))
        .bind(&posting.key.material_no)
        .bind(&posting.key.sloc)
        .bind(posting.quantity)
        .bind(posting.ledger.at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("increment_stock", e))?;

        let Some(row) = row else {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(GatewayError::NotFound(format!("stock item {}", posting.key)));
        };
        let updated = item_from_row(&row)?;

        let r = &posting.record;
        sqlx::query(
            r#"
            INSERT INTO material_in (
                material_no, gr_number, material_desc, quantity, sloc, uom, remarks,
                wbs, receiver, date, po, reference
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&r.material_no)
        .bind(&r.gr_number)
        .bind(&r.material_desc)
        .bind(r.quantity)
        .bind(&r.sloc)
        .bind(&r.uom)
        .bind(&r.remarks)
        .bind(&r.wbs)
        .bind(&r.receiver)
        .bind(r.date)
        .bind(&r.po)
        .bind(&r.reference)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_material_in", e))?;

        insert_ledger(&mut tx, &posting.ledger).await?;
        insert_history(&mut tx, &posting.key, &posting.history).await?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(updated)
    }

    #[instrument(skip(self), err)]
    async fn ledger_entries(&self, material_no: Option<&str>) -> GatewayResult<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT material_no, type, quantity, at, reference_id, remarks
            FROM material_transactions
            WHERE $1::text IS NULL OR material_no = $1
            ORDER BY at DESC, id DESC
            "#,
        )
        .bind(material_no)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("ledger_entries", e))?;

        rows.iter()
            .map(|row| {
                Ok(LedgerEntry {
                    material_no: col(row, "material_no")?,
                    direction: parsed::<Direction>(row, "type")?,
                    quantity: col(row, "quantity")?,
                    at: col(row, "at")?,
                    reference_id: col(row, "reference_id")?,
                    remarks: col(row, "remarks")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl PurchaseGateway for PostgresGateway {
    #[instrument(skip(self), err)]
    async fn list_purchase_orders(&self) -> GatewayResult<Vec<PurchaseOrder>> {
        let rows = sqlx::query("SELECT * FROM purchase_orders ORDER BY order_date DESC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_purchase_orders", e))?;
        rows.iter().map(purchase_from_row).collect()
    }

    #[instrument(skip(self), fields(id = %id), err)]
    async fn get_purchase_order(&self, id: RecordId) -> GatewayResult<Option<PurchaseOrder>> {
        let row = sqlx::query("SELECT * FROM purchase_orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_purchase_order", e))?;
        row.as_ref().map(purchase_from_row).transpose()
    }

    #[instrument(skip(self, order), fields(id = %order.id), err)]
    async fn insert_purchase_order(&self, order: &PurchaseOrder) -> GatewayResult<()> {
        sqlx::query(
            r#"
            INSERT INTO purchase_orders (
                id, material_no, sloc, item_name, quantity, order_date, status, supplier, total_cost
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.item.material_no)
        .bind(&order.item.sloc)
        .bind(&order.item_name)
        .bind(order.quantity)
        .bind(order.order_date)
        .bind(order.status.as_str())
        .bind(&order.supplier)
        .bind(order.total_cost)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_purchase_order", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(id = %id, expected = %expected, status = %status), err)]
    async fn update_purchase_status(
        &self,
        id: RecordId,
        expected: PurchaseOrderStatus,
        status: PurchaseOrderStatus,
    ) -> GatewayResult<()> {
        let result = sqlx::query("UPDATE purchase_orders SET status = $2 WHERE id = $1 AND status = $3")
            .bind(id.as_uuid())
            .bind(status.as_str())
            .bind(expected.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_purchase_status", e))?;
        if result.rows_affected() > 0 {
            return Ok(());
        }

        let stored: Option<String> = sqlx::query_scalar("SELECT status FROM purchase_orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_purchase_status", e))?;
        Err(match stored {
            Some(stored) => GatewayError::InvalidState(format!("purchase order {id} is {stored}")),
            None => GatewayError::NotFound(format!("purchase order {id}")),
        })
    }
}

#[async_trait]
impl UserGateway for PostgresGateway {
    #[instrument(skip(self), err)]
    async fn list_users(&self) -> GatewayResult<Vec<UserProfile>> {
        let rows = sqlx::query("SELECT * FROM user_profiles ORDER BY lower(name)")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter().map(user_from_row).collect()
    }

    #[instrument(skip(self), fields(id = %id), err)]
    async fn get_user(&self, id: UserId) -> GatewayResult<Option<UserProfile>> {
        let row = sqlx::query("SELECT * FROM user_profiles WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_user_by_email(&self, email: &str) -> GatewayResult<Option<UserProfile>> {
        let row = sqlx::query("SELECT * FROM user_profiles WHERE email = $1")
            .bind(estore_auth::user::normalize_email(email))
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self, user), fields(id = %user.id), err)]
    async fn insert_user(&self, user: &UserProfile) -> GatewayResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (id, name, email, role, status, last_active, avatar)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(user.last_active)
        .bind(&user.avatar)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(())
    }

    #[instrument(skip(self, user), fields(id = %user.id), err)]
    async fn update_user(&self, user: &UserProfile) -> GatewayResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE user_profiles
            SET name = $2, email = $3, role = $4, status = $5, last_active = $6, avatar = $7
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(user.last_active)
        .bind(&user.avatar)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;
        if result.rows_affected() == 0 {
            return Err(GatewayError::NotFound(format!("user {}", user.id)));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(id = %id), err)]
    async fn delete_user(&self, id: UserId) -> GatewayResult<()> {
        let result = sqlx::query("DELETE FROM user_profiles WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        if result.rows_affected() == 0 {
            return Err(GatewayError::NotFound(format!("user {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl OpnameGateway for PostgresGateway {
    #[instrument(skip(self), err)]
    async fn list_sessions(&self) -> GatewayResult<Vec<StockOpnameSession>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            session_columns!(),
            " FROM stock_opname_sessions ORDER BY created_at DESC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_sessions", e))?;
        rows.iter().map(session_from_row).collect()
    }

    #[instrument(skip(self), fields(id = %id), err)]
    async fn get_session(&self, id: RecordId) -> GatewayResult<Option<StockOpnameSession>> {
        let row = sqlx::query(concat!(
            "SELECT ",
            session_columns!(),
            " FROM stock_opname_sessions WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_session", e))?;
        row.as_ref().map(session_from_row).transpose()
    }

    #[instrument(skip(self, session, lines), fields(id = %session.id, line_count = lines.len()), err)]
    async fn create_session(&self, session: &StockOpnameSession, lines: &[StockOpnameItem]) -> GatewayResult<()> {
        let mut tx = self.begin().await?;
        sqlx::query(concat!(
            "INSERT INTO stock_opname_sessions (",
            session_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(session.id.as_uuid())
        .bind(&session.title)
        .bind(session.status.as_str())
        .bind(&session.creator)
        .bind(&session.notes)
        .bind(session.total_items as i64)
        .bind(session.created_at)
        .bind(session.closed_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_session", e))?;

        for line in lines {
            sqlx::query(concat!(
                "INSERT INTO stock_opname_items (",
                line_columns!(),
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
            ))
            .bind(line.id.as_uuid())
            .bind(line.session_id.as_uuid())
            .bind(&line.key.material_no)
            .bind(&line.key.sloc)
            .bind(&line.material_desc)
            .bind(line.system_qty)
            .bind(line.physical_qty)
            .bind(line.variance)
            .bind(line.is_counted)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_session_item", e))?;
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self, session), fields(id = %session.id, status = %session.status), err)]
    async fn update_session(&self, session: &StockOpnameSession) -> GatewayResult<()> {
        let result = sqlx::query(
            "UPDATE stock_opname_sessions SET status = $2, closed_at = $3 WHERE id = $1 AND status = $4",
        )
        .bind(session.id.as_uuid())
        .bind(session.status.as_str())
        .bind(session.closed_at)
        .bind(OpnameStatus::Open.as_str())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_session", e))?;
        if result.rows_affected() == 0 {
            return Err(self.session_write_refused(session.id).await);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(session_id = %session_id), err)]
    async fn session_items(
        &self,
        session_id: RecordId,
        offset: usize,
        limit: usize,
    ) -> GatewayResult<(Vec<StockOpnameItem>, usize)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_opname_items WHERE session_id = $1")
            .bind(session_id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_session_items", e))?;

        let rows = sqlx::query(concat!(
            "SELECT ",
            line_columns!(),
            " FROM stock_opname_items WHERE session_id = $1 ORDER BY material_no, sloc OFFSET $2 LIMIT $3"
        ))
        .bind(session_id.as_uuid())
        .bind(offset as i64)
        .bind(limit as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("session_items", e))?;

        let lines = rows.iter().map(line_from_row).collect::<GatewayResult<Vec<_>>>()?;
        Ok((lines, total.max(0) as usize))
    }

    #[instrument(skip(self), fields(session_id = %session_id), err)]
    async fn all_session_items(&self, session_id: RecordId) -> GatewayResult<Vec<StockOpnameItem>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            line_columns!(),
            " FROM stock_opname_items WHERE session_id = $1 ORDER BY material_no, sloc"
        ))
        .bind(session_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("all_session_items", e))?;
        rows.iter().map(line_from_row).collect()
    }

    #[instrument(skip(self), fields(id = %id), err)]
    async fn get_session_item(&self, id: RecordId) -> GatewayResult<Option<StockOpnameItem>> {
        let row = sqlx::query(concat!(
            "SELECT ",
            line_columns!(),
            " FROM stock_opname_items WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_session_item", e))?;
        row.as_ref().map(line_from_row).transpose()
    }

    #[instrument(skip(self, line), fields(id = %line.id), err)]
    async fn update_session_item(&self, line: &StockOpnameItem) -> GatewayResult<()> {
        let result = sqlx::query(concat!(
            "UPDATE stock_opname_items SET physical_qty = $2, variance = $3, is_counted = $4 ",
            "WHERE id = $1 AND EXISTS (SELECT 1 FROM stock_opname_sessions s ",
            "WHERE s.id = stock_opname_items.session_id AND s.status = $5)"
        ))
        .bind(line.id.as_uuid())
        .bind(line.physical_qty)
        .bind(line.variance)
        .bind(line.is_counted)
        .bind(OpnameStatus::Open.as_str())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_session_item", e))?;
        if result.rows_affected() > 0 {
            return Ok(());
        }

        let session_id: Option<sqlx::types::Uuid> =
            sqlx::query_scalar("SELECT session_id FROM stock_opname_items WHERE id = $1")
                .bind(line.id.as_uuid())
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("update_session_item", e))?;
        match session_id {
            Some(session_id) => Err(self.session_write_refused(RecordId::from_uuid(session_id)).await),
            None => Err(GatewayError::NotFound(format!("opname item {}", line.id))),
        }
    }

    #[instrument(skip(self, session, adjustments), fields(id = %session.id, adjustments = adjustments.len()), err)]
    async fn finalize_session(
        &self,
        session: &StockOpnameSession,
        adjustments: &[StockAdjustment],
    ) -> GatewayResult<()> {
        let mut tx = self.begin().await?;

        // Close first: the guarded update holds the session row lock until commit.
        let result = sqlx::query(
            "UPDATE stock_opname_sessions SET status = $2, closed_at = $3 WHERE id = $1 AND status = $4",
        )
        .bind(session.id.as_uuid())
        .bind(session.status.as_str())
        .bind(session.closed_at)
        .bind(OpnameStatus::Open.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("close_session", e))?;
        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(self.session_write_refused(session.id).await);
        }

        for adj in adjustments {
            let result = sqlx::query(
                "UPDATE stock_items SET quantity = $3, last_updated = $4 WHERE material_no = $1 AND sloc = $2",
            )
            .bind(&adj.key.material_no)
            .bind(&adj.key.sloc)
            .bind(adj.physical_qty)
            .bind(adj.history.at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("apply_adjustment", e))?;

            if result.rows_affected() == 0 {
                tracing::warn!(key = %adj.key, "opname adjustment skipped: item no longer exists");
                continue;
            }
            insert_history(&mut tx, &adj.key, &adj.history).await?;
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

/// Map SQLx errors to gateway errors, keeping the failing operation in the message.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> GatewayError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => GatewayError::Conflict(msg),
                _ => GatewayError::Backend(msg),
            }
        }
        sqlx::Error::RowNotFound => GatewayError::NotFound(format!("row not found in {operation}")),
        sqlx::Error::PoolClosed => GatewayError::Backend(format!("connection pool closed in {operation}")),
        other => GatewayError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}
