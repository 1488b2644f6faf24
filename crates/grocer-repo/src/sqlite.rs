use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grocer_types::domain::cart::{CartRow, NewCartRow};
use grocer_types::domain::order::{Order, OrderLine, OrderStatus};
use grocer_types::domain::profile::Profile;
use grocer_types::domain::quantity::Quantity;
use grocer_types::ports::cart_repository::CartRepository;
use grocer_types::ports::order_repository::OrderRepository;
use grocer_types::ports::profile_repository::ProfileRepository;
use grocer_types::ports::RepoError;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, user_id, total_cents, status, shipping_address, contact_phone, idempotency_key, created_at, updated_at";

pub struct SqliteRepo {
    pool: SqlitePool,
}

fn db_err(e: impl ToString) -> RepoError {
    RepoError::DbError(e.to_string())
}

fn write_err(e: sqlx::Error) -> RepoError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Conflict(db.message().to_string())
        }
        _ => db_err(e),
    }
}

fn parse_uuid(s: &str) -> Result<Uuid, RepoError> {
    Uuid::parse_str(s).map_err(db_err)
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, RepoError> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(db_err)?
        .with_timezone(&Utc))
}

fn parse_quantity(q: i64) -> Result<Quantity, RepoError> {
    Quantity::new(q).map_err(db_err)
}

#[derive(FromRow)]
struct DbCartRow {
    id: String,
    user_id: String,
    product_id: String,
    quantity: i64,
}

impl DbCartRow {
    fn into_row(self) -> Result<CartRow, RepoError> {
        Ok(CartRow {
            id: parse_uuid(&self.id)?,
            user_id: parse_uuid(&self.user_id)?,
            product_id: self.product_id,
            quantity: parse_quantity(self.quantity)?,
        })
    }
}

#[derive(FromRow)]
struct DbProfile {
    id: String,
    email: String,
    full_name: String,
    phone: String,
    address: String,
    created_at: String,
    updated_at: String,
}

impl DbProfile {
    fn into_profile(self) -> Result<Profile, RepoError> {
        Ok(Profile {
            id: parse_uuid(&self.id)?,
            email: self.email,
            full_name: self.full_name,
            phone: self.phone,
            address: self.address,
            created_at: parse_time(&self.created_at)?,
            updated_at: parse_time(&self.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct DbOrder {
    id: String,
    user_id: String,
    total_cents: i64,
    status: String,
    shipping_address: String,
    contact_phone: String,
    idempotency_key: Option<String>,
    created_at: String,
    updated_at: String,
}

impl DbOrder {
    fn into_order(self) -> Result<Order, RepoError> {
        let status = OrderStatus::parse(&self.status)
            .ok_or_else(|| RepoError::DbError(format!("unknown order status {}", self.status)))?;
        let idempotency_key = self
            .idempotency_key
            .as_deref()
            .map(parse_uuid)
            .transpose()?;
        Ok(Order {
            id: parse_uuid(&self.id)?,
            user_id: parse_uuid(&self.user_id)?,
            total_cents: self.total_cents,
            status,
            shipping_address: self.shipping_address,
            contact_phone: self.contact_phone,
            idempotency_key,
            created_at: parse_time(&self.created_at)?,
            updated_at: parse_time(&self.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct DbOrderLine {
    id: String,
    order_id: String,
    product_id: String,
    quantity: i64,
    price_cents: i64,
    created_at: String,
}

impl DbOrderLine {
    fn into_line(self) -> Result<OrderLine, RepoError> {
        Ok(OrderLine {
            id: parse_uuid(&self.id)?,
            order_id: parse_uuid(&self.order_id)?,
            product_id: self.product_id,
            quantity: parse_quantity(self.quantity)?,
            price_cents: self.price_cents,
            created_at: parse_time(&self.created_at)?,
        })
    }
}

impl SqliteRepo {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(options).await?;

        let ddl = include_str!("../migrations/0001_create_storefront.sql");
        for statement in ddl.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&pool).await?;
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl CartRepository for SqliteRepo {
    async fn list_cart_rows(&self, user_id: Uuid) -> Result<Vec<CartRow>, RepoError> {
        let rows: Vec<DbCartRow> = sqlx::query_as(
            "SELECT id, user_id, product_id, quantity FROM cart_items WHERE user_id = ? ORDER BY rowid",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(DbCartRow::into_row)
            .collect::<Result<Vec<_>, _>>()
    }

    async fn insert_cart_row(&self, row: NewCartRow) -> Result<CartRow, RepoError> {
        let row = CartRow {
            id: Uuid::new_v4(),
            user_id: row.user_id,
            product_id: row.product_id,
            quantity: row.quantity,
        };
        sqlx::query("INSERT INTO cart_items (id, user_id, product_id, quantity) VALUES (?, ?, ?, ?)")
            .bind(row.id.to_string())
            .bind(row.user_id.to_string())
            .bind(&row.product_id)
            .bind(i64::from(row.quantity))
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        Ok(row)
    }

    async fn update_cart_row(
        &self,
        user_id: Uuid,
        id: Uuid,
        quantity: Quantity,
    ) -> Result<(), RepoError> {
        sqlx::query("UPDATE cart_items SET quantity = ? WHERE user_id = ? AND id = ?")
            .bind(i64::from(quantity))
            .bind(user_id.to_string())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_cart_row(&self, user_id: Uuid, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = ? AND id = ?")
            .bind(user_id.to_string())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_cart_rows(&self, user_id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = ?")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for SqliteRepo {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, RepoError> {
        let row: Option<DbProfile> = sqlx::query_as(
            "SELECT id, email, full_name, phone, address, created_at, updated_at FROM profiles WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(DbProfile::into_profile).transpose()
    }

    async fn upsert_profile(&self, profile: Profile) -> Result<Profile, RepoError> {
        sqlx::query(
            "INSERT INTO profiles (id, email, full_name, phone, address, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET
                email = excluded.email,
                full_name = excluded.full_name,
                phone = excluded.phone,
                address = excluded.address,
                updated_at = excluded.updated_at",
        )
        .bind(profile.id.to_string())
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(&profile.phone)
        .bind(&profile.address)
        .bind(profile.created_at.to_rfc3339())
        .bind(profile.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(profile)
    }
}

#[async_trait]
impl OrderRepository for SqliteRepo {
    async fn create(&self, order: Order) -> Result<Order, RepoError> {
        sqlx::query(
            "INSERT INTO orders (id, user_id, total_cents, status, shipping_address, contact_phone, idempotency_key, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(order.id.to_string())
        .bind(order.user_id.to_string())
        .bind(order.total_cents)
        .bind(order.status.as_str())
        .bind(&order.shipping_address)
        .bind(&order.contact_phone)
        .bind(order.idempotency_key.map(|k| k.to_string()))
        .bind(order.created_at.to_rfc3339())
        .bind(order.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(order)
    }

    async fn create_lines(&self, lines: Vec<OrderLine>) -> Result<Vec<OrderLine>, RepoError> {
        // One batch, one transaction: either every line lands or none do.
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        for line in &lines {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, quantity, price_cents, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(line.id.to_string())
            .bind(line.order_id.to_string())
            .bind(&line.product_id)
            .bind(i64::from(line.quantity))
            .bind(line.price_cents)
            .bind(line.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
        }
        tx.commit().await.map_err(db_err)?;
        Ok(lines)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        let row: Option<DbOrder> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        row.map(DbOrder::into_order).transpose()
    }

    async fn lines(&self, order_id: Uuid) -> Result<Vec<OrderLine>, RepoError> {
        let rows: Vec<DbOrderLine> = sqlx::query_as(
            "SELECT id, order_id, product_id, quantity, price_cents, created_at FROM order_items WHERE order_id = ? ORDER BY rowid",
        )
        .bind(order_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(DbOrderLine::into_line)
            .collect::<Result<Vec<_>, _>>()
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, RepoError> {
        let rows: Vec<DbOrder> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(DbOrder::into_order)
            .collect::<Result<Vec<_>, _>>()
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: Uuid,
        key: Uuid,
    ) -> Result<Option<Order>, RepoError> {
        let row: Option<DbOrder> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ? AND idempotency_key = ?"
        ))
        .bind(user_id.to_string())
        .bind(key.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(DbOrder::into_order).transpose()
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepoError> {
        let updated = sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query("DELETE FROM order_items WHERE order_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        let res = sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(res.rows_affected() > 0)
    }
}
