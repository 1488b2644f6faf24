use async_trait::async_trait;
use dashmap::DashMap;
use grocer_types::domain::cart::{CartRow, NewCartRow};
use grocer_types::domain::order::{Order, OrderLine, OrderStatus};
use grocer_types::domain::profile::Profile;
use grocer_types::domain::quantity::Quantity;
use grocer_types::ports::cart_repository::CartRepository;
use grocer_types::ports::order_repository::OrderRepository;
use grocer_types::ports::profile_repository::ProfileRepository;
use grocer_types::ports::RepoError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Process-local stand-in for the remote row store. Clones share tables.
#[derive(Clone, Default)]
pub struct InMemoryRepo {
    pub profiles: Arc<DashMap<Uuid, Profile>>,
    pub cart_rows: Arc<DashMap<Uuid, (u64, CartRow)>>,
    pub orders: Arc<DashMap<Uuid, Order>>,
    pub order_lines: Arc<DashMap<Uuid, (u64, OrderLine)>>,
    seq: Arc<AtomicU64>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl CartRepository for InMemoryRepo {
    async fn list_cart_rows(&self, user_id: Uuid) -> Result<Vec<CartRow>, RepoError> {
        let mut rows: Vec<(u64, CartRow)> = self
            .cart_rows
            .iter()
            .filter(|kv| kv.value().1.user_id == user_id)
            .map(|kv| kv.value().clone())
            .collect();
        rows.sort_by_key(|(seq, _)| *seq);
        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }

    async fn insert_cart_row(&self, row: NewCartRow) -> Result<CartRow, RepoError> {
        let row = CartRow {
            id: Uuid::new_v4(),
            user_id: row.user_id,
            product_id: row.product_id,
            quantity: row.quantity,
        };
        self.cart_rows.insert(row.id, (self.next_seq(), row.clone()));
        Ok(row)
    }

    async fn update_cart_row(
        &self,
        user_id: Uuid,
        id: Uuid,
        quantity: Quantity,
    ) -> Result<(), RepoError> {
        if let Some(mut v) = self.cart_rows.get_mut(&id) {
            if v.1.user_id == user_id {
                v.1.quantity = quantity;
            }
        }
        Ok(())
    }

    async fn delete_cart_row(&self, user_id: Uuid, id: Uuid) -> Result<(), RepoError> {
        self.cart_rows.remove_if(&id, |_, (_, row)| row.user_id == user_id);
        Ok(())
    }

    async fn delete_cart_rows(&self, user_id: Uuid) -> Result<(), RepoError> {
        self.cart_rows.retain(|_, (_, row)| row.user_id != user_id);
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepo {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, RepoError> {
        Ok(self.profiles.get(&id).map(|r| r.clone()))
    }

    async fn upsert_profile(&self, profile: Profile) -> Result<Profile, RepoError> {
        self.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepo {
    async fn create(&self, order: Order) -> Result<Order, RepoError> {
        if let Some(key) = order.idempotency_key {
            if self.find_by_idempotency_key(order.user_id, key).await?.is_some() {
                return Err(RepoError::Conflict(format!("idempotency key {key}")));
            }
        }
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn create_lines(&self, lines: Vec<OrderLine>) -> Result<Vec<OrderLine>, RepoError> {
        for line in &lines {
            if !self.orders.contains_key(&line.order_id) {
                return Err(RepoError::DbError(format!(
                    "order {} does not exist",
                    line.order_id
                )));
            }
        }
        for line in &lines {
            self.order_lines
                .insert(line.id, (self.next_seq(), line.clone()));
        }
        Ok(lines)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        Ok(self.orders.get(&id).map(|r| r.clone()))
    }

    async fn lines(&self, order_id: Uuid) -> Result<Vec<OrderLine>, RepoError> {
        let mut lines: Vec<(u64, OrderLine)> = self
            .order_lines
            .iter()
            .filter(|kv| kv.value().1.order_id == order_id)
            .map(|kv| kv.value().clone())
            .collect();
        lines.sort_by_key(|(seq, _)| *seq);
        Ok(lines.into_iter().map(|(_, line)| line).collect())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, RepoError> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|kv| kv.value().user_id == user_id)
            .map(|kv| kv.value().clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: Uuid,
        key: Uuid,
    ) -> Result<Option<Order>, RepoError> {
        Ok(self
            .orders
            .iter()
            .find(|kv| kv.value().user_id == user_id && kv.value().idempotency_key == Some(key))
            .map(|kv| kv.value().clone()))
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepoError> {
        if let Some(mut v) = self.orders.get_mut(&id) {
            v.update_status(status);
            return Ok(Some(v.clone()));
        }
        Ok(None)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        self.order_lines.retain(|_, (_, line)| line.order_id != id);
        Ok(self.orders.remove(&id).is_some())
    }
}
