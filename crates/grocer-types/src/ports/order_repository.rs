use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::order::{Order, OrderLine, OrderStatus};
use crate::ports::RepoError;

/// `orders` and `order_items` tables.
///
/// No multi-row transaction spans the two tables; callers that need
/// all-or-nothing semantics compensate with [`OrderRepository::delete`].
#[async_trait]
pub trait OrderRepository: Send + Sync + 'static {
    async fn create(&self, order: Order) -> Result<Order, RepoError>;
    async fn create_lines(&self, lines: Vec<OrderLine>) -> Result<Vec<OrderLine>, RepoError>;
    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError>;
    async fn lines(&self, order_id: Uuid) -> Result<Vec<OrderLine>, RepoError>;
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, RepoError>;
    async fn find_by_idempotency_key(
        &self,
        user_id: Uuid,
        key: Uuid,
    ) -> Result<Option<Order>, RepoError>;
    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepoError>;
    /// Removes the order and any lines already written for it.
    async fn delete(&self, id: Uuid) -> Result<bool, RepoError>;
}
