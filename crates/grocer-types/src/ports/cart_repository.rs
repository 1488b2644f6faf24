use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::cart::{CartRow, NewCartRow};
use crate::domain::quantity::Quantity;
use crate::ports::RepoError;

/// Row-per-line storage for member carts (`cart_items`).
///
/// Every call is scoped by `user_id` so one account can never touch
/// another account's rows, even with a guessed row id.
#[async_trait]
pub trait CartRepository: Send + Sync + 'static {
    /// Rows for the account in insertion order.
    async fn list_cart_rows(&self, user_id: Uuid) -> Result<Vec<CartRow>, RepoError>;

    async fn insert_cart_row(&self, row: NewCartRow) -> Result<CartRow, RepoError>;

    async fn update_cart_row(
        &self,
        user_id: Uuid,
        id: Uuid,
        quantity: Quantity,
    ) -> Result<(), RepoError>;

    async fn delete_cart_row(&self, user_id: Uuid, id: Uuid) -> Result<(), RepoError>;

    async fn delete_cart_rows(&self, user_id: Uuid) -> Result<(), RepoError>;
}
