use async_trait::async_trait;
use uuid::Uuid;

use crate::ports::RepoError;

/// Client-side storage for guest carts, one opaque JSON payload per session.
///
/// The store never interprets the payload; a corrupt payload is the
/// caller's problem to detect and reset.
#[async_trait]
pub trait GuestCartStore: Send + Sync + 'static {
    async fn read(&self, session: Uuid) -> Result<Option<String>, RepoError>;
    async fn write(&self, session: Uuid, payload: String) -> Result<(), RepoError>;
    async fn remove(&self, session: Uuid) -> Result<(), RepoError>;
}
