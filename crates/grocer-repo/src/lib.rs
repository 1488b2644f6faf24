#[cfg(not(any(feature = "memory", feature = "sqlite")))]
compile_error!("Enable a repo feature: `memory` or `sqlite`.");

use async_trait::async_trait;
use grocer_types::domain::cart::{CartRow, NewCartRow};
use grocer_types::domain::order::{Order, OrderLine, OrderStatus};
use grocer_types::domain::profile::Profile;
use grocer_types::domain::quantity::Quantity;
use grocer_types::ports::cart_repository::CartRepository;
use grocer_types::ports::guest_cart_store::GuestCartStore;
use grocer_types::ports::order_repository::OrderRepository;
use grocer_types::ports::profile_repository::ProfileRepository;
use grocer_types::ports::RepoError;
use std::sync::Arc;
use uuid::Uuid;

pub mod guest;
#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://grocer.db";
pub const DEFAULT_GUEST_CART_DIR: &str = "guest-carts";

/// The row store selected by the enabled features.
pub enum Repo {
    #[cfg(feature = "memory")]
    Memory(memory::InMemoryRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteRepo),
}

macro_rules! dispatch {
    ($self:ident, $repo:ident => $call:expr) => {
        match $self {
            #[cfg(feature = "memory")]
            Repo::Memory($repo) => $call,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite($repo) => $call,
        }
    };
}

pub async fn build_repo(url: Option<&str>) -> anyhow::Result<Repo> {
    Repo::build_repo(url).await
}

/// On-disk store when `dir` is given. Otherwise process memory, or
/// [`DEFAULT_GUEST_CART_DIR`] when the `memory` feature is off.
pub fn build_guest_store(dir: Option<&str>) -> Arc<dyn GuestCartStore> {
    match dir {
        Some(dir) => Arc::new(guest::FileGuestStore::new(dir)),
        #[cfg(feature = "memory")]
        None => Arc::new(guest::InMemoryGuestStore::new()),
        #[cfg(not(feature = "memory"))]
        None => Arc::new(guest::FileGuestStore::new(DEFAULT_GUEST_CART_DIR)),
    }
}

impl Repo {
    #[cfg(all(feature = "memory", not(feature = "sqlite")))]
    pub async fn build_repo(_: Option<&str>) -> anyhow::Result<Self> {
        Ok(Repo::Memory(memory::InMemoryRepo::new()))
    }

    #[cfg(all(feature = "sqlite", not(feature = "memory")))]
    pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Self> {
        let url = database_url.unwrap_or(DEFAULT_DATABASE_URL);
        Ok(Repo::Sqlite(sqlite::SqliteRepo::new(url).await?))
    }

    // Both enabled: an explicit URL selects sqlite.
    #[cfg(all(feature = "sqlite", feature = "memory"))]
    pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Self> {
        match database_url {
            Some(url) => Ok(Repo::Sqlite(sqlite::SqliteRepo::new(url).await?)),
            None => Ok(Repo::Memory(memory::InMemoryRepo::new())),
        }
    }
}

#[async_trait]
impl CartRepository for Repo {
    async fn list_cart_rows(&self, user_id: Uuid) -> Result<Vec<CartRow>, RepoError> {
        dispatch!(self, r => r.list_cart_rows(user_id).await)
    }

    async fn insert_cart_row(&self, row: NewCartRow) -> Result<CartRow, RepoError> {
        dispatch!(self, r => r.insert_cart_row(row).await)
    }

    async fn update_cart_row(
        &self,
        user_id: Uuid,
        id: Uuid,
        quantity: Quantity,
    ) -> Result<(), RepoError> {
        dispatch!(self, r => r.update_cart_row(user_id, id, quantity).await)
    }

    async fn delete_cart_row(&self, user_id: Uuid, id: Uuid) -> Result<(), RepoError> {
        dispatch!(self, r => r.delete_cart_row(user_id, id).await)
    }

    async fn delete_cart_rows(&self, user_id: Uuid) -> Result<(), RepoError> {
        dispatch!(self, r => r.delete_cart_rows(user_id).await)
    }
}

#[async_trait]
impl ProfileRepository for Repo {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, RepoError> {
        dispatch!(self, r => r.get_profile(id).await)
    }

    async fn upsert_profile(&self, profile: Profile) -> Result<Profile, RepoError> {
        dispatch!(self, r => r.upsert_profile(profile).await)
    }
}

#[async_trait]
impl OrderRepository for Repo {
    async fn create(&self, order: Order) -> Result<Order, RepoError> {
        dispatch!(self, r => r.create(order).await)
    }

    async fn create_lines(&self, lines: Vec<OrderLine>) -> Result<Vec<OrderLine>, RepoError> {
        dispatch!(self, r => r.create_lines(lines).await)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        dispatch!(self, r => r.get(id).await)
    }

    async fn lines(&self, order_id: Uuid) -> Result<Vec<OrderLine>, RepoError> {
        dispatch!(self, r => r.lines(order_id).await)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, RepoError> {
        dispatch!(self, r => r.list_for_user(user_id).await)
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: Uuid,
        key: Uuid,
    ) -> Result<Option<Order>, RepoError> {
        dispatch!(self, r => r.find_by_idempotency_key(user_id, key).await)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepoError> {
        dispatch!(self, r => r.update_status(id, status).await)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        dispatch!(self, r => r.delete(id).await)
    }
}
