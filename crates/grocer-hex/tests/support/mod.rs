#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use grocer_hex::application::cart_service::{CartDeps, CartService};
use grocer_hex::application::checkout_service::{CheckoutRequest, CheckoutService};
use grocer_hex::application::payment::{PaymentGateway, SimulatedGateway};
use grocer_hex::catalog::Catalog;
use grocer_repo::guest::InMemoryGuestStore;
use grocer_repo::memory::InMemoryRepo;
use grocer_types::domain::cart::{CartRow, NewCartRow};
use grocer_types::domain::identity::{Account, Identity};
use grocer_types::domain::order::{
    Order, OrderLine, OrderStatus, PaymentDetails, ShippingDetails,
};
use grocer_types::domain::product::Product;
use grocer_types::domain::profile::Profile;
use grocer_types::domain::quantity::Quantity;
use grocer_types::ports::cart_repository::CartRepository;
use grocer_types::ports::order_repository::OrderRepository;
use grocer_types::ports::profile_repository::ProfileRepository;
use grocer_types::ports::RepoError;
use uuid::Uuid;

pub const TIMEOUT: Duration = Duration::from_millis(200);

/// In-memory rows with switches for injecting failures, plus a call counter.
#[derive(Default)]
pub struct FlakyRepo {
    pub inner: InMemoryRepo,
    pub calls: AtomicUsize,
    pub fail_cart_writes: AtomicBool,
    pub fail_create_lines: AtomicBool,
    pub fail_delete: AtomicBool,
    pub hang: AtomicBool,
    /// `create` writes the order, then never answers.
    pub hang_after_create: AtomicBool,
    /// 1-based cart insert that fails; 0 disables.
    pub fail_insert_at: AtomicUsize,
    pub inserts: AtomicUsize,
}

impl FlakyRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set(flag: &AtomicBool, on: bool) {
        flag.store(on, Ordering::SeqCst);
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<(), RepoError> {
        if flag.load(Ordering::SeqCst) {
            Err(RepoError::DbError(format!("injected {what} failure")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CartRepository for FlakyRepo {
    async fn list_cart_rows(&self, user_id: Uuid) -> Result<Vec<CartRow>, RepoError> {
        self.enter().await;
        self.inner.list_cart_rows(user_id).await
    }

    async fn insert_cart_row(&self, row: NewCartRow) -> Result<CartRow, RepoError> {
        self.enter().await;
        Self::check(&self.fail_cart_writes, "cart insert")?;
        let n = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_insert_at.load(Ordering::SeqCst) {
            return Err(RepoError::DbError(format!("injected failure of insert #{n}")));
        }
        self.inner.insert_cart_row(row).await
    }

    async fn update_cart_row(
        &self,
        user_id: Uuid,
        id: Uuid,
        quantity: Quantity,
    ) -> Result<(), RepoError> {
        self.enter().await;
        Self::check(&self.fail_cart_writes, "cart update")?;
        self.inner.update_cart_row(user_id, id, quantity).await
    }

    async fn delete_cart_row(&self, user_id: Uuid, id: Uuid) -> Result<(), RepoError> {
        self.enter().await;
        Self::check(&self.fail_cart_writes, "cart delete")?;
        self.inner.delete_cart_row(user_id, id).await
    }

    async fn delete_cart_rows(&self, user_id: Uuid) -> Result<(), RepoError> {
        self.enter().await;
        Self::check(&self.fail_cart_writes, "cart clear")?;
        self.inner.delete_cart_rows(user_id).await
    }
}

#[async_trait]
impl ProfileRepository for FlakyRepo {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, RepoError> {
        self.enter().await;
        self.inner.get_profile(id).await
    }

    async fn upsert_profile(&self, profile: Profile) -> Result<Profile, RepoError> {
        self.enter().await;
        self.inner.upsert_profile(profile).await
    }
}

#[async_trait]
impl OrderRepository for FlakyRepo {
    async fn create(&self, order: Order) -> Result<Order, RepoError> {
        self.enter().await;
        let created = self.inner.create(order).await?;
        if self.hang_after_create.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(created)
    }

    async fn create_lines(&self, lines: Vec<OrderLine>) -> Result<Vec<OrderLine>, RepoError> {
        self.enter().await;
        Self::check(&self.fail_create_lines, "order line insert")?;
        self.inner.create_lines(lines).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        self.enter().await;
        self.inner.get(id).await
    }

    async fn lines(&self, order_id: Uuid) -> Result<Vec<OrderLine>, RepoError> {
        self.enter().await;
        self.inner.lines(order_id).await
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, RepoError> {
        self.enter().await;
        self.inner.list_for_user(user_id).await
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: Uuid,
        key: Uuid,
    ) -> Result<Option<Order>, RepoError> {
        self.enter().await;
        self.inner.find_by_idempotency_key(user_id, key).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepoError> {
        self.enter().await;
        self.inner.update_status(id, status).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        self.enter().await;
        Self::check(&self.fail_delete, "order delete")?;
        self.inner.delete(id).await
    }
}

pub struct Harness {
    pub repo: Arc<FlakyRepo>,
    pub guest_store: Arc<InMemoryGuestStore>,
    pub deps: CartDeps<FlakyRepo>,
    pub checkout: CheckoutService<FlakyRepo>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_gateway(Arc::new(SimulatedGateway::default()))
    }

    pub fn with_gateway(payments: Arc<dyn PaymentGateway>) -> Self {
        Self::build(Catalog::grocery(), payments)
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self::build(catalog, Arc::new(SimulatedGateway::default()))
    }

    fn build(catalog: Catalog, payments: Arc<dyn PaymentGateway>) -> Self {
        let repo = Arc::new(FlakyRepo::new());
        let guest_store = Arc::new(InMemoryGuestStore::new());
        let deps = CartDeps {
            repo: repo.clone(),
            guest_store: guest_store.clone(),
            catalog: Arc::new(catalog),
            timeout: TIMEOUT,
        };
        let checkout = CheckoutService::new(repo.clone(), payments, TIMEOUT);
        Self {
            repo,
            guest_store,
            deps,
            checkout,
        }
    }

    pub async fn cart(&self, identity: Identity) -> CartService<FlakyRepo> {
        CartService::open(identity, self.deps.clone())
            .await
            .expect("open cart")
    }

    pub fn catalog(&self) -> &Catalog {
        &self.deps.catalog
    }
}

pub fn member() -> Account {
    Account {
        id: Uuid::new_v4(),
        email: "shopper@example.com".into(),
    }
}

pub fn request() -> CheckoutRequest {
    CheckoutRequest {
        idempotency_key: Uuid::new_v4(),
        shipping: ShippingDetails {
            full_name: "Sam Shopper".into(),
            email: "shopper@example.com".into(),
            address: "12 Market Row".into(),
            phone: "555-0142".into(),
        },
        payment: PaymentDetails {
            card_number: "4242424242424242".into(),
            expiry: "12/30".into(),
            cvv: "123".into(),
        },
    }
}

pub fn product(id: &str, name: &str, price_cents: i64) -> Product {
    Product {
        id: id.into(),
        name: name.into(),
        description: format!("{name} from the corner shop"),
        price_cents,
        image: format!("/products/{id}.jpg"),
        category: "Pantry".into(),
        subcategory: "Staples".into(),
        unit: "each".into(),
        stock: 10,
        is_popular: false,
        nutrition: None,
    }
}

/// Apples at 3.00 and bread at 5.50.
pub fn corner_shop() -> Catalog {
    Catalog::new(
        Vec::new(),
        vec![product("apple", "Apple", 300), product("bread", "Bread", 550)],
    )
}
