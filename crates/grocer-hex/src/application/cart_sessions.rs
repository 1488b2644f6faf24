//! Live carts keyed by identity.
//!
//! Each cart sits behind its own async mutex, so mutations on one identity
//! run one at a time while different identities proceed in parallel.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use grocer_types::domain::identity::{Account, Identity, IdentityKey};
use grocer_types::ports::cart_repository::CartRepository;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::application::cart_service::{CartDeps, CartService};
use crate::errors::CartError;

pub type SharedCart<R> = Arc<Mutex<CartService<R>>>;

/// What happens to a guest cart when its shopper signs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuestMergePolicy {
    /// Add the guest lines into the member cart by product id.
    #[default]
    Merge,
    /// Drop the guest lines; the member cart is used as stored.
    Discard,
}

impl FromStr for GuestMergePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(GuestMergePolicy::Merge),
            "discard" => Ok(GuestMergePolicy::Discard),
            other => anyhow::bail!("unknown guest merge policy {other:?}"),
        }
    }
}

/// How long an untouched cart stays in memory by default.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

struct Slot<R: CartRepository> {
    cart: SharedCart<R>,
    touched: Instant,
}

pub struct CartSessions<R: CartRepository> {
    deps: CartDeps<R>,
    carts: DashMap<IdentityKey, Slot<R>>,
    merge_policy: GuestMergePolicy,
    idle_ttl: Duration,
    last_sweep: std::sync::Mutex<Instant>,
}

impl<R: CartRepository> CartSessions<R> {
    pub fn new(deps: CartDeps<R>, merge_policy: GuestMergePolicy) -> Self {
        Self {
            deps,
            carts: DashMap::new(),
            merge_policy,
            idle_ttl: DEFAULT_IDLE_TTL,
            last_sweep: std::sync::Mutex::new(Instant::now()),
        }
    }

    /// Carts untouched for `idle_ttl` and not in use are dropped from
    /// memory. Their lines stay in the row store or guest store.
    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.idle_ttl = idle_ttl;
        self
    }

    pub fn merge_policy(&self) -> GuestMergePolicy {
        self.merge_policy
    }

    pub fn len(&self) -> usize {
        self.carts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.carts.is_empty()
    }

    /// The identity's cart, loaded on first access.
    pub async fn cart(&self, identity: &Identity) -> Result<SharedCart<R>, CartError> {
        let shared = {
            let mut slot = self.carts.entry(identity.key()).or_insert_with(|| Slot {
                cart: Arc::new(Mutex::new(CartService::new(
                    identity.clone(),
                    self.deps.clone(),
                ))),
                touched: Instant::now(),
            });
            slot.touched = Instant::now();
            slot.cart.clone()
        };
        self.sweep_idle();
        shared.lock().await.ensure_loaded().await?;
        Ok(shared)
    }

    /// Moves a shopper from their guest session to their account, applying
    /// the merge policy, and forgets the guest cart.
    ///
    /// Guest lines are moved one at a time, so a retry after a failed
    /// member write only moves what is left.
    pub async fn sign_in(
        &self,
        guest_session: Uuid,
        account: Account,
    ) -> Result<SharedCart<R>, CartError> {
        let guest = self.cart(&Identity::guest(guest_session)).await?;
        let member = self.cart(&Identity::Member(account.clone())).await?;
        {
            let mut guest = guest.lock().await;
            let mut member = member.lock().await;
            if self.merge_policy == GuestMergePolicy::Merge {
                member.absorb(&mut guest).await?;
            }
            guest.clear().await?;
        }
        self.carts.remove(&IdentityKey::Guest(guest_session));
        tracing::debug!(
            %guest_session,
            account_id = %account.id,
            policy = ?self.merge_policy,
            "guest cart handed over to member"
        );
        Ok(member)
    }

    /// Forgets the member's live cart. Returns whether one was held.
    pub fn sign_out(&self, account_id: Uuid) -> bool {
        self.carts.remove(&IdentityKey::Member(account_id)).is_some()
    }

    /// Drops idle carts nobody holds, at most once per `idle_ttl`.
    fn sweep_idle(&self) {
        let now = Instant::now();
        {
            let Ok(mut last) = self.last_sweep.try_lock() else {
                return;
            };
            if now.duration_since(*last) < self.idle_ttl {
                return;
            }
            *last = now;
        }
        let before = self.carts.len();
        self.carts.retain(|_, slot| {
            Arc::strong_count(&slot.cart) > 1 || now.duration_since(slot.touched) < self.idle_ttl
        });
        let evicted = before.saturating_sub(self.carts.len());
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.carts.len(), "evicted idle carts");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use grocer_repo::guest::InMemoryGuestStore;
    use grocer_repo::memory::InMemoryRepo;
    use grocer_types::domain::quantity::Quantity;

    fn sessions(policy: GuestMergePolicy) -> CartSessions<InMemoryRepo> {
        CartSessions::new(
            CartDeps {
                repo: Arc::new(InMemoryRepo::new()),
                guest_store: Arc::new(InMemoryGuestStore::new()),
                catalog: Arc::new(Catalog::grocery()),
                timeout: Duration::from_secs(1),
            },
            policy,
        )
    }

    fn account() -> Account {
        Account {
            id: Uuid::new_v4(),
            email: "m@example.com".into(),
        }
    }

    #[tokio::test]
    async fn same_identity_shares_one_cart() {
        let sessions = sessions(GuestMergePolicy::Merge);
        let identity = Identity::guest(Uuid::new_v4());
        let a = sessions.cart(&identity).await.unwrap();
        let b = sessions.cart(&identity).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_adds_of_one_product_never_duplicate_lines() {
        let sessions = Arc::new(sessions(GuestMergePolicy::Merge));
        let identity = Identity::Member(account());
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let sessions = sessions.clone();
            let identity = identity.clone();
            tasks.push(tokio::spawn(async move {
                let cart = sessions.cart(&identity).await.unwrap();
                let mut cart = cart.lock().await;
                cart.add_product("1", 2).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        let cart = sessions.cart(&identity).await.unwrap();
        let cart = cart.lock().await;
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.total_items(), 16);
    }

    #[tokio::test]
    async fn sign_in_merges_guest_lines_by_product() {
        let sessions = sessions(GuestMergePolicy::Merge);
        let guest_session = Uuid::new_v4();
        let account = account();

        {
            let member = sessions.cart(&Identity::Member(account.clone())).await.unwrap();
            let mut member = member.lock().await;
            member.add_product("1", 95).await.unwrap();
        }
        {
            let guest = sessions.cart(&Identity::guest(guest_session)).await.unwrap();
            let mut guest = guest.lock().await;
            guest.add_product("1", 10).await.unwrap();
            guest.add_product("2", 3).await.unwrap();
        }

        let member = sessions.sign_in(guest_session, account).await.unwrap();
        let member = member.lock().await;
        assert_eq!(member.lines().len(), 2);
        assert_eq!(member.line_for_product("1").unwrap().quantity, Quantity::MAX);
        assert_eq!(member.line_for_product("2").unwrap().quantity.get(), 3);
        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test]
    async fn sign_in_with_discard_keeps_member_cart_untouched() {
        let sessions = sessions(GuestMergePolicy::Discard);
        let guest_session = Uuid::new_v4();
        {
            let guest = sessions.cart(&Identity::guest(guest_session)).await.unwrap();
            guest.lock().await.add_product("2", 3).await.unwrap();
        }
        let member = sessions.sign_in(guest_session, account()).await.unwrap();
        assert!(member.lock().await.is_empty());

        // The guest payload is gone too.
        let guest = sessions.cart(&Identity::guest(guest_session)).await.unwrap();
        assert!(guest.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_carts_are_evicted() {
        let sessions = sessions(GuestMergePolicy::Merge).with_idle_ttl(Duration::from_secs(60));
        for _ in 0..1000 {
            sessions.cart(&Identity::guest(Uuid::new_v4())).await.unwrap();
        }
        let member = Identity::Member(account());
        let held = sessions.cart(&member).await.unwrap();
        assert_eq!(sessions.len(), 1001);

        tokio::time::advance(Duration::from_secs(61)).await;
        let fresh = Identity::guest(Uuid::new_v4());
        sessions.cart(&fresh).await.unwrap();

        // The held member cart survives; the 1000 one-off guests do not.
        assert_eq!(sessions.len(), 2);
        assert!(Arc::ptr_eq(&held, &sessions.cart(&member).await.unwrap()));
    }

    #[tokio::test]
    async fn evicted_guest_cart_reloads_from_its_payload() {
        let sessions = sessions(GuestMergePolicy::Merge).with_idle_ttl(Duration::ZERO);
        let identity = Identity::guest(Uuid::new_v4());
        {
            let cart = sessions.cart(&identity).await.unwrap();
            cart.lock().await.add_product("1", 4).await.unwrap();
        }
        sessions.cart(&Identity::guest(Uuid::new_v4())).await.unwrap();
        let cart = sessions.cart(&identity).await.unwrap();
        assert_eq!(cart.lock().await.total_items(), 4);
    }

    #[tokio::test]
    async fn sign_out_forgets_the_member_cart() {
        let sessions = sessions(GuestMergePolicy::Merge);
        let account = account();
        sessions.cart(&Identity::Member(account.clone())).await.unwrap();
        assert!(sessions.sign_out(account.id));
        assert!(sessions.is_empty());
        assert!(!sessions.sign_out(account.id));
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!("merge".parse::<GuestMergePolicy>().unwrap(), GuestMergePolicy::Merge);
        assert_eq!(
            " Discard ".parse::<GuestMergePolicy>().unwrap(),
            GuestMergePolicy::Discard
        );
        assert!("keep".parse::<GuestMergePolicy>().is_err());
    }
}
