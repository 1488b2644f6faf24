//! Turns a member's cart into an order plus order lines.
//!
//! The row store has no transaction spanning `orders` and `order_items`, so a
//! failed line insert, or an order insert that timed out, is undone by
//! deleting the order by its id.

use std::sync::Arc;
use std::time::Duration;

use grocer_types::domain::identity::Account;
use grocer_types::domain::order::{
    Order, OrderDraft, OrderLine, OrderStatus, PaymentDetails, ShippingDetails,
};
use grocer_types::domain::profile::{Profile, ProfileUpdate};
use grocer_types::ports::Persistence;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::cart_service::CartService;
use crate::application::deadline::{bounded, CallError};
use crate::application::payment::PaymentGateway;
use crate::errors::CheckoutError;

/// One checkout attempt. Resubmitting with the same key after a success is
/// rejected instead of creating a second order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub idempotency_key: Uuid,
    pub shipping: ShippingDetails,
    pub payment: PaymentDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

pub struct CheckoutService<R: Persistence> {
    repo: Arc<R>,
    payments: Arc<dyn PaymentGateway>,
    timeout: Duration,
}

impl<R: Persistence> CheckoutService<R> {
    pub fn new(repo: Arc<R>, payments: Arc<dyn PaymentGateway>, timeout: Duration) -> Self {
        Self {
            repo,
            payments,
            timeout,
        }
    }

    /// The account's profile, provisioning a blank one on first use.
    pub async fn profile(&self, account: &Account) -> Result<Profile, CheckoutError> {
        let existing = bounded(self.timeout, self.repo.get_profile(account.id))
            .await
            .map_err(CheckoutError::ProfileLoadFailed)?;
        if let Some(profile) = existing {
            return Ok(profile);
        }
        tracing::info!(account_id = %account.id, "provisioning empty profile");
        bounded(
            self.timeout,
            self.repo.upsert_profile(Profile::provisioned(account)),
        )
        .await
        .map_err(CheckoutError::ProfileLoadFailed)
    }

    /// Saves the editable profile fields. A blank full name is rejected
    /// before any store call.
    pub async fn update_profile(
        &self,
        account: &Account,
        update: &ProfileUpdate,
    ) -> Result<Profile, CheckoutError> {
        update
            .validate()
            .map_err(|e| CheckoutError::InvalidProfile(e.to_string()))?;
        let mut profile = self.profile(account).await?;
        update.apply(&mut profile);
        let saved = bounded(self.timeout, self.repo.upsert_profile(profile))
            .await
            .map_err(CheckoutError::ProfileUpdateFailed)?;
        tracing::info!(account_id = %account.id, "profile updated");
        Ok(saved)
    }

    /// Places an order for everything in `cart` and empties it.
    ///
    /// Rejected without touching the store when the cart belongs to a guest,
    /// is empty, or the details do not validate. On failure the cart keeps
    /// its lines.
    pub async fn place_order(
        &self,
        cart: &mut CartService<R>,
        request: &CheckoutRequest,
    ) -> Result<PlacedOrder, CheckoutError> {
        let account = cart
            .identity()
            .account()
            .cloned()
            .ok_or(CheckoutError::NotAuthenticated)?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        request
            .shipping
            .validate()
            .map_err(|e| CheckoutError::InvalidShipping(e.to_string()))?;
        request
            .payment
            .validate()
            .map_err(|e| CheckoutError::InvalidPayment(e.to_string()))?;

        self.profile(&account).await?;

        let draft = OrderDraft::from_cart(
            account.id,
            cart.lines(),
            &request.shipping,
            Some(request.idempotency_key),
        )
        .map_err(|_| CheckoutError::EmptyCart)?;
        debug_assert!(draft.is_balanced());

        let previous = bounded(
            self.timeout,
            self.repo
                .find_by_idempotency_key(account.id, request.idempotency_key),
        )
        .await
        .map_err(CheckoutError::OrderCreationFailed)?;
        if let Some(previous) = previous {
            return Err(CheckoutError::DuplicateSubmission(previous.id));
        }

        self.payments
            .charge(draft.order.total_cents, &request.payment)
            .await
            .map_err(|e| CheckoutError::PaymentDeclined(e.to_string()))?;

        let order_id = draft.order.id;
        let mut order = match bounded(self.timeout, self.repo.create(draft.order)).await {
            Ok(order) => order,
            Err(source @ CallError::Timeout(_)) => {
                // The insert may have landed after the deadline.
                self.compensate(order_id).await;
                return Err(CheckoutError::OrderCreationFailed(source));
            }
            Err(source) => return Err(CheckoutError::OrderCreationFailed(source)),
        };

        let lines = match bounded(self.timeout, self.repo.create_lines(draft.lines)).await {
            Ok(lines) => lines,
            Err(source) => {
                let compensated = self.compensate(order.id).await;
                return Err(CheckoutError::OrderItemsCreationFailed {
                    source,
                    compensated,
                });
            }
        };

        match bounded(self.timeout, self.repo.update_status(order.id, OrderStatus::Paid)).await {
            Ok(Some(paid)) => order = paid,
            Ok(None) => {
                tracing::warn!(order_id = %order.id, "order vanished before it could be marked paid")
            }
            Err(e) => {
                tracing::warn!(order_id = %order.id, error = %e, "failed to mark order paid")
            }
        }

        if let Err(e) = cart.clear().await {
            tracing::warn!(order_id = %order.id, error = %e, "order placed but cart not cleared");
        }

        tracing::info!(
            order_id = %order.id,
            account_id = %account.id,
            total_cents = order.total_cents,
            lines = lines.len(),
            "order placed"
        );
        Ok(PlacedOrder { order, lines })
    }

    pub async fn list_orders(&self, account: &Account) -> Result<Vec<Order>, CheckoutError> {
        bounded(self.timeout, self.repo.list_for_user(account.id))
            .await
            .map_err(CheckoutError::OrderLookupFailed)
    }

    /// An order with its lines; other accounts' orders read as missing.
    pub async fn order_details(
        &self,
        account: &Account,
        order_id: Uuid,
    ) -> Result<PlacedOrder, CheckoutError> {
        let order = bounded(self.timeout, self.repo.get(order_id))
            .await
            .map_err(CheckoutError::OrderLookupFailed)?
            .filter(|o| o.user_id == account.id)
            .ok_or(CheckoutError::OrderNotFound(order_id))?;
        let lines = bounded(self.timeout, self.repo.lines(order_id))
            .await
            .map_err(CheckoutError::OrderLookupFailed)?;
        Ok(PlacedOrder { order, lines })
    }

    /// Best effort; the caller reports the original failure either way.
    async fn compensate(&self, order_id: Uuid) -> bool {
        match bounded(self.timeout, self.repo.delete(order_id)).await {
            Ok(true) => {
                tracing::info!(%order_id, "rolled back partially written order");
                true
            }
            Ok(false) => {
                tracing::warn!(%order_id, "rollback found no order to delete");
                false
            }
            Err(e) => {
                tracing::error!(%order_id, error = %e, "failed to roll back order");
                false
            }
        }
    }
}
