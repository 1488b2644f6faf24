//! The storefront's two-step checkout as a state machine:
//! `Idle -> ValidatingShipping -> ValidatingPayment -> Submitting -> Succeeded | Failed`.
//!
//! Entered details survive a failure, and `Failed` can go back to
//! `Submitting` with the same idempotency key.

use grocer_types::domain::order::{PaymentDetails, ShippingDetails};
use grocer_types::domain::profile::Profile;
use grocer_types::ports::Persistence;
use serde::Serialize;
use uuid::Uuid;

use crate::application::cart_service::CartService;
use crate::application::checkout_service::{CheckoutRequest, CheckoutService, PlacedOrder};
use crate::errors::CheckoutError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutState {
    Idle,
    ValidatingShipping,
    ValidatingPayment,
    Submitting,
    Succeeded { order_id: Uuid },
    Failed { reason: String },
}

impl CheckoutState {
    fn name(&self) -> &'static str {
        match self {
            CheckoutState::Idle => "idle",
            CheckoutState::ValidatingShipping => "validating shipping",
            CheckoutState::ValidatingPayment => "validating payment",
            CheckoutState::Submitting => "submitting",
            CheckoutState::Succeeded { .. } => "succeeded",
            CheckoutState::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutFlow {
    state: CheckoutState,
    idempotency_key: Uuid,
    shipping: ShippingDetails,
    payment: PaymentDetails,
}

impl Default for CheckoutFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutFlow {
    pub fn new() -> Self {
        Self::with_key(Uuid::new_v4())
    }

    pub fn with_key(idempotency_key: Uuid) -> Self {
        Self {
            state: CheckoutState::Idle,
            idempotency_key,
            shipping: ShippingDetails::default(),
            payment: PaymentDetails::default(),
        }
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    pub fn idempotency_key(&self) -> Uuid {
        self.idempotency_key
    }

    pub fn shipping(&self) -> &ShippingDetails {
        &self.shipping
    }

    pub fn payment(&self) -> &PaymentDetails {
        &self.payment
    }

    /// Starts collecting shipping details, prefilled from `profile` if given.
    pub fn begin(&mut self, profile: Option<&Profile>) -> Result<(), CheckoutError> {
        self.expect(&[CheckoutState::Idle], "begin checkout")?;
        if let Some(profile) = profile {
            self.shipping = ShippingDetails::from_profile(profile);
        }
        self.state = CheckoutState::ValidatingShipping;
        Ok(())
    }

    /// Stores and validates shipping details. Invalid details keep the flow
    /// on the shipping step.
    pub fn submit_shipping(&mut self, shipping: ShippingDetails) -> Result<(), CheckoutError> {
        self.expect(&[CheckoutState::ValidatingShipping], "submit shipping")?;
        self.shipping = shipping;
        self.shipping
            .validate()
            .map_err(|e| CheckoutError::InvalidShipping(e.to_string()))?;
        self.state = CheckoutState::ValidatingPayment;
        Ok(())
    }

    /// Stores and validates payment details and moves to `Submitting`.
    pub fn submit_payment(&mut self, payment: PaymentDetails) -> Result<(), CheckoutError> {
        self.expect(&[CheckoutState::ValidatingPayment], "submit payment")?;
        self.payment = payment;
        self.payment
            .validate()
            .map_err(|e| CheckoutError::InvalidPayment(e.to_string()))?;
        self.state = CheckoutState::Submitting;
        Ok(())
    }

    /// Goes back to `Submitting` after a failure, keeping every detail.
    pub fn retry(&mut self) -> Result<(), CheckoutError> {
        if !matches!(self.state, CheckoutState::Failed { .. }) {
            return Err(self.out_of_order("retry"));
        }
        self.state = CheckoutState::Submitting;
        Ok(())
    }

    pub fn request(&self) -> CheckoutRequest {
        CheckoutRequest {
            idempotency_key: self.idempotency_key,
            shipping: self.shipping.clone(),
            payment: self.payment.clone(),
        }
    }

    /// Runs the checkout transaction and records its outcome.
    pub async fn submit<R: Persistence>(
        &mut self,
        checkout: &CheckoutService<R>,
        cart: &mut CartService<R>,
    ) -> Result<PlacedOrder, CheckoutError> {
        self.expect(&[CheckoutState::Submitting], "submit order")?;
        let result = checkout.place_order(cart, &self.request()).await;
        self.state = match &result {
            Ok(placed) => CheckoutState::Succeeded {
                order_id: placed.order.id,
            },
            Err(e) => CheckoutState::Failed {
                reason: e.to_string(),
            },
        };
        result
    }

    fn expect(&self, allowed: &[CheckoutState], action: &'static str) -> Result<(), CheckoutError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(self.out_of_order(action))
        }
    }

    fn out_of_order(&self, action: &'static str) -> CheckoutError {
        CheckoutError::OutOfOrder {
            action,
            state: self.state.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn shipping() -> ShippingDetails {
        ShippingDetails {
            full_name: "Alice".into(),
            email: "alice@example.com".into(),
            address: "1 Main St".into(),
            phone: "555-0100".into(),
        }
    }

    fn payment() -> PaymentDetails {
        PaymentDetails {
            card_number: "4242424242424242".into(),
            expiry: "12/30".into(),
            cvv: "123".into(),
        }
    }

    #[test]
    fn walks_through_steps_in_order() {
        let mut flow = CheckoutFlow::new();
        assert_eq!(flow.state(), &CheckoutState::Idle);
        assert!(matches!(
            flow.submit_payment(payment()),
            Err(CheckoutError::OutOfOrder { .. })
        ));

        flow.begin(None).unwrap();
        assert_eq!(flow.state(), &CheckoutState::ValidatingShipping);
        flow.submit_shipping(shipping()).unwrap();
        assert_eq!(flow.state(), &CheckoutState::ValidatingPayment);
        flow.submit_payment(payment()).unwrap();
        assert_eq!(flow.state(), &CheckoutState::Submitting);

        let request = flow.request();
        assert_eq!(request.idempotency_key, flow.idempotency_key());
        assert_eq!(request.shipping, shipping());
    }

    #[test]
    fn invalid_shipping_stays_on_step_and_keeps_input() {
        let mut flow = CheckoutFlow::new();
        flow.begin(None).unwrap();
        let mut partial = shipping();
        partial.phone.clear();
        assert!(matches!(
            flow.submit_shipping(partial.clone()),
            Err(CheckoutError::InvalidShipping(_))
        ));
        assert_eq!(flow.state(), &CheckoutState::ValidatingShipping);
        assert_eq!(flow.shipping(), &partial);
    }

    #[test]
    fn begin_prefills_from_profile() {
        let now = Utc::now();
        let profile = Profile {
            id: Uuid::new_v4(),
            email: "p@example.com".into(),
            full_name: "Pat".into(),
            phone: "555".into(),
            address: "9 Oak".into(),
            created_at: now,
            updated_at: now,
        };
        let mut flow = CheckoutFlow::new();
        flow.begin(Some(&profile)).unwrap();
        assert_eq!(flow.shipping().full_name, "Pat");
        assert_eq!(flow.shipping().address, "9 Oak");
    }

    #[test]
    fn retry_only_from_failed() {
        let mut flow = CheckoutFlow::new();
        assert!(flow.retry().is_err());
        flow.state = CheckoutState::Failed {
            reason: "boom".into(),
        };
        flow.retry().unwrap();
        assert_eq!(flow.state(), &CheckoutState::Submitting);
    }
}
