use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::cart::CartLine;
use crate::domain::profile::Profile;
use crate::domain::quantity::Quantity;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Paid,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Paid => "paid",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "processing" => Some(OrderStatus::Processing),
            "paid" => Some(OrderStatus::Paid),
            "completed" => Some(OrderStatus::Completed),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// `order_items` row. `price_cents` is the unit price at purchase time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderLine {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: String,
    pub quantity: Quantity,
    pub price_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl OrderLine {
    pub fn line_total_cents(&self) -> i64 {
        self.price_cents * i64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub contact_phone: String,
    #[serde(default)]
    pub idempotency_key: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn update_status(&mut self, status: OrderStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

/// An order and its lines built from a cart snapshot, not yet persisted.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

impl OrderDraft {
    /// Snapshots `cart` into a pending order. Each line copies the product's
    /// current price so later catalog changes leave the order untouched.
    pub fn from_cart(
        user_id: Uuid,
        cart: &[CartLine],
        shipping: &ShippingDetails,
        idempotency_key: Option<Uuid>,
    ) -> anyhow::Result<Self> {
        if cart.is_empty() {
            anyhow::bail!("cart empty");
        }
        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let lines: Vec<OrderLine> = cart
            .iter()
            .map(|line| OrderLine {
                id: Uuid::new_v4(),
                order_id,
                product_id: line.product.id.clone(),
                quantity: line.quantity,
                price_cents: line.product.price_cents,
                created_at: now,
            })
            .collect();
        let total = lines.iter().map(OrderLine::line_total_cents).sum();
        Ok(Self {
            order: Order {
                id: order_id,
                user_id,
                total_cents: total,
                status: OrderStatus::Pending,
                shipping_address: shipping.address.clone(),
                contact_phone: shipping.phone.clone(),
                idempotency_key,
                created_at: now,
                updated_at: now,
            },
            lines,
        })
    }

    pub fn is_balanced(&self) -> bool {
        self.lines.iter().map(OrderLine::line_total_cents).sum::<i64>() == self.order.total_cents
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShippingDetails {
    pub full_name: String,
    pub email: String,
    pub address: String,
    pub phone: String,
}

impl ShippingDetails {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            full_name: profile.full_name.clone(),
            email: profile.email.clone(),
            address: profile.address.clone(),
            phone: profile.phone.clone(),
        }
    }

    /// Blank fields take their value from `prefill`.
    pub fn or_prefill(self, prefill: &ShippingDetails) -> Self {
        let pick = |own: String, other: &String| {
            if own.trim().is_empty() {
                other.clone()
            } else {
                own
            }
        };
        Self {
            full_name: pick(self.full_name, &prefill.full_name),
            email: pick(self.email, &prefill.email),
            address: pick(self.address, &prefill.address),
            phone: pick(self.phone, &prefill.phone),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let fields = [
            ("full_name", &self.full_name),
            ("email", &self.email),
            ("address", &self.address),
            ("phone", &self.phone),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                anyhow::bail!("{name} empty");
            }
        }
        if !self.email.contains('@') {
            anyhow::bail!("invalid email");
        }
        Ok(())
    }
}

#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentDetails {
    pub card_number: String,
    pub expiry: String,
    pub cvv: String,
}

impl PaymentDetails {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.card_number.trim().is_empty() {
            anyhow::bail!("card_number empty");
        }
        if self.expiry.trim().is_empty() {
            anyhow::bail!("expiry empty");
        }
        if self.cvv.trim().is_empty() {
            anyhow::bail!("cvv empty");
        }
        Ok(())
    }

    pub fn last_four(&self) -> &str {
        let digits = self.card_number.trim();
        let start = digits
            .char_indices()
            .rev()
            .nth(3)
            .map(|(i, _)| i)
            .unwrap_or(0);
        &digits[start..]
    }
}

// Card data never reaches logs.
impl std::fmt::Debug for PaymentDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentDetails")
            .field("card_number", &format_args!("****{}", self.last_four()))
            .field("expiry", &self.expiry)
            .field("cvv", &"***")
            .finish()
    }
}
