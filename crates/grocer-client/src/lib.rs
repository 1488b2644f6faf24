use std::time::Duration;

use anyhow::Context;
use grocer_types::domain::cart::CartLine;
use grocer_types::domain::order::{Order, OrderLine, PaymentDetails, ShippingDetails};
use grocer_types::domain::product::{Category, Product};
use grocer_types::domain::profile::{Profile, ProfileUpdate};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ACCOUNT_ID_HEADER: &str = "x-account-id";
pub const ACCOUNT_EMAIL_HEADER: &str = "x-account-email";
pub const GUEST_SESSION_HEADER: &str = "x-guest-session";

#[derive(Clone)]
pub struct GrocerClientBuilder {
    base: Url,
    headers: HeaderMap,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
}

/// Storefront API client. Identity headers are fixed at build time, so one
/// client speaks for one shopper.
#[derive(Clone)]
pub struct GrocerClient {
    base: Url,
    client: reqwest::Client,
}

impl GrocerClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::builder(base_url)?.build()
    }

    pub fn builder(base_url: &str) -> anyhow::Result<GrocerClientBuilder> {
        let base = Url::parse(base_url).context("invalid base url")?;
        Ok(GrocerClientBuilder {
            base,
            headers: HeaderMap::new(),
            timeout: None,
            client: None,
        })
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base.join(path).context("failed to join url")
    }

    pub async fn health(&self) -> anyhow::Result<()> {
        self.client
            .get(self.url("health")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn categories(&self) -> anyhow::Result<Vec<Category>> {
        let res = self
            .client
            .get(self.url("categories")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    /// Catalog listing, narrowed by a search query and/or a category slug.
    pub async fn products(
        &self,
        query: Option<&str>,
        category: Option<&str>,
    ) -> anyhow::Result<Vec<Product>> {
        let mut params = Vec::new();
        if let Some(q) = query {
            params.push(("q", q));
        }
        if let Some(c) = category {
            params.push(("category", c));
        }
        let res = self
            .client
            .get(self.url("products")?)
            .query(&params)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn product(&self, id: &str) -> anyhow::Result<ProductDetails> {
        let res = self
            .client
            .get(self.url(&format!("products/{id}"))?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn cart(&self) -> anyhow::Result<Cart> {
        let res = self
            .client
            .get(self.url("cart")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn add_line(&self, product_id: &str, quantity: Option<i64>) -> anyhow::Result<Cart> {
        let res = self
            .client
            .post(self.url("cart/lines")?)
            .json(&AddLineRequest {
                product_id: product_id.to_string(),
                quantity,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn set_quantity(&self, line_id: Uuid, quantity: i64) -> anyhow::Result<Cart> {
        let res = self
            .client
            .patch(self.url(&format!("cart/lines/{line_id}"))?)
            .json(&SetQuantityRequest { quantity })
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn remove_line(&self, line_id: Uuid) -> anyhow::Result<Cart> {
        let res = self
            .client
            .delete(self.url(&format!("cart/lines/{line_id}"))?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn clear_cart(&self) -> anyhow::Result<Cart> {
        let res = self
            .client
            .delete(self.url("cart")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    /// Hands the guest cart over to the member; needs both header sets.
    pub async fn sign_in(&self) -> anyhow::Result<Cart> {
        let res = self
            .client
            .post(self.url("cart/sign-in")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    /// Drops the member's live cart on the server; the stored rows stay.
    pub async fn sign_out(&self) -> anyhow::Result<()> {
        self.client
            .post(self.url("cart/sign-out")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn profile(&self) -> anyhow::Result<Profile> {
        let res = self
            .client
            .get(self.url("profile")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> anyhow::Result<Profile> {
        let res = self
            .client
            .put(self.url("profile")?)
            .json(update)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn checkout(&self, req: &CheckoutRequest) -> anyhow::Result<PlacedOrder> {
        tracing::debug!(idempotency_key = %req.idempotency_key, "submitting checkout");
        let res = self
            .client
            .post(self.url("checkout")?)
            .json(req)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn orders(&self) -> anyhow::Result<Vec<Order>> {
        let res = self
            .client
            .get(self.url("orders")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn order(&self, id: Uuid) -> anyhow::Result<PlacedOrder> {
        let res = self
            .client
            .get(self.url(&format!("orders/{id}"))?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }
}

impl GrocerClientBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(
        mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        let header_name =
            HeaderName::from_bytes(key.as_ref().as_bytes()).context("invalid header name")?;
        let header_value = HeaderValue::from_str(value.as_ref()).context("invalid header value")?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn with_member(self, account_id: Uuid, email: &str) -> anyhow::Result<Self> {
        self.with_header(ACCOUNT_ID_HEADER, account_id.to_string())?
            .with_header(ACCOUNT_EMAIL_HEADER, email)
    }

    pub fn with_guest_session(self, session: Uuid) -> anyhow::Result<Self> {
        self.with_header(GUEST_SESSION_HEADER, session.to_string())
    }

    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<GrocerClient> {
        if let Some(client) = self.client {
            return Ok(GrocerClient {
                base: self.base,
                client,
            });
        }

        let mut builder = reqwest::Client::builder();
        if !self.headers.is_empty() {
            builder = builder.default_headers(self.headers);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(GrocerClient {
            base: self.base,
            client,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    pub lines: Vec<CartLine>,
    pub total_cents: i64,
    pub total_items: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProductDetails {
    pub product: Product,
    pub related: Vec<Product>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CheckoutRequest {
    pub idempotency_key: Uuid,
    pub shipping: ShippingDetails,
    pub payment: PaymentDetails,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct AddLineRequest {
    product_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    quantity: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct SetQuantityRequest {
    quantity: i64,
}
