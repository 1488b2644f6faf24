use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post, put},
    serve, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::application::cart_service::{CartDeps, CartService};
use crate::application::cart_sessions::{CartSessions, GuestMergePolicy};
use crate::application::checkout_flow::CheckoutFlow;
use crate::application::checkout_service::{CheckoutService, PlacedOrder};
use crate::application::payment::PaymentGateway;
use crate::catalog::Catalog;
use crate::errors::{AppError, CheckoutError};
use crate::inbound::http::identity::Shopper;
use grocer_types::domain::cart::CartLine;
use grocer_types::domain::order::{Order, PaymentDetails, ShippingDetails};
use grocer_types::domain::product::{Category, Product};
use grocer_types::domain::profile::{Profile, ProfileUpdate};
use grocer_types::ports::guest_cart_store::GuestCartStore;
use grocer_types::ports::Persistence;

const RELATED_LIMIT: usize = 4;

#[derive(Clone)]
pub struct HttpServerConfig {
    pub port: String,
}

/// Shared handler state: the catalog, live carts and the checkout service.
pub struct AppState<R: Persistence> {
    pub catalog: Arc<Catalog>,
    pub sessions: Arc<CartSessions<R>>,
    pub checkout: Arc<CheckoutService<R>>,
}

impl<R: Persistence> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog.clone(),
            sessions: self.sessions.clone(),
            checkout: self.checkout.clone(),
        }
    }
}

impl<R: Persistence> AppState<R> {
    pub fn new(
        repo: Arc<R>,
        guest_store: Arc<dyn GuestCartStore>,
        payments: Arc<dyn PaymentGateway>,
        timeout: Duration,
        merge_policy: GuestMergePolicy,
        cart_idle_ttl: Duration,
    ) -> Self {
        let catalog = Arc::new(Catalog::grocery());
        let deps = CartDeps {
            repo: repo.clone(),
            guest_store,
            catalog: catalog.clone(),
            timeout,
        };
        Self {
            catalog,
            sessions: Arc::new(CartSessions::new(deps, merge_policy).with_idle_ttl(cart_idle_ttl)),
            checkout: Arc::new(CheckoutService::new(repo, payments, timeout)),
        }
    }
}

pub struct HttpServer<R: Persistence> {
    pub state: AppState<R>,
    pub config: HttpServerConfig,
}

#[derive(Deserialize)]
pub struct ProductQuery {
    pub q: Option<String>,
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct AddLineRequest {
    pub product_id: String,
    pub quantity: Option<i64>,
}

#[derive(Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct CheckoutBody {
    pub idempotency_key: Uuid,
    /// Blank or missing fields are taken from the member's profile.
    #[serde(default)]
    pub shipping: ShippingDetails,
    pub payment: PaymentDetails,
}

#[derive(Serialize)]
struct ProductDetails {
    product: Product,
    related: Vec<Product>,
}

#[derive(Serialize)]
struct CartView {
    lines: Vec<CartLine>,
    total_cents: i64,
    total_items: u32,
}

impl<R: Persistence> From<&CartService<R>> for CartView {
    fn from(cart: &CartService<R>) -> Self {
        Self {
            lines: cart.lines().to_vec(),
            total_cents: cart.total_cents(),
            total_items: cart.total_items(),
        }
    }
}

impl<R> HttpServer<R>
where
    R: Persistence,
{
    pub async fn new(state: AppState<R>, config: HttpServerConfig) -> anyhow::Result<Self> {
        Ok(Self { state, config })
    }

    pub fn router(&self) -> Router {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                let request_id = Uuid::new_v4();
                tracing::info_span!(
                    "http_request",
                    %request_id,
                    method = %request.method(),
                    uri
                )
            })
            .on_request(
                |request: &axum::extract::Request<_>, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        method = %request.method(),
                        uri = %request.uri(),
                        "request"
                    );
                },
            )
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        status = %response.status(),
                        latency_ms = %latency.as_millis(),
                        "response"
                    );
                },
            );

        Router::new()
            .route("/health", get(health))
            .route("/categories", get(list_categories::<R>))
            .route("/products", get(list_products::<R>))
            .route("/products/{id}", get(get_product::<R>))
            .route("/cart", get(get_cart::<R>))
            .route("/cart", delete(clear_cart::<R>))
            .route("/cart/lines", post(add_line::<R>))
            .route("/cart/lines/{id}", patch(set_quantity::<R>))
            .route("/cart/lines/{id}", delete(remove_line::<R>))
            .route("/cart/sign-in", post(sign_in::<R>))
            .route("/cart/sign-out", post(sign_out::<R>))
            .route("/profile", get(get_profile::<R>))
            .route("/profile", put(update_profile::<R>))
            .route("/checkout", post(checkout::<R>))
            .route("/orders", get(list_orders::<R>))
            .route("/orders/{id}", get(get_order::<R>))
            .layer(trace_layer)
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(self.state.clone())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let app = self.router();
        let addr: SocketAddr = format!("0.0.0.0:{}", self.config.port).parse()?;
        tracing::info!("starting server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        serve(listener, app.into_make_service()).await?;
        Ok(())
    }
}

async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn list_categories<R: Persistence>(
    State(state): State<AppState<R>>,
) -> Json<Vec<Category>> {
    Json(state.catalog.categories().to_vec())
}

async fn list_products<R: Persistence>(
    State(state): State<AppState<R>>,
    Query(query): Query<ProductQuery>,
) -> Json<Vec<Product>> {
    let catalog = &state.catalog;
    let q = query.q.as_deref().filter(|q| !q.trim().is_empty());
    let slug = query.category.as_deref().filter(|c| !c.is_empty());
    let found: Vec<&Product> = match (q, slug) {
        (Some(q), Some(slug)) => {
            let within = catalog.by_category(slug);
            catalog
                .search(q)
                .into_iter()
                .filter(|p| within.iter().any(|w| w.id == p.id))
                .collect()
        }
        (Some(q), None) => catalog.search(q),
        (None, Some(slug)) => catalog.by_category(slug),
        (None, None) => catalog.all().iter().collect(),
    };
    Json(found.into_iter().cloned().collect())
}

async fn get_product<R: Persistence>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
) -> Result<Json<ProductDetails>, AppError> {
    let product = state
        .catalog
        .get(&id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("unknown product {id}")))?;
    let related = state
        .catalog
        .related(&id, RELATED_LIMIT)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(ProductDetails { product, related }))
}

async fn get_cart<R: Persistence>(
    State(state): State<AppState<R>>,
    shopper: Shopper,
) -> Result<Json<CartView>, AppError> {
    let cart = state.sessions.cart(&shopper.identity()?).await?;
    let cart = cart.lock().await;
    Ok(Json(CartView::from(&*cart)))
}

async fn add_line<R: Persistence>(
    State(state): State<AppState<R>>,
    shopper: Shopper,
    Json(payload): Json<AddLineRequest>,
) -> Result<(StatusCode, Json<CartView>), AppError> {
    let cart = state.sessions.cart(&shopper.identity()?).await?;
    let mut cart = cart.lock().await;
    cart.add_product(&payload.product_id, payload.quantity.unwrap_or(1))
        .await?;
    Ok((StatusCode::CREATED, Json(CartView::from(&*cart))))
}

async fn set_quantity<R: Persistence>(
    State(state): State<AppState<R>>,
    shopper: Shopper,
    Path(id): Path<String>,
    Json(payload): Json<SetQuantityRequest>,
) -> Result<Json<CartView>, AppError> {
    let line_id = parse_id(&id)?;
    let cart = state.sessions.cart(&shopper.identity()?).await?;
    let mut cart = cart.lock().await;
    cart.set_quantity(line_id, payload.quantity).await?;
    Ok(Json(CartView::from(&*cart)))
}

async fn remove_line<R: Persistence>(
    State(state): State<AppState<R>>,
    shopper: Shopper,
    Path(id): Path<String>,
) -> Result<Json<CartView>, AppError> {
    let line_id = parse_id(&id)?;
    let cart = state.sessions.cart(&shopper.identity()?).await?;
    let mut cart = cart.lock().await;
    cart.remove_line(line_id).await?;
    Ok(Json(CartView::from(&*cart)))
}

async fn clear_cart<R: Persistence>(
    State(state): State<AppState<R>>,
    shopper: Shopper,
) -> Result<Json<CartView>, AppError> {
    let cart = state.sessions.cart(&shopper.identity()?).await?;
    let mut cart = cart.lock().await;
    cart.clear().await?;
    Ok(Json(CartView::from(&*cart)))
}

async fn sign_in<R: Persistence>(
    State(state): State<AppState<R>>,
    shopper: Shopper,
) -> Result<Json<CartView>, AppError> {
    let account = shopper.account()?.clone();
    let session = shopper
        .guest_session
        .ok_or_else(|| AppError::BadRequest("sign-in needs the guest session header".into()))?;
    let cart = state.sessions.sign_in(session, account).await?;
    let cart = cart.lock().await;
    Ok(Json(CartView::from(&*cart)))
}

async fn sign_out<R: Persistence>(
    State(state): State<AppState<R>>,
    shopper: Shopper,
) -> Result<StatusCode, AppError> {
    let account = shopper.account()?;
    state.sessions.sign_out(account.id);
    Ok(StatusCode::NO_CONTENT)
}

async fn get_profile<R: Persistence>(
    State(state): State<AppState<R>>,
    shopper: Shopper,
) -> Result<Json<Profile>, AppError> {
    let profile = state.checkout.profile(shopper.account()?).await?;
    Ok(Json(profile))
}

async fn update_profile<R: Persistence>(
    State(state): State<AppState<R>>,
    shopper: Shopper,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<Profile>, AppError> {
    let profile = state
        .checkout
        .update_profile(shopper.account()?, &payload)
        .await?;
    Ok(Json(profile))
}

async fn checkout<R: Persistence>(
    State(state): State<AppState<R>>,
    shopper: Shopper,
    Json(payload): Json<CheckoutBody>,
) -> Result<(StatusCode, Json<PlacedOrder>), AppError> {
    let identity = shopper.identity()?;
    let Some(account) = identity.account() else {
        return Err(CheckoutError::NotAuthenticated.into());
    };
    let profile = state.checkout.profile(account).await?;

    let mut flow = CheckoutFlow::with_key(payload.idempotency_key);
    flow.begin(Some(&profile))?;
    let shipping = payload.shipping.or_prefill(flow.shipping());
    flow.submit_shipping(shipping)?;
    flow.submit_payment(payload.payment)?;

    let cart = state.sessions.cart(&identity).await?;
    let mut cart = cart.lock().await;
    let placed = flow.submit(&state.checkout, &mut cart).await?;
    Ok((StatusCode::CREATED, Json(placed)))
}

async fn list_orders<R: Persistence>(
    State(state): State<AppState<R>>,
    shopper: Shopper,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = state.checkout.list_orders(shopper.account()?).await?;
    Ok(Json(orders))
}

async fn get_order<R: Persistence>(
    State(state): State<AppState<R>>,
    shopper: Shopper,
    Path(id): Path<String>,
) -> Result<Json<PlacedOrder>, AppError> {
    let order_id = parse_id(&id)?;
    let placed = state
        .checkout
        .order_details(shopper.account()?, order_id)
        .await?;
    Ok(Json(placed))
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}
