///  To run :
///  cargo r --example client_example
use std::sync::Arc;
use std::time::Duration;

use grocer_client::{CheckoutRequest, GrocerClient};
use grocer_hex::application::cart_sessions::{GuestMergePolicy, DEFAULT_IDLE_TTL};
use grocer_hex::application::payment::SimulatedGateway;
use grocer_hex::inbound::http::{AppState, HttpServer, HttpServerConfig};
use grocer_repo::{build_guest_store, build_repo};
use grocer_types::domain::order::{PaymentDetails, ShippingDetails};
use tempfile::tempdir;
use uuid::Uuid;

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let port = find_free_port();
    let addr = format!("http://127.0.0.1:{port}/");

    // Use a temp file-backed SQLite DB so multiple connections see the same data.
    let tmp = tempdir()?;
    let db_url = format!("sqlite://{}", tmp.path().join("grocer.db").display());
    let guest_dir = tmp.path().join("guests");

    let repo = build_repo(Some(&db_url)).await?;
    let state = AppState::new(
        Arc::new(repo),
        build_guest_store(guest_dir.to_str()),
        Arc::new(SimulatedGateway::default()),
        Duration::from_secs(5),
        GuestMergePolicy::Merge,
        DEFAULT_IDLE_TTL,
    );
    let server = HttpServer::new(
        state,
        HttpServerConfig {
            port: port.to_string(),
        },
    )
    .await?;

    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Shop as a guest first.
    let session = Uuid::new_v4();
    let guest = GrocerClient::builder(&addr)?
        .with_guest_session(session)?
        .build()?;
    let bananas = guest.products(Some("bananas"), None).await?;
    println!("Found {} banana products", bananas.len());
    let cart = guest.add_line(&bananas[0].id, Some(3)).await?;
    println!("Guest cart: {} items, {} cents", cart.total_items, cart.total_cents);

    // Sign in; the guest cart moves over to the account.
    let account_id = Uuid::new_v4();
    let member = GrocerClient::builder(&addr)?
        .with_guest_session(session)?
        .with_member(account_id, "example@example.com")?
        .build()?;
    let cart = member.sign_in().await?;
    println!("Member cart after sign-in: {} lines", cart.lines.len());

    let placed = member
        .checkout(&CheckoutRequest {
            idempotency_key: Uuid::new_v4(),
            shipping: ShippingDetails {
                full_name: "Example Shopper".into(),
                email: "example@example.com".into(),
                address: "1 Demo Street".into(),
                phone: "555-0100".into(),
            },
            payment: PaymentDetails {
                card_number: "4242424242424242".into(),
                expiry: "12/30".into(),
                cvv: "123".into(),
            },
        })
        .await?;
    println!(
        "Placed order id={} status={:?} total={} cents",
        placed.order.id, placed.order.status, placed.order.total_cents
    );

    let history = member.orders().await?;
    println!("Order history holds {} order(s)", history.len());

    handle.abort();
    Ok(())
}
