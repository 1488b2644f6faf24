mod support;

use std::sync::Arc;

use grocer_hex::application::checkout_flow::{CheckoutFlow, CheckoutState};
use grocer_hex::application::deadline::CallError;
use grocer_hex::application::payment::SimulatedGateway;
use grocer_hex::errors::CheckoutError;
use grocer_types::domain::identity::Identity;
use grocer_types::domain::order::{OrderStatus, ShippingDetails};
use grocer_types::domain::profile::ProfileUpdate;
use grocer_types::ports::cart_repository::CartRepository;
use grocer_types::ports::order_repository::OrderRepository;
use grocer_types::ports::profile_repository::ProfileRepository;
use support::{corner_shop, member, request, FlakyRepo, Harness};
use uuid::Uuid;

// End-to-end checkout against the in-memory adapter.
#[tokio::test]
async fn checkout_places_paid_order_and_empties_cart() {
    let h = Harness::with_catalog(corner_shop());
    let account = member();
    let mut cart = h.cart(Identity::Member(account.clone())).await;
    cart.add_product("apple", 2).await.unwrap();
    cart.add_product("bread", 1).await.unwrap();

    let req = request();
    let placed = h.checkout.place_order(&mut cart, &req).await.unwrap();

    assert_eq!(placed.order.user_id, account.id);
    assert_eq!(placed.order.status, OrderStatus::Paid);
    assert_eq!(placed.order.total_cents, 1150);
    assert_eq!(placed.order.idempotency_key, Some(req.idempotency_key));
    assert_eq!(placed.order.shipping_address, "12 Market Row");
    assert_eq!(
        placed.lines.iter().map(|l| l.line_total_cents()).sum::<i64>(),
        placed.order.total_cents
    );
    assert!(placed.lines.iter().all(|l| l.order_id == placed.order.id));

    assert!(cart.is_empty());
    assert!(h.repo.inner.list_cart_rows(account.id).await.unwrap().is_empty());
    assert!(h.repo.inner.get_profile(account.id).await.unwrap().is_some());

    let details = h
        .checkout
        .order_details(&account, placed.order.id)
        .await
        .unwrap();
    assert_eq!(details, placed);
    assert_eq!(h.checkout.list_orders(&account).await.unwrap().len(), 1);
}

#[tokio::test]
async fn order_prices_are_snapshots() {
    let h = Harness::with_catalog(corner_shop());
    let account = member();
    let mut cart = h.cart(Identity::Member(account.clone())).await;
    cart.add_product("bread", 3).await.unwrap();

    let placed = h.checkout.place_order(&mut cart, &request()).await.unwrap();
    assert_eq!(placed.lines.len(), 1);
    assert_eq!(placed.lines[0].product_id, "bread");
    assert_eq!(placed.lines[0].price_cents, 550);
    assert_eq!(placed.lines[0].quantity.get(), 3);
}

#[tokio::test]
async fn guest_and_empty_checkouts_fail_before_any_remote_call() {
    let h = Harness::with_catalog(corner_shop());

    let mut guest = h.cart(Identity::guest(Uuid::new_v4())).await;
    guest.add_product("apple", 1).await.unwrap();
    assert_eq!(
        h.checkout.place_order(&mut guest, &request()).await,
        Err(CheckoutError::NotAuthenticated)
    );
    assert_eq!(guest.lines().len(), 1);

    let mut empty = h.cart(Identity::Member(member())).await;
    let before = h.repo.calls();
    assert_eq!(
        h.checkout.place_order(&mut empty, &request()).await,
        Err(CheckoutError::EmptyCart)
    );
    assert_eq!(h.repo.calls(), before);
}

#[tokio::test]
async fn invalid_details_are_rejected_before_any_remote_call() {
    let h = Harness::with_catalog(corner_shop());
    let mut cart = h.cart(Identity::Member(member())).await;
    cart.add_product("apple", 1).await.unwrap();
    let before = h.repo.calls();

    let mut req = request();
    req.shipping.email = "nobody".into();
    assert!(matches!(
        h.checkout.place_order(&mut cart, &req).await,
        Err(CheckoutError::InvalidShipping(_))
    ));

    let mut req = request();
    req.payment.cvv = " ".into();
    assert!(matches!(
        h.checkout.place_order(&mut cart, &req).await,
        Err(CheckoutError::InvalidPayment(_))
    ));
    assert_eq!(h.repo.calls(), before);
}

#[tokio::test]
async fn failed_order_lines_roll_back_the_order_and_keep_the_cart() {
    let h = Harness::with_catalog(corner_shop());
    let account = member();
    let mut cart = h.cart(Identity::Member(account.clone())).await;
    cart.add_product("apple", 2).await.unwrap();
    let before = cart.lines().to_vec();

    FlakyRepo::set(&h.repo.fail_create_lines, true);
    let err = h
        .checkout
        .place_order(&mut cart, &request())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::OrderItemsCreationFailed {
            source: CallError::Repo(_),
            compensated: true,
        }
    ));
    assert!(h.repo.inner.list_for_user(account.id).await.unwrap().is_empty());
    assert!(h.repo.inner.order_lines.is_empty());
    assert_eq!(cart.lines(), before.as_slice());
}

#[tokio::test]
async fn failed_rollback_is_reported() {
    let h = Harness::with_catalog(corner_shop());
    let account = member();
    let mut cart = h.cart(Identity::Member(account.clone())).await;
    cart.add_product("apple", 1).await.unwrap();

    FlakyRepo::set(&h.repo.fail_create_lines, true);
    FlakyRepo::set(&h.repo.fail_delete, true);
    let err = h
        .checkout
        .place_order(&mut cart, &request())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::OrderItemsCreationFailed {
            compensated: false,
            ..
        }
    ));
    let orphans = h.repo.inner.list_for_user(account.id).await.unwrap();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].status, OrderStatus::Pending);
    assert!(!cart.is_empty());
}

#[tokio::test]
async fn same_idempotency_key_places_one_order() {
    let h = Harness::with_catalog(corner_shop());
    let account = member();
    let mut cart = h.cart(Identity::Member(account.clone())).await;
    let req = request();

    cart.add_product("apple", 1).await.unwrap();
    let first = h.checkout.place_order(&mut cart, &req).await.unwrap();

    cart.add_product("apple", 1).await.unwrap();
    assert_eq!(
        h.checkout.place_order(&mut cart, &req).await,
        Err(CheckoutError::DuplicateSubmission(first.order.id))
    );
    assert_eq!(h.repo.inner.list_for_user(account.id).await.unwrap().len(), 1);
    assert_eq!(cart.lines().len(), 1);
}

#[tokio::test]
async fn declined_payment_creates_nothing() {
    let h = Harness::with_gateway(Arc::new(SimulatedGateway::declining()));
    let account = member();
    let mut cart = h.cart(Identity::Member(account.clone())).await;
    cart.add_product("1", 2).await.unwrap();

    let err = h
        .checkout
        .place_order(&mut cart, &request())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::PaymentDeclined(ref m) if m.contains("4242")));
    assert!(h.repo.inner.list_for_user(account.id).await.unwrap().is_empty());
    assert_eq!(cart.lines().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn hanging_store_surfaces_as_timeout() {
    let h = Harness::with_catalog(corner_shop());
    let mut cart = h.cart(Identity::Member(member())).await;
    cart.add_product("apple", 1).await.unwrap();

    FlakyRepo::set(&h.repo.hang, true);
    let err = h
        .checkout
        .place_order(&mut cart, &request())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::ProfileLoadFailed(CallError::Timeout(_))));
    assert!(err.is_timeout());
}

#[tokio::test]
async fn other_accounts_orders_read_as_missing() {
    let h = Harness::with_catalog(corner_shop());
    let owner = member();
    let mut cart = h.cart(Identity::Member(owner.clone())).await;
    cart.add_product("bread", 1).await.unwrap();
    let placed = h.checkout.place_order(&mut cart, &request()).await.unwrap();

    let stranger = member();
    assert_eq!(
        h.checkout.order_details(&stranger, placed.order.id).await,
        Err(CheckoutError::OrderNotFound(placed.order.id))
    );
    assert!(h.checkout.list_orders(&stranger).await.unwrap().is_empty());
}

#[tokio::test]
async fn profile_is_provisioned_once() {
    let h = Harness::new();
    let account = member();

    let first = h.checkout.profile(&account).await.unwrap();
    assert_eq!(first.id, account.id);
    assert_eq!(first.email, account.email);
    assert!(first.full_name.is_empty());

    let second = h.checkout.profile(&account).await.unwrap();
    assert_eq!(second, first);
}

#[tokio::test]
async fn flow_retries_with_the_same_key_after_a_failure() {
    let h = Harness::with_catalog(corner_shop());
    let account = member();
    let mut cart = h.cart(Identity::Member(account.clone())).await;
    cart.add_product("apple", 2).await.unwrap();

    let profile = h.checkout.profile(&account).await.unwrap();
    let mut flow = CheckoutFlow::new();
    flow.begin(Some(&profile)).unwrap();
    assert_eq!(flow.shipping(), &ShippingDetails::from_profile(&profile));

    let req = request();
    flow.submit_shipping(req.shipping.clone()).unwrap();
    flow.submit_payment(req.payment.clone()).unwrap();

    FlakyRepo::set(&h.repo.fail_create_lines, true);
    assert!(flow.submit(&h.checkout, &mut cart).await.is_err());
    assert!(matches!(flow.state(), CheckoutState::Failed { .. }));
    assert_eq!(flow.shipping(), &req.shipping);

    FlakyRepo::set(&h.repo.fail_create_lines, false);
    flow.retry().unwrap();
    let placed = flow.submit(&h.checkout, &mut cart).await.unwrap();

    assert_eq!(
        flow.state(),
        &CheckoutState::Succeeded {
            order_id: placed.order.id
        }
    );
    assert_eq!(placed.order.idempotency_key, Some(flow.idempotency_key()));
    assert!(cart.is_empty());
    assert!(flow.submit(&h.checkout, &mut cart).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn order_insert_that_times_out_is_rolled_back_and_can_be_retried() {
    let h = Harness::with_catalog(corner_shop());
    let account = member();
    let mut cart = h.cart(Identity::Member(account.clone())).await;
    cart.add_product("apple", 2).await.unwrap();
    let req = request();

    FlakyRepo::set(&h.repo.hang_after_create, true);
    let err = h.checkout.place_order(&mut cart, &req).await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::OrderCreationFailed(CallError::Timeout(_))
    ));
    assert!(h.repo.inner.list_for_user(account.id).await.unwrap().is_empty());
    assert_eq!(cart.lines().len(), 1);

    FlakyRepo::set(&h.repo.hang_after_create, false);
    let placed = h.checkout.place_order(&mut cart, &req).await.unwrap();
    assert_eq!(placed.order.total_cents, 600);
    assert_eq!(placed.lines.len(), 1);
    assert!(cart.is_empty());
}

#[tokio::test]
async fn profile_edits_are_trimmed_and_need_a_name() {
    let h = Harness::new();
    let account = member();

    let before = h.repo.calls();
    let err = h
        .checkout
        .update_profile(
            &account,
            &ProfileUpdate {
                full_name: "  ".into(),
                phone: "555".into(),
                address: "somewhere".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::InvalidProfile(_)));
    assert_eq!(h.repo.calls(), before);

    let saved = h
        .checkout
        .update_profile(
            &account,
            &ProfileUpdate {
                full_name: " Sam Shopper ".into(),
                phone: "555-0142 ".into(),
                address: " 12 Market Row".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(saved.full_name, "Sam Shopper");
    assert_eq!(saved.phone, "555-0142");
    assert_eq!(saved.address, "12 Market Row");
    assert_eq!(saved.email, account.email);
    assert_eq!(h.checkout.profile(&account).await.unwrap(), saved);
    assert_eq!(
        ShippingDetails::from_profile(&saved).address,
        "12 Market Row"
    );
}
