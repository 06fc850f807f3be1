//! The checkout flow end to end.

use std::sync::Arc;
use std::time::Duration;

use bazaar_client::checkout::{BillingChoice, CardForm, ConfirmationStep};
use bazaar_client::storage::{MemoryStorage, Storage, StorageError, keys};
use bazaar_client::{ClientError, Entry, Marketplace, Navigator, Route, SessionStore};
use bazaar_core::{AddressId, PaymentMethod};
use bazaar_integration_tests::{CUSTOMER_EMAIL, CUSTOMER_ID, CUSTOMER_PASSWORD, FakeBackend};
use chrono::{Datelike, Utc};

const LAMP: i64 = 3;

async fn backend() -> FakeBackend {
    let backend = FakeBackend::start().await;
    backend.add_product(LAMP, "Desk lamp", 20.0, 5);
    backend.add_address(CUSTOMER_ID, 6, "Office", false);
    backend.add_address(CUSTOMER_ID, 7, "Home", true);
    backend.set_cart(CUSTOMER_ID, &[(LAMP, 2)]);
    backend
}

fn session_value(market: &Marketplace, key: &str) -> Option<String> {
    market.store().get(key).expect("session store")
}

fn card_form() -> CardForm {
    CardForm {
        card_number: "4111 1111 1111 4242".to_string(),
        card_holder_name: "Jane Doe".to_string(),
        expiry_month: "12".to_string(),
        expiry_year: (Utc::now().year() + 1).to_string(),
        cvc: "123".to_string(),
    }
}

/// Session storage that refuses to record an order id.
#[derive(Default)]
struct RejectsOrderId(MemoryStorage);

impl Storage for RejectsOrderId {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.0.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if key == keys::ORDER_ID {
            return Err(StorageError::Poisoned);
        }
        self.0.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.0.remove(key)
    }
}

async fn confirmation_for(market: &Marketplace) -> ConfirmationStep {
    market
        .checkout()
        .enter_confirmation()
        .await
        .expect("enter confirmation")
        .ready()
        .expect("confirmation ready")
}

/// Address 7, then `method`, leaving the flow on the confirmation page.
async fn through_payment(market: &Marketplace, method: PaymentMethod) {
    let mut address = market
        .checkout()
        .enter_address()
        .await
        .expect("address step")
        .ready()
        .expect("address ready");
    address.select_shipping(AddressId::new(7)).expect("known");
    address.proceed().expect("proceed");

    let mut payment = market
        .checkout()
        .enter_payment()
        .expect("payment step")
        .ready()
        .expect("payment ready");
    payment.select_method(method);
    payment.confirm().expect("confirm payment");
}

// ============================================================================
// Guards
// ============================================================================

#[tokio::test]
async fn test_payment_without_address_redirects_to_address() {
    let backend = backend().await;
    let market = backend.signed_in_market().await;

    let entry = market.checkout().enter_payment().expect("enter");

    assert_eq!(entry.redirect(), Some(&Route::CheckoutAddress));
    assert_eq!(market.navigator().current_path(), "/checkout/address");
}

#[tokio::test]
async fn test_confirmation_redirects_to_earliest_missing_step() {
    let backend = backend().await;
    let market = backend.signed_in_market().await;
    let flow = market.checkout();

    let entry = flow.enter_confirmation().await.expect("enter");
    assert_eq!(entry.redirect(), Some(&Route::CheckoutAddress));

    market
        .store()
        .set(keys::SHIPPING_ADDRESS_ID, "7")
        .expect("store");
    let entry = flow.enter_confirmation().await.expect("enter");
    assert_eq!(entry.redirect(), Some(&Route::CheckoutPayment));

    market
        .store()
        .set(keys::PAYMENT_METHOD, "CREDIT_CARD")
        .expect("store");
    let entry = flow.enter_confirmation().await.expect("enter");
    assert_eq!(entry.redirect(), Some(&Route::CheckoutPayment));
    assert_eq!(market.navigator().current_path(), "/checkout/payment");

    market
        .store()
        .set(keys::PAYMENT_METHOD, "BANK_TRANSFER")
        .expect("store");
    let entry = flow.enter_confirmation().await.expect("enter");
    assert!(entry.ready().is_some());
    assert_eq!(market.navigator().current_path(), "/checkout/confirm");
}

#[tokio::test]
async fn test_success_without_order_goes_home() {
    let backend = backend().await;
    let market = backend.signed_in_market().await;
    market.navigator().navigate(&Route::CheckoutSuccess);
    market.store().set(keys::ORDER_ID, "12").expect("store");

    let entry = market.checkout().enter_success().expect("enter");

    assert_eq!(entry.redirect(), Some(&Route::Home));
    assert_eq!(market.navigator().current_path(), "/");
}

#[tokio::test]
async fn test_checkout_requires_sign_in() {
    let backend = backend().await;
    let market = backend.market_at("/checkout/payment");

    let entry = market.checkout().enter_payment().expect("enter");

    assert!(matches!(entry, Entry::Redirect(Route::Login { .. })));
    assert_eq!(
        market.navigator().current_path(),
        "/login?returnUrl=%2Fcheckout%2Fpayment"
    );
}

// ============================================================================
// Address and payment steps
// ============================================================================

#[tokio::test]
async fn test_address_step_preselects_default_and_adds_new() {
    let backend = backend().await;
    let market = backend.signed_in_market().await;

    let mut step = market
        .checkout()
        .enter_address()
        .await
        .expect("enter")
        .ready()
        .expect("ready");
    assert_eq!(step.addresses().len(), 2);
    assert_eq!(step.selected_shipping(), Some(AddressId::new(7)));
    assert_eq!(step.billing(), BillingChoice::SameAsShipping);

    let new_address = bazaar_client::models::Address {
        address_name: "Cabin".to_string(),
        recipient_name: "Jane Doe".to_string(),
        address_line1: "1 Lake Road".to_string(),
        city: "Duluth".to_string(),
        state: "MN".to_string(),
        postal_code: "55802".to_string(),
        country: "US".to_string(),
        phone_number: "555-0101".to_string(),
        ..Default::default()
    };
    let created_id = step
        .add_address(&new_address)
        .await
        .expect("create")
        .id
        .expect("id");
    assert_eq!(step.selected_shipping(), Some(created_id));

    step.select_billing(AddressId::new(6)).expect("known");
    step.proceed().expect("proceed");

    assert_eq!(
        session_value(&market, keys::SHIPPING_ADDRESS_ID),
        Some(created_id.to_string())
    );
    assert_eq!(
        session_value(&market, keys::BILLING_ADDRESS_ID).as_deref(),
        Some("6")
    );
    assert_eq!(market.navigator().current_path(), "/checkout/payment");
}

#[tokio::test]
async fn test_invalid_card_stores_nothing() {
    let backend = backend().await;
    let market = backend.signed_in_market().await;
    market
        .store()
        .set(keys::SHIPPING_ADDRESS_ID, "7")
        .expect("store");

    let mut step = market
        .checkout()
        .enter_payment()
        .expect("enter")
        .ready()
        .expect("ready");
    assert_eq!(step.method(), PaymentMethod::CreditCard);
    let mut form = card_form();
    form.card_number = "4111".to_string();
    step.set_card(form);

    let err = step.confirm().expect_err("invalid card");

    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(session_value(&market, keys::PAYMENT_METHOD), None);
    assert_eq!(session_value(&market, keys::CARD_DATA), None);
    assert_eq!(market.navigator().current_path(), "/checkout/payment");
}

#[tokio::test]
async fn test_card_payment_shows_masked_number() {
    let backend = backend().await;
    let market = backend.signed_in_market().await;
    market
        .store()
        .set(keys::SHIPPING_ADDRESS_ID, "7")
        .expect("store");

    let mut step = market
        .checkout()
        .enter_payment()
        .expect("enter")
        .ready()
        .expect("ready");
    step.set_card(card_form());
    step.confirm().expect("confirm");

    let confirmation = market
        .checkout()
        .enter_confirmation()
        .await
        .expect("enter")
        .ready()
        .expect("ready");
    assert_eq!(
        confirmation.masked_card().as_deref(),
        Some("**** **** **** 4242")
    );
    assert_eq!(confirmation.method_label(), PaymentMethod::CreditCard.label());
    assert!(confirmation.shipping_fee().is_zero());
}

#[tokio::test]
async fn test_proceed_without_addresses_is_rejected() {
    let backend = FakeBackend::start().await;
    backend.add_product(LAMP, "Desk lamp", 20.0, 5);
    backend.set_cart(CUSTOMER_ID, &[(LAMP, 1)]);
    let market = backend.signed_in_market().await;

    let step = market
        .checkout()
        .enter_address()
        .await
        .expect("enter")
        .ready()
        .expect("ready");
    assert!(step.addresses().is_empty());
    assert_eq!(step.selected_shipping(), None);

    let err = step.proceed().expect_err("no address");

    assert!(matches!(err, ClientError::MissingSelection(_)));
    assert_eq!(session_value(&market, keys::SHIPPING_ADDRESS_ID), None);
    assert_eq!(market.navigator().current_path(), "/checkout/address");
}

// ============================================================================
// Placing the order
// ============================================================================

#[tokio::test]
async fn test_cash_on_delivery_order() {
    let backend = backend().await;
    let market = backend.signed_in_market().await;
    through_payment(&market, PaymentMethod::CashOnDelivery).await;

    let confirmation = market
        .checkout()
        .enter_confirmation()
        .await
        .expect("enter")
        .ready()
        .expect("ready");
    assert_eq!(confirmation.error(), None);
    assert_eq!(
        confirmation.shipping_address().and_then(|a| a.id),
        Some(AddressId::new(7))
    );
    assert_eq!(confirmation.subtotal().to_string(), "40.00");
    assert_eq!(confirmation.shipping_fee().to_string(), "5.00");
    assert_eq!(confirmation.total().to_string(), "45.00");

    backend.reset_requests();
    let order = confirmation.place_order().await.expect("place order");

    let sent = backend.order_requests();
    assert_eq!(sent.len(), 1);
    let body = sent.first().expect("order request");
    assert_eq!(body["shippingAddressId"], 7);
    assert_eq!(body["paymentMethod"], "CASH_ON_DELIVERY");
    assert_eq!(backend.count("POST", "/api/orders"), 1);

    for key in keys::CHECKOUT {
        assert_eq!(session_value(&market, key), None, "{key} should be cleared");
    }
    assert_eq!(session_value(&market, keys::ORDER_ID), Some(order.id.to_string()));
    assert_eq!(session_value(&market, keys::ORDER_NUMBER), Some(order.number()));

    assert_eq!(
        backend.count("DELETE", &format!("/api/cart/{CUSTOMER_ID}/clear")),
        1
    );
    assert!(market.cart().is_empty());
    assert_eq!(market.navigator().current_path(), "/checkout/success");

    let success = market
        .checkout()
        .enter_success()
        .expect("enter")
        .ready()
        .expect("ready");
    assert_eq!(success.order_number(), order.number());
    success.view_orders();
    assert_eq!(market.navigator().current_path(), "/account/orders");

    let err = confirmation.place_order().await.expect_err("already placed");
    assert!(matches!(err, ClientError::MissingSelection(_)));
    assert_eq!(backend.order_requests().len(), 1);
}

#[tokio::test]
async fn test_unknown_shipping_address_blocks_order() {
    let backend = backend().await;
    let market = backend.signed_in_market().await;
    let store = market.store();
    store.set(keys::SHIPPING_ADDRESS_ID, "99").expect("store");
    store.set(keys::PAYMENT_METHOD, "BANK_TRANSFER").expect("store");

    let confirmation = confirmation_for(&market).await;
    assert_eq!(
        confirmation.error(),
        Some("Failed to load addresses: Address not found")
    );
    assert!(confirmation.shipping_address().is_none());

    let err = confirmation.place_order().await.expect_err("no address");

    assert!(matches!(err, ClientError::MissingSelection(_)));
    assert!(backend.order_requests().is_empty());
    assert_eq!(market.navigator().current_path(), "/checkout/confirm");
}

#[tokio::test]
async fn test_order_survives_session_storage_failure() {
    let backend = backend().await;
    let store = SessionStore::new(
        Arc::new(MemoryStorage::new()),
        Arc::new(RejectsOrderId::default()),
    );
    let market = Marketplace::new(backend.config(), store, Navigator::new());
    market
        .account()
        .login(CUSTOMER_EMAIL, CUSTOMER_PASSWORD)
        .await
        .expect("login");
    through_payment(&market, PaymentMethod::CashOnDelivery).await;
    let confirmation = confirmation_for(&market).await;

    let order = confirmation.place_order().await.expect("order placed");

    assert_eq!(backend.order_requests().len(), 1);
    assert_eq!(session_value(&market, keys::ORDER_ID), None);
    assert_eq!(session_value(&market, keys::ORDER_NUMBER), Some(order.number()));
    for key in keys::CHECKOUT {
        assert_eq!(session_value(&market, key), None);
    }
    assert!(market.cart().is_empty());
    assert_eq!(market.navigator().current_path(), "/checkout/success");

    let err = confirmation.place_order().await.expect_err("already placed");
    assert!(matches!(err, ClientError::MissingSelection(_)));
    assert_eq!(backend.order_requests().len(), 1);
}

#[tokio::test]
async fn test_second_submission_is_rejected_while_in_flight() {
    let backend = backend().await;
    backend.delay_orders(Duration::from_millis(200));
    let market = backend.signed_in_market().await;
    through_payment(&market, PaymentMethod::BankTransfer).await;
    let confirmation = market
        .checkout()
        .enter_confirmation()
        .await
        .expect("enter")
        .ready()
        .expect("ready");

    let (first, second) = tokio::join!(confirmation.place_order(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(market.checkout().is_placing_order());
        confirmation.place_order().await
    });

    assert!(first.is_ok());
    assert!(matches!(second, Err(ClientError::OrderInFlight)));
    assert_eq!(backend.order_requests().len(), 1);
    assert!(!market.checkout().is_placing_order());
}

#[tokio::test]
async fn test_failed_order_can_be_retried() {
    let backend = backend().await;
    backend.fail_orders(true);
    let market = backend.signed_in_market().await;
    through_payment(&market, PaymentMethod::BankTransfer).await;
    let confirmation = market
        .checkout()
        .enter_confirmation()
        .await
        .expect("enter")
        .ready()
        .expect("ready");

    let err = confirmation.place_order().await.expect_err("declined");
    assert_eq!(err.user_message(), "Payment declined");
    assert_eq!(
        session_value(&market, keys::SHIPPING_ADDRESS_ID).as_deref(),
        Some("7")
    );
    assert_eq!(session_value(&market, keys::ORDER_ID), None);
    assert!(!market.cart().is_empty());
    assert_eq!(market.navigator().current_path(), "/checkout/confirm");

    backend.fail_orders(false);
    confirmation.place_order().await.expect("retry");
    assert_eq!(backend.order_requests().len(), 2);
    assert_eq!(market.navigator().current_path(), "/checkout/success");
}

#[tokio::test]
async fn test_logout_discards_checkout_progress() {
    let backend = backend().await;
    let market = backend.signed_in_market().await;
    through_payment(&market, PaymentMethod::CashOnDelivery).await;

    market.account().logout().expect("logout");

    for key in keys::CHECKOUT {
        assert_eq!(session_value(&market, key), None);
    }
    assert!(!market.auth().is_logged_in());
}
