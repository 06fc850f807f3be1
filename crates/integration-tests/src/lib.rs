//! End-to-end tests for the Bazaar client.
//!
//! [`FakeBackend`] is an in-process marketplace backend (axum) speaking the
//! same REST dialect as the real one, with just enough behaviour for the
//! cart and checkout paths: bearer-token checks, server-side stock
//! enforcement and order creation. Every request it receives is recorded so
//! tests can assert on what went over the wire.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use bazaar_client::{ClientConfig, Marketplace, Navigator, SessionStore};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use url::Url;

/// The one customer account the backend knows.
pub const CUSTOMER_ID: i64 = 1;
pub const CUSTOMER_EMAIL: &str = "jane@example.com";
pub const CUSTOMER_PASSWORD: &str = "secret123";

/// A request as seen by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
}

#[derive(Debug, Clone)]
struct FakeProduct {
    name: String,
    price: f64,
    stock: u32,
}

#[derive(Default)]
struct BackendState {
    products: BTreeMap<i64, FakeProduct>,
    carts: BTreeMap<i64, Vec<(i64, u32)>>,
    addresses: BTreeMap<i64, Vec<Value>>,
    orders: Vec<Value>,
    order_requests: Vec<Value>,
    requests: Vec<RecordedRequest>,
    revoked: bool,
    fail_orders: bool,
    order_delay: Option<Duration>,
    next_id: i64,
}

impl BackendState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn cart_json(&self, user_id: i64) -> Value {
        let items: Vec<Value> = self
            .carts
            .get(&user_id)
            .into_iter()
            .flatten()
            .filter_map(|(product_id, quantity)| {
                let product = self.products.get(product_id)?;
                Some(json!({
                    "id": product_id * 100,
                    "product": {
                        "id": product_id,
                        "name": product.name,
                        "price": product.price,
                        "stock_quantity": product.stock,
                    },
                    "quantity": quantity,
                    "subtotal": product.price * f64::from(*quantity),
                }))
            })
            .collect();
        json!({ "id": user_id, "userId": user_id, "items": items })
    }
}

type Shared = Arc<Mutex<BackendState>>;

fn lock(state: &Shared) -> MutexGuard<'_, BackendState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn authorize(state: &BackendState, headers: &HeaderMap, user_id: i64) -> Result<(), Response> {
    let expected = format!("Bearer token-{user_id}");
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if state.revoked || presented != Some(expected.as_str()) {
        return Err(error(StatusCode::UNAUTHORIZED, "Full authentication is required"));
    }
    Ok(())
}

fn quantity_param(query: &HashMap<String, String>) -> Result<u32, Response> {
    query
        .get("quantity")
        .and_then(|q| q.parse().ok())
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "quantity is required"))
}

// =============================================================================
// Handlers
// =============================================================================

async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    lock(&state).requests.push(RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        query: request.uri().query().map(str::to_string),
    });
    next.run(request).await
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["email"] == CUSTOMER_EMAIL && body["password"] == CUSTOMER_PASSWORD {
        Json(json!({
            "token": format!("token-{CUSTOMER_ID}"),
            "type": "Bearer",
            "id": CUSTOMER_ID,
            "username": "jane",
            "email": CUSTOMER_EMAIL,
            "role": "USER",
            "firstName": "Jane",
            "lastName": "Doe",
        }))
        .into_response()
    } else {
        error(StatusCode::UNAUTHORIZED, "Invalid email or password")
    }
}

async fn get_product(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    let state = lock(&state);
    state.products.get(&id).map_or_else(
        || error(StatusCode::NOT_FOUND, "Product not found"),
        |p| {
            Json(json!({
                "id": id,
                "name": p.name,
                "price": p.price,
                "stock_quantity": p.stock,
            }))
            .into_response()
        },
    )
}

async fn get_cart(
    State(state): State<Shared>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let state = lock(&state);
    if let Err(rejection) = authorize(&state, &headers, user_id) {
        return rejection;
    }
    Json(state.cart_json(user_id)).into_response()
}

/// Shared by add (POST, adds to the line) and update (PUT, sets the line).
fn write_cart_line(
    state: &Shared,
    headers: &HeaderMap,
    user_id: i64,
    product_id: i64,
    query: &HashMap<String, String>,
    add: bool,
) -> Response {
    let mut state = lock(state);
    if let Err(rejection) = authorize(&state, headers, user_id) {
        return rejection;
    }
    let quantity = match quantity_param(query) {
        Ok(q) => q,
        Err(rejection) => return rejection,
    };
    let Some(stock) = state.products.get(&product_id).map(|p| p.stock) else {
        return error(StatusCode::NOT_FOUND, "Product not found");
    };

    let lines = state.carts.entry(user_id).or_default();
    let existing = lines
        .iter()
        .find(|(id, _)| *id == product_id)
        .map_or(0, |(_, q)| *q);
    let wanted = if add { existing + quantity } else { quantity };
    if wanted > stock {
        return error(
            StatusCode::BAD_REQUEST,
            &format!("Not enough stock. Only {stock} available"),
        );
    }
    match lines.iter_mut().find(|(id, _)| *id == product_id) {
        Some(line) => line.1 = wanted,
        None => lines.push((product_id, wanted)),
    }
    Json(state.cart_json(user_id)).into_response()
}

async fn add_to_cart(
    State(state): State<Shared>,
    Path((user_id, product_id)): Path<(i64, i64)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    write_cart_line(&state, &headers, user_id, product_id, &query, true)
}

async fn update_cart(
    State(state): State<Shared>,
    Path((user_id, product_id)): Path<(i64, i64)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    write_cart_line(&state, &headers, user_id, product_id, &query, false)
}

async fn remove_from_cart(
    State(state): State<Shared>,
    Path((user_id, product_id)): Path<(i64, i64)>,
    headers: HeaderMap,
) -> Response {
    let mut state = lock(&state);
    if let Err(rejection) = authorize(&state, &headers, user_id) {
        return rejection;
    }
    state
        .carts
        .entry(user_id)
        .or_default()
        .retain(|(id, _)| *id != product_id);
    Json(state.cart_json(user_id)).into_response()
}

async fn clear_cart(
    State(state): State<Shared>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let mut state = lock(&state);
    if let Err(rejection) = authorize(&state, &headers, user_id) {
        return rejection;
    }
    state.carts.remove(&user_id);
    StatusCode::OK.into_response()
}

async fn list_addresses(
    State(state): State<Shared>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let state = lock(&state);
    if let Err(rejection) = authorize(&state, &headers, user_id) {
        return rejection;
    }
    Json(state.addresses.get(&user_id).cloned().unwrap_or_default()).into_response()
}

async fn create_address(
    State(state): State<Shared>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    if let Err(rejection) = authorize(&state, &headers, user_id) {
        return rejection;
    }
    let id = state.next_id();
    body["id"] = json!(id);
    state.addresses.entry(user_id).or_default().push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn get_address(
    State(state): State<Shared>,
    Path((user_id, address_id)): Path<(i64, i64)>,
    headers: HeaderMap,
) -> Response {
    let state = lock(&state);
    if let Err(rejection) = authorize(&state, &headers, user_id) {
        return rejection;
    }
    state
        .addresses
        .get(&user_id)
        .and_then(|list| list.iter().find(|a| a["id"] == address_id))
        .map_or_else(
            || error(StatusCode::NOT_FOUND, "Address not found"),
            |a| Json(a.clone()).into_response(),
        )
}

async fn create_order(
    State(state): State<Shared>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let delay = {
        let mut guard = lock(&state);
        if let Err(rejection) = authorize(&guard, &headers, user_id) {
            return rejection;
        }
        guard.order_requests.push(body.clone());
        guard.order_delay
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut state = lock(&state);
    if state.fail_orders {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Payment declined");
    }
    let id = state.next_id();
    let order = json!({
        "id": id,
        "orderNumber": format!("ORD-{id:05}"),
        "status": "PENDING",
        "paymentStatus": "PENDING",
        "paymentMethod": body["paymentMethod"],
        "items": [],
        "userId": user_id,
    });
    state.orders.push(order.clone());
    (StatusCode::CREATED, Json(order)).into_response()
}

async fn list_orders(
    State(state): State<Shared>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let state = lock(&state);
    if let Err(rejection) = authorize(&state, &headers, user_id) {
        return rejection;
    }
    Json(state.orders.clone()).into_response()
}

// =============================================================================
// FakeBackend
// =============================================================================

/// A running fake backend. The server stops when this is dropped.
pub struct FakeBackend {
    addr: SocketAddr,
    state: Shared,
    server: JoinHandle<()>,
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl FakeBackend {
    /// Bind to an ephemeral port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(BackendState {
            next_id: 1000,
            ..BackendState::default()
        }));

        let app = Router::new()
            .route("/api/users/login", post(login))
            .route("/api/products/{id}", get(get_product))
            .route("/api/cart/{user_id}", get(get_cart))
            .route(
                "/api/cart/{user_id}/product/{product_id}",
                post(add_to_cart).put(update_cart).delete(remove_from_cart),
            )
            .route("/api/cart/{user_id}/clear", delete(clear_cart))
            .route(
                "/api/addresses/{user_id}",
                get(list_addresses).post(create_address),
            )
            .route(
                "/api/addresses/{user_id}/address/{address_id}",
                get(get_address),
            )
            .route("/api/orders/{user_id}", get(list_orders).post(create_order))
            .layer(middleware::from_fn_with_state(state.clone(), record))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("failed to bind fake backend: {e}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| panic!("fake backend has no address: {e}"));
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Client configuration pointing at this backend.
    ///
    /// # Panics
    ///
    /// Never in practice; the bound address always forms a valid URL.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        let url = Url::parse(&format!("http://{}", self.addr))
            .unwrap_or_else(|e| panic!("invalid backend url: {e}"));
        ClientConfig::new(url)
    }

    /// A signed-out client with fresh in-memory stores, located at `path`.
    #[must_use]
    pub fn market_at(&self, path: &str) -> Marketplace {
        Marketplace::new(
            self.config(),
            SessionStore::in_memory(),
            Navigator::starting_at(path),
        )
    }

    /// A client signed in as the customer, located at `/`.
    ///
    /// # Panics
    ///
    /// Panics if the login fails.
    pub async fn signed_in_market(&self) -> Marketplace {
        let market = self.market_at("/");
        market
            .account()
            .login(CUSTOMER_EMAIL, CUSTOMER_PASSWORD)
            .await
            .unwrap_or_else(|e| panic!("login failed: {e}"));
        market
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    pub fn add_product(&self, id: i64, name: &str, price: f64, stock: u32) {
        lock(&self.state).products.insert(
            id,
            FakeProduct {
                name: name.to_string(),
                price,
                stock,
            },
        );
    }

    /// Change a product's stock behind the client's back.
    pub fn set_stock(&self, id: i64, stock: u32) {
        if let Some(product) = lock(&self.state).products.get_mut(&id) {
            product.stock = stock;
        }
    }

    pub fn set_cart(&self, user_id: i64, lines: &[(i64, u32)]) {
        lock(&self.state).carts.insert(user_id, lines.to_vec());
    }

    pub fn add_address(&self, user_id: i64, id: i64, name: &str, is_default: bool) {
        lock(&self.state)
            .addresses
            .entry(user_id)
            .or_default()
            .push(json!({
                "id": id,
                "addressName": name,
                "recipientName": "Jane Doe",
                "addressLine1": format!("{id} Main Street"),
                "city": "Springfield",
                "state": "IL",
                "postalCode": "62701",
                "country": "US",
                "phoneNumber": "555-0100",
                "isDefault": is_default,
            }));
    }

    /// Reject every token from now on.
    pub fn revoke_sessions(&self) {
        lock(&self.state).revoked = true;
    }

    /// Make order creation fail with a 500 until turned off again.
    pub fn fail_orders(&self, fail: bool) {
        lock(&self.state).fail_orders = fail;
    }

    /// Hold order responses for `delay`.
    pub fn delay_orders(&self, delay: Duration) {
        lock(&self.state).order_delay = Some(delay);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }

    /// Number of `method` requests whose path starts with `prefix`.
    #[must_use]
    pub fn count(&self, method: &str, prefix: &str) -> usize {
        lock(&self.state)
            .requests
            .iter()
            .filter(|r| r.method == method && r.path.starts_with(prefix))
            .count()
    }

    /// Forget recorded requests.
    pub fn reset_requests(&self) {
        lock(&self.state).requests.clear();
    }

    /// Bodies of every order creation request received.
    #[must_use]
    pub fn order_requests(&self) -> Vec<Value> {
        lock(&self.state).order_requests.clone()
    }

    /// Quantity of `product_id` in the server-side cart.
    #[must_use]
    pub fn server_quantity(&self, user_id: i64, product_id: i64) -> u32 {
        lock(&self.state)
            .carts
            .get(&user_id)
            .and_then(|lines| lines.iter().find(|(id, _)| *id == product_id))
            .map_or(0, |(_, q)| *q)
    }
}
