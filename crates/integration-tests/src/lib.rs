//! Integration tests for Stockroom.
//!
//! # Running Tests
//!
//! ```bash
//! # Engine and HTTP tests (in-memory store, no services needed)
//! cargo test -p stockroom-integration-tests
//!
//! # PostgreSQL backend tests (needs Docker)
//! cargo test -p stockroom-integration-tests --test postgres_engine -- --ignored --test-threads=1
//! ```
//!
//! # Test Categories
//!
//! - `reservation` - Cart reservations against the stock ledger
//! - `order_lifecycle` - Checkout, fulfilment, and cancellation
//! - `tracking_log` - Single-current tracking history
//! - `http_cart` / `http_orders` - Router contract via `tower::ServiceExt::oneshot`
//! - `postgres_engine` - The same engine over `PostgreSQL` (testcontainers)
//!
//! This library holds the fixtures those tests share.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Form, Router,
    body::{Body, Bytes},
    http::{HeaderMap, Request, StatusCode, header},
    response::Response,
    routing::post,
};
use secrecy::SecretString;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, Session};

use stockroom_core::{Money, ProductStatus, ShippingPolicy, UserId};
use stockroom_storefront::config::StorefrontConfig;
use stockroom_storefront::db::MemoryInventoryStore;
use stockroom_storefront::middleware::{session_layer, set_current_user};
use stockroom_storefront::models::{CurrentUser, NewProduct, Product};
use stockroom_storefront::services::{
    CancellationNotice, NotificationError, OrderNotifier, OrderService, ReservationService,
};
use stockroom_storefront::state::AppState;

/// Path of the test-only login route.
pub const TEST_LOGIN_PATH: &str = "/test/login";

/// Configuration suitable for tests: no email, no Sentry, default shipping.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://unused"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from("kV9#mQ2$xL7@nR4!pT8&wZ3*bY6^cF1%"),
        shipping: ShippingPolicy::default(),
        email: None,
        sentry_dsn: None,
        sentry_environment: "test".to_string(),
    }
}

/// Notifier that records every notice and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<CancellationNotice>>,
    fail: bool,
}

impl RecordingNotifier {
    /// A notifier whose every send fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    /// Notices received so far, including failed ones.
    #[must_use]
    pub fn sent(&self) -> Vec<CancellationNotice> {
        self.sent.lock().unwrap().clone()
    }

    /// Wait until at least `count` notices arrived (sends are spawned).
    pub async fn wait_for(&self, count: usize) -> Vec<CancellationNotice> {
        for _ in 0..200 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("expected {count} notification(s), got {}", self.sent().len());
    }
}

#[async_trait]
impl OrderNotifier for RecordingNotifier {
    async fn send_order_cancellation_email(
        &self,
        notice: &CancellationNotice,
    ) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(notice.clone());
        if self.fail {
            return Err(NotificationError::InvalidAddress(notice.email.clone()));
        }
        Ok(())
    }
}

/// An in-memory engine with its services.
pub struct TestEngine {
    pub store: MemoryInventoryStore,
    pub notifier: Arc<RecordingNotifier>,
    pub reservations: ReservationService,
    pub orders: OrderService,
}

impl TestEngine {
    /// Engine over an empty store with a recording notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::with_notifier(RecordingNotifier::default())
    }

    /// Engine over an empty store with the given notifier.
    #[must_use]
    pub fn with_notifier(notifier: RecordingNotifier) -> Self {
        let store = MemoryInventoryStore::new();
        let notifier = Arc::new(notifier);
        let shipping = ShippingPolicy::default();
        Self {
            reservations: ReservationService::new(Arc::new(store.clone()), shipping),
            orders: OrderService::new(
                Arc::new(store.clone()),
                Arc::clone(&notifier) as Arc<dyn OrderNotifier>,
                shipping,
            ),
            store,
            notifier,
        }
    }

    /// Insert an active product.
    pub async fn product(&self, name: &str, price: i64, stock: i32) -> Product {
        seed_product(&self.store, name, price, stock).await
    }

    /// Current stock of a product.
    pub async fn stock(&self, product: &Product) -> i32 {
        self.store.product(product.id).await.unwrap().stock
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Insert an active product priced in whole units.
pub async fn seed_product(
    store: &MemoryInventoryStore,
    name: &str,
    price: i64,
    stock: i32,
) -> Product {
    store
        .insert_product(NewProduct {
            name: name.to_string(),
            price: Money::from_units(price),
            stock,
            status: ProductStatus::Active,
        })
        .await
}

/// A logged-in customer.
#[must_use]
pub fn customer(id: i64) -> CurrentUser {
    CurrentUser {
        id: UserId::new(id),
        email: format!("customer{id}@example.com"),
    }
}

#[derive(serde::Deserialize)]
struct LoginForm {
    user_id: i64,
    email: String,
}

async fn test_login(session: Session, Form(form): Form<LoginForm>) -> StatusCode {
    let user = CurrentUser {
        id: UserId::new(form.user_id),
        email: form.email,
    };
    match set_current_user(&session, &user).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// The storefront router over an in-memory engine, plus a login route.
pub struct TestApp {
    pub engine: TestEngine,
    pub router: Router,
}

impl TestApp {
    /// Build the app with a recording notifier.
    #[must_use]
    pub fn new() -> Self {
        let engine = TestEngine::new();
        let state = AppState::new(
            test_config(),
            Arc::new(engine.store.clone()),
            Arc::clone(&engine.notifier) as Arc<dyn OrderNotifier>,
        );
        let router = stockroom_storefront::routes::routes()
            .route(TEST_LOGIN_PATH, post(test_login))
            .layer(session_layer(MemoryStore::default(), false))
            .with_state(state);
        Self { engine, router }
    }

    /// Send a request and collect the response.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        TestResponse::from_response(response).await
    }

    /// GET `uri`, optionally with a session cookie.
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// POST a urlencoded form to `uri`, optionally with a session cookie.
    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Log `user` in and return the session cookie.
    pub async fn login(&self, user: &CurrentUser) -> String {
        let response = self
            .post_form(
                TEST_LOGIN_PATH,
                &format!("user_id={}&email={}", user.id, user.email),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::NO_CONTENT);
        response.session_cookie().expect("login sets a session cookie")
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// A fully buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    async fn from_response(response: Response) -> Self {
        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    /// Parse the body as JSON.
    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    /// The `Location` header of a redirect.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    /// `name=value` of the session cookie, if one was set.
    #[must_use]
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| value.starts_with("sr_session="))
            .and_then(|value| value.split(';').next())
            .map(str::to_string)
    }
}
