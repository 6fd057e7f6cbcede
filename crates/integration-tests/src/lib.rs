//! End-to-end tests for the ecomstore API.
//!
//! # Running Tests
//!
//! ```bash
//! # Migrate and seed a database, then start the server
//! ecomstore migrate
//! ecomstore seed --file catalog.yaml
//! cargo run -p ecomstore-server
//!
//! # Run the ignored end-to-end tests against it
//! ECOMSTORE_BASE_URL=http://localhost:3000 cargo test -p ecomstore-integration-tests -- --ignored
//! ```
//!
//! The checkout tests also need PayPal sandbox credentials configured on the
//! server; they stop at the approval link since approving requires a buyer.

#![cfg_attr(not(test), forbid(unsafe_code))]

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("ECOMSTORE_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:3000".to_string())
        .trim_end_matches('/')
        .to_string()
}

/// A password that satisfies the account policy.
pub const TEST_PASSWORD: &str = "Integration1!";

/// A client with its own cookie jar, so each test holds its own session.
pub struct TestClient {
    pub http: Client,
    pub base_url: String,
}

impl TestClient {
    /// Each client presents its own forwarded address so the per-IP limit
    /// on `/login` and `/register` does not throttle the whole suite.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let octets = Uuid::new_v4().into_bytes();
        let forwarded = format!("10.{}.{}.{}", octets[0], octets[1], octets[2]);

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_str(&forwarded).expect("forwarded address is a valid header"),
        );

        Self {
            http: Client::builder()
                .cookie_store(true)
                .default_headers(headers)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url(),
        }
    }

    /// Absolute URL for an API path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// # Errors
    ///
    /// Returns the transport error if the server is unreachable.
    pub async fn get(&self, path: &str) -> reqwest::Result<Response> {
        self.http.get(self.url(path)).send().await
    }

    /// # Errors
    ///
    /// Returns the transport error if the server is unreachable.
    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Result<Response> {
        self.http.post(self.url(path)).json(body).send().await
    }

    /// Register a fresh account; the server logs it in on success.
    ///
    /// Returns the email used.
    ///
    /// # Panics
    ///
    /// Panics if registration does not return 201.
    #[allow(clippy::expect_used)]
    pub async fn register_fresh_user(&self) -> String {
        let email = format!("it-{}@example.com", Uuid::new_v4().simple());
        let resp = self
            .post_json(
                "/register",
                &json!({
                    "email": email,
                    "name": "Integration",
                    "password": TEST_PASSWORD,
                    "confirmPassword": TEST_PASSWORD,
                }),
            )
            .await
            .expect("register request failed");
        assert_eq!(resp.status(), StatusCode::CREATED);
        email
    }

    /// First active product in the catalog, if any.
    ///
    /// # Panics
    ///
    /// Panics if the catalog request fails.
    #[allow(clippy::expect_used)]
    pub async fn first_product(&self) -> Option<Value> {
        let products: Vec<Value> = self
            .get("/products")
            .await
            .expect("products request failed")
            .json()
            .await
            .expect("products body is not JSON");
        products.into_iter().next()
    }
}

impl Default for TestClient {
    fn default() -> Self {
        Self::new()
    }
}
