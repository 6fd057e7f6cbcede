//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness
//! GET  /health/ready                  - Readiness (database)
//!
//! # Account
//! POST /register                      - Create account and log in (rate limited)
//! POST /login                         - Log in (rate limited)
//! POST /logout                        - Log out
//! GET  /profile                       - Current user (auth)
//!
//! # Catalog
//! GET  /products                      - Active products
//! GET  /products/{id}                 - Product detail
//! GET  /products/categories           - Categories
//! GET  /products/categories/{id}      - Products in a category
//!
//! # Reviews
//! GET    /products/{id}/reviews       - Reviews of a product
//! POST   /products/{id}/reviews       - Post a review (auth)
//! GET    /products/{id}/reviews/me    - Own review (auth)
//! PUT    /products/{id}/reviews       - Replace own review (auth)
//! DELETE /products/{id}/reviews       - Delete own review (auth)
//!
//! # Cart (auth)
//! GET  /cart                          - Active cart with subtotal
//! POST /cart/add                      - Add units of a product
//! POST /cart/reduce                   - Take one unit off
//! POST /cart/remove                   - Drop a line
//!
//! # Checkout and orders (auth)
//! POST /checkout/product              - Buy one product
//! POST /checkout/cart                 - Buy the cart
//! GET  /checkout/capture?token=       - Buyer approved at PayPal
//! GET  /checkout/cancel?token=        - Buyer cancelled at PayPal
//! GET  /orders                        - Order history
//! GET  /orders/{id}                   - One order
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod health;
pub mod products;
pub mod reviews;

use std::time::Duration;

use axum::{
    Router,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::config::Config;
use crate::middleware::{auth_rate_limiter, create_session_layer, request_id_middleware};
use crate::state::AppState;

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    let rate_limited = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter());

    Router::new()
        .merge(rate_limited)
        .route("/logout", post(auth::logout))
        .route("/profile", get(auth::profile))
}

/// Create the product and review routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/categories", get(products::categories))
        .route("/categories/{id}", get(products::category_products))
        .route("/{id}", get(products::show))
        .route(
            "/{id}/reviews",
            get(reviews::index)
                .post(reviews::create)
                .put(reviews::update)
                .delete(reviews::delete),
        )
        .route("/{id}/reviews/me", get(reviews::mine))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/reduce", post(cart::reduce))
        .route("/remove", post(cart::remove))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/product", post(checkout::product))
        .route("/cart", post(checkout::cart))
        .route("/capture", get(checkout::capture))
        .route("/cancel", get(checkout::cancel))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(account_routes())
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .route("/orders", get(checkout::orders))
        .route("/orders/{id}", get(checkout::order))
}

/// CORS for the configured browser origins, with cookies allowed.
fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|_| tracing::warn!(%origin, "Ignoring invalid CORS origin"))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60))
}

/// The full application: routes, health checks and the middleware stack.
///
/// Sentry layers are added by the binary on top of this.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.pool(), state.config());
    let cors = cors_layer(state.config());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(routes())
        .layer(session_layer)
        .layer(cors)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::config::fixtures::config;

    /// App over a pool that never connects; only routes that stop before
    /// the database can be exercised.
    fn test_app() -> Router {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(100))
            .connect_lazy("postgres://localhost:1/ecomstore_test")
            .unwrap();
        let state = AppState::new(config("http://localhost:3000"), pool).unwrap();
        app(state)
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let response = test_app()
            .oneshot(
                Request::get("/health")
                    .header("x-request-id", "req-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "req-123");
    }

    #[tokio::test]
    async fn test_cart_requires_login() {
        let response = test_app()
            .oneshot(Request::get("/cart").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "authentication required");
    }

    #[tokio::test]
    async fn test_orders_require_login() {
        let response = test_app()
            .oneshot(Request::get("/orders").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_register_password_mismatch() {
        let body = serde_json::json!({
            "email": "ada@example.com",
            "name": "Ada",
            "password": "s3cret!pass",
            "confirmPassword": "s3cret!diff1",
        });
        let response = test_app()
            .oneshot(
                Request::post("/register")
                    .header("content-type", "application/json")
                    .header("x-forwarded-for", "203.0.113.9")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["fields"]["confirmPassword"], "passwords do not match");
    }

    #[tokio::test]
    async fn test_review_routes_reject_bad_product_id() {
        let response = test_app()
            .oneshot(
                Request::get("/products/not-a-uuid/reviews")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Invalid product ID");
    }

    #[tokio::test]
    async fn test_product_show_rejects_bad_id() {
        let response = test_app()
            .oneshot(Request::get("/products/42").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    fn post_json(uri: &str, forwarded_for: &str, body: impl Into<Body>) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .header("x-forwarded-for", forwarded_for)
            .body(body.into())
            .unwrap()
    }

    #[tokio::test]
    async fn test_login_missing_field_is_json_400() {
        let body = serde_json::json!({ "email": "ada@example.com" }).to_string();
        let response = test_app()
            .oneshot(post_json("/login", "203.0.113.10", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(json_body(response).await["error"], "invalid parameters");
    }

    #[tokio::test]
    async fn test_register_malformed_json_is_json_400() {
        let response = test_app()
            .oneshot(post_json("/register", "203.0.113.11", "{\"email\": "))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "invalid parameters");
    }

    #[tokio::test]
    async fn test_body_without_content_type_is_json_400() {
        let response = test_app()
            .oneshot(
                Request::post("/login")
                    .header("x-forwarded-for", "203.0.113.12")
                    .body(Body::from(r#"{"email":"ada@example.com","password":"x"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "invalid parameters");
    }

    #[tokio::test]
    async fn test_unreadable_session_store_is_500() {
        // A session cookie forces a store lookup, which cannot reach the database
        let cookie = format!(
            "{}={}",
            crate::middleware::session::SESSION_COOKIE_NAME,
            tower_sessions::session::Id::default()
        );
        let response = test_app()
            .oneshot(
                Request::get("/cart")
                    .header("cookie", cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
