//! HTTP surface: router assembly and shared handler state.

pub mod catalog;
pub mod payment;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::payment::Reconciler;
use crate::store::{OrderStore, ProductStore};

#[derive(Clone)]
pub struct AppState {
    pub products: Arc<dyn ProductStore>,
    pub orders: Arc<dyn OrderStore>,
    pub reconciler: Arc<Reconciler>,
    /// Base the gateway callbacks redirect the buyer to.
    pub frontend_url: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({"status": "healthy", "service": "imi-commerce"})) }),
        )
        .route("/api/v1/products", get(catalog::list_products).post(catalog::create_product))
        .route("/api/v1/products/:id", get(catalog::get_product))
        .route("/api/v1/orders", get(catalog::list_orders))
        .route("/api/v1/orders/:id", get(catalog::get_order))
        .route("/api/v1/checkout", post(payment::checkout))
        .route("/api/v1/payment/success", post(payment::payment_success))
        .route("/api/v1/payment/failure", post(payment::payment_failure))
        .route("/api/v1/payment/verify", post(payment::verify_payment))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use rust_decimal::Decimal;
    use tower::util::ServiceExt;

    use crate::config::PayuConfig;
    use crate::domain::Product;
    use crate::events::EventPublisher;
    use crate::store::memory::{InMemoryOrderStore, InMemoryProductStore};

    async fn test_app() -> (Router, Product) {
        let products = Arc::new(InMemoryProductStore::new());
        let orders = Arc::new(InMemoryOrderStore::new());
        let product = products
            .insert(Product::new("Widget", None, Decimal::new(10000, 2), 5))
            .await
            .unwrap();
        let config = PayuConfig::for_tests();
        let reconciler = Arc::new(
            Reconciler::new(
                config.clone(),
                products.clone(),
                orders.clone(),
                EventPublisher::disabled(),
            )
            .unwrap(),
        );
        let state = AppState {
            products,
            orders,
            reconciler,
            frontend_url: config.frontend_url,
        };
        (router(state), product)
    }

    #[tokio::test]
    async fn checkout_returns_201_with_gateway_payload() {
        let (app, product) = test_app().await;
        let body = serde_json::json!({
            "buyer_ref": "buyer-1",
            "first_name": "Asha",
            "email": "asha@example.com",
            "product_id": product.id,
            "quantity": 1,
            "payment_method": "ONLINE",
            "shipping_address": {
                "full_name": "Asha Rao",
                "phone": "+919900112233",
                "line1": "14 MG Road",
                "city": "Bengaluru",
                "state": "KA",
                "postal_code": "560001",
                "country": "IN"
            }
        });
        let response = app
            .oneshot(
                Request::post("/api/v1/checkout")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["payment"]["amount"], "100.00");
        assert_eq!(json["order"]["payment_status"], "Pending");
    }

    #[tokio::test]
    async fn checkout_with_bad_method_is_rejected() {
        let (app, product) = test_app().await;
        let body = serde_json::json!({
            "buyer_ref": "buyer-1",
            "first_name": "Asha",
            "email": "asha@example.com",
            "product_id": product.id,
            "payment_method": "WALLET",
            "shipping_address": {
                "full_name": "Asha Rao",
                "phone": "+919900112233",
                "line1": "14 MG Road",
                "city": "Bengaluru",
                "state": "KA",
                "postal_code": "560001",
                "country": "IN"
            }
        });
        let response = app
            .oneshot(
                Request::post("/api/v1/checkout")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn failure_callback_always_redirects() {
        let (app, _) = test_app().await;
        let response = app
            .oneshot(
                Request::post("/api/v1/payment/failure")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("txnid=TXN_expired&status=failure"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_redirection());
        let location = response.headers().get(header::LOCATION).unwrap().to_str().unwrap();
        assert_eq!(location, "http://localhost:5173/payment/failure?txnid=TXN_expired");
    }

    #[tokio::test]
    async fn unknown_product_is_404() {
        let (app, _) = test_app().await;
        let response = app
            .oneshot(
                Request::get(format!("/api/v1/products/{}", uuid::Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
