use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clients::{self, ClientRecord};
use crate::invoice::store::InvoicePatch;
use crate::invoice::view::{ListPage, ListQuery};
use crate::invoice::{Invoice, InvoiceDraft, InvoiceError, InvoiceStats};
use crate::payments::stk::StkPushResponse;
use crate::shared::state::AppState;

impl IntoResponse for InvoiceError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Payment(msg) => (StatusCode::PAYMENT_REQUIRED, msg.clone()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

async fn list_invoices(State(state): State<Arc<AppState>>) -> Json<Vec<Invoice>> {
    Json(state.store.invoices().await)
}

async fn invoice_view(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Json<ListPage> {
    Json(state.store.page_for(&query).await)
}

async fn invoice_stats(State(state): State<Arc<AppState>>) -> Json<InvoiceStats> {
    Json(state.store.stats().await)
}

async fn create_invoice(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<InvoiceDraft>,
) -> Result<(StatusCode, Json<Invoice>), InvoiceError> {
    let invoice = state.store.create(draft).await?;
    log::info!("created invoice {} for {}", invoice.id, invoice.client);
    Ok((StatusCode::CREATED, Json(invoice)))
}

async fn get_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Invoice>, InvoiceError> {
    state
        .store
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| InvoiceError::NotFound(format!("Invoice {id} not found")))
}

async fn update_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<InvoicePatch>,
) -> Result<Json<Invoice>, InvoiceError> {
    let invoice = state.store.update(&id, patch).await?;
    Ok(Json(invoice))
}

async fn delete_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, InvoiceError> {
    state.store.delete(&id).await?;
    log::info!("deleted invoice {id}");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayRequest {
    phone: Option<String>,
}

async fn pay_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Option<Json<PayRequest>>,
) -> Result<Json<StkPushResponse>, InvoiceError> {
    let phone = payload.and_then(|Json(req)| req.phone);
    let ack = state.store.process_payment(&id, phone.as_deref()).await?;
    Ok(Json(ack))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StkPushBody {
    phone: Option<String>,
    amount: Option<f64>,
    invoice_id: Option<String>,
    #[allow(dead_code)]
    account: Option<String>,
}

/// Stand-in for the mobile-money gateway: validates the bare minimum and
/// answers with a canned Daraja acknowledgement. Never moves money.
async fn stk_push(Json(body): Json<StkPushBody>) -> impl IntoResponse {
    let has_reference = body.phone.is_some() || body.invoice_id.is_some();
    if body.amount.is_none() || !has_reference {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "Phone number and amount are required"
            })),
        );
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "MerchantRequestID": "29115-34620561-1",
            "CheckoutRequestID": "ws_CO_200220231010440123456798",
            "ResponseCode": "0",
            "ResponseDescription": "Success. Request accepted for processing",
            "CustomerMessage": "Success. Request accepted for processing"
        })),
    )
}

async fn list_clients(State(state): State<Arc<AppState>>) -> Json<Vec<ClientRecord>> {
    let invoices = state.store.invoices().await;
    Json(clients::directory(&state.client_contacts, &invoices))
}

async fn get_profile(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.account.profile().await)
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Json(update): Json<crate::account::ProfileUpdate>,
) -> impl IntoResponse {
    Json(state.account.update_profile(update).await)
}

#[derive(Debug, Serialize)]
struct ThemeResponse {
    theme: crate::account::Theme,
}

async fn toggle_theme(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ThemeResponse {
        theme: state.account.toggle_theme().await,
    })
}

async fn list_notifications(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.account.notifications().await)
}

async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    if state.account.mark_notification_read(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn clear_notifications(State(state): State<Arc<AppState>>) -> StatusCode {
    state.account.clear_notifications().await;
    StatusCode::NO_CONTENT
}

pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/invoices", get(list_invoices).post(create_invoice))
        .route("/api/invoices/view", get(invoice_view))
        .route("/api/invoices/stats", get(invoice_stats))
        .route(
            "/api/invoices/:id",
            get(get_invoice)
                .patch(update_invoice)
                .delete(delete_invoice),
        )
        .route("/api/invoices/:id/pay", post(pay_invoice))
        .route("/api/payments/stk-push", post(stk_push))
        .route("/api/clients", get(list_clients))
        .route(
            "/api/account/profile",
            get(get_profile).put(update_profile),
        )
        .route("/api/account/theme", put(toggle_theme))
        .route(
            "/api/account/notifications",
            get(list_notifications).delete(clear_notifications),
        )
        .route(
            "/api/account/notifications/:id/read",
            put(mark_notification_read),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::invoice::seed_invoices;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_config() -> AppConfig {
        crate::config::AppConfig {
            server: crate::config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            payments: crate::config::PaymentsConfig {
                stk_base_url: "http://127.0.0.1:1".to_string(),
                currency: "KES".to_string(),
            },
        }
    }

    fn app(stk_base_url: &str) -> Router {
        let state = AppState::with_invoices(test_config(), stk_base_url, seed_invoices());
        configure_api_routes().with_state(Arc::new(state))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_list_invoices_returns_seeded_collection() {
        let response = app("http://127.0.0.1:1")
            .oneshot(
                Request::builder()
                    .uri("/api/invoices")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 18);
    }

    #[tokio::test]
    async fn test_create_invoice_roundtrip() {
        let app = app("http://127.0.0.1:1");
        let due = (chrono::Utc::now().date_naive() + chrono::Duration::days(7)).to_string();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/invoices")
                    .header("content-type", "application/json")
                    .body(Body::from(format!(
                        r#"{{"client":"Acme Ltd","dueDate":"{due}","items":[{{"description":"A","quantity":2,"unitPrice":100}}]}}"#
                    )))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["id"], "QP-2063");
        assert_eq!(json["amount"], 232.0);
        assert_eq!(json["status"], "pending");

        let fetch = app
            .oneshot(
                Request::builder()
                    .uri("/api/invoices/QP-2063")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        // Router state is shared across clones.
        assert_eq!(fetch.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_update_unknown_invoice_is_404() {
        let response = app("http://127.0.0.1:1")
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri("/api/invoices/QP-9999")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"client":"Ghost"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("QP-9999"));
    }

    #[tokio::test]
    async fn test_stk_push_mock_validates_and_answers_canned_payload() {
        let app = app("http://127.0.0.1:1");
        let bad = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/payments/stk-push")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"phone":"254712345678"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let ok = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/payments/stk-push")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"phone":"254712345678","amount":620.0}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        let json = body_json(ok).await;
        assert_eq!(json["ResponseCode"], "0");
    }

    #[tokio::test]
    async fn test_pay_route_against_mock_gateway() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/stk-push")
            .with_status(200)
            .with_body(
                r#"{
                    "MerchantRequestID": "29115-34620561-1",
                    "CheckoutRequestID": "ws_CO_200220231010440123456798",
                    "ResponseCode": "0",
                    "ResponseDescription": "Success. Request accepted for processing",
                    "CustomerMessage": "Success. Request accepted for processing"
                }"#,
            )
            .create_async()
            .await;

        let app = app(&server.url());
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/invoices/QP-2046/pay")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let fetch = app
            .oneshot(
                Request::builder()
                    .uri("/api/invoices/QP-2046")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(fetch).await;
        assert_eq!(json["status"], "pending_payment");
        assert!(json.get("paymentInitiatedAt").is_some());
    }

    #[tokio::test]
    async fn test_view_route_paginates() {
        let response = app("http://127.0.0.1:1")
            .oneshot(
                Request::builder()
                    .uri("/api/invoices/view?status=Paid&sort=amount-asc&page=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["total"], 6);
        let amounts: Vec<f64> = json["invoices"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["amount"].as_f64().unwrap())
            .collect();
        let mut sorted = amounts.clone();
        sorted.sort_by(f64::total_cmp);
        assert_eq!(amounts, sorted);
    }

    #[tokio::test]
    async fn test_profile_update_merges() {
        let app = app("http://127.0.0.1:1");
        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/account/profile")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"Demo User"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["name"], "Demo User");
        assert_eq!(json["email"], "charles@gmail.com");
    }
}
