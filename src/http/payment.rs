//! Checkout and gateway callback endpoints.
//!
//! The success/failure endpoints are called by the gateway itself
//! (form-encoded, unauthenticated) and answer with a redirect that sends the
//! buyer's browser back to the frontend.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::{Form, Json};
use serde::{Deserialize, Serialize};

use crate::domain::Order;
use crate::error::{Error, Result};
use crate::http::AppState;
use crate::payment::{CheckoutOutcome, CheckoutRequest, GatewayResponse, SuccessCallback};

pub async fn checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutOutcome>)> {
    let outcome = state.reconciler.checkout(request).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn payment_success(
    State(state): State<AppState>,
    Form(callback): Form<SuccessCallback>,
) -> Result<Redirect> {
    let order = state.reconciler.confirm_payment(&callback).await?;
    tracing::info!(txnid = %callback.txnid, order_id = %order.id, "gateway reported success");
    Ok(Redirect::to(&format!(
        "{}/payment/success?txnid={}&mihpayid={}",
        state.frontend_url, callback.txnid, callback.mihpayid
    )))
}

#[derive(Debug, Deserialize)]
pub struct FailureCallback {
    pub txnid: String,
    #[serde(default)]
    pub status: String,
}

/// Always redirects: the gateway may post failures for unknown or expired
/// attempts, and the buyer still needs to land somewhere.
pub async fn payment_failure(
    State(state): State<AppState>,
    Form(callback): Form<FailureCallback>,
) -> Redirect {
    tracing::warn!(txnid = %callback.txnid, status = %callback.status, "gateway reported failure");
    if let Err(e) = state.reconciler.fail_payment(&callback.txnid).await {
        tracing::error!(txnid = %callback.txnid, error = %e, "failed to record payment failure");
    }
    Redirect::to(&format!("{}/payment/failure?txnid={}", state.frontend_url, callback.txnid))
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub txnid: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub order: Order,
    pub gateway_response: GatewayResponse,
}

/// Reconciliation fallback: asks the gateway for the transaction status
/// out-of-band and applies the result locally.
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>> {
    let gateway_response = state.reconciler.gateway().verify_payment(&request.txnid).await?;
    let order = match gateway_response.status {
        Some(status) => state.reconciler.apply_verification(&request.txnid, status).await?,
        // No recognizable status: surface the raw response, leave the order
        // as it stands.
        None => state
            .orders
            .find_by_txn_ref(&request.txnid)
            .await?
            .ok_or(Error::NotFound("Order"))?,
    };
    Ok(Json(VerifyResponse { order, gateway_response }))
}
