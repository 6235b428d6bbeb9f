//! Blockchain endpoints: chain config and the four attestation steps.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use spacedata_attest::{
    generate_request_id, ChainConfigView, DeliveryReceipt, FetchedProof, GenerateRequestIdBody,
    GeneratedRequestId, PendingAttestation, ProofBody, RequestAttestationBody, VerificationOutcome,
};

use super::json_body;
use crate::attestation::FetchOutcome;
use crate::error::AppError;
use crate::state::AppState;

/// Creates the blockchain router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/config", get(get_config))
        .route("/request-attestation", post(request_attestation))
        .route("/fetch-attestation/{request_id}", get(fetch_attestation))
        .route("/verify-attestation", post(verify_attestation))
        .route("/deliver-data", post(deliver_data))
        .route("/generate-request-id", post(generate_id))
        .with_state(state)
}

async fn get_config(State(state): State<AppState>) -> Json<ChainConfigView> {
    Json(state.attestation.config_view().clone())
}

async fn request_attestation(
    State(state): State<AppState>,
    payload: Result<Json<RequestAttestationBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let body = json_body(payload)?;
    let attestation_type = body
        .attestation_type
        .ok_or_else(|| AppError::missing_field("attestation_type"))?;
    let parameters = body
        .parameters
        .ok_or_else(|| AppError::missing_field("parameters"))?;

    let submission = state
        .attestation
        .request_attestation(&attestation_type, &parameters)
        .await?;
    Ok(Json(submission).into_response())
}

async fn fetch_attestation(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Response, AppError> {
    match state.attestation.fetch_attestation_result(&request_id).await? {
        FetchOutcome::Ready(proof) => Ok(Json(FetchedProof {
            success: true,
            proof,
        })
        .into_response()),
        FetchOutcome::NotReady => {
            Ok((StatusCode::ACCEPTED, Json(PendingAttestation::new(request_id))).into_response())
        }
    }
}

/// Pulls the three proof fields out of a body, naming the first one missing.
fn proof_fields(body: ProofBody) -> Result<(String, String, String), AppError> {
    let request_id = body
        .request_id
        .ok_or_else(|| AppError::missing_field("request_id"))?;
    let attestation_response = body
        .attestation_response
        .ok_or_else(|| AppError::missing_field("attestation_response"))?;
    let proof = body.proof.ok_or_else(|| AppError::missing_field("proof"))?;
    Ok((request_id, attestation_response, proof))
}

async fn verify_attestation(
    State(state): State<AppState>,
    payload: Result<Json<ProofBody>, JsonRejection>,
) -> Result<Json<VerificationOutcome>, AppError> {
    let (request_id, attestation_response, proof) = proof_fields(json_body(payload)?)?;
    let verified = state
        .attestation
        .verify_attestation(&request_id, &attestation_response, &proof)
        .await?;
    Ok(Json(VerificationOutcome {
        success: true,
        verified,
    }))
}

async fn deliver_data(
    State(state): State<AppState>,
    payload: Result<Json<ProofBody>, JsonRejection>,
) -> Result<Json<DeliveryReceipt>, AppError> {
    let (request_id, attestation_response, proof) = proof_fields(json_body(payload)?)?;
    let transaction_hash = state
        .attestation
        .deliver_data(&request_id, &attestation_response, &proof)
        .await?;
    Ok(Json(DeliveryReceipt {
        success: true,
        transaction_hash,
    }))
}

async fn generate_id(
    payload: Result<Json<GenerateRequestIdBody>, JsonRejection>,
) -> Result<Json<GeneratedRequestId>, AppError> {
    let data_info = json_body(payload)?
        .data_info
        .ok_or_else(|| AppError::missing_field("data_info"))?;
    let request_id = generate_request_id(&data_info)
        .map_err(|e| AppError::Internal(format!("Failed to generate request ID: {e}")))?;
    tracing::info!("Generated request ID: {}", request_id);
    Ok(Json(GeneratedRequestId {
        success: true,
        request_id,
    }))
}
