use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use canvas_core::{fingerprint_image, JobId};
use canvas_policies::AdmissionPolicy;
use log::{debug, error, info};
use serde_json::json;

use super::types::{JobStateView, ProofStatusResponse, StatusQuery, VerificationRequest, VerificationResponse,
                   MISSING_IMAGE_ID};
use crate::app::AppState;
use crate::errors::ApiError;
use crate::jobs::{with_store, DispatchOutcome};

/// Longitud máxima de los campos de la petición en los logs.
const LOG_FIELD_CHARS: usize = 30;

fn truncate_for_log(s: &str) -> String {
    s.chars().take(LOG_FIELD_CHARS).collect()
}

pub async fn index() -> &'static str {
    "Hello, World!"
}

pub async fn available_contracts() -> &'static str {
    "Available Contracts"
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "truecanvas",
        "version": env!("CARGO_PKG_VERSION"),
        "jobs": state.jobs.counts(),
    }))
}

/// `POST /verify`: admisión, fingerprint y despacho. Responde sin esperar
/// al worker.
pub async fn verify(State(state): State<AppState>, body: Bytes) -> Result<Json<VerificationResponse>, ApiError> {
    let req: VerificationRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(format!("invalid request body: {e}")))?;
    info!("verify: image={} logs={}", truncate_for_log(&req.image), truncate_for_log(&req.logs));

    let decision = state.policy.evaluate(&req.logs);
    if !decision.accepted {
        info!("verify: rejected policy={} hits={} scaled={} len={}",
              state.policy.policy_id(), decision.marker_hits, decision.scaled_hits, decision.text_len);
        return Ok(Json(VerificationResponse::unverified()));
    }

    let job_id = fingerprint_image(&req.image);
    match state.jobs.dispatch(job_id.clone(), req.image).await? {
        DispatchOutcome::Spawned { attempt } => debug!("verify: job_id={job_id} spawned attempt={attempt}"),
        DispatchOutcome::AlreadyKnown(st) => debug!("verify: job_id={job_id} already {st}"),
        DispatchOutcome::AlreadyProven => debug!("verify: job_id={job_id} already proven"),
        DispatchOutcome::ShuttingDown => error!("verify: job_id={job_id} not dispatched, shutting down"),
    }
    Ok(Json(VerificationResponse::verified(&job_id)))
}

/// `GET /proof_status?imageID=<id>`.
pub async fn proof_status(State(state): State<AppState>, Query(query): Query<StatusQuery>) -> Result<Response, ApiError> {
    let Some(raw) = query.image_id.filter(|id| !id.is_empty()) else {
        return Ok(MISSING_IMAGE_ID.into_response());
    };
    // Un id mal formado no puede tener registro: se responde como desconocido.
    let Ok(job_id) = JobId::parse(&raw) else {
        debug!("proof_status: malformed imageID={}", truncate_for_log(&raw));
        return Ok(Json(ProofStatusResponse::unproven(JobStateView::Unknown)).into_response());
    };

    let key = job_id.clone();
    let body = match with_store(state.store(), move |store| store.get(&key)).await {
        Ok(artifact) => ProofStatusResponse::proven(artifact),
        Err(e) if e.is_not_found() => ProofStatusResponse::unproven(state.jobs.state(&job_id).into()),
        Err(e) => return Err(e.into()),
    };
    Ok(Json(body).into_response())
}
