//! Medical record endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::medical_records;
use crate::models::MedicalRecord;

#[derive(Debug, Deserialize)]
pub struct MedicalRecordRequest {
    pub patient_id: Uuid,
}

/// `POST /api/medical-record`: the patient's record, created on first call.
pub async fn create(
    State(ctx): State<ApiContext>,
    payload: Result<Json<MedicalRecordRequest>, JsonRejection>,
) -> Result<Json<MedicalRecord>, ApiError> {
    let Json(request) = payload?;
    let record = ctx
        .with_conn(move |conn| medical_records::create_for_patient(conn, &request.patient_id))
        .await?;
    Ok(Json(record))
}

/// `GET /api/medical-record/:mr_number`
pub async fn by_number(
    State(ctx): State<ApiContext>,
    Path(mr_number): Path<String>,
) -> Result<Json<MedicalRecord>, ApiError> {
    let record = ctx
        .with_conn(move |conn| medical_records::find_by_number(conn, &mr_number))
        .await?;
    Ok(Json(record))
}
