//! Patient registration endpoints.
//!
//! - `POST /api/patients`: create, or overwrite by national ID
//! - `GET /api/patients`: paginated, newest first
//! - `GET /api/patients/:national_id`
//! - `GET /api/patients/:national_id/screenings`: answer history, newest first

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, PageQuery, Paged};
use crate::models::{NewPatient, Patient, ScreeningAnswer};
use crate::registry;
use crate::screening::intake;

/// `POST /api/patients`: 201 when the national ID was new, 200 when an
/// existing patient was overwritten.
pub async fn upsert(
    State(ctx): State<ApiContext>,
    payload: Result<Json<NewPatient>, JsonRejection>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let Json(input) = payload?;
    let (patient, created) = ctx
        .with_conn(move |conn| registry::resolve_or_upsert(conn, &input))
        .await?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(patient)))
}

pub async fn list(
    State(ctx): State<ApiContext>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Paged<Patient>>, ApiError> {
    let Query(query) = query?;
    let page = query.to_request()?;
    let result = ctx
        .with_conn(move |conn| registry::list_paginated(conn, &page))
        .await?;
    Ok(Json(result.into()))
}

pub async fn by_national_id(
    State(ctx): State<ApiContext>,
    Path(national_id): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    let patient = ctx
        .with_conn(move |conn| registry::find_by_national_id(conn, &national_id))
        .await?;
    Ok(Json(patient))
}

pub async fn screening_history(
    State(ctx): State<ApiContext>,
    Path(national_id): Path<String>,
) -> Result<Json<Vec<ScreeningAnswer>>, ApiError> {
    let answers = ctx
        .with_conn(move |conn| intake::history(conn, &national_id))
        .await?;
    Ok(Json(answers))
}
