//! Intake queue endpoints.
//!
//! - `POST /api/screening/queue`: queue a stored screening
//! - `GET /api/screening/queue?status=&page=&limit=`
//! - `GET /api/screening/queue/:id`
//! - `PATCH /api/screening/queue/:id/status`

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, PageQuery, Paged};
use crate::models::enums::QueueStatus;
use crate::models::{PatientInfo, QueueEntry, StatusUpdate};
use crate::screening::queue;

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub patient_info: PatientInfo,
    pub screening_answer_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct QueueListQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn enqueue(
    State(ctx): State<ApiContext>,
    payload: Result<Json<EnqueueRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<QueueEntry>), ApiError> {
    let Json(request) = payload?;
    let entry = ctx
        .with_conn(move |conn| {
            queue::enqueue(conn, &request.patient_info, &request.screening_answer_id)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Defaults to the waiting line, first page of ten.
pub async fn list(
    State(ctx): State<ApiContext>,
    query: Result<Query<QueueListQuery>, QueryRejection>,
) -> Result<Json<Paged<QueueEntry>>, ApiError> {
    let Query(query) = query?;
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .to_request()?;
    let status = query
        .status
        .unwrap_or_else(|| QueueStatus::ScreeningPending.as_str().to_string());
    let result = ctx
        .with_conn(move |conn| queue::list_paginated(conn, &status, &page))
        .await?;
    Ok(Json(result.into()))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<QueueEntry>, ApiError> {
    let Path(id) = id?;
    let entry = ctx.with_conn(move |conn| queue::find(conn, &id)).await?;
    Ok(Json(entry))
}

pub async fn update_status(
    State(ctx): State<ApiContext>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<QueueEntry>, ApiError> {
    let Path(id) = id?;
    let Json(update) = payload?;
    let entry = ctx
        .with_conn(move |conn| queue::update_status(conn, &id, &update.status))
        .await?;
    Ok(Json(entry))
}
