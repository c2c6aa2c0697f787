//! Screening questionnaire, answer intake and the walk-in flow.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, MessageResponse};
use crate::models::{
    AnswerCorrection, AnswerItem, NewQuestion, PatientInfo, QuestionPatch, ScreeningAnswer,
    ScreeningQuestion,
};
use crate::screening::{intake, questions, WalkInOutcome, WalkInRequest};

// ─── Questions ────────────────────────────────────────────────────────────────

pub async fn list_questions(
    State(ctx): State<ApiContext>,
) -> Result<Json<Vec<ScreeningQuestion>>, ApiError> {
    let questions = ctx.with_conn(|conn| questions::list(conn)).await?;
    Ok(Json(questions))
}

pub async fn create_question(
    State(ctx): State<ApiContext>,
    payload: Result<Json<NewQuestion>, JsonRejection>,
) -> Result<(StatusCode, Json<ScreeningQuestion>), ApiError> {
    let Json(input) = payload?;
    let question = ctx
        .with_conn(move |conn| questions::create(conn, input))
        .await?;
    Ok((StatusCode::CREATED, Json(question)))
}

pub async fn update_question(
    State(ctx): State<ApiContext>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<QuestionPatch>, JsonRejection>,
) -> Result<Json<ScreeningQuestion>, ApiError> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    let question = ctx
        .with_conn(move |conn| questions::update(conn, &id, patch))
        .await?;
    Ok(Json(question))
}

// ─── Answers ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitAnswersRequest {
    pub patient_info: PatientInfo,
    #[serde(default)]
    pub answers: Vec<AnswerItem>,
}

pub async fn submit_answers(
    State(ctx): State<ApiContext>,
    payload: Result<Json<SubmitAnswersRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ScreeningAnswer>), ApiError> {
    let Json(request) = payload?;
    let answer = ctx
        .with_conn(move |conn| intake::submit(conn, &request.patient_info, request.answers))
        .await?;
    Ok((StatusCode::CREATED, Json(answer)))
}

pub async fn get_answers(
    State(ctx): State<ApiContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ScreeningAnswer>, ApiError> {
    let Path(id) = id?;
    let answer = ctx.with_conn(move |conn| intake::find(conn, &id)).await?;
    Ok(Json(answer))
}

pub async fn correct_answers(
    State(ctx): State<ApiContext>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<AnswerCorrection>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(id) = id?;
    let Json(correction) = payload?;
    ctx.with_conn(move |conn| intake::correct(conn, &id, correction))
        .await?;
    Ok(Json(MessageResponse {
        message: "screening answers updated",
    }))
}

// ─── Walk-in ──────────────────────────────────────────────────────────────────

/// `POST /api/screening/with-patient`: register, screen and queue in one go.
pub async fn walk_in(
    State(ctx): State<ApiContext>,
    payload: Result<Json<WalkInRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<WalkInOutcome>), ApiError> {
    let Json(request) = payload?;
    let workflow = ctx.workflow.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let deadline = workflow.store().deadline();
        workflow.run_walk_in_screening(deadline, &request)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("walk-in task failed: {e}")))??;

    Ok((StatusCode::CREATED, Json(outcome)))
}
