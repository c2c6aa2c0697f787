//! Self-registration and credential check for patient accounts.
//!
//! - `POST /api/register`: patient record plus account, 201 or 409
//! - `POST /api/login`: confirms an email/password pair and returns the
//!   account profile. No session token is issued.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::accounts::{self, Registration};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{Account, NewPatient};

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(flatten)]
    pub patient: NewPatient,
    pub password: String,
}

/// `POST /api/register`
pub async fn register(
    State(ctx): State<ApiContext>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Registration>), ApiError> {
    let Json(request) = payload?;
    let registration = ctx
        .with_conn_and_hasher(move |conn, hasher| {
            accounts::register_patient(conn, hasher, &request.patient, &request.password)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `POST /api/login`
pub async fn login(
    State(ctx): State<ApiContext>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Account>, ApiError> {
    let Json(request) = payload?;
    let account = ctx
        .with_conn_and_hasher(move |conn, hasher| {
            accounts::verify_credentials(conn, hasher, &request.email, &request.password)
        })
        .await?;

    match account {
        Some(account) => Ok(Json(account)),
        None => {
            tracing::info!("Rejected login attempt");
            Err(ApiError::Unauthorized)
        }
    }
}
