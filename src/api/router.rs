//! Intake API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.

use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the intake API router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn intake_api_router(ctx: ApiContext) -> Router {
    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/register", post(endpoints::auth::register))
        .route("/login", post(endpoints::auth::login))
        .route(
            "/patients",
            get(endpoints::patients::list).post(endpoints::patients::upsert),
        )
        .route("/patients/:national_id", get(endpoints::patients::by_national_id))
        .route(
            "/patients/:national_id/screenings",
            get(endpoints::patients::screening_history),
        )
        .route(
            "/screening/questions",
            get(endpoints::screening::list_questions).post(endpoints::screening::create_question),
        )
        .route(
            "/screening/questions/:id",
            patch(endpoints::screening::update_question),
        )
        .route("/screening/answers", post(endpoints::screening::submit_answers))
        .route(
            "/screening/answers/:id",
            get(endpoints::screening::get_answers).patch(endpoints::screening::correct_answers),
        )
        .route(
            "/screening/queue",
            get(endpoints::queue::list).post(endpoints::queue::enqueue),
        )
        .route("/screening/queue/:id", get(endpoints::queue::detail))
        .route(
            "/screening/queue/:id/status",
            patch(endpoints::queue::update_status),
        )
        .route("/screening/with-patient", post(endpoints::screening::walk_in))
        .route("/medical-record", post(endpoints::medical_records::create))
        .route(
            "/medical-record/:mr_number",
            get(endpoints::medical_records::by_number),
        )
        .route_layer(axum::middleware::from_fn(middleware::audit::log_access))
        .with_state(ctx);

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
}
