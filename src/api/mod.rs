//! Intake HTTP API.
//!
//! Exposes patient registration, screening and medical-record numbering
//! as JSON endpoints. Routes are nested under `/api/` behind a request
//! log and a permissive CORS layer.
//!
//! The router is composable: `intake_api_router()` returns a `Router`
//! that can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::intake_api_router;
pub use server::{start_api_server, ApiServer};
pub use types::ApiContext;
