//! HTTP endpoint handlers, one module per resource.

pub mod auth;
pub mod health;
pub mod medical_records;
pub mod patients;
pub mod queue;
pub mod screening;
