//! Pre-visit health screening: questionnaire, answer intake, the intake
//! queue, and the walk-in workflow that ties them to patient registration.

pub mod intake;
pub mod questions;
pub mod queue;
pub mod workflow;

pub use workflow::{ScreeningWorkflow, WalkInOutcome, WalkInRequest};
