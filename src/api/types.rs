//! Shared types for the HTTP layer.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::crypto::PasswordHasher;
use crate::db::Store;
use crate::error::IntakeError;
use crate::models::{Page, PageRequest};
use crate::screening::ScreeningWorkflow;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all routes. Holds no connection: every request
/// opens its own through [`ApiContext::with_conn`].
#[derive(Clone)]
pub struct ApiContext {
    pub workflow: ScreeningWorkflow,
}

impl ApiContext {
    pub fn new(workflow: ScreeningWorkflow) -> Self {
        Self { workflow }
    }

    pub fn store(&self) -> &Store {
        self.workflow.store()
    }

    /// Run blocking storage work on a fresh connection bound to the
    /// store's default deadline.
    pub async fn with_conn<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, IntakeError> + Send + 'static,
    {
        let store = self.store().clone();
        tokio::task::spawn_blocking(move || -> Result<T, IntakeError> {
            let conn = store.connect(store.deadline())?;
            work(&conn)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("storage task failed: {e}")))?
        .map_err(ApiError::from)
    }

    /// Like [`ApiContext::with_conn`], with access to the password hasher.
    pub async fn with_conn_and_hasher<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &dyn PasswordHasher) -> Result<T, IntakeError> + Send + 'static,
    {
        let workflow = self.workflow.clone();
        tokio::task::spawn_blocking(move || -> Result<T, IntakeError> {
            let store = workflow.store();
            let conn = store.connect(store.deadline())?;
            work(&conn, workflow.hasher())
        })
        .await
        .map_err(|e| ApiError::Internal(format!("storage task failed: {e}")))?
        .map_err(ApiError::from)
    }
}

// ═══════════════════════════════════════════════════════════
// Pagination
// ═══════════════════════════════════════════════════════════

/// `?page=&limit=` query parameters. Missing values take the defaults;
/// zero or negative values are rejected.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn to_request(&self) -> Result<PageRequest, ApiError> {
        PageRequest::new(
            self.page.unwrap_or(DEFAULT_PAGE),
            self.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .map_err(ApiError::from)
    }
}

#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

/// `{ "data": [...], "meta": {...} }` list envelope.
#[derive(Debug, Serialize)]
pub struct Paged<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> From<Page<T>> for Paged<T> {
    fn from(page: Page<T>) -> Self {
        let meta = PageMeta {
            page: page.page,
            limit: page.page_size,
            total: page.total,
            total_pages: page.total_pages(),
        };
        Self {
            data: page.items,
            meta,
        }
    }
}

/// Acknowledgement body for updates that return no entity.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
