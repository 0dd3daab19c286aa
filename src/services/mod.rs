// Domain rules
pub mod bom_linker;
pub mod code_generator;

// Registries
pub mod bom;
pub mod items;

// Import / export
pub mod spreadsheet;

use sea_orm::{
    sea_query::{Expr, Func, SimpleExpr},
    ColumnTrait,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;

/// Outcome of a best-effort bulk operation. Rows are processed independently
/// and a failing row never rolls back the others.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkResult {
    /// Ids of the records that were written or deleted.
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<BulkFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkFailure {
    /// Zero-based position in the request (or data row for imports).
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub error: String,
}

impl BulkResult {
    pub fn record(&mut self, index: usize, id: Option<Uuid>, outcome: Result<Uuid, ServiceError>) {
        match outcome {
            Ok(id) => self.succeeded.push(id),
            Err(err) => {
                crate::metrics::REGISTRY_METRICS.bulk_row_failures.inc();
                self.failed.push(BulkFailure {
                    index,
                    id,
                    error: err.response_message(),
                })
            }
        }
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// `lower(column) LIKE %needle%`, escaping LIKE wildcards in the needle.
pub(crate) fn contains_ci<C: ColumnTrait>(column: C, needle: &str) -> SimpleExpr {
    let escaped = needle
        .trim()
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Expr::expr(Func::lower(Expr::col(column))).like(
        sea_orm::sea_query::LikeExpr::new(format!("%{}%", escaped)).escape('\\'),
    )
}

/// Maps an update that matched no row. With a version filter the row was
/// either changed or removed by someone else; without one it can only have
/// been removed.
pub(crate) fn unmatched_update(kind: &str, id: Uuid, versioned: bool) -> ServiceError {
    if versioned {
        crate::metrics::REGISTRY_METRICS.version_conflicts.inc();
        ServiceError::ConcurrentModification(id)
    } else {
        ServiceError::NotFound(format!("{} {} not found", kind, id))
    }
}

/// Treats `Some("")` from query strings as absent.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
