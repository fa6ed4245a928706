//! Finance reports, gated by a store-checked permission.

use axum::Json;

use crate::models::ReportsResponse;

/// Permission slug required for `/api/reports`.
pub const REPORTS_PERMISSION: &str = "FIN_VIEW";

/// `GET /api/reports`: demo payload.
pub async fn reports_handler() -> Json<ReportsResponse> {
    Json(ReportsResponse {
        reports: vec!["quarterly-summary".into(), "ledger-balance".into()],
    })
}

/// `GET /api/reports/summary`: gated by the token's own permission slugs
/// (re-validated by the session stage rather than re-read from the store).
pub async fn summary_handler() -> Json<ReportsResponse> {
    Json(ReportsResponse {
        reports: vec!["quarterly-summary".into()],
    })
}
