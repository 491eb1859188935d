use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::routes::dashboard::DashboardPayload;
use crate::routes::health::HealthResponse;
use crate::services::aging::{AgingBucket, BucketCount};
use crate::services::column_roles::{AgeSource, ColumnRoles, SecondaryRoles};
use crate::services::dashboard::DashboardReport;
use crate::services::filter::FilterPredicate;
use crate::services::kpis::KpiSummary;
use crate::services::missing_pages::GroupCount;
use crate::services::risk_ranking::{RankingRow, RiskWeights};
use crate::services::table::Table;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(title = "query-risk", description = "Query aging and subject risk ranking"),
    paths(
        crate::routes::health::healthz_handler,
        crate::routes::dashboard::compute_dashboard_handler
    ),
    components(schemas(
        HealthResponse,
        ErrorResponse,
        DashboardPayload,
        DashboardReport,
        Table,
        ColumnRoles,
        AgeSource,
        SecondaryRoles,
        RiskWeights,
        FilterPredicate,
        KpiSummary,
        BucketCount,
        AgingBucket,
        RankingRow,
        GroupCount
    ))
)]
pub struct ApiDoc;

pub fn openapi_json() -> serde_json::Value {
    serde_json::to_value(ApiDoc::openapi()).unwrap_or_else(|err| {
        tracing::error!(error = %err, "failed to serialize openapi document");
        serde_json::Value::Null
    })
}

async fn openapi_handler() -> Json<serde_json::Value> {
    Json(openapi_json())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_handler))
}
