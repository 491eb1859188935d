use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::services::column_roles::{ColumnRoles, SecondaryRoles};
use crate::services::dashboard::{compute_dashboard, DashboardReport, DashboardRequest};
use crate::services::filter::FilterPredicate;
use crate::services::risk_ranking::{RiskWeights, WeightPolicy};
use crate::services::table::Table;
use crate::state::AppState;

/// Tables plus optional per-request overrides of the server configuration.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct DashboardPayload {
    pub queries: Table,
    #[serde(default)]
    pub missing_pages: Option<Table>,
    #[serde(default)]
    pub roles: Option<ColumnRoles>,
    #[serde(default)]
    pub secondary_roles: Option<SecondaryRoles>,
    /// Weights for this request regardless of whether missing pages are present.
    #[serde(default)]
    pub weights: Option<RiskWeights>,
    #[serde(default)]
    pub filters: Vec<FilterPredicate>,
    #[serde(default)]
    pub option_columns: Option<Vec<String>>,
    /// Reference time for derived ages; the server clock when omitted.
    #[serde(default)]
    pub reference_time: Option<DateTime<Utc>>,
}

impl DashboardPayload {
    fn into_request(self, state: &AppState) -> AppResult<(DashboardRequest, Option<DateTime<Utc>>)> {
        let config = &state.config;
        let weights = match self.weights {
            Some(weights) => {
                if ![weights.open, weights.age, weights.secondary]
                    .iter()
                    .all(|value| value.is_finite())
                {
                    return Err(AppError::bad_request("weights must be finite numbers"));
                }
                WeightPolicy {
                    with_secondary: weights,
                    primary_only: weights,
                }
            }
            None => config.weights,
        };
        let request = DashboardRequest {
            queries: self.queries,
            missing_pages: self.missing_pages,
            roles: self.roles.unwrap_or_else(|| config.roles.clone()),
            secondary_roles: self
                .secondary_roles
                .unwrap_or_else(|| config.secondary_roles.clone()),
            weights,
            filters: self.filters,
            option_columns: self
                .option_columns
                .unwrap_or_else(|| config.option_columns.clone()),
        };
        Ok((request, self.reference_time))
    }
}

#[utoipa::path(
    post,
    path = "/api/dashboard",
    request_body = DashboardPayload,
    responses(
        (status = 200, description = "Dashboard computed", body = DashboardReport),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 422, description = "Column mapping or date column rejected", body = crate::error::ErrorResponse)
    )
)]
pub(crate) async fn compute_dashboard_handler(
    State(state): State<AppState>,
    Json(payload): Json<DashboardPayload>,
) -> AppResult<Json<DashboardReport>> {
    let (request, reference_time) = payload.into_request(&state)?;
    let reference = reference_time.unwrap_or_else(Utc::now);
    let report = compute_dashboard(&request, reference)?;
    Ok(Json(report))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", post(compute_dashboard_handler))
}
