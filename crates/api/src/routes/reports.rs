//! Report routes.
//!
//! `as_of` defaults to today in the configured reporting time zone.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tally_core::reports::{
    BalanceMode, BalanceSheetReport, IncomeStatementReport, TrialBalanceReport,
};
use tally_shared::types::TenantId;

use crate::{AppState, error::ApiError};

/// Creates the report routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/tenants/{tenant_id}/reports/trial-balance",
            get(get_trial_balance),
        )
        .route(
            "/tenants/{tenant_id}/reports/balance-sheet",
            get(get_balance_sheet),
        )
        .route(
            "/tenants/{tenant_id}/reports/income-statement",
            get(get_income_statement),
        )
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Query parameters for the trial balance.
#[derive(Debug, Default, Deserialize)]
pub struct TrialBalanceQuery {
    /// As of date (defaults to today).
    pub as_of: Option<NaiveDate>,
    /// `auto` (default), `cached` or `recomputed`.
    #[serde(default)]
    pub basis: BalanceMode,
}

/// Query parameters for the balance sheet.
#[derive(Debug, Default, Deserialize)]
pub struct BalanceSheetQuery {
    /// As of date (defaults to today).
    pub as_of: Option<NaiveDate>,
}

/// Query parameters for the income statement.
#[derive(Debug, Default, Deserialize)]
pub struct IncomeStatementQuery {
    /// Period end (defaults to today).
    pub as_of: Option<NaiveDate>,
    /// Period start; omitted means since inception.
    pub from: Option<NaiveDate>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET `/tenants/{tenant_id}/reports/trial-balance`
async fn get_trial_balance(
    State(state): State<AppState>,
    Path(tenant_id): Path<TenantId>,
    Query(query): Query<TrialBalanceQuery>,
) -> Result<Json<TrialBalanceReport>, ApiError> {
    let as_of = query.as_of.unwrap_or_else(|| state.reports.today());
    let report = state
        .reports
        .trial_balance_with(tenant_id, as_of, query.basis)
        .await?;
    Ok(Json(report))
}

/// GET `/tenants/{tenant_id}/reports/balance-sheet`
async fn get_balance_sheet(
    State(state): State<AppState>,
    Path(tenant_id): Path<TenantId>,
    Query(query): Query<BalanceSheetQuery>,
) -> Result<Json<BalanceSheetReport>, ApiError> {
    let as_of = query.as_of.unwrap_or_else(|| state.reports.today());
    let report = state.reports.balance_sheet(tenant_id, as_of).await?;
    Ok(Json(report))
}

/// GET `/tenants/{tenant_id}/reports/income-statement`
async fn get_income_statement(
    State(state): State<AppState>,
    Path(tenant_id): Path<TenantId>,
    Query(query): Query<IncomeStatementQuery>,
) -> Result<Json<IncomeStatementReport>, ApiError> {
    let as_of = query.as_of.unwrap_or_else(|| state.reports.today());
    let report = match query.from {
        Some(from) => {
            state
                .reports
                .income_statement_for_period(tenant_id, from, as_of)
                .await?
        }
        None => state.reports.income_statement(tenant_id, as_of).await?,
    };
    Ok(Json(report))
}
