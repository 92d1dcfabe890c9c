//! Chart of accounts routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use tally_core::accounts::{Account, AccountType, NewAccount, NormalSide};
use tally_shared::types::{AccountId, TenantId};
use tracing::info;

use crate::{AppState, error::ApiError};

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/tenants/{tenant_id}/accounts",
            get(list_accounts).post(create_account),
        )
        .route(
            "/tenants/{tenant_id}/accounts/{account_id}",
            get(get_account).patch(update_account),
        )
        .route(
            "/tenants/{tenant_id}/accounts/{account_id}/ledger",
            get(get_account_ledger),
        )
}

/// Query parameters for listing accounts.
#[derive(Debug, Default, Deserialize)]
pub struct ListAccountsQuery {
    /// Filter by account type.
    #[serde(rename = "type")]
    pub account_type: Option<AccountType>,
    /// Filter by active status.
    pub active: Option<bool>,
}

/// Request body for creating an account.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Account code (unique within the tenant).
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Parent account ID for hierarchical structure.
    pub parent_id: Option<AccountId>,
}

/// Request body for updating an account.
///
/// `"parent_id": null` moves the account to the top level; omitting the
/// field leaves the parent unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateAccountRequest {
    /// New parent.
    #[serde(default, deserialize_with = "present")]
    pub parent_id: Option<Option<AccountId>>,
    /// Activate or deactivate.
    pub is_active: Option<bool>,
}

/// Distinguishes an explicit `null` from a missing field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Query parameters for the account ledger.
#[derive(Debug, Default, Deserialize)]
pub struct LedgerQuery {
    /// Start date (inclusive). Defaults to inception.
    pub from: Option<NaiveDate>,
    /// End date (inclusive). Defaults to today.
    pub to: Option<NaiveDate>,
}

/// Response for an account.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// Account ID.
    pub id: AccountId,
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Side on which the balance grows.
    pub normal_side: NormalSide,
    /// Parent account ID.
    pub parent_id: Option<AccountId>,
    /// Cached running balance.
    pub balance: Decimal,
    /// Whether the account accepts new lines.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            normal_side: account.normal_side(),
            id: account.id,
            code: account.code,
            name: account.name,
            account_type: account.account_type,
            parent_id: account.parent_id,
            balance: account.current_balance,
            is_active: account.is_active,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// POST `/tenants/{tenant_id}/accounts` - Register an account.
async fn create_account(
    State(state): State<AppState>,
    Path(tenant_id): Path<TenantId>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .store
        .create_account(NewAccount {
            tenant_id,
            code: request.code,
            name: request.name,
            account_type: request.account_type,
            parent_id: request.parent_id,
        })
        .await?;

    info!(tenant_id = %tenant_id, account_id = %account.id, code = %account.code, "account created");
    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}

/// GET `/tenants/{tenant_id}/accounts` - List accounts ordered by code.
async fn list_accounts(
    State(state): State<AppState>,
    Path(tenant_id): Path<TenantId>,
    Query(query): Query<ListAccountsQuery>,
) -> Result<Json<Vec<AccountResponse>>, ApiError> {
    let accounts = state.store.list_accounts(tenant_id).await?;

    Ok(Json(
        accounts
            .into_iter()
            .filter(|a| query.account_type.is_none_or(|t| t == a.account_type))
            .filter(|a| query.active.is_none_or(|active| active == a.is_active))
            .map(AccountResponse::from)
            .collect(),
    ))
}

/// GET `/tenants/{tenant_id}/accounts/{account_id}`
async fn get_account(
    State(state): State<AppState>,
    Path((tenant_id, account_id)): Path<(TenantId, AccountId)>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.store.get_account(tenant_id, account_id).await?;
    Ok(Json(account.into()))
}

/// PATCH `/tenants/{tenant_id}/accounts/{account_id}` - Re-parent and/or
/// (de)activate.
async fn update_account(
    State(state): State<AppState>,
    Path((tenant_id, account_id)): Path<(TenantId, AccountId)>,
    Json(request): Json<UpdateAccountRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let mut account = None;

    if let Some(parent_id) = request.parent_id {
        account = Some(
            state
                .store
                .set_parent(tenant_id, account_id, parent_id)
                .await?,
        );
    }
    if let Some(is_active) = request.is_active {
        let updated = state
            .store
            .set_active(tenant_id, account_id, is_active)
            .await?;
        info!(tenant_id = %tenant_id, account_id = %account_id, is_active, "account activity changed");
        account = Some(updated);
    }

    let account = match account {
        Some(account) => account,
        None => state.store.get_account(tenant_id, account_id).await?,
    };
    Ok(Json(account.into()))
}

/// GET `/tenants/{tenant_id}/accounts/{account_id}/ledger` - General ledger
/// with running balance.
async fn get_account_ledger(
    State(state): State<AppState>,
    Path((tenant_id, account_id)): Path<(TenantId, AccountId)>,
    Query(query): Query<LedgerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .reports
        .account_ledger(tenant_id, account_id, query.from, query.to)
        .await?;
    Ok(Json(report))
}
