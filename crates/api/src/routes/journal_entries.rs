//! Journal entry routes.
//!
//! Creation optionally posts in the same request; posting, reversal and
//! cancellation are separate actions on an existing entry.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tally_core::ledger::{
    BalanceChange, EntryFilter, EntryStatus, EntryTotals, InitialStatus, JournalEntry,
    JournalEntryWithLines, JournalLine, JournalLineInput, NewJournalEntry, PostOutcome,
    ReverseEntry,
};
use tally_shared::types::{EntryId, PageRequest, PageResponse, TenantId};

use crate::{AppState, error::ApiError, extractors::Actor};

/// Creates the journal entry routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/tenants/{tenant_id}/journal-entries",
            get(list_entries).post(create_entry),
        )
        .route(
            "/tenants/{tenant_id}/journal-entries/{entry_id}",
            get(get_entry),
        )
        .route(
            "/tenants/{tenant_id}/journal-entries/{entry_id}/post",
            post(post_entry),
        )
        .route(
            "/tenants/{tenant_id}/journal-entries/{entry_id}/reverse",
            post(reverse_entry),
        )
        .route(
            "/tenants/{tenant_id}/journal-entries/{entry_id}/cancel",
            post(cancel_entry),
        )
}

/// Request body for creating a journal entry.
#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Description.
    pub description: String,
    /// External reference.
    pub reference: Option<String>,
    /// Lines; debits and credits as decimal strings.
    pub lines: Vec<JournalLineInput>,
    /// `draft` (default) or `posted`.
    #[serde(default)]
    pub status: InitialStatus,
}

/// Response for a created entry.
#[derive(Debug, Serialize)]
pub struct CreateEntryResponse {
    /// Entry ID.
    pub entry_id: EntryId,
    /// Generated entry number.
    pub entry_number: String,
    /// Status after creation.
    pub status: EntryStatus,
}

/// Query parameters for listing entries.
#[derive(Debug, Default, Deserialize)]
pub struct ListEntriesQuery {
    /// Filter by status.
    pub status: Option<EntryStatus>,
    /// Earliest entry date (inclusive).
    pub from: Option<NaiveDate>,
    /// Latest entry date (inclusive).
    pub to: Option<NaiveDate>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Entries per page.
    pub per_page: Option<u32>,
}

/// Request body for reversing an entry.
#[derive(Debug, Default, Deserialize)]
pub struct ReverseEntryRequest {
    /// Date of the compensating entry. Defaults to today.
    pub reversal_date: Option<NaiveDate>,
    /// Reason, appended to the compensating entry's description.
    pub reason: Option<String>,
}

/// An entry with its lines and column totals.
#[derive(Debug, Serialize)]
pub struct EntryResponse {
    /// Header fields.
    #[serde(flatten)]
    pub entry: JournalEntry,
    /// Lines in insertion order.
    pub lines: Vec<JournalLine>,
    /// Column totals.
    pub totals: Option<EntryTotals>,
}

impl From<JournalEntryWithLines> for EntryResponse {
    fn from(entry: JournalEntryWithLines) -> Self {
        Self {
            totals: entry.totals(),
            entry: entry.entry,
            lines: entry.lines,
        }
    }
}

/// Response for a post request.
#[derive(Debug, Serialize)]
pub struct PostEntryResponse {
    /// The entry after the request.
    pub entry: EntryResponse,
    /// True if the entry had been posted before this request.
    pub already_posted: bool,
    /// Balance changes made by this request.
    pub balance_changes: Vec<BalanceChange>,
}

/// Response for a reversal.
#[derive(Debug, Serialize)]
pub struct ReversalResponse {
    /// The original entry, now reversed.
    pub original: EntryResponse,
    /// The compensating entry.
    pub reversal: EntryResponse,
    /// Balance changes made by the compensating entry.
    pub balance_changes: Vec<BalanceChange>,
}

/// POST `/tenants/{tenant_id}/journal-entries` - Create, and optionally post,
/// an entry.
async fn create_entry(
    State(state): State<AppState>,
    Path(tenant_id): Path<TenantId>,
    Actor(user): Actor,
    Json(request): Json<CreateEntryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state
        .posting
        .create_entry(
            NewJournalEntry {
                tenant_id,
                entry_date: request.entry_date,
                description: request.description,
                reference: request.reference,
                created_by: user,
                lines: request.lines,
            },
            request.status,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateEntryResponse {
            entry_id: created.entry.id,
            entry_number: created.entry.entry_number,
            status: created.entry.status,
        }),
    ))
}

/// GET `/tenants/{tenant_id}/journal-entries` - List entries, newest first.
async fn list_entries(
    State(state): State<AppState>,
    Path(tenant_id): Path<TenantId>,
    Query(query): Query<ListEntriesQuery>,
) -> Result<Json<PageResponse<JournalEntry>>, ApiError> {
    let defaults = PageRequest::default();
    let page = PageRequest {
        page: query.page.unwrap_or(defaults.page),
        per_page: query.per_page.unwrap_or(defaults.per_page),
    };
    let filter = EntryFilter {
        status: query.status,
        from: query.from,
        to: query.to,
    };

    let entries = state.posting.list_entries(tenant_id, filter, page).await?;
    Ok(Json(entries))
}

/// GET `/tenants/{tenant_id}/journal-entries/{entry_id}`
async fn get_entry(
    State(state): State<AppState>,
    Path((tenant_id, entry_id)): Path<(TenantId, EntryId)>,
) -> Result<Json<EntryResponse>, ApiError> {
    let entry = state.posting.get_entry(tenant_id, entry_id).await?;
    Ok(Json(entry.into()))
}

/// POST `/tenants/{tenant_id}/journal-entries/{entry_id}/post`
///
/// Posting an already-posted entry succeeds without changing anything.
async fn post_entry(
    State(state): State<AppState>,
    Path((tenant_id, entry_id)): Path<(TenantId, EntryId)>,
    Actor(user): Actor,
) -> Result<Json<PostEntryResponse>, ApiError> {
    let outcome = state.posting.post_entry(tenant_id, entry_id, user).await?;

    let response = match outcome {
        PostOutcome::Posted { entry, changes } => PostEntryResponse {
            entry: entry.into(),
            already_posted: false,
            balance_changes: changes,
        },
        PostOutcome::AlreadyPosted { entry } => PostEntryResponse {
            entry: entry.into(),
            already_posted: true,
            balance_changes: Vec::new(),
        },
    };
    Ok(Json(response))
}

/// POST `/tenants/{tenant_id}/journal-entries/{entry_id}/reverse`
async fn reverse_entry(
    State(state): State<AppState>,
    Path((tenant_id, entry_id)): Path<(TenantId, EntryId)>,
    Actor(user): Actor,
    request: Option<Json<ReverseEntryRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let reversal = state
        .posting
        .reverse_entry(ReverseEntry {
            tenant_id,
            entry_id,
            reversal_date: request
                .reversal_date
                .unwrap_or_else(|| state.reports.today()),
            user,
            reason: request.reason,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ReversalResponse {
            original: reversal.original.into(),
            reversal: reversal.reversal.into(),
            balance_changes: reversal.changes,
        }),
    ))
}

/// POST `/tenants/{tenant_id}/journal-entries/{entry_id}/cancel`
async fn cancel_entry(
    State(state): State<AppState>,
    Path((tenant_id, entry_id)): Path<(TenantId, EntryId)>,
) -> Result<Json<EntryResponse>, ApiError> {
    let entry = state.posting.cancel_entry(tenant_id, entry_id).await?;
    Ok(Json(entry.into()))
}
