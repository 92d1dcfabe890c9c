//! Validation rules shared by every account registry implementation.
//!
//! Stores look up whatever they need (the parent record, the parent chain)
//! and pass it in, so the rules stay free of I/O.

use std::collections::BTreeSet;

use tally_shared::types::{AccountId, TenantId};

use super::error::AccountError;
use super::types::{Account, NewAccount};

/// Longest accepted account code.
pub const MAX_CODE_LEN: usize = 32;

/// Trims and checks an account code.
///
/// # Errors
///
/// Returns `InvalidCode` for empty or over-long codes.
pub fn normalize_code(code: &str) -> Result<String, AccountError> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return Err(AccountError::InvalidCode("code must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_CODE_LEN {
        return Err(AccountError::InvalidCode(format!(
            "code must be at most {MAX_CODE_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Validates a new account against its (already looked up) parent.
///
/// Returns the normalized code.
///
/// # Errors
///
/// - `InvalidCode` if the code is blank
/// - `ParentNotFound` if a parent was requested but `parent` is `None`
/// - `InvalidParentTenant` if the parent belongs to another tenant
pub fn validate_new_account(
    input: &NewAccount,
    parent: Option<&Account>,
) -> Result<String, AccountError> {
    let code = normalize_code(&input.code)?;

    if let Some(parent_id) = input.parent_id {
        let parent = parent.ok_or(AccountError::ParentNotFound(parent_id))?;
        if parent.tenant_id != input.tenant_id {
            return Err(AccountError::InvalidParentTenant(parent_id));
        }
    }

    Ok(code)
}

/// Validates re-parenting `account_id` under `parent`.
///
/// `parent_of` resolves an account to its current parent within the tenant.
/// The ancestor chain is walked from `parent` upward; reaching `account_id`
/// means the change would close a cycle.
///
/// # Errors
///
/// - `InvalidParentTenant` if the parent belongs to another tenant
/// - `CyclicParent` if `account_id` is the parent or one of its ancestors
pub fn validate_parent<F>(
    tenant_id: TenantId,
    account_id: AccountId,
    parent: &Account,
    parent_of: F,
) -> Result<(), AccountError>
where
    F: Fn(AccountId) -> Option<AccountId>,
{
    if parent.tenant_id != tenant_id {
        return Err(AccountError::InvalidParentTenant(parent.id));
    }

    let cyclic = AccountError::CyclicParent {
        account_id,
        parent_id: parent.id,
    };

    if parent.id == account_id {
        return Err(cyclic);
    }

    let mut seen = BTreeSet::from([parent.id]);
    let mut current = parent.parent_id;
    while let Some(ancestor) = current {
        if ancestor == account_id {
            return Err(cyclic);
        }
        // Stored chains are acyclic; stop on a repeat rather than spin.
        if !seen.insert(ancestor) {
            break;
        }
        current = parent_of(ancestor);
    }

    Ok(())
}
