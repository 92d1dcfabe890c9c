//! Account repository for chart of accounts database operations.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tally_core::accounts::{Account, AccountError, NewAccount, validate_new_account, validate_parent};
use tally_shared::types::{AccountId, TenantId};
use tracing::debug;
use uuid::Uuid;

use crate::entities::accounts;
use crate::error::{account_error, is_unique_violation};

/// Account repository for chart of accounts operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an account with a zero balance.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The code is blank or too long
    /// - The parent does not exist or belongs to another tenant
    /// - The code is already used within the tenant
    pub async fn create_account(&self, input: NewAccount) -> Result<Account, AccountError> {
        let txn = self.db.begin().await.map_err(account_error)?;

        let parent = match input.parent_id {
            Some(parent_id) => accounts::Entity::find_by_id(parent_id.into_inner())
                .lock_shared()
                .one(&txn)
                .await
                .map_err(account_error)?
                .map(Account::from),
            None => None,
        };
        let code = validate_new_account(&input, parent.as_ref())?;

        let now = Utc::now().into();
        let model = accounts::ActiveModel {
            id: Set(AccountId::new().into_inner()),
            tenant_id: Set(input.tenant_id.into_inner()),
            code: Set(code.clone()),
            name: Set(input.name.trim().to_string()),
            account_type: Set(input.account_type.into()),
            parent_id: Set(input.parent_id.map(AccountId::into_inner)),
            current_balance: Set(Decimal::ZERO),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = model.insert(&txn).await.map_err(|e| {
            if is_unique_violation(&e) {
                AccountError::DuplicateCode(code.clone())
            } else {
                account_error(e)
            }
        })?;
        txn.commit().await.map_err(account_error)?;

        debug!(tenant_id = %input.tenant_id, account_id = %created.id, code = %created.code, "account created");
        Ok(created.into())
    }

    /// Moves an account under `parent_id`, or to the top level.
    ///
    /// The account and its new parent are locked in id order before the
    /// ancestor chain is read, so two re-parentings of the same pair cannot
    /// both pass the cycle check.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `ParentNotFound`, `InvalidParentTenant` or
    /// `CyclicParent`.
    pub async fn set_parent(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
        parent_id: Option<AccountId>,
    ) -> Result<Account, AccountError> {
        let txn = self.db.begin().await.map_err(account_error)?;

        let mut ids = vec![account_id.into_inner()];
        ids.extend(parent_id.map(AccountId::into_inner));
        let locked: HashMap<Uuid, accounts::Model> = accounts::Entity::find()
            .filter(accounts::Column::Id.is_in(ids))
            .order_by_asc(accounts::Column::Id)
            .lock_exclusive()
            .all(&txn)
            .await
            .map_err(account_error)?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();

        let account = locked
            .get(&account_id.into_inner())
            .filter(|m| m.tenant_id == tenant_id.into_inner())
            .cloned()
            .ok_or(AccountError::NotFound(account_id))?;

        if let Some(parent_id) = parent_id {
            let parent: Account = locked
                .get(&parent_id.into_inner())
                .cloned()
                .map(Account::from)
                .ok_or(AccountError::ParentNotFound(parent_id))?;
            let parents = Self::parent_map(&txn, tenant_id).await?;
            validate_parent(tenant_id, account_id, &parent, |id| {
                parents.get(&id).copied().flatten()
            })?;
        }

        let mut active: accounts::ActiveModel = account.into();
        active.parent_id = Set(parent_id.map(AccountId::into_inner));
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&txn).await.map_err(account_error)?;
        txn.commit().await.map_err(account_error)?;

        Ok(updated.into())
    }

    /// Activates or deactivates an account.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account is not in the tenant.
    pub async fn set_active(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
        is_active: bool,
    ) -> Result<Account, AccountError> {
        let txn = self.db.begin().await.map_err(account_error)?;

        let account = accounts::Entity::find_by_id(account_id.into_inner())
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(account_error)?
            .ok_or(AccountError::NotFound(account_id))?;

        let mut active: accounts::ActiveModel = account.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&txn).await.map_err(account_error)?;
        txn.commit().await.map_err(account_error)?;

        Ok(updated.into())
    }

    /// Loads one account of the tenant.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account is not in the tenant.
    pub async fn get_account(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
    ) -> Result<Account, AccountError> {
        accounts::Entity::find_by_id(account_id.into_inner())
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(account_error)?
            .map(Account::from)
            .ok_or(AccountError::NotFound(account_id))
    }

    /// Lists all accounts of the tenant, ordered by code.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the query fails.
    pub async fn list_accounts(&self, tenant_id: TenantId) -> Result<Vec<Account>, AccountError> {
        let models = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .order_by_asc(accounts::Column::Code)
            .all(&self.db)
            .await
            .map_err(account_error)?;
        Ok(models.into_iter().map(Account::from).collect())
    }

    /// Current parent of every account of the tenant.
    async fn parent_map(
        txn: &DatabaseTransaction,
        tenant_id: TenantId,
    ) -> Result<HashMap<AccountId, Option<AccountId>>, AccountError> {
        let rows: Vec<(Uuid, Option<Uuid>)> = accounts::Entity::find()
            .select_only()
            .column(accounts::Column::Id)
            .column(accounts::Column::ParentId)
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .into_tuple()
            .all(txn)
            .await
            .map_err(account_error)?;

        Ok(rows
            .into_iter()
            .map(|(id, parent)| (AccountId::from_uuid(id), parent.map(AccountId::from_uuid)))
            .collect())
    }
}
