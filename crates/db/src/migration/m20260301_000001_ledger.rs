//! Initial ledger schema.
//!
//! Creates the account, journal entry, line and sequence tables together with
//! the triggers that keep posted entries immutable.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: CHART OF ACCOUNTS
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 3: JOURNAL
        // ============================================================
        db.execute_unprepared(JOURNAL_ENTRIES_SQL).await?;
        db.execute_unprepared(JOURNAL_ENTRY_LINES_SQL).await?;
        db.execute_unprepared(ENTRY_SEQUENCES_SQL).await?;

        // ============================================================
        // PART 4: TRIGGERS & FUNCTIONS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE account_type AS ENUM (
    'asset_non_current',
    'asset_current',
    'liability_non_current',
    'liability_current',
    'equity',
    'revenue',
    'cost_of_sales',
    'expense',
    'other_income',
    'other_expense'
);

CREATE TYPE entry_status AS ENUM ('draft', 'posted', 'reversed', 'cancelled');
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    code VARCHAR(32) NOT NULL,
    name VARCHAR(255) NOT NULL,
    account_type account_type NOT NULL,
    parent_id UUID REFERENCES accounts(id) ON DELETE RESTRICT,
    current_balance NUMERIC NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (tenant_id, code),
    CHECK (parent_id IS NULL OR parent_id <> id)
);

CREATE INDEX idx_accounts_tenant ON accounts(tenant_id, code);
CREATE INDEX idx_accounts_parent ON accounts(parent_id) WHERE parent_id IS NOT NULL;
";

const JOURNAL_ENTRIES_SQL: &str = r"
CREATE TABLE journal_entries (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    entry_number VARCHAR(32) NOT NULL,
    entry_date DATE NOT NULL,
    description TEXT NOT NULL,
    reference VARCHAR(100),
    status entry_status NOT NULL DEFAULT 'draft',
    created_by UUID,
    posted_by UUID,
    posted_at TIMESTAMPTZ,
    reversal_of UUID REFERENCES journal_entries(id) ON DELETE RESTRICT,
    reversed_by UUID REFERENCES journal_entries(id) ON DELETE RESTRICT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (tenant_id, entry_number),
    CHECK (status = 'draft' OR status = 'cancelled' OR posted_at IS NOT NULL),
    CHECK (status <> 'reversed' OR reversed_by IS NOT NULL)
);

CREATE INDEX idx_journal_entries_tenant_date ON journal_entries(tenant_id, entry_date DESC);
CREATE INDEX idx_journal_entries_affecting ON journal_entries(tenant_id, entry_date)
    WHERE status IN ('posted', 'reversed');
";

const JOURNAL_ENTRY_LINES_SQL: &str = r"
CREATE TABLE journal_entry_lines (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    entry_id UUID NOT NULL REFERENCES journal_entries(id) ON DELETE CASCADE,
    line_number INTEGER NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts(id) ON DELETE RESTRICT,
    description TEXT,
    debit NUMERIC NOT NULL DEFAULT 0,
    credit NUMERIC NOT NULL DEFAULT 0,
    UNIQUE (entry_id, line_number),
    CHECK (debit >= 0),
    CHECK (credit >= 0)
);

CREATE INDEX idx_journal_entry_lines_account ON journal_entry_lines(account_id);
";

const ENTRY_SEQUENCES_SQL: &str = r"
CREATE TABLE entry_sequences (
    tenant_id UUID NOT NULL,
    year INTEGER NOT NULL,
    last_value INTEGER NOT NULL CHECK (last_value > 0),
    PRIMARY KEY (tenant_id, year)
);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: check_entry_balance
-- Ensures debit = credit when an entry becomes posted
-- ============================================================
CREATE OR REPLACE FUNCTION check_entry_balance()
RETURNS TRIGGER AS $$
DECLARE
    total_debit NUMERIC;
    total_credit NUMERIC;
BEGIN
    SELECT COALESCE(SUM(debit), 0), COALESCE(SUM(credit), 0)
    INTO total_debit, total_credit
    FROM journal_entry_lines
    WHERE entry_id = NEW.id;

    IF total_debit <> total_credit THEN
        RAISE EXCEPTION 'Journal entry is not balanced. Debit: %, Credit: %',
            total_debit, total_credit;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE CONSTRAINT TRIGGER trg_check_entry_balance
AFTER INSERT OR UPDATE ON journal_entries
DEFERRABLE INITIALLY DEFERRED
FOR EACH ROW
WHEN (NEW.status = 'posted')
EXECUTE FUNCTION check_entry_balance();

-- ============================================================
-- FUNCTION: prevent_posted_modification
-- Posted entries may only become reversed; reversed and cancelled
-- entries are final
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_posted_modification()
RETURNS TRIGGER AS $$
BEGIN
    IF TG_OP = 'DELETE' THEN
        IF OLD.status <> 'draft' THEN
            RAISE EXCEPTION 'Cannot delete % journal entry', OLD.status;
        END IF;
        RETURN OLD;
    END IF;

    IF OLD.status = 'posted' AND NEW.status NOT IN ('posted', 'reversed') THEN
        RAISE EXCEPTION 'Cannot modify posted journal entry. Reverse it instead.';
    END IF;

    IF OLD.status IN ('reversed', 'cancelled') THEN
        RAISE EXCEPTION 'Cannot modify % journal entry', OLD.status;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_posted_mod
BEFORE UPDATE OR DELETE ON journal_entries
FOR EACH ROW
EXECUTE FUNCTION prevent_posted_modification();

-- ============================================================
-- FUNCTION: prevent_line_modification
-- Lines are frozen once their entry leaves draft
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_line_modification()
RETURNS TRIGGER AS $$
DECLARE
    entry_status_val entry_status;
BEGIN
    SELECT status INTO entry_status_val
    FROM journal_entries
    WHERE id = COALESCE(OLD.entry_id, NEW.entry_id);

    IF entry_status_val IS NOT NULL AND entry_status_val <> 'draft' THEN
        RAISE EXCEPTION 'Cannot modify lines of % journal entry', entry_status_val;
    END IF;

    IF TG_OP = 'DELETE' THEN
        RETURN OLD;
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_line_mod
BEFORE UPDATE OR DELETE ON journal_entry_lines
FOR EACH ROW
EXECUTE FUNCTION prevent_line_modification();
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS entry_sequences CASCADE;
DROP TABLE IF EXISTS journal_entry_lines CASCADE;
DROP TABLE IF EXISTS journal_entries CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;

DROP FUNCTION IF EXISTS prevent_line_modification() CASCADE;
DROP FUNCTION IF EXISTS prevent_posted_modification() CASCADE;
DROP FUNCTION IF EXISTS check_entry_balance() CASCADE;

DROP TYPE IF EXISTS entry_status;
DROP TYPE IF EXISTS account_type;
";
