//! Table definitions and the versioned migration runner.
//!
//! Tables are SCHEMAFULL. Record keys are UUID strings; embedded lists
//! (answers, line items, images, staged agents) are flexible objects and
//! status enums are strings guarded by ASSERT.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

const LEDGER_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS schema_version SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE schema_version TYPE int;
DEFINE FIELD IF NOT EXISTS label ON TABLE schema_version TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE schema_version TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_schema_version ON TABLE schema_version \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct Applied {
    version: u32,
}

/// One forward-only step. Versions must increase down the list.
struct Step {
    version: u32,
    label: &'static str,
    ddl: &'static str,
}

static STEPS: &[Step] = &[
    Step {
        version: 1,
        label: "field_ops_tables",
        ddl: FIELD_OPS_V1,
    },
    Step {
        version: 2,
        label: "pending_registration_codes",
        ddl: PENDING_CODES_V2,
    },
];

const FIELD_OPS_V1: &str = "\
-- Tenants (global scope)
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD code ON TABLE tenant TYPE string;
DEFINE FIELD agency_name ON TABLE tenant TYPE string;
DEFINE FIELD admin_name ON TABLE tenant TYPE string;
DEFINE FIELD admin_phone ON TABLE tenant TYPE string;
DEFINE FIELD admin_password_hash ON TABLE tenant TYPE string;
DEFINE FIELD is_active ON TABLE tenant TYPE bool DEFAULT true;
DEFINE FIELD app_settings ON TABLE tenant TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD agent_count ON TABLE tenant TYPE int DEFAULT 0;
DEFINE FIELD inspection_count ON TABLE tenant TYPE int DEFAULT 0;
DEFINE FIELD approved_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_code ON TABLE tenant COLUMNS code UNIQUE;

-- Agents (tenant scope)
DEFINE TABLE agent SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE agent TYPE string;
DEFINE FIELD name ON TABLE agent TYPE string;
DEFINE FIELD phone ON TABLE agent TYPE string;
DEFINE FIELD password_hash ON TABLE agent TYPE string;
DEFINE FIELD is_active ON TABLE agent TYPE bool DEFAULT true;
DEFINE FIELD total_inspections ON TABLE agent TYPE int DEFAULT 0;
DEFINE FIELD total_sales ON TABLE agent TYPE float DEFAULT 0.0;
DEFINE FIELD assigned_products ON TABLE agent TYPE array DEFAULT [];
DEFINE FIELD assigned_products.* ON TABLE agent TYPE object FLEXIBLE;
DEFINE FIELD created_at ON TABLE agent TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE agent TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_agent_tenant_phone ON TABLE agent \
    COLUMNS tenant_id, phone UNIQUE;

-- Products (tenant scope)
DEFINE TABLE product SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE product TYPE string;
DEFINE FIELD name ON TABLE product TYPE string;
DEFINE FIELD name_key ON TABLE product TYPE string \
    VALUE string::lowercase(name);
DEFINE FIELD product_type ON TABLE product TYPE string DEFAULT 'other';
DEFINE FIELD model ON TABLE product TYPE option<string>;
DEFINE FIELD serial_number ON TABLE product TYPE option<string>;
DEFINE FIELD quantity ON TABLE product TYPE int ASSERT $value >= 0;
DEFINE FIELD price ON TABLE product TYPE float;
DEFINE FIELD min_price ON TABLE product TYPE float;
DEFINE FIELD created_at ON TABLE product TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE product TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_product_tenant_name ON TABLE product \
    COLUMNS tenant_id, name_key UNIQUE;
DEFINE INDEX idx_product_tenant ON TABLE product COLUMNS tenant_id;

-- Inspections (tenant + agent scope)
DEFINE TABLE inspection SCHEMAFULL;
DEFINE FIELD inspection_id ON TABLE inspection TYPE string;
DEFINE FIELD tenant_id ON TABLE inspection TYPE string;
DEFINE FIELD agent_id ON TABLE inspection TYPE string;
DEFINE FIELD consumer_name ON TABLE inspection TYPE string;
DEFINE FIELD consumer_number ON TABLE inspection TYPE string;
DEFINE FIELD mobile_number ON TABLE inspection TYPE string;
DEFINE FIELD address ON TABLE inspection TYPE string;
DEFINE FIELD safety_questions ON TABLE inspection TYPE array DEFAULT [];
DEFINE FIELD safety_questions.* ON TABLE inspection TYPE object FLEXIBLE;
DEFINE FIELD products ON TABLE inspection TYPE array DEFAULT [];
DEFINE FIELD products.* ON TABLE inspection TYPE object FLEXIBLE;
DEFINE FIELD images ON TABLE inspection TYPE array DEFAULT [];
DEFINE FIELD images.* ON TABLE inspection TYPE object FLEXIBLE;
DEFINE FIELD suraksha_hose_due_date ON TABLE inspection \
    TYPE option<string>;
DEFINE FIELD hotplate_exchange ON TABLE inspection TYPE bool;
DEFINE FIELD other_discount ON TABLE inspection TYPE float;
DEFINE FIELD subtotal_amount ON TABLE inspection TYPE float;
DEFINE FIELD total_discount ON TABLE inspection TYPE float;
DEFINE FIELD total_amount ON TABLE inspection TYPE float;
DEFINE FIELD latitude ON TABLE inspection TYPE option<float>;
DEFINE FIELD longitude ON TABLE inspection TYPE option<float>;
DEFINE FIELD location_address ON TABLE inspection TYPE option<string>;
DEFINE FIELD location_accuracy ON TABLE inspection TYPE option<float>;
DEFINE FIELD status ON TABLE inspection TYPE string \
    ASSERT $value IN ['completed', 'issues_found'];
DEFINE FIELD passed_questions ON TABLE inspection TYPE int;
DEFINE FIELD failed_questions ON TABLE inspection TYPE int;
DEFINE FIELD inspection_date ON TABLE inspection TYPE datetime;
DEFINE FIELD created_at ON TABLE inspection TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE inspection TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_inspection_display_id ON TABLE inspection \
    COLUMNS inspection_id UNIQUE;
DEFINE INDEX idx_inspection_tenant ON TABLE inspection \
    COLUMNS tenant_id, created_at;
DEFINE INDEX idx_inspection_agent ON TABLE inspection \
    COLUMNS agent_id, created_at;

-- Global display-id counter, advanced atomically on every insert.
DEFINE TABLE sequence SCHEMAFULL;
DEFINE FIELD value ON TABLE sequence TYPE int DEFAULT 0;

-- Registration requests (platform scope)
DEFINE TABLE registration_request SCHEMAFULL;
DEFINE FIELD code ON TABLE registration_request TYPE string;
DEFINE FIELD agency_name ON TABLE registration_request TYPE string;
DEFINE FIELD admin_name ON TABLE registration_request TYPE string;
DEFINE FIELD admin_phone ON TABLE registration_request TYPE string;
DEFINE FIELD admin_password_hash ON TABLE registration_request \
    TYPE string;
DEFINE FIELD agents ON TABLE registration_request TYPE array DEFAULT [];
DEFINE FIELD agents.* ON TABLE registration_request \
    TYPE object FLEXIBLE;
DEFINE FIELD status ON TABLE registration_request TYPE string \
    ASSERT $value IN ['pending', 'approved', 'partially_approved', \
    'rejected'];
DEFINE FIELD requested_at ON TABLE registration_request TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD reviewed_at ON TABLE registration_request \
    TYPE option<datetime>;
DEFINE FIELD reviewed_by ON TABLE registration_request \
    TYPE option<string>;
DEFINE FIELD rejection_reason ON TABLE registration_request \
    TYPE option<string>;
DEFINE FIELD tenant_id ON TABLE registration_request \
    TYPE option<string>;
DEFINE FIELD failed_agents ON TABLE registration_request \
    TYPE array DEFAULT [];
DEFINE FIELD failed_agents.* ON TABLE registration_request \
    TYPE object FLEXIBLE;
DEFINE INDEX idx_registration_code_status ON TABLE registration_request \
    COLUMNS code, status;

-- Staged CSV exports (time-boxed)
DEFINE TABLE export SCHEMAFULL;
DEFINE FIELD owner ON TABLE export TYPE string;
DEFINE FIELD file_name ON TABLE export TYPE string;
DEFINE FIELD csv ON TABLE export TYPE string;
DEFINE FIELD record_count ON TABLE export TYPE int;
DEFINE FIELD created_at ON TABLE export TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD expires_at ON TABLE export TYPE datetime;
DEFINE INDEX idx_export_expires ON TABLE export COLUMNS expires_at;
";

// One row per code with an undecided request, keyed by the code itself so
// a second claim fails on the record id.
const PENDING_CODES_V2: &str = "\
DEFINE TABLE pending_code SCHEMAFULL;
DEFINE FIELD request ON TABLE pending_code TYPE string;
INSERT IGNORE INTO pending_code \
    (SELECT code AS id, meta::id(id) AS request FROM registration_request \
    WHERE status = 'pending');
";

async fn applied_version<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    let rows: Vec<Applied> = db
        .query("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
        .await?
        .take(0)?;
    Ok(rows.first().map_or(0, |r| r.version))
}

/// Bring the database up to the newest schema version.
///
/// Steps at or below the recorded version are skipped, so calling this on
/// every start is harmless.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(LEDGER_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let current = applied_version(db).await?;
    for step in STEPS.iter().filter(|s| s.version > current) {
        info!(version = step.version, label = step.label, "migrating schema");
        db.query(step.ddl)
            .await?
            .check()
            .map_err(|e| DbError::Migration(format!("step {} ({}): {e}", step.version, step.label)))?;
        db.query("CREATE schema_version SET version = $version, label = $label")
            .bind(("version", step.version))
            .bind(("label", step.label))
            .await?
            .check()
            .map_err(|e| DbError::Migration(format!("recording step {}: {e}", step.version)))?;
    }
    Ok(())
}
