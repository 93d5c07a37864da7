use sqlx::PgPool;
use tracing::info;

use super::StorageError;

/// Tables of the shared database: tenant directory and module catalog.
pub const SHARED_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS tenants (
        id              UUID PRIMARY KEY,
        name            TEXT NOT NULL,
        subdomain       TEXT NOT NULL UNIQUE,
        custom_domain   TEXT UNIQUE,
        domain_type     TEXT NOT NULL DEFAULT 'subdomain'
                        CHECK (domain_type IN ('subdomain', 'custom')),
        is_active       BOOLEAN NOT NULL DEFAULT TRUE,
        tls_issued      BOOLEAN NOT NULL DEFAULT FALSE,
        tls_issued_at   TIMESTAMPTZ,
        primary_color   TEXT NOT NULL DEFAULT '#3498db',
        secondary_color TEXT NOT NULL DEFAULT '#2ecc71',
        logo_url        TEXT,
        contact_email   TEXT,
        contact_phone   TEXT,
        created_by      TEXT,
        created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT tenants_custom_domain_required
            CHECK (domain_type <> 'custom' OR custom_domain IS NOT NULL)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS module_definitions (
        key         TEXT PRIMARY KEY,
        name        TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        icon        TEXT NOT NULL DEFAULT '',
        is_core     BOOLEAN NOT NULL DEFAULT FALSE,
        sort_order  INTEGER NOT NULL DEFAULT 0,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tenant_modules (
        tenant_id   UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
        module_key  TEXT NOT NULL REFERENCES module_definitions(key) ON DELETE CASCADE,
        is_enabled  BOOLEAN NOT NULL DEFAULT FALSE,
        enabled_at  TIMESTAMPTZ,
        disabled_at TIMESTAMPTZ,
        PRIMARY KEY (tenant_id, module_key)
    )
    "#,
];

/// Tables every tenant database starts with.
pub const TENANT_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id            UUID PRIMARY KEY,
        username      TEXT NOT NULL UNIQUE,
        email         TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        is_superuser  BOOLEAN NOT NULL DEFAULT FALSE,
        is_staff      BOOLEAN NOT NULL DEFAULT FALSE,
        is_active     BOOLEAN NOT NULL DEFAULT TRUE,
        created_at    TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
];

/// Apply a list of idempotent DDL statements in one transaction
pub async fn apply(pool: &PgPool, statements: &[&str]) -> Result<(), StorageError> {
    let mut tx = pool.begin().await?;
    for statement in statements {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn migrate_shared(pool: &PgPool) -> Result<(), StorageError> {
    apply(pool, SHARED_SCHEMA).await?;
    info!("Shared schema is up to date");
    Ok(())
}
