//! Database module
//!
//! Connection checks, migrations and bootstrap data.

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::models::ADMIN_USERNAME;

/// PostgreSQL SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Simple connectivity check
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the SQL files in `migrations/`
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    let required_tables = [
        "api_keys",
        "users",
        "courses",
        "modules",
        "enrollments",
        "module_progress",
    ];

    for table in required_tables {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    Ok(true)
}

/// Create the default admin user if it does not exist yet
pub async fn ensure_default_admin(
    pool: &PgPool,
    initial_balance: Decimal,
) -> Result<(), sqlx::Error> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO users (username, email, first_name, last_name, balance)
        VALUES ($1, 'admin@example.com', 'admin', 'admin', $2)
        ON CONFLICT (username) DO NOTHING
        "#,
    )
    .bind(ADMIN_USERNAME)
    .bind(initial_balance)
    .execute(pool)
    .await?
    .rows_affected();

    if inserted > 0 {
        tracing::info!("Default admin user created");
    } else {
        tracing::info!("Default admin user already exists");
    }

    Ok(())
}

/// Name of the violated unique constraint, if `err` is a unique violation
pub fn unique_violation(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            Some(db_err.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}
