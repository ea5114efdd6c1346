//! Job result repository
//!
//! Handles all database operations related to result records.

use sqlx::PgPool;

use joule_core::domain::job::JobResult;

/// Create a new result record
pub async fn create(pool: &PgPool, result: &JobResult) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO job_results (id, job_id, result_name, input_path, state, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(result.id)
    .bind(result.job_id)
    .bind(&result.result_name)
    .bind(&result.input_path)
    .bind(&result.state)
    .bind(result.created_at)
    .bind(result.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist the result record's processing state
pub async fn update(pool: &PgPool, result: &JobResult) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE job_results
        SET state = $1, updated_at = $2
        WHERE id = $3
        "#,
    )
    .bind(&result.state)
    .bind(result.updated_at)
    .bind(result.id)
    .execute(pool)
    .await?;

    Ok(())
}
