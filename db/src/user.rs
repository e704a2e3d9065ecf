use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::user::User;

pub async fn get_user_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
}

pub async fn get_user_by_customer_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    stripe_customer_id: &str,
) -> Res<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE stripe_customer_id = $1")
        .bind(stripe_customer_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

/// Stores `stripe_customer_id` unless the user already has one.
/// Returns `None` when another request claimed the user first.
pub async fn claim_stripe_customer_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    stripe_customer_id: &str,
) -> Res<Option<User>> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET stripe_customer_id = $2, updated_at = NOW()
        WHERE id = $1 AND stripe_customer_id IS NULL
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(stripe_customer_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}
