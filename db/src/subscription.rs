use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{dtos::subscription::SubscriptionUpsert, models::subscription::Subscription};

pub async fn get_subscription_by_user_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Option<Subscription>> {
    sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

/// Inserts or replaces the subscription of `data.user_id`.
///
/// A user holds at most one subscription, so a new Stripe subscription id
/// replaces the previous row. Returns `None` when the stored row already
/// reflects a newer event.
pub async fn upsert_subscription<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: SubscriptionUpsert,
) -> Res<Option<Subscription>> {
    sqlx::query_as::<_, Subscription>(
        r#"
        INSERT INTO subscriptions
            (id, user_id, plan_id, plan_interval, status, current_period_end,
             cancel_at_period_end, last_event_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (user_id) DO UPDATE SET
            id = EXCLUDED.id,
            plan_id = EXCLUDED.plan_id,
            plan_interval = EXCLUDED.plan_interval,
            status = EXCLUDED.status,
            current_period_end = EXCLUDED.current_period_end,
            cancel_at_period_end = EXCLUDED.cancel_at_period_end,
            last_event_at = EXCLUDED.last_event_at,
            updated_at = NOW()
        WHERE subscriptions.last_event_at <= EXCLUDED.last_event_at
        RETURNING *
        "#,
    )
    .bind(data.id)
    .bind(data.user_id)
    .bind(data.plan_id)
    .bind(data.plan_interval)
    .bind(data.status)
    .bind(data.current_period_end)
    .bind(data.cancel_at_period_end)
    .bind(data.last_event_at)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

/// Moves the subscription identified by its Stripe id back to `plan_id`,
/// clearing the cancellation flag. Returns `None` when no row matched or the
/// row already reflects an event newer than `event_at`.
pub async fn reset_subscription_plan<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    subscription_id: &str,
    plan_id: &str,
    event_at: i64,
) -> Res<Option<Subscription>> {
    sqlx::query_as::<_, Subscription>(
        r#"
        UPDATE subscriptions
        SET plan_id = $2, status = 'active', cancel_at_period_end = FALSE,
            last_event_at = $3, updated_at = NOW()
        WHERE id = $1 AND last_event_at <= $3
        RETURNING *
        "#,
    )
    .bind(subscription_id)
    .bind(plan_id)
    .bind(event_at)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}
