use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local mirror of a Stripe subscription, one per user.
///
/// `plan_id` is kept as text: a plan retired from the catalog still loads.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user_id: Uuid,
    pub plan_id: String,
    pub plan_interval: String,
    pub status: String,
    /// Seconds since epoch.
    pub current_period_end: i64,
    pub cancel_at_period_end: bool,
    /// Creation time of the newest applied Stripe event, seconds since epoch.
    pub last_event_at: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
