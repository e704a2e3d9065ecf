use db::dtos::subscription::SubscriptionUpsert;
use uuid::Uuid;

pub struct SubscriptionRequest {
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Subscription state carried by a Stripe lifecycle event.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionChange {
    pub id: String,
    pub customer_id: String,
    pub plan_id: String,
    pub plan_interval: String,
    pub status: String,
    pub current_period_end: i64,
    pub cancel_at_period_end: bool,
}

impl SubscriptionChange {
    /// `event_at` is the creation time of the Stripe event carrying the change.
    pub fn into_upsert(self, user_id: Uuid, event_at: i64) -> SubscriptionUpsert {
        SubscriptionUpsert {
            id: self.id,
            user_id,
            plan_id: self.plan_id,
            plan_interval: self.plan_interval,
            status: self.status,
            current_period_end: self.current_period_end,
            cancel_at_period_end: self.cancel_at_period_end,
            last_event_at: event_at,
        }
    }
}
