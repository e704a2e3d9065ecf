use uuid::Uuid;

pub struct SubscriptionUpsert {
    pub id: String,
    pub user_id: Uuid,
    pub plan_id: String,
    pub plan_interval: String,
    pub status: String,
    pub current_period_end: i64,
    pub cancel_at_period_end: bool,
    pub last_event_at: i64,
}
