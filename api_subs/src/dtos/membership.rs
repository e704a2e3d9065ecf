use serde::{Deserialize, Serialize};

use crate::models::plan::{Currency, PlanId};

/// Raw form fields of a membership action.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentForm {
    pub intent: Option<String>,
    pub plan_id: Option<String>,
    pub plan_interval: Option<String>,
}

/// Everything the membership page needs to render billing state.
#[derive(Debug, Serialize)]
pub struct BillingView {
    pub plan: PlanSummary,
    pub upgradable: bool,
    pub period: Option<RenewalPeriod>,
    pub selected_plan: PlanId,
    pub upgrade_label: String,
    pub plans: Vec<PlanOption>,
    pub currency: Currency,
}

#[derive(Debug, Serialize)]
pub struct PlanSummary {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenewalStatus {
    Renews,
    Expires,
}

#[derive(Debug, Serialize)]
pub struct RenewalPeriod {
    pub status: RenewalStatus,
    pub label: String,
    /// Period end as `M/D/YYYY`.
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct PlanOption {
    pub id: PlanId,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub display_price: Option<String>,
}
