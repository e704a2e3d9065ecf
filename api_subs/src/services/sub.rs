use chrono::DateTime;
use db::models::subscription::Subscription;

use crate::{
    dtos::membership::{BillingView, PlanOption, PlanSummary, RenewalPeriod, RenewalStatus},
    models::plan::{self, Currency, Interval, PRICING_PLANS, PlanId},
};

/// Derives the display state of a user's membership.
///
/// No subscription means the free plan. A plan id missing from the catalog
/// keeps its own name but borrows the Pro description.
pub fn reconcile(subscription: Option<&Subscription>, currency: Currency) -> BillingView {
    let plan_id = subscription
        .map(|sub| sub.plan_id.as_str())
        .unwrap_or(PlanId::Free.as_str());
    let is_free = plan_id == PlanId::Free.as_str();

    let description = match plan::find_plan(plan_id) {
        Ok(plan) => plan.description,
        Err(_) => {
            log::warn!(
                "Subscription {} references unknown plan '{}', showing Pro description",
                subscription.map(|sub| sub.id.as_str()).unwrap_or("-"),
                plan_id
            );
            plan::plan(PlanId::Pro).description
        }
    };

    let period = subscription
        .filter(|_| !is_free)
        .map(|sub| renewal_period(sub.cancel_at_period_end, sub.current_period_end));

    let selected_plan = plan_id.parse::<PlanId>().unwrap_or(PlanId::Free);

    let plans = if is_free {
        upgrade_options(currency)
    } else {
        Vec::new()
    };

    BillingView {
        plan: PlanSummary {
            id: plan_id.to_string(),
            name: capitalize(plan_id),
            description: description.to_string(),
        },
        upgradable: is_free,
        period,
        selected_plan,
        upgrade_label: upgrade_label(selected_plan),
        plans,
        currency,
    }
}

pub fn renewal_period(cancel_at_period_end: bool, current_period_end: i64) -> RenewalPeriod {
    let status = if cancel_at_period_end {
        RenewalStatus::Expires
    } else {
        RenewalStatus::Renews
    };
    let label = match status {
        RenewalStatus::Renews => "Renews on",
        RenewalStatus::Expires => "Expires on",
    };

    RenewalPeriod {
        status,
        label: label.to_string(),
        date: format_period_end(current_period_end),
    }
}

/// Formats epoch seconds as a US short date in UTC, e.g. `3/7/2026`.
pub fn format_period_end(seconds: i64) -> String {
    DateTime::from_timestamp(seconds, 0)
        .map(|date| date.format("%-m/%-d/%Y").to_string())
        .unwrap_or_else(|| "Invalid Date".to_string())
}

/// Text of the upgrade button for the currently selected plan.
pub fn upgrade_label(selected: PlanId) -> String {
    match selected {
        PlanId::Free => "Upgrade to PRO".to_string(),
        other => format!("Upgrade to {}", plan::plan(other).name),
    }
}

fn upgrade_options(currency: Currency) -> Vec<PlanOption> {
    PRICING_PLANS
        .iter()
        .map(|plan| {
            let price = plan.price(Interval::Year, currency).unwrap_or_default();
            PlanOption {
                id: plan.id,
                name: plan.name.to_string(),
                description: plan.description.to_string(),
                price,
                display_price: (plan.id != PlanId::Free)
                    .then(|| plan::format_price(price, currency, Interval::Year)),
            }
        })
        .collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    // 2026-03-07T12:00:00Z
    const PERIOD_END: i64 = 1_772_884_800;

    fn subscription(plan_id: &str, cancel_at_period_end: bool) -> Subscription {
        let now = Utc::now().naive_utc();
        Subscription {
            id: "sub_123".to_string(),
            user_id: Uuid::new_v4(),
            plan_id: plan_id.to_string(),
            plan_interval: "year".to_string(),
            status: "active".to_string(),
            current_period_end: PERIOD_END,
            cancel_at_period_end,
            last_event_at: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn no_subscription_is_an_upgradable_free_plan() {
        let view = reconcile(None, Currency::Usd);

        assert_eq!(view.plan.id, "free");
        assert_eq!(view.plan.name, "Free");
        assert!(view.upgradable);
        assert!(view.period.is_none());
        assert_eq!(view.selected_plan, PlanId::Free);
        assert_eq!(view.upgrade_label, "Upgrade to PRO");
        assert_eq!(view.plans.len(), 4);
    }

    #[test]
    fn active_pro_subscription_renews() {
        let sub = subscription("pro", false);
        let view = reconcile(Some(&sub), Currency::Usd);

        assert_eq!(view.plan.name, "Pro");
        assert!(!view.upgradable);
        assert!(view.plans.is_empty());

        let period = view.period.unwrap();
        assert_eq!(period.status, RenewalStatus::Renews);
        assert_eq!(period.label, "Renews on");
        assert_eq!(period.date, "3/7/2026");
    }

    #[test]
    fn cancelled_subscription_expires() {
        let sub = subscription("local", true);
        let view = reconcile(Some(&sub), Currency::Eur);

        let period = view.period.unwrap();
        assert_eq!(period.status, RenewalStatus::Expires);
        assert_eq!(period.label, "Expires on");
        assert_eq!(
            view.plan.description,
            "Access to our local club chat and voting rights."
        );
    }

    #[test]
    fn unknown_plan_falls_back_to_pro_description() {
        let sub = subscription("legacy-gold", false);
        let view = reconcile(Some(&sub), Currency::Usd);

        assert_eq!(view.plan.id, "legacy-gold");
        assert_eq!(view.plan.name, "Legacy-gold");
        assert_eq!(view.plan.description, plan::plan(PlanId::Pro).description);
        assert!(!view.upgradable);
        assert_eq!(view.selected_plan, PlanId::Free);
        assert!(view.period.is_some());
    }

    #[test]
    fn free_subscription_lists_priced_options() {
        let sub = subscription("free", false);
        let view = reconcile(Some(&sub), Currency::Eur);

        assert!(view.upgradable);
        assert!(view.period.is_none());

        let free = view.plans.iter().find(|p| p.id == PlanId::Free).unwrap();
        assert!(free.display_price.is_none());

        let local = view.plans.iter().find(|p| p.id == PlanId::Local).unwrap();
        assert_eq!(local.price, 8500);
        assert_eq!(local.display_price.as_deref(), Some("€ 85 / year"));
    }

    #[test]
    fn upgrade_label_names_selected_plan() {
        assert_eq!(upgrade_label(PlanId::Free), "Upgrade to PRO");
        assert_eq!(upgrade_label(PlanId::Visiting), "Upgrade to Visiting");
    }

    #[test]
    fn out_of_range_period_end_does_not_panic() {
        assert_eq!(format_period_end(i64::MAX), "Invalid Date");
        assert_eq!(format_period_end(0), "1/1/1970");
    }
}
