use stripe::{Expandable, Price, Subscription};

use crate::{
    dtos::pay::SubscriptionChange,
    models::plan::{Interval, PriceKey},
};

/// Catalog key of a Stripe price, read from its lookup key.
pub fn price_key(price: &Price) -> Option<PriceKey> {
    price.lookup_key.as_deref()?.parse().ok()
}

/// Enables `SubscriptionChange::from(&subscription)` for webhook payloads.
///
/// Plan and interval come from the first item's lookup key. Prices created
/// outside the catalog keep their raw lookup key (or price id) as plan id.
impl From<&Subscription> for SubscriptionChange {
    fn from(sub: &Subscription) -> Self {
        let price = sub.items.data.first().and_then(|item| item.price.as_ref());

        let (plan_id, plan_interval) = match price.and_then(price_key) {
            Some(key) => (key.plan_id.to_string(), key.interval.to_string()),
            None => {
                let raw = price
                    .map(|p| p.lookup_key.clone().unwrap_or_else(|| p.id.to_string()))
                    .unwrap_or_default();
                let interval = price
                    .and_then(|p| p.recurring.as_ref())
                    .map(|r| r.interval.to_string())
                    .unwrap_or_else(|| Interval::Year.to_string());
                log::warn!(
                    "Subscription {} uses price '{}' outside the plan catalog",
                    sub.id,
                    raw
                );
                (raw, interval)
            }
        };

        SubscriptionChange {
            id: sub.id.to_string(),
            customer_id: match &sub.customer {
                Expandable::Id(id) => id.to_string(),
                Expandable::Object(customer) => customer.id.to_string(),
            },
            plan_id,
            plan_interval,
            status: sub.status.to_string(),
            current_period_end: sub.current_period_end,
            cancel_at_period_end: sub.cancel_at_period_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn subscription(price: Value, customer: Value) -> Subscription {
        serde_json::from_value(json!({
            "id": "sub_1",
            "object": "subscription",
            "automatic_tax": { "enabled": false },
            "billing_cycle_anchor": 1_741_348_800,
            "cancel_at_period_end": true,
            "created": 1_741_348_800,
            "currency": "eur",
            "current_period_start": 1_741_348_800,
            "current_period_end": 1_772_884_800,
            "customer": customer,
            "items": {
                "object": "list",
                "data": [{ "id": "si_1", "object": "subscription_item", "price": price }],
                "has_more": false,
                "url": "/v1/subscription_items?subscription=sub_1"
            },
            "livemode": false,
            "metadata": {},
            "start_date": 1_741_348_800,
            "status": "active"
        }))
        .unwrap()
    }

    #[test]
    fn catalog_lookup_key_sets_plan_and_interval() {
        let sub = subscription(
            json!({ "id": "price_1", "object": "price", "lookup_key": "pro_year_usd" }),
            json!("cus_1"),
        );

        let change = SubscriptionChange::from(&sub);

        assert_eq!(
            change,
            SubscriptionChange {
                id: "sub_1".to_string(),
                customer_id: "cus_1".to_string(),
                plan_id: "pro".to_string(),
                plan_interval: "year".to_string(),
                status: "active".to_string(),
                current_period_end: 1_772_884_800,
                cancel_at_period_end: true,
            }
        );
    }

    #[test]
    fn price_outside_catalog_keeps_raw_lookup_key() {
        let sub = subscription(
            json!({
                "id": "price_legacy",
                "object": "price",
                "lookup_key": "gold_monthly",
                "recurring": { "interval": "month", "interval_count": 1, "usage_type": "licensed" }
            }),
            json!("cus_1"),
        );

        let change = SubscriptionChange::from(&sub);

        assert_eq!(change.plan_id, "gold_monthly");
        assert_eq!(change.plan_interval, "month");
    }

    #[test]
    fn price_without_lookup_key_uses_price_id() {
        let sub = subscription(
            json!({ "id": "price_9x", "object": "price" }),
            json!("cus_1"),
        );

        let change = SubscriptionChange::from(&sub);

        assert_eq!(change.plan_id, "price_9x");
        assert_eq!(change.plan_interval, "year");
    }

    #[test]
    fn expanded_customer_object_is_read() {
        let sub = subscription(
            json!({ "id": "price_1", "object": "price", "lookup_key": "local_year_eur" }),
            json!({ "id": "cus_expanded", "object": "customer" }),
        );

        let change = SubscriptionChange::from(&sub);

        assert!(matches!(sub.customer, Expandable::Object(_)));
        assert_eq!(change.customer_id, "cus_expanded");
        assert_eq!(change.plan_id, "local");
    }
}
