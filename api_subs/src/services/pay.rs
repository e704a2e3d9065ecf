use common::error::{AppError, Res};
use sqlx::PgPool;
use stripe::{
    CheckoutSession, CheckoutSessionMode, Client, CreateCheckoutSession, CustomerId, Event,
    EventObject, EventType, SubscriptionStatus, Webhook,
};

use crate::{dtos::pay::SubscriptionChange, dtos::pay::SubscriptionRequest, models::plan::PlanId};

/// Creates a checkout session for a given customer.
/// Requires SubscriptionRequest object to specify the Stripe price
/// and urls where app should redirect the user in the case of success or failure
pub async fn create_subscription_session(
    client: &Client,
    customer_id: CustomerId,
    req: SubscriptionRequest,
) -> Res<CheckoutSession> {
    let params = CreateCheckoutSession {
        payment_method_types: Some(vec![stripe::CreateCheckoutSessionPaymentMethodTypes::Card]),
        line_items: Some(vec![stripe::CreateCheckoutSessionLineItems {
            price: Some(req.price_id.to_string()),
            quantity: Some(1),
            ..Default::default()
        }]),
        mode: Some(CheckoutSessionMode::Subscription),
        success_url: Some(req.success_url.as_str()),
        cancel_url: Some(req.cancel_url.as_str()),
        customer: Some(customer_id),
        ..Default::default()
    };
    CheckoutSession::create(client, params)
        .await
        .map_err(AppError::from)
}

/// Creates an event for the webhook based on the request payload and signature.
/// Requires a webhook secret key.
pub fn construct_event(payload: &str, signature: &str, webhook_secret: &str) -> Res<Event> {
    match Webhook::construct_event(payload, signature, webhook_secret) {
        Ok(event) => Ok(event),
        Err(e) => {
            log::error!("Error constructing webhook event: {}", e);
            Err(AppError::BadRequest(format!("Webhook Error: {}", e)))
        }
    }
}

/// Local change requested by a webhook event.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookAction {
    Store {
        change: SubscriptionChange,
        event_at: i64,
    },
    ResetToFree {
        subscription_id: String,
        event_at: i64,
    },
    Ignore,
}

/// Decides what an event does to the local subscriptions table.
///
/// Updates carrying a terminal status are handled like a deletion.
pub fn webhook_action(event: &Event) -> WebhookAction {
    match (&event.type_, &event.data.object) {
        (
            EventType::CustomerSubscriptionCreated | EventType::CustomerSubscriptionUpdated,
            EventObject::Subscription(subscription),
        ) => match subscription.status {
            SubscriptionStatus::Canceled | SubscriptionStatus::IncompleteExpired => {
                WebhookAction::ResetToFree {
                    subscription_id: subscription.id.to_string(),
                    event_at: event.created,
                }
            }
            _ => WebhookAction::Store {
                change: SubscriptionChange::from(subscription),
                event_at: event.created,
            },
        },
        (EventType::CustomerSubscriptionDeleted, EventObject::Subscription(subscription)) => {
            WebhookAction::ResetToFree {
                subscription_id: subscription.id.to_string(),
                event_at: event.created,
            }
        }
        (EventType::CheckoutSessionCompleted, EventObject::CheckoutSession(session)) => {
            log::info!("Checkout session completed: {}", session.id);
            WebhookAction::Ignore
        }
        _ => {
            log::info!("Unhandled event type: {}", event.type_);
            WebhookAction::Ignore
        }
    }
}

/// Applies subscription lifecycle events to the local subscriptions table.
pub async fn process_webhook_event(pool: &PgPool, event: Event) -> Res<()> {
    log::info!("Processing webhook event {}: {}", event.id, event.type_);

    match webhook_action(&event) {
        WebhookAction::Store { change, event_at } => {
            apply_subscription_change(pool, change, event_at).await
        }
        WebhookAction::ResetToFree {
            subscription_id,
            event_at,
        } => apply_subscription_deleted(pool, &subscription_id, event_at).await,
        WebhookAction::Ignore => Ok(()),
    }
}

/// Stores the subscription for the user owning the Stripe customer.
/// Events for customers this service never created are acknowledged and skipped.
pub async fn apply_subscription_change(
    pool: &PgPool,
    change: SubscriptionChange,
    event_at: i64,
) -> Res<()> {
    let Some(user) = db::user::get_user_by_customer_id(pool, &change.customer_id).await? else {
        log::warn!(
            "Subscription {} belongs to unknown customer {}",
            change.id,
            change.customer_id
        );
        return Ok(());
    };

    let id = change.id.clone();
    match db::subscription::upsert_subscription(pool, change.into_upsert(user.id, event_at)).await? {
        Some(stored) => log::info!(
            "Subscription {} of user {} is now {} ({}), cancel_at_period_end={}",
            stored.id,
            stored.user_id,
            stored.plan_id,
            stored.status,
            stored.cancel_at_period_end
        ),
        None => log::info!("Skipped out-of-order event for subscription {}", id),
    }
    Ok(())
}

/// A deleted Stripe subscription drops the user back to the free plan.
pub async fn apply_subscription_deleted(
    pool: &PgPool,
    subscription_id: &str,
    event_at: i64,
) -> Res<()> {
    match db::subscription::reset_subscription_plan(
        pool,
        subscription_id,
        PlanId::Free.as_str(),
        event_at,
    )
    .await?
    {
        Some(sub) => log::info!("Subscription {} of user {} reset to free", sub.id, sub.user_id),
        None => log::warn!(
            "Deleted subscription {} is not stored locally or has newer state",
            subscription_id
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use stripe::{NotificationEventData, Subscription};

    use super::*;

    fn subscription(status: &str) -> Subscription {
        serde_json::from_value(serde_json::json!({
            "id": "sub_1",
            "object": "subscription",
            "automatic_tax": { "enabled": false },
            "billing_cycle_anchor": 1_741_348_800,
            "cancel_at_period_end": false,
            "created": 1_741_348_800,
            "currency": "usd",
            "current_period_start": 1_741_348_800,
            "current_period_end": 1_772_884_800,
            "customer": "cus_1",
            "items": {
                "object": "list",
                "data": [{
                    "id": "si_1",
                    "object": "subscription_item",
                    "price": { "id": "price_1", "object": "price", "lookup_key": "pro_year_usd" }
                }],
                "has_more": false,
                "url": "/v1/subscription_items?subscription=sub_1"
            },
            "livemode": false,
            "metadata": {},
            "start_date": 1_741_348_800,
            "status": status
        }))
        .unwrap()
    }

    fn event(type_: EventType, object: EventObject) -> Event {
        Event {
            type_,
            created: 1_741_400_000,
            data: NotificationEventData {
                object,
                previous_attributes: None,
            },
            ..Default::default()
        }
    }

    #[test]
    fn updated_subscription_is_stored() {
        let action = webhook_action(&event(
            EventType::CustomerSubscriptionUpdated,
            EventObject::Subscription(subscription("active")),
        ));

        match action {
            WebhookAction::Store { change, event_at } => {
                assert_eq!(change.id, "sub_1");
                assert_eq!(change.customer_id, "cus_1");
                assert_eq!(change.plan_id, "pro");
                assert_eq!(event_at, 1_741_400_000);
            }
            other => panic!("expected Store, got {:?}", other),
        }
    }

    #[test]
    fn deleted_subscription_resets_to_free() {
        let action = webhook_action(&event(
            EventType::CustomerSubscriptionDeleted,
            EventObject::Subscription(subscription("canceled")),
        ));

        assert_eq!(
            action,
            WebhookAction::ResetToFree {
                subscription_id: "sub_1".to_string(),
                event_at: 1_741_400_000,
            }
        );
    }

    #[test]
    fn terminal_update_is_treated_as_deletion() {
        for status in ["canceled", "incomplete_expired"] {
            let action = webhook_action(&event(
                EventType::CustomerSubscriptionUpdated,
                EventObject::Subscription(subscription(status)),
            ));
            assert!(
                matches!(action, WebhookAction::ResetToFree { .. }),
                "{} stored as {:?}",
                status,
                action
            );
        }
    }

    #[test]
    fn other_events_are_ignored() {
        let action = webhook_action(&event(
            EventType::InvoicePaid,
            EventObject::Subscription(subscription("active")),
        ));
        assert_eq!(action, WebhookAction::Ignore);

        let action = webhook_action(&event(
            EventType::CustomerSubscriptionUpdated,
            EventObject::Customer(Default::default()),
        ));
        assert_eq!(action, WebhookAction::Ignore);
    }
}
