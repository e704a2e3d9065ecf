use std::sync::Arc;

use async_trait::async_trait;
use common::error::{AppError, Res};
use sqlx::PgPool;
use stripe::Client;
use uuid::Uuid;

use crate::{
    dtos::pay::SubscriptionRequest,
    models::plan::{Currency, Interval, PlanId, PriceKey},
    services::{pay, price_book::PriceBook},
};

/// Billing operations backed by the payment processor.
///
/// Both operations answer `None` when no session could be produced. Callers
/// treat that as a retryable condition, never as a crash.
#[async_trait]
pub trait BillingGateway: Send + Sync {
    /// URL of a hosted checkout subscribing `user_id` to a plan.
    async fn create_subscription_checkout(
        &self,
        user_id: Uuid,
        plan_id: PlanId,
        plan_interval: Interval,
        currency: Currency,
    ) -> Option<String>;

    /// URL of the hosted customer portal for `user_id`.
    async fn create_customer_portal(&self, user_id: Uuid) -> Option<String>;
}

pub struct StripeGateway {
    client: Client,
    pool: Arc<PgPool>,
    prices: Arc<PriceBook>,
    host_url: String,
}

impl StripeGateway {
    pub fn new(client: Client, pool: Arc<PgPool>, prices: Arc<PriceBook>, host_url: String) -> Self {
        Self {
            client,
            pool,
            prices,
            host_url,
        }
    }

    fn membership_url(&self) -> String {
        format!("{}/dashboard/membership", self.host_url)
    }

    /// Returns the user's Stripe customer id, creating the customer on first use.
    async fn ensure_customer(&self, user_id: Uuid) -> Res<String> {
        let user = db::user::get_user_by_id(self.pool.as_ref(), user_id).await?;
        if let Some(customer_id) = user.stripe_customer_id {
            return Ok(customer_id);
        }

        let customer = common::stripe::create_customer(
            &self.client,
            user.id,
            &user.email,
            user.name.as_deref(),
        )
        .await?;
        let customer_id = customer.id.to_string();

        match db::user::claim_stripe_customer_id(self.pool.as_ref(), user.id, &customer_id).await? {
            Some(_) => {
                log::info!("Created Stripe customer {} for user {}", customer_id, user.id);
                Ok(customer_id)
            }
            None => {
                // a concurrent request stored its customer first
                let winner = db::user::get_user_by_id(self.pool.as_ref(), user.id)
                    .await?
                    .stripe_customer_id
                    .ok_or_else(|| {
                        AppError::Internal(format!("User {} lost its Stripe customer", user.id))
                    })?;
                log::warn!(
                    "User {} already has customer {}, deleting duplicate {}",
                    user.id,
                    winner,
                    customer_id
                );
                if let Err(e) = common::stripe::delete_customer(&self.client, &customer_id).await {
                    log::error!("Failed to delete duplicate customer {}: {}", customer_id, e);
                }
                Ok(winner)
            }
        }
    }

    async fn try_create_checkout(
        &self,
        user_id: Uuid,
        plan_id: PlanId,
        plan_interval: Interval,
        currency: Currency,
    ) -> Res<String> {
        // only free members go through checkout, paid members use the portal
        let current = db::subscription::get_subscription_by_user_id(self.pool.as_ref(), user_id)
            .await?;
        if let Some(sub) = current.filter(|s| s.plan_id != PlanId::Free.as_str()) {
            return Err(AppError::GatewaySession(format!(
                "user already subscribed to '{}'",
                sub.plan_id
            )));
        }

        let key = PriceKey {
            plan_id,
            interval: plan_interval,
            currency,
        };
        let price_id = self
            .prices
            .price_id(&key)
            .ok_or_else(|| AppError::GatewaySession(format!("no Stripe price for {}", key)))?
            .to_string();

        let customer_id = self.ensure_customer(user_id).await?;
        let req = SubscriptionRequest {
            price_id,
            success_url: format!("{}?checkout=success", self.membership_url()),
            cancel_url: self.membership_url(),
        };

        let session = pay::create_subscription_session(
            &self.client,
            common::stripe::parse_customer_id(&customer_id)?,
            req,
        )
        .await?;

        session
            .url
            .ok_or_else(|| AppError::GatewaySession("checkout session has no url".to_string()))
    }

    async fn try_create_portal(&self, user_id: Uuid) -> Res<String> {
        let customer_id = self.ensure_customer(user_id).await?;
        let session =
            common::stripe::create_portal_session(&self.client, &customer_id, &self.membership_url())
                .await?;
        Ok(session.url)
    }
}

#[async_trait]
impl BillingGateway for StripeGateway {
    async fn create_subscription_checkout(
        &self,
        user_id: Uuid,
        plan_id: PlanId,
        plan_interval: Interval,
        currency: Currency,
    ) -> Option<String> {
        match self
            .try_create_checkout(user_id, plan_id, plan_interval, currency)
            .await
        {
            Ok(url) => {
                log::info!("Checkout for user {} on {} created", user_id, plan_id);
                Some(url)
            }
            Err(e) => {
                log::error!("Checkout for user {} on {} failed: {}", user_id, plan_id, e);
                None
            }
        }
    }

    async fn create_customer_portal(&self, user_id: Uuid) -> Option<String> {
        match self.try_create_portal(user_id).await {
            Ok(url) => Some(url),
            Err(e) => {
                log::error!("Customer portal for user {} failed: {}", user_id, e);
                None
            }
        }
    }
}
