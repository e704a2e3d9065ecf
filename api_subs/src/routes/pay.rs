use std::sync::Arc;

use actix_web::{Responder, post, web};
use common::{
    env_config::Config,
    error::{AppError, Res},
    http::Success,
};
use sqlx::PgPool;

use crate::services;

/// Handles Stripe webhook events for subscription lifecycle changes.
///
/// # Input
/// - `payload`: Raw string containing the webhook event data
/// - `req`: HTTP request containing Stripe signature in headers
/// - `config`: Application configuration with webhook secret
///
/// # Output
/// - Success: Returns 200 OK when webhook is processed successfully
/// - Error: Returns 400 Bad Request for invalid signature or 500 for processing errors
///
/// # Note
/// This endpoint is called by Stripe's servers, not by the frontend.
/// Configure https://yourapp.com/api/pay/webhook in the Stripe Dashboard and
/// set its signing secret as STRIPE_WEBHOOK_SECRET.
///
/// # Event Types Handled
/// - customer.subscription.created / updated: stores the member's plan, period end and cancellation flag
/// - customer.subscription.deleted: moves the member back to the free plan
/// - checkout.session.completed: logged
#[post("/webhook")]
pub async fn post_webhook(
    payload: String,
    req: actix_web::HttpRequest,
    config: web::Data<Arc<Config>>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let webhook_secret = config
        .stripe_webhook_secret
        .as_deref()
        .ok_or_else(|| AppError::Internal("STRIPE_WEBHOOK_SECRET is not configured".to_string()))?;

    let signature = match req.headers().get("stripe-signature") {
        Some(signature) => signature.to_str().unwrap_or(""),
        None => return Err(AppError::BadRequest("Stripe signature missing".to_string())),
    };

    let event = services::pay::construct_event(&payload, signature, webhook_secret)?;
    let pg_pool: &PgPool = &**pool;
    services::pay::process_webhook_event(pg_pool, event).await?;

    Success::ok("Webhook processed successfully")
}
