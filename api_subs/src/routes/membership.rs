use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Responder, get, http::header::ACCEPT_LANGUAGE, post, web};
use common::{error::Res, http::Success, jwt::JwtClaims};
use sqlx::PgPool;

use crate::{
    dtos::membership::IntentForm,
    models::plan::Currency,
    services::{self, gateway::BillingGateway, intent::BillingIntent},
};

fn request_currency(req: &HttpRequest) -> Currency {
    Currency::from_accept_language(
        req.headers()
            .get(ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok()),
    )
}

/// Returns the membership page state of the authenticated user.
///
/// # Output
/// - Success: the current plan, renewal/expiry label, upgrade options priced
///   in the client's currency
/// - Error: 302 to the login path without a session
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/dashboard/membership', { credentials: 'include' });
/// const view = await response.json();
/// // {
/// //   plan: { id: "pro", name: "Pro", description: "Access to all features and unlimited projects." },
/// //   upgradable: false,
/// //   period: { status: "renews", label: "Renews on", date: "3/7/2026" },
/// //   selected_plan: "pro",
/// //   upgrade_label: "Upgrade to Pro",
/// //   plans: [],
/// //   currency: "usd"
/// // }
/// ```
#[get("")]
pub async fn get_membership(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
    req: HttpRequest,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &**pool;
    let subscription =
        db::subscription::get_subscription_by_user_id(pg_pool, claims.user_id).await?;

    Success::ok(services::sub::reconcile(
        subscription.as_ref(),
        request_currency(&req),
    ))
}

/// Runs the billing action submitted by the membership form.
///
/// # Input
/// Form body (`application/x-www-form-urlencoded`):
/// - `intent`: `create-checkout` or `open-portal`
/// - `planId`, `planInterval`: required for checkout
///
/// # Output
/// - 302 to the Stripe checkout or portal URL
/// - 200 `{ "success": false }` when Stripe produced no session
/// - 200 `{}` for an unrecognized intent
/// - 400 for an invalid checkout plan
///
/// # Frontend Example
/// ```html
/// <form method="POST" action="/api/dashboard/membership">
///   <input type="hidden" name="planId" value="pro" />
///   <input type="hidden" name="planInterval" value="year" />
///   <button type="submit" name="intent" value="create-checkout">Upgrade to Pro</button>
/// </form>
/// ```
#[post("")]
pub async fn post_membership(
    claims: web::ReqData<JwtClaims>,
    form: web::Form<IntentForm>,
    gateway: web::Data<Arc<dyn BillingGateway>>,
    req: HttpRequest,
) -> Res<HttpResponse> {
    let intent = BillingIntent::from_form(&form)?;
    let gateway: &dyn BillingGateway = gateway.get_ref().as_ref();

    let outcome =
        services::intent::dispatch(gateway, claims.user_id, intent, request_currency(&req)).await;
    Ok(outcome.into_response())
}
