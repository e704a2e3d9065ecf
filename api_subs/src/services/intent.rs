use actix_web::HttpResponse;
use common::{
    error::{AppError, Res},
    http::redirect,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    dtos::membership::IntentForm,
    models::plan::{Currency, Interval, PlanId},
    services::gateway::BillingGateway,
};

pub const INTENT_CREATE_CHECKOUT: &str = "create-checkout";
pub const INTENT_OPEN_PORTAL: &str = "open-portal";

// spellings posted by older membership forms
const LEGACY_CREATE_CHECKOUT: &str = "subscription-create-checkout";
const LEGACY_OPEN_PORTAL: &str = "subscription-create-customer-portal";

/// Billing action requested by a membership form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingIntent {
    CreateCheckout {
        plan_id: PlanId,
        plan_interval: Interval,
    },
    OpenPortal,
}

impl BillingIntent {
    /// Validates the submitted form.
    ///
    /// Unrecognized or missing intents yield `Ok(None)`. A checkout naming an
    /// unknown plan, the free plan or an unsupported interval is rejected.
    pub fn from_form(form: &IntentForm) -> Res<Option<Self>> {
        match form.intent.as_deref() {
            Some(INTENT_CREATE_CHECKOUT | LEGACY_CREATE_CHECKOUT) => {
                let plan_id = form
                    .plan_id
                    .as_deref()
                    .ok_or_else(|| AppError::BadRequest("planId is required".to_string()))?
                    .parse::<PlanId>()
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                if plan_id == PlanId::Free {
                    return Err(AppError::BadRequest(
                        "The free plan needs no checkout".to_string(),
                    ));
                }
                let plan_interval = form
                    .plan_interval
                    .as_deref()
                    .ok_or_else(|| AppError::BadRequest("planInterval is required".to_string()))?
                    .parse::<Interval>()?;

                Ok(Some(BillingIntent::CreateCheckout {
                    plan_id,
                    plan_interval,
                }))
            }
            Some(INTENT_OPEN_PORTAL | LEGACY_OPEN_PORTAL) => Ok(Some(BillingIntent::OpenPortal)),
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Redirect(String),
    Failed,
    Noop,
}

impl DispatchOutcome {
    pub fn into_response(self) -> HttpResponse {
        match self {
            DispatchOutcome::Redirect(url) => redirect(&url),
            DispatchOutcome::Failed => HttpResponse::Ok().json(json!({ "success": false })),
            DispatchOutcome::Noop => HttpResponse::Ok().json(json!({})),
        }
    }
}

/// Runs one billing intent for an authenticated user.
pub async fn dispatch(
    gateway: &dyn BillingGateway,
    user_id: Uuid,
    intent: Option<BillingIntent>,
    currency: Currency,
) -> DispatchOutcome {
    let url = match intent {
        Some(BillingIntent::CreateCheckout {
            plan_id,
            plan_interval,
        }) => {
            gateway
                .create_subscription_checkout(user_id, plan_id, plan_interval, currency)
                .await
        }
        Some(BillingIntent::OpenPortal) => gateway.create_customer_portal(user_id).await,
        None => return DispatchOutcome::Noop,
    };

    match url {
        Some(url) => DispatchOutcome::Redirect(url),
        None => DispatchOutcome::Failed,
    }
}
