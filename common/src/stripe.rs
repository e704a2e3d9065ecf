use std::collections::HashMap;

use stripe::{
    BillingPortalSession, Client, CreateBillingPortalSession, CreateCustomer, Customer,
    CustomerId,
};
use uuid::Uuid;

use crate::error::{AppError, Res};

pub fn create_client(secret_key: &str) -> Client {
    Client::new(secret_key)
}

/// Creates a Stripe customer tagged with the owning user's id.
pub async fn create_customer(
    client: &Client,
    user_id: Uuid,
    email: &str,
    name: Option<&str>,
) -> Res<Customer> {
    let params = CreateCustomer {
        email: Some(email),
        name,
        metadata: Some(HashMap::from([(
            "user_id".to_string(),
            user_id.to_string(),
        )])),
        ..Default::default()
    };

    Customer::create(client, params)
        .await
        .map_err(AppError::from)
}

/// Deletes a customer, used to drop duplicates created by concurrent requests.
pub async fn delete_customer(client: &Client, customer_id: &str) -> Res<()> {
    Customer::delete(client, &parse_customer_id(customer_id)?)
        .await
        .map(|_| ())
        .map_err(AppError::from)
}

pub fn parse_customer_id(customer_id: &str) -> Res<CustomerId> {
    customer_id.parse::<CustomerId>().map_err(|e| {
        AppError::Internal(format!(
            "Failed to parse customer id: {}. {}",
            customer_id, e
        ))
    })
}

/// Opens a customer portal session that returns to `return_url`.
pub async fn create_portal_session(
    client: &Client,
    customer_id: &str,
    return_url: &str,
) -> Res<BillingPortalSession> {
    let mut params = CreateBillingPortalSession::new(parse_customer_id(customer_id)?);
    params.return_url = Some(return_url);

    BillingPortalSession::create(client, params)
        .await
        .map_err(AppError::from)
}
