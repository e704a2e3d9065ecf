mod cors;

use std::{io, sync::Arc};

use actix_web::{
    App, HttpServer,
    web::{self},
};
use api_subs::services::{
    gateway::{BillingGateway, StripeGateway},
    price_book::PriceBook,
};
use common::env_config::Config;

#[actix_web::main]
async fn main() -> io::Result<()> {
    // get env vars
    let config = Config::from_env().map_err(|e| io::Error::other(e.to_string()))?;
    let config_data = config.clone();

    // get info
    let is_production = config.is_production();
    let origin = config.cors_allowed_origin.clone();
    let cookie_secure = !origin.contains("localhost");
    let login_path = config.login_path.clone();

    // init logger
    if config.console_logging_enabled {
        logger::setup().map_err(|e| io::Error::other(e.to_string()))?;
    }

    // init db connection
    let pool = db::setup(&config.database_url, is_production)
        .await
        .map_err(|e| io::Error::other(format!("Failed to set up database: {}", e)))?;

    // resolve catalog prices from Stripe
    let client = common::stripe::create_client(&config.stripe_secret_key);
    let prices = PriceBook::load(&client)
        .await
        .map_err(|e| io::Error::other(format!("Failed to load Stripe prices: {}", e)))?;
    let gateway: Arc<dyn BillingGateway> = Arc::new(StripeGateway::new(
        client,
        pool.clone(),
        Arc::new(prices),
        config.host_url(),
    ));

    log::info!(
        "Starting {} server on {}:{}",
        config.environment,
        config.server_host,
        config.server_port
    );

    HttpServer::new(move || {
        let secret = config_data.jwt_config.secret.as_str();
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config_data.clone()))
            .app_data(web::Data::new(gateway.clone()))
            .wrap(logger::middleware(config_data.console_logging_enabled)) // 4th
            .wrap(extractor::middleware(secret)) // 3rd
            .wrap(cors::middleware(&origin)) // 2nd
            .wrap(api_auth::session_middleware(
                cookie_secure,
                is_production,
                secret.as_bytes(),
            )) // 1st
            .service(
                web::scope("/api")
                    .service(api_subs::mount_webhook())
                    .service(
                        web::scope("/dashboard")
                            .wrap(api_auth::require_user(&login_path))
                            .service(api_subs::mount_membership()),
                    ),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
