use std::collections::HashMap;

use common::error::{AppError, Res};
use stripe::{Client, ListPrices, Price};

use crate::{
    misc::pay::price_key,
    models::plan::{self, PriceKey},
};

/// Stripe price ids of the catalog, keyed by lookup key.
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    prices: HashMap<PriceKey, String>,
}

impl PriceBook {
    /// Reads active Stripe prices and keeps the ones carrying a catalog
    /// lookup key. Paid catalog entries without a Stripe price are reported.
    pub async fn load(client: &Client) -> Res<Self> {
        let params = ListPrices {
            active: Some(true),
            limit: Some(100),
            ..Default::default()
        };

        let prices = Price::list(client, &params).await.map_err(AppError::from)?;

        let mut book = PriceBook::default();
        for price in prices.data {
            let Some(key) = price_key(&price) else {
                continue;
            };

            let expected = plan::plan(key.plan_id).price(key.interval, key.currency);
            if price.unit_amount != expected {
                log::warn!(
                    "Stripe price {} ({}) is {:?}, catalog says {:?}",
                    price.id,
                    key,
                    price.unit_amount,
                    expected
                );
            }
            book.prices.insert(key, price.id.to_string());
        }

        for key in book.missing() {
            log::warn!("No active Stripe price with lookup key {}", key);
        }
        log::info!("Loaded {} catalog prices from Stripe", book.prices.len());

        Ok(book)
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (PriceKey, String)>) -> Self {
        PriceBook {
            prices: entries.into_iter().collect(),
        }
    }

    pub fn price_id(&self, key: &PriceKey) -> Option<&str> {
        self.prices.get(key).map(String::as_str)
    }

    /// Paid catalog entries that cannot be sold.
    pub fn missing(&self) -> Vec<PriceKey> {
        PriceKey::paid()
            .filter(|key| !self.prices.contains_key(key))
            .collect()
    }
}
