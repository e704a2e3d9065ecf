use std::{fmt, str::FromStr};

use common::error::{AppError, Res};
use serde::{Deserialize, Serialize};

/// Subscription plan identifiers.
/// Used verbatim in the database and in Stripe price lookup keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanId {
    Free,
    Pro,
    Local,
    Visiting,
}

impl PlanId {
    pub const ALL: [PlanId; 4] = [PlanId::Free, PlanId::Pro, PlanId::Local, PlanId::Visiting];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanId::Free => "free",
            PlanId::Pro => "pro",
            PlanId::Local => "local",
            PlanId::Visiting => "visiting",
        }
    }
}

impl FromStr for PlanId {
    type Err = AppError;

    fn from_str(s: &str) -> Res<Self> {
        PlanId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| AppError::UnknownPlan(s.to_string()))
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing intervals. Every plan bills yearly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Year,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Year => "year",
        }
    }
}

impl FromStr for Interval {
    type Err = AppError;

    fn from_str(s: &str) -> Res<Self> {
        match s {
            "year" => Ok(Interval::Year),
            other => Err(AppError::BadRequest(format!(
                "Unsupported plan interval: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Usd,
    Eur,
}

impl Currency {
    pub const DEFAULT: Currency = Currency::Usd;

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "usd",
            Currency::Eur => "eur",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
        }
    }

    /// Picks the billing currency from an `Accept-Language` header value.
    ///
    /// Clients listing `en-US` among their locales pay in dollars, every other
    /// client pays in euros. No header at all means the default currency.
    pub fn from_accept_language(header: Option<&str>) -> Currency {
        let Some(header) = header.filter(|h| !h.trim().is_empty()) else {
            return Currency::DEFAULT;
        };

        let has_en_us = header
            .split(',')
            .filter_map(|part| part.split(';').next())
            .any(|locale| locale.trim().eq_ignore_ascii_case("en-US"));

        if has_en_us { Currency::Usd } else { Currency::Eur }
    }
}

impl FromStr for Currency {
    type Err = AppError;

    fn from_str(s: &str) -> Res<Self> {
        match s {
            "usd" => Ok(Currency::Usd),
            "eur" => Ok(Currency::Eur),
            other => Err(AppError::BadRequest(format!(
                "Unsupported currency: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A plan of the catalog. Amounts are in minor currency units.
#[derive(Debug)]
pub struct Plan {
    pub id: PlanId,
    pub name: &'static str,
    pub description: &'static str,
    prices: &'static [(Interval, Currency, i64)],
}

impl Plan {
    pub fn price(&self, interval: Interval, currency: Currency) -> Option<i64> {
        self.prices
            .iter()
            .find(|(i, c, _)| *i == interval && *c == currency)
            .map(|(_, _, amount)| *amount)
    }
}

pub static PRICING_PLANS: [Plan; 4] = [
    Plan {
        id: PlanId::Free,
        name: "Free",
        description: "Start with the basics, upgrade anytime.",
        prices: &[
            (Interval::Year, Currency::Usd, 0),
            (Interval::Year, Currency::Eur, 0),
        ],
    },
    Plan {
        id: PlanId::Pro,
        name: "Pro",
        description: "Access to all features and unlimited projects.",
        prices: &[
            (Interval::Year, Currency::Usd, 1990),
            (Interval::Year, Currency::Eur, 1990),
        ],
    },
    Plan {
        id: PlanId::Local,
        name: "Local",
        description: "Access to our local club chat and voting rights.",
        prices: &[
            (Interval::Year, Currency::Usd, 8500),
            (Interval::Year, Currency::Eur, 8500),
        ],
    },
    Plan {
        id: PlanId::Visiting,
        name: "Visiting",
        description: "Access to all features and unlimited projects.",
        prices: &[
            (Interval::Year, Currency::Usd, 3500),
            (Interval::Year, Currency::Eur, 3500),
        ],
    },
];

pub fn plan(id: PlanId) -> &'static Plan {
    // PRICING_PLANS is ordered like PlanId::ALL
    &PRICING_PLANS[id as usize]
}

/// Looks a plan up by its raw identifier.
pub fn find_plan(id: &str) -> Res<&'static Plan> {
    id.parse::<PlanId>().map(plan)
}

/// Price of a plan for one interval and currency.
pub fn price(plan_id: &str, interval: Interval, currency: Currency) -> Res<i64> {
    let plan = find_plan(plan_id)?;
    plan.price(interval, currency).ok_or_else(|| {
        AppError::Internal(format!(
            "Plan {} has no {} price in {}",
            plan.id, interval, currency
        ))
    })
}

/// Renders an amount the way the membership page shows it, e.g. `$ 19.9 / year`.
pub fn format_price(amount: i64, currency: Currency, interval: Interval) -> String {
    format!(
        "{} {} / {}",
        currency.symbol(),
        amount as f64 / 100.0,
        interval
    )
}

/// Stripe lookup key of a catalog price, `{plan}_{interval}_{currency}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PriceKey {
    pub plan_id: PlanId,
    pub interval: Interval,
    pub currency: Currency,
}

impl PriceKey {
    /// Every paid entry of the catalog, which must exist in Stripe.
    pub fn paid() -> impl Iterator<Item = PriceKey> {
        PRICING_PLANS
            .iter()
            .filter(|plan| plan.id != PlanId::Free)
            .flat_map(|plan| {
                plan.prices.iter().map(|(interval, currency, _)| PriceKey {
                    plan_id: plan.id,
                    interval: *interval,
                    currency: *currency,
                })
            })
    }
}

impl FromStr for PriceKey {
    type Err = AppError;

    fn from_str(s: &str) -> Res<Self> {
        let mut parts = s.split('_');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(plan_id), Some(interval), Some(currency), None) => Ok(PriceKey {
                plan_id: plan_id.parse()?,
                interval: interval.parse()?,
                currency: currency.parse()?,
            }),
            _ => Err(AppError::BadRequest(format!("Malformed price key: {}", s))),
        }
    }
}

impl fmt::Display for PriceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.plan_id, self.interval, self.currency)
    }
}
