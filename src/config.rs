use rust_decimal::Decimal;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::aggregates::PricingPolicy;

const DEFAULT_PORT: u16 = 8083;
const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 60;
const DEFAULT_REFRESH_TOKEN_DAYS: i64 = 7;
const DEV_JWT_SECRET: &str = "storefront-development-secret-do-not-use-in-production";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    /// PostgreSQL URL; the in-memory store is used when absent.
    pub database_url: Option<String>,
    pub port: u16,
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub nats_url: Option<String>,
    /// Shared secret the payment gateway sends in `X-Payment-Secret`.
    pub payment_webhook_secret: Option<String>,
    pub pricing: PricingPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ if cfg!(debug_assertions) => DEV_JWT_SECRET.to_string(),
            _ => return Err(ConfigError::Missing("JWT_SECRET")),
        };

        let defaults = PricingPolicy::default();
        let pricing = PricingPolicy {
            service_fee_percent: parse_var("SERVICE_FEE_PERCENT")?.unwrap_or(defaults.service_fee_percent),
            default_tax_rate: parse_var("DEFAULT_TAX_RATE")?.unwrap_or(defaults.default_tax_rate),
            tax_rates: match env::var("TAX_RATES") {
                Ok(raw) => parse_tax_rates(&raw)?,
                Err(_) => HashMap::new(),
            },
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            port: parse_var("PORT")?.unwrap_or(DEFAULT_PORT),
            jwt_secret,
            access_token_minutes: parse_var("ACCESS_TOKEN_MINUTES")?.unwrap_or(DEFAULT_ACCESS_TOKEN_MINUTES),
            refresh_token_days: parse_var("REFRESH_TOKEN_DAYS")?.unwrap_or(DEFAULT_REFRESH_TOKEN_DAYS),
            nats_url: env::var("NATS_URL").ok().filter(|s| !s.is_empty()),
            payment_webhook_secret: env::var("PAYMENT_WEBHOOK_SECRET").ok().filter(|s| !s.is_empty()),
            pricing,
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map(Some).map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(None),
    }
}

/// Parses `Nigeria=7.5,United States=8` into lower-cased country keys.
pub fn parse_tax_rates(raw: &str) -> Result<HashMap<String, Decimal>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let invalid = || ConfigError::Invalid { name: "TAX_RATES", value: pair.to_string() };
            let (country, rate) = pair.split_once('=').ok_or_else(invalid)?;
            let rate = Decimal::from_str(rate.trim()).map_err(|_| invalid())?;
            Ok((country.trim().to_lowercase(), rate))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_tax_rates() {
        let rates = parse_tax_rates("Nigeria=7.5, United States = 8,").unwrap();
        assert_eq!(rates.get("nigeria"), Some(&dec!(7.5)));
        assert_eq!(rates.get("united states"), Some(&dec!(8)));
        assert!(parse_tax_rates("Nigeria:7").is_err());
        assert!(parse_tax_rates("Nigeria=lots").is_err());
    }
}
