//! Server Configuration

use anyhow::{ensure, Context, Result};
use chrono::Duration;
use std::str::FromStr;

use assistant_context::ThemeId;
use assistant_core::MetadataConfig;

/// Longest accepted dedup retention (one year)
const MAX_DEDUP_RETENTION_HOURS: i64 = 24 * 365;

/// Configuration loaded from the environment (and `.env`)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,

    /// Webhook signing secret. Signature checks are skipped when unset.
    pub webhook_secret: Option<String>,

    /// Checkout creation is disabled when unset
    pub stripe_secret_key: Option<String>,

    /// Namespaces every new user starts with
    pub default_themes: Vec<ThemeId>,

    /// Theme receiving checkout status entries
    pub billing_theme: ThemeId,

    pub metadata: MetadataConfig,

    pub dedup_capacity: usize,
    pub dedup_retention: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            webhook_secret: None,
            stripe_secret_key: None,
            default_themes: vec![ThemeId(1)],
            billing_theme: ThemeId(1),
            metadata: MetadataConfig::default(),
            dedup_capacity: 10_000,
            dedup_retention: Duration::hours(72),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let default_themes = match optional_env("DEFAULT_THEMES") {
            Some(raw) => parse_themes(&raw).context("DEFAULT_THEMES must be comma-separated integers")?,
            None => defaults.default_themes,
        };

        Ok(Self {
            bind_addr: optional_env("BIND_ADDR").unwrap_or(defaults.bind_addr),
            webhook_secret: optional_env("CHECKOUT_WEBHOOK_SECRET"),
            stripe_secret_key: optional_env("STRIPE_SECRET_KEY"),
            default_themes,
            billing_theme: ThemeId(parse_env("BILLING_THEME_ID", defaults.billing_theme.0)?),
            metadata: MetadataConfig {
                output_template: optional_env("WIDGET_OUTPUT_TEMPLATE")
                    .unwrap_or(defaults.metadata.output_template),
                widget_domain: optional_env("WIDGET_DOMAIN").unwrap_or(defaults.metadata.widget_domain),
                widget_prefers_border: parse_env(
                    "WIDGET_PREFERS_BORDER",
                    defaults.metadata.widget_prefers_border,
                )?,
            },
            dedup_capacity: parse_env("DEDUP_CAPACITY", defaults.dedup_capacity)?,
            dedup_retention: retention_hours(parse_env("DEDUP_RETENTION_HOURS", 72)?)
                .context("DEDUP_RETENTION_HOURS is out of range")?,
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Environment variable '{key}' has an invalid value")),
        None => Ok(default),
    }
}

fn retention_hours(hours: i64) -> Result<Duration> {
    ensure!(
        (1..=MAX_DEDUP_RETENTION_HOURS).contains(&hours),
        "expected 1..={MAX_DEDUP_RETENTION_HOURS} hours, got {hours}"
    );
    Ok(Duration::hours(hours))
}

fn parse_themes(raw: &str) -> Result<Vec<ThemeId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().map(ThemeId).with_context(|| format!("bad theme id '{s}'")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_themes() {
        assert_eq!(parse_themes("1, 2,,3").unwrap(), vec![ThemeId(1), ThemeId(2), ThemeId(3)]);
        assert!(parse_themes("1,x").is_err());
    }

    #[test]
    fn test_retention_hours_bounds() {
        assert_eq!(retention_hours(72).unwrap(), Duration::hours(72));
        assert_eq!(
            retention_hours(MAX_DEDUP_RETENTION_HOURS).unwrap(),
            Duration::hours(MAX_DEDUP_RETENTION_HOURS)
        );
        for bad in [0, -1, MAX_DEDUP_RETENTION_HOURS + 1, 10_000_000_000, i64::MIN] {
            assert!(retention_hours(bad).is_err(), "{bad} hours accepted");
        }
    }
}
