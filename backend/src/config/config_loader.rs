use std::{fmt::Display, str::FromStr};

use anyhow::{Context, Result};

use super::config_model::{
    BackendServer, Cloudinary, Database, DotEnvyConfig, Jwt, Stripe,
};

const MIN_JWT_SECRET_BYTES: usize = 32;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    load_from(|key| std::env::var(key).ok())
}

pub fn load_from<F>(lookup: F) -> Result<DotEnvyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let backend_server = BackendServer {
        port: parse_or(&lookup, "SERVER_PORT_BACKEND", 8080)?,
        body_limit: parse_or(&lookup, "SERVER_BODY_LIMIT", 10)?,
        timeout: parse_or(&lookup, "SERVER_TIMEOUT", 30)?,
    };

    let database = Database {
        url: required(&lookup, "DATABASE_URL")?,
        max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
    };

    let jwt_secret = required(&lookup, "JWT_SECRET")?;
    if jwt_secret.len() < MIN_JWT_SECRET_BYTES {
        anyhow::bail!("JWT_SECRET must be at least {MIN_JWT_SECRET_BYTES} bytes");
    }

    let jwt = Jwt {
        secret: jwt_secret,
        issuer: string_or(&lookup, "JWT_ISSUER", "storefront-api"),
        audience: string_or(&lookup, "JWT_AUDIENCE", "storefront-clients"),
        expiration_minutes: parse_or(&lookup, "JWT_EXPIRATION_MINUTES", 60)?,
    };

    let stripe = Stripe {
        secret_key: required(&lookup, "STRIPE_SECRET_KEY")?,
        publishable_key: required(&lookup, "STRIPE_PUBLISHABLE_KEY")?,
        webhook_secret: required(&lookup, "STRIPE_WEBHOOK_SECRET")?,
        currency: string_or(&lookup, "STRIPE_CURRENCY", "usd").to_lowercase(),
        timeout_secs: parse_or(&lookup, "STRIPE_TIMEOUT_SECS", 15)?,
        webhook_tolerance_secs: parse_or(&lookup, "STRIPE_WEBHOOK_TOLERANCE_SECS", 300)?,
    };

    let cloudinary = Cloudinary {
        cloud_name: required(&lookup, "CLOUDINARY_CLOUD_NAME")?,
        api_key: required(&lookup, "CLOUDINARY_API_KEY")?,
        api_secret: required(&lookup, "CLOUDINARY_API_SECRET")?,
        folder: string_or(&lookup, "CLOUDINARY_FOLDER", "ecommerce-products"),
        timeout_secs: parse_or(&lookup, "CLOUDINARY_TIMEOUT_SECS", 30)?,
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        jwt,
        stripe,
        cloudinary,
    })
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, key).with_context(|| format!("{key} is missing"))
}

fn string_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, key).unwrap_or_else(|| default.to_string())
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match non_empty(lookup, key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|err| anyhow::anyhow!("{key} is invalid: {err}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("DATABASE_URL", "postgres://localhost:5432/storefront".to_string()),
            ("JWT_SECRET", "supersecretjwtsecretforunittesting123".to_string()),
            ("STRIPE_SECRET_KEY", "sk_test_123".to_string()),
            ("STRIPE_PUBLISHABLE_KEY", "pk_test_123".to_string()),
            ("STRIPE_WEBHOOK_SECRET", "whsec_123".to_string()),
            ("CLOUDINARY_CLOUD_NAME", "demo".to_string()),
            ("CLOUDINARY_API_KEY", "key".to_string()),
            ("CLOUDINARY_API_SECRET", "secret".to_string()),
        ])
    }

    fn load_env(env: &HashMap<&'static str, String>) -> Result<DotEnvyConfig> {
        load_from(|key| env.get(key).cloned())
    }

    #[test]
    fn applies_defaults() {
        let config = load_env(&base_env()).unwrap();

        assert_eq!(config.backend_server.port, 8080);
        assert_eq!(config.backend_server.body_limit, 10);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.jwt.issuer, "storefront-api");
        assert_eq!(config.jwt.expiration_minutes, 60);
        assert_eq!(config.stripe.currency, "usd");
        assert_eq!(config.stripe.webhook_tolerance_secs, 300);
        assert_eq!(config.cloudinary.folder, "ecommerce-products");
    }

    #[test]
    fn missing_required_variable_fails() {
        let mut env = base_env();
        env.remove("STRIPE_WEBHOOK_SECRET");

        let err = load_env(&env).unwrap_err();
        assert!(err.to_string().contains("STRIPE_WEBHOOK_SECRET"));
    }

    #[test]
    fn short_jwt_secret_fails() {
        let mut env = base_env();
        env.insert("JWT_SECRET", "short".to_string());

        assert!(load_env(&env).is_err());
    }

    #[test]
    fn unparsable_number_fails() {
        let mut env = base_env();
        env.insert("SERVER_PORT_BACKEND", "eighty".to_string());

        let err = load_env(&env).unwrap_err();
        assert!(err.to_string().contains("SERVER_PORT_BACKEND"));
    }

    #[test]
    fn currency_is_lower_cased() {
        let mut env = base_env();
        env.insert("STRIPE_CURRENCY", "EUR".to_string());

        assert_eq!(load_env(&env).unwrap().stripe.currency, "eur");
    }
}
