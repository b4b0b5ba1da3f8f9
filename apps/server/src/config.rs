use std::{net::SocketAddr, str::FromStr, time::Duration};

use tracing::warn;
use wayfarer_acquisition::config::{
    parse_assignments, parse_list, parse_namespace_ttls, AcquisitionConfig,
};
use wayfarer_acquisition::{HttpProviderConfig, OutputFormat};

pub struct Config {
    pub listen_addr: SocketAddr,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub acquisition: AcquisitionConfig,
    pub providers: Vec<HttpProviderConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_allow: vec!["*".to_string()],
            request_timeout: Duration::from_secs(60),
            acquisition: AcquisitionConfig::default(),
            providers: Vec::new(),
        }
    }
}

impl Config {
    /// Load settings from the environment (and `.env`).
    ///
    /// Malformed values are logged and replaced by their defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = AcquisitionConfig::default();

        let listen_addr = env_or("WAYFARER_LISTEN_ADDR", Config::default().listen_addr);
        let cors_allow = parse_list(
            &std::env::var("WAYFARER_CORS_ALLOW_ORIGINS").unwrap_or_else(|_| "*".into()),
        );
        let timeout_ms: u64 = env_or("WAYFARER_REQUEST_TIMEOUT_MS", 60_000);

        let mut namespace_ttl_secs = defaults.namespace_ttl_secs.clone();
        namespace_ttl_secs.extend(env_map("WAYFARER_NAMESPACE_TTLS", parse_namespace_ttls));

        let acquisition = AcquisitionConfig {
            cache_capacity: env_or("WAYFARER_CACHE_CAPACITY", defaults.cache_capacity),
            default_ttl_secs: env_or("WAYFARER_DEFAULT_TTL_SECS", defaults.default_ttl_secs),
            namespace_ttl_secs,
            provider_order: std::env::var("WAYFARER_PROVIDER_ORDER")
                .map(|raw| parse_list(&raw))
                .unwrap_or_default(),
            credits: env_map("WAYFARER_PROVIDER_CREDITS", parse_assignments::<u32>),
            provider_timeout_secs: env_map("WAYFARER_PROVIDER_TIMEOUTS", parse_assignments::<u64>),
            default_provider_timeout_secs: env_or(
                "WAYFARER_PROVIDER_TIMEOUT_SECS",
                defaults.default_provider_timeout_secs,
            ),
            task_timeout_secs: env_opt("WAYFARER_TASK_TIMEOUT_SECS").or(defaults.task_timeout_secs),
            cleanup_interval_secs: env_or(
                "WAYFARER_CACHE_CLEANUP_INTERVAL_SECS",
                defaults.cleanup_interval_secs,
            ),
            credit_reset_interval_secs: env_or(
                "WAYFARER_CREDIT_RESET_INTERVAL_SECS",
                defaults.credit_reset_interval_secs,
            ),
        };

        Self {
            listen_addr,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            acquisition,
            providers: providers_from_env(),
        }
    }
}

/// Read and parse a variable, keeping `default` when it is unset or malformed.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring invalid {}='{}', using default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_opt<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    let parsed = raw.trim().parse().ok();
    if parsed.is_none() {
        warn!("Ignoring invalid {}='{}'", key, raw);
    }
    parsed
}

fn env_map<T, E, F>(key: &str, parse: F) -> T
where
    T: Default,
    E: std::fmt::Display,
    F: Fn(&str, &str) -> Result<T, E>,
{
    match std::env::var(key) {
        Ok(raw) => parse(key, &raw).unwrap_or_else(|e| {
            warn!("Ignoring {}: {}", key, e);
            T::default()
        }),
        Err(_) => T::default(),
    }
}

/// Providers come from `WAYFARER_PROVIDERS=id=endpoint,...`. Each provider's
/// key is read from `WAYFARER_PROVIDER_KEY_<ID>` and its supported formats
/// from `WAYFARER_PROVIDER_FORMATS_<ID>` (all formats when unset).
fn providers_from_env() -> Vec<HttpProviderConfig> {
    let endpoints = env_map("WAYFARER_PROVIDERS", parse_assignments::<String>);

    let mut providers: Vec<HttpProviderConfig> = endpoints
        .into_iter()
        .map(|(id, endpoint)| {
            let suffix = id.to_uppercase().replace('-', "_");
            let api_key = std::env::var(format!("WAYFARER_PROVIDER_KEY_{}", suffix))
                .ok()
                .filter(|k| !k.trim().is_empty());
            let formats = std::env::var(format!("WAYFARER_PROVIDER_FORMATS_{}", suffix))
                .map(|raw| parse_formats(&id, &raw))
                .unwrap_or_default();

            HttpProviderConfig {
                id,
                endpoint,
                api_key,
                formats,
            }
        })
        .collect();

    // HashMap order is arbitrary; registration order only matters for
    // providers missing from WAYFARER_PROVIDER_ORDER.
    providers.sort_by(|a, b| a.id.cmp(&b.id));
    providers
}

fn parse_formats(provider: &str, raw: &str) -> Vec<OutputFormat> {
    parse_list(raw)
        .into_iter()
        .filter_map(|name| {
            match serde_json::from_value::<OutputFormat>(serde_json::Value::String(
                name.to_lowercase(),
            )) {
                Ok(format) => Some(format),
                Err(_) => {
                    warn!("Unknown format '{}' for provider '{}'", name, provider);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats_skips_unknown() {
        let formats = parse_formats("jina", "Markdown, text, pdf");
        assert_eq!(formats, vec![OutputFormat::Markdown, OutputFormat::Text]);
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        std::env::set_var("WAYFARER_TEST_CAPACITY", "many");
        assert_eq!(env_or("WAYFARER_TEST_CAPACITY", 1000usize), 1000);
        std::env::set_var("WAYFARER_TEST_CAPACITY", " 250 ");
        assert_eq!(env_or("WAYFARER_TEST_CAPACITY", 1000usize), 250);
        std::env::remove_var("WAYFARER_TEST_CAPACITY");
    }
}
