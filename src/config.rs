use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;

use log::{info, warn};

use crate::model::PackageLimits;
use crate::optimizer::PackingConfig;
use crate::subset::{MAX_EXHAUSTIVE_ITEMS, SearchBounds};
use crate::types::Grams;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub catalog: CatalogConfig,
    pub optimizer: OptimizerConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            catalog: CatalogConfig::from_env(),
            optimizer: OptimizerConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;

    fn from_env() -> Self {
        let host_value =
            env_string("PACKMAN_API_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, display_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "⚠️ Could not parse PACKMAN_API_HOST ('{}'): {}. Using {}.",
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match env_string("PACKMAN_API_PORT") {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!(
                        "⚠️ PACKMAN_API_PORT must not be 0. Using {}.",
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        "⚠️ Could not parse PACKMAN_API_PORT ('{}'): {}. Using {}.",
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

/// Location of the item catalog served to clients.
#[derive(Clone, Debug)]
pub struct CatalogConfig {
    path: Option<PathBuf>,
}

impl CatalogConfig {
    fn from_env() -> Self {
        Self {
            path: env_string("PACKMAN_CATALOG_PATH").map(PathBuf::from),
        }
    }

    /// Catalog file, if one is configured.
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

/// Configuration for the allocation engine.
#[derive(Clone, Debug)]
pub struct OptimizerConfig {
    packing: PackingConfig,
}

impl OptimizerConfig {
    const MAX_WEIGHT_VAR: &'static str = "PACKMAN_MAX_PACKAGE_WEIGHT";
    const MAX_PRICE_VAR: &'static str = "PACKMAN_MAX_PACKAGE_PRICE";
    const BALANCE_VAR: &'static str = "PACKMAN_BALANCE_ENABLED";
    const EXACT_LIMIT_VAR: &'static str = "PACKMAN_EXACT_SUBSET_LIMIT";

    fn from_env() -> Self {
        let defaults = PackingConfig::default();
        let max_shippable = defaults.schedule.max_weight();

        let max_weight = load_with_warning(
            Self::MAX_WEIGHT_VAR,
            PackageLimits::DEFAULT_MAX_WEIGHT,
            |value: Grams| value > 0 && value <= max_shippable,
            "must be between 1 and the heaviest shipping bracket",
            "Warning: Adjusted weight cap changes how many packages are needed",
        );

        let max_price = load_with_warning(
            Self::MAX_PRICE_VAR,
            PackageLimits::DEFAULT_MAX_PRICE,
            |value: f64| value.is_finite() && value > 0.0,
            "must be greater than 0",
            "Warning: Adjusted price cap changes how many packages are needed",
        );

        let exact_subset_limit = load_with_warning(
            Self::EXACT_LIMIT_VAR,
            SearchBounds::DEFAULT_EXACT_ITEM_LIMIT,
            |value: usize| value <= MAX_EXHAUSTIVE_ITEMS,
            "must not exceed 30",
            "Warning: Adjusted exhaustive search limit may slow down balancing",
        );

        let balance_enabled = env_string(Self::BALANCE_VAR)
            .and_then(|raw| parse_bool(&raw, Self::BALANCE_VAR))
            .unwrap_or(PackingConfig::DEFAULT_BALANCE_ENABLED);

        let packing = match PackageLimits::new(max_weight, max_price) {
            Ok(limits) => PackingConfig::builder()
                .limits(limits)
                .balance_enabled(balance_enabled)
                .exact_subset_limit(exact_subset_limit)
                .build()
                .unwrap_or_else(|err| {
                    warn!("⚠️ {}. Using default packing configuration.", err);
                    defaults
                }),
            Err(err) => {
                warn!("⚠️ {}. Using default packing configuration.", err);
                defaults
            }
        };

        Self { packing }
    }

    /// Returns the configured PackingConfig.
    pub fn packing_config(&self) -> PackingConfig {
        self.packing.clone()
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            packing: PackingConfig::default(),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name, err
            );
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            warn!(
                "⚠️ Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

/// Parses a value and checks it against the validator.
fn parse_validated<T>(raw: &str, validator: impl Fn(T) -> bool) -> Result<T, String>
where
    T: std::str::FromStr + Copy,
    T::Err: std::fmt::Display,
{
    match raw.parse::<T>() {
        Ok(value) if validator(value) => Ok(value),
        Ok(_) => Err("out of range".to_string()),
        Err(err) => Err(err.to_string()),
    }
}

fn load_with_warning<T>(
    var_name: &str,
    default: T,
    validator: impl Fn(T) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> T
where
    T: std::str::FromStr + Copy + PartialEq + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    let Some(raw) = env_string(var_name) else {
        return default;
    };
    match parse_validated(&raw, validator) {
        Ok(value) => {
            if value != default {
                info!("⚠️ {} ({} = {}).", warning, var_name, value);
            }
            value
        }
        Err(reason) => {
            warn!(
                "⚠️ {} contains invalid value '{}' ({}): {}. Using {}.",
                var_name, raw, reason, invalid_hint, default
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_true_values() {
        assert_eq!(parse_bool("1", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("true", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("yes", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("on", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("TRUE", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool(" true ", "TEST_VAR"), Some(true));
    }

    #[test]
    fn test_parse_bool_false_values() {
        assert_eq!(parse_bool("0", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("false", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("no", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("OFF", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("  0  ", "TEST_VAR"), Some(false));
    }

    #[test]
    fn test_parse_bool_invalid_values() {
        assert_eq!(parse_bool("maybe", "TEST_VAR"), None);
        assert_eq!(parse_bool("2", "TEST_VAR"), None);
        assert_eq!(parse_bool("", "TEST_VAR"), None);
    }

    #[test]
    fn test_parse_validated_applies_validator() {
        let in_range = |value: Grams| value > 0 && value <= 5000;
        assert_eq!(parse_validated("4000", in_range), Ok(4000));
        assert!(parse_validated("6000", in_range).is_err());
        assert!(parse_validated("0", in_range).is_err());
        assert!(parse_validated("-1", in_range).is_err());
        assert!(parse_validated("heavy", in_range).is_err());
    }

    #[test]
    fn test_missing_variable_uses_default() {
        let value = load_with_warning(
            "PACKMAN_TEST_SURELY_UNSET_VARIABLE",
            42usize,
            |_| true,
            "",
            "",
        );
        assert_eq!(value, 42);
    }

    #[test]
    fn test_default_optimizer_config_matches_packing_defaults() {
        assert_eq!(
            OptimizerConfig::default().packing_config(),
            PackingConfig::default()
        );
    }
}
