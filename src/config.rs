use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::controller::EngineConfig;
use crate::optimizer::PackingStrategy;

/// Complete application configuration, loaded from environment variables or
/// default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub engine: EngineSettings,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment
    /// variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            engine: EngineSettings::from_env(),
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
            env_string("CARTONIZE_API_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse CARTONIZE_API_HOST ('{}'): {}. Using {}.",
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    Self::DEFAULT_HOST
                        .parse::<IpAddr>()
                        .expect("Default host must be valid"),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match env_string("CARTONIZE_API_PORT") {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    eprintln!(
                        "⚠️ CARTONIZE_API_PORT must not be 0. Using {}.",
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    eprintln!(
                        "⚠️ Could not parse CARTONIZE_API_PORT ('{}'): {}. Using {}.",
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
            display_host: effective_host,
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
}

/// Configuration for the packing engine and its request defaults.
#[derive(Clone, Debug)]
pub struct EngineSettings {
    engine: EngineConfig,
    default_strategy: PackingStrategy,
    default_enable_3d: bool,
}

impl EngineSettings {
    const BATCH_CAP_VAR: &'static str = "CARTONIZE_BATCH_CAP_MULTIPLIER";
    const STRATEGY_VAR: &'static str = "CARTONIZE_DEFAULT_STRATEGY";
    const ENABLE_3D_VAR: &'static str = "CARTONIZE_ENABLE_3D";

    fn from_env() -> Self {
        let batch_cap_multiplier = load_u64_with_warning(
            Self::BATCH_CAP_VAR,
            EngineConfig::DEFAULT_BATCH_CAP_MULTIPLIER,
            |value| value >= 1,
            "must be at least 1",
        );

        let default_strategy = match env_string(Self::STRATEGY_VAR) {
            Some(raw) => match parse_strategy(&raw) {
                Some(strategy) => strategy,
                None => {
                    eprintln!(
                        "⚠️ Could not interpret {} ('{}') as strategy. Using {}.",
                        Self::STRATEGY_VAR,
                        raw,
                        PackingStrategy::default()
                    );
                    PackingStrategy::default()
                }
            },
            None => PackingStrategy::default(),
        };

        let default_enable_3d = env_string(Self::ENABLE_3D_VAR)
            .and_then(|raw| parse_bool(&raw, Self::ENABLE_3D_VAR))
            .unwrap_or(true);

        Self {
            engine: EngineConfig::default().with_batch_cap_multiplier(batch_cap_multiplier),
            default_strategy,
            default_enable_3d,
        }
    }

    /// Returns the configured engine tuning.
    pub fn engine_config(&self) -> EngineConfig {
        self.engine
    }

    /// Strategy used when a request does not name one.
    pub fn default_strategy(&self) -> PackingStrategy {
        self.default_strategy
    }

    /// Whether 3D placement generation is on when a request does not say.
    pub fn default_enable_3d(&self) -> bool {
        self.default_enable_3d
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            default_strategy: PackingStrategy::default(),
            default_enable_3d: true,
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
            eprintln!(
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
            eprintln!(
                "⚠️ Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn parse_strategy(raw: &str) -> Option<PackingStrategy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "minimize_cartons" => Some(PackingStrategy::MinimizeCartons),
        "minimize_waste" => Some(PackingStrategy::MinimizeWaste),
        "maximize_efficiency" => Some(PackingStrategy::MaximizeEfficiency),
        _ => None,
    }
}

fn load_u64_with_warning(
    var_name: &str,
    default: u64,
    validator: impl Fn(u64) -> bool,
    invalid_hint: &str,
) -> u64 {
    match env_string(var_name) {
        Some(raw) => match raw.parse::<u64>() {
            Ok(value) => {
                if !validator(value) {
                    eprintln!(
                        "⚠️ {} contains invalid value '{}': {}. Using {}.",
                        var_name, raw, invalid_hint, default
                    );
                    default
                } else {
                    value
                }
            }
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name, raw, err, default
                );
                default
            }
        },
        None => default,
    }
}
