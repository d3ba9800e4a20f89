// # netposd - Network Position Reporter
//
// A THIN integration layer: it wires the reqwest fetcher and the system
// interface lister into a `netpos_core::Aggregator`, resolves once and prints
// the composite result as JSON on stdout. All resolution logic lives in
// netpos-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Resolution
// - `NETPOS_TIMEOUT_MS`: Per-provider timeout in milliseconds (1-60000)
// - `NETPOS_MAX_RETRIES`: In-place retries for providers that opt in (0-10)
// - `NETPOS_RETRY_PROVIDERS`: Comma-separated providers that opt in to retry
// - `NETPOS_CACHE_ENABLED`: `true` / `false`
//
// ### Providers
// - `NETPOS_PUBLIC_IP_PROVIDERS`: Comma-separated public-ip chain
// - `NETPOS_LOCATION_PROVIDERS`: Comma-separated location chain
//
// ### Request
// - `NETPOS_KINDS`: Comma-separated kinds (public-ip, location, interfaces, client-address)
// - `NETPOS_LOCATION_IP`: Address to geolocate instead of this host
// - `NETPOS_POLICY`: `best_effort` (default) or `all_or_nothing`
//
// ### Logging
// - `NETPOS_LOG_LEVEL`: trace, debug, info, warn, error (logs go to stderr)
//
// ## Example
//
// ```bash
// export NETPOS_KINDS=public-ip,location
// export NETPOS_LOCATION_PROVIDERS=ip-api,ipwhois
// export NETPOS_POLICY=all_or_nothing
//
// netposd
// ```

use anyhow::{Context, Result};
use netpos_core::ip::is_valid_ip;
use netpos_core::{AggregationPolicy, Aggregator, NetposConfig, ResolveRequest, ResourceKind};
use netpos_http::ReqwestFetcher;
use netpos_iface::SystemInterfaces;
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Result printed
/// - 1: Configuration or startup error
/// - 2: Runtime error (all-or-nothing resolution failed)
#[derive(Debug, Clone, Copy)]
enum NetposExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<NetposExitCode> for ExitCode {
    fn from(code: NetposExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    timeout_ms: Option<u64>,
    max_retries: Option<u32>,
    retry_providers: Vec<String>,
    cache_enabled: bool,
    public_ip_providers: Option<Vec<String>>,
    location_providers: Option<Vec<String>>,
    kinds: Vec<ResourceKind>,
    location_ip: Option<String>,
    policy: AggregationPolicy,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup` (name → value)
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let kinds = match lookup("NETPOS_KINDS") {
            Some(raw) => split_list(&raw)
                .iter()
                .map(|s| ResourceKind::from_str(s))
                .collect::<Result<Vec<_>, _>>()
                .context("NETPOS_KINDS")?,
            None => ResourceKind::ALL.to_vec(),
        };

        Ok(Self {
            timeout_ms: parse_var(&lookup, "NETPOS_TIMEOUT_MS")?,
            max_retries: parse_var(&lookup, "NETPOS_MAX_RETRIES")?,
            retry_providers: lookup("NETPOS_RETRY_PROVIDERS")
                .map(|s| split_list(&s))
                .unwrap_or_default(),
            cache_enabled: parse_var(&lookup, "NETPOS_CACHE_ENABLED")?.unwrap_or(true),
            public_ip_providers: lookup("NETPOS_PUBLIC_IP_PROVIDERS").map(|s| split_list(&s)),
            location_providers: lookup("NETPOS_LOCATION_PROVIDERS").map(|s| split_list(&s)),
            kinds,
            location_ip: lookup("NETPOS_LOCATION_IP")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            policy: match lookup("NETPOS_POLICY") {
                Some(raw) => raw
                    .parse::<AggregationPolicy>()
                    .context("NETPOS_POLICY")?,
                None => AggregationPolicy::default(),
            },
            log_level: lookup("NETPOS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if let Some(timeout) = self.timeout_ms
            && !(1..=60_000).contains(&timeout)
        {
            anyhow::bail!(
                "NETPOS_TIMEOUT_MS must be between 1 and 60000 milliseconds. Got: {}",
                timeout
            );
        }

        if let Some(max_retries) = self.max_retries
            && max_retries > 10
        {
            anyhow::bail!("NETPOS_MAX_RETRIES must be between 0 and 10. Got: {}", max_retries);
        }

        if !self.retry_providers.is_empty() {
            let netpos = self.netpos_config();
            for name in &self.retry_providers {
                if !netpos.public_ip.providers.contains(name)
                    && !netpos.location.providers.contains(name)
                {
                    anyhow::bail!(
                        "NETPOS_RETRY_PROVIDERS names '{}', which is in no configured chain",
                        name
                    );
                }
            }
        } else if self.max_retries.is_some_and(|n| n > 0) {
            eprintln!("WARNING: NETPOS_MAX_RETRIES is set but NETPOS_RETRY_PROVIDERS is empty");
        }

        if self.public_ip_providers.as_ref().is_some_and(Vec::is_empty) {
            anyhow::bail!(
                "NETPOS_PUBLIC_IP_PROVIDERS must name at least one provider. \
                Available: ipify, icanhazip, ifconfig.me, ipinfo"
            );
        }

        if self.location_providers.as_ref().is_some_and(Vec::is_empty) {
            anyhow::bail!(
                "NETPOS_LOCATION_PROVIDERS must name at least one provider. \
                Available: ipapi, ip-api, ipwhois"
            );
        }

        if self.kinds.is_empty() {
            anyhow::bail!(
                "NETPOS_KINDS must contain at least one kind. \
                Valid kinds: public-ip, client-address, location, interfaces"
            );
        }

        if let Some(ref ip) = self.location_ip
            && !is_valid_ip(ip)
        {
            anyhow::bail!("NETPOS_LOCATION_IP is not a valid IP address. Got: {}", ip);
        }

        if self.location_ip.is_some() && !self.kinds.contains(&ResourceKind::Location) {
            eprintln!("WARNING: NETPOS_LOCATION_IP is set but location is not requested");
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "NETPOS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Library configuration for the resolvers
    fn netpos_config(&self) -> NetposConfig {
        let mut config = NetposConfig::new().with_cache_enabled(self.cache_enabled);

        if let Some(timeout_ms) = self.timeout_ms {
            let timeout = Duration::from_millis(timeout_ms);
            config.public_ip = config.public_ip.with_timeout(timeout);
            config.location = config.location.with_timeout(timeout);
        }
        if let Some(max_retries) = self.max_retries {
            config.public_ip.max_retries = max_retries;
            config.location.max_retries = max_retries;
        }
        if let Some(ref providers) = self.public_ip_providers {
            config.public_ip = config.public_ip.with_providers(providers.iter().cloned());
        }
        if let Some(ref providers) = self.location_providers {
            config.location = config.location.with_providers(providers.iter().cloned());
        }
        for resolution in [&mut config.public_ip, &mut config.location] {
            resolution.retry_providers = self
                .retry_providers
                .iter()
                .filter(|name| resolution.providers.contains(name))
                .cloned()
                .collect();
        }

        config
    }

    /// The single aggregate request this run performs
    fn request(&self) -> ResolveRequest {
        let request = ResolveRequest::new(self.kinds.iter().copied());
        match self.location_ip {
            Some(ref ip) => request.with_location_target(ip.clone()),
            None => request,
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, raw, e)),
        None => Ok(None),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return NetposExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return NetposExitCode::ConfigError.into();
    }

    // Initialize tracing (stdout is reserved for the JSON result)
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return NetposExitCode::ConfigError.into();
    }

    info!("Starting netposd");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return NetposExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let aggregator = match build_aggregator(&config) {
            Ok(aggregator) => aggregator,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return NetposExitCode::ConfigError;
            }
        };

        match run(&aggregator, &config).await {
            Ok(()) => NetposExitCode::Success,
            Err(e) => {
                error!("Resolution failed: {:#}", e);
                NetposExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Wire the capabilities into an aggregator
fn build_aggregator(config: &Config) -> Result<Aggregator> {
    let fetcher = Arc::new(ReqwestFetcher::new()?);
    let lister = Arc::new(SystemInterfaces::new());

    let aggregator = Aggregator::new(config.netpos_config(), fetcher, lister)
        .context("Invalid resolver configuration")?;

    info!(
        "Configured chains: public-ip {:?}, location {:?}",
        aggregator.config().public_ip.providers,
        aggregator.config().location.providers
    );
    Ok(aggregator)
}

/// Resolve once and print the result
async fn run(aggregator: &Aggregator, config: &Config) -> Result<()> {
    let request = config.request();
    info!(
        "Resolving {} kind(s) with policy {}",
        request.kinds.len(),
        config.policy
    );

    let result = aggregator.resolve_all(&request, config.policy).await?;

    for (kind, reason) in result.errors() {
        warn!("{} unavailable: {}", kind, reason);
    }

    let json = serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.kinds, ResourceKind::ALL.to_vec());
        assert_eq!(config.policy, AggregationPolicy::BestEffort);
        assert!(config.netpos_config().validate().is_ok());
    }

    #[test]
    fn test_overrides_reach_library_config() {
        let config = config_from(&[
            ("NETPOS_TIMEOUT_MS", "1500"),
            ("NETPOS_MAX_RETRIES", "2"),
            ("NETPOS_RETRY_PROVIDERS", "ipify, ip-api"),
            ("NETPOS_CACHE_ENABLED", "false"),
            ("NETPOS_PUBLIC_IP_PROVIDERS", "icanhazip, ipify"),
            ("NETPOS_LOCATION_PROVIDERS", "ip-api"),
            ("NETPOS_KINDS", "public-ip,location"),
            ("NETPOS_LOCATION_IP", "8.8.8.8"),
            ("NETPOS_POLICY", "all_or_nothing"),
        ])
        .unwrap();
        assert!(config.validate().is_ok());

        let netpos = config.netpos_config();
        assert_eq!(netpos.public_ip.timeout_ms, 1500);
        assert_eq!(netpos.location.max_retries, 2);
        assert!(!netpos.interfaces.cache_enabled);
        assert_eq!(netpos.public_ip.providers, vec!["icanhazip", "ipify"]);
        assert_eq!(netpos.location.providers, vec!["ip-api"]);
        assert_eq!(netpos.public_ip.retry_providers, vec!["ipify"]);
        assert_eq!(netpos.location.retry_providers, vec!["ip-api"]);
        assert!(netpos.validate().is_ok());

        let request = config.request();
        assert_eq!(request.kinds, vec![ResourceKind::PublicIp, ResourceKind::Location]);
        assert_eq!(request.location_target.as_deref(), Some("8.8.8.8"));
        assert_eq!(config.policy, AggregationPolicy::AllOrNothing);
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        assert!(config_from(&[("NETPOS_TIMEOUT_MS", "soon")]).is_err());
        assert!(config_from(&[("NETPOS_KINDS", "public-ip,weather")]).is_err());
        assert!(config_from(&[("NETPOS_POLICY", "sometimes")]).is_err());
    }

    #[test]
    fn test_out_of_range_values_fail_validation() {
        for vars in [
            [("NETPOS_TIMEOUT_MS", "0")],
            [("NETPOS_TIMEOUT_MS", "60001")],
            [("NETPOS_MAX_RETRIES", "11")],
            [("NETPOS_LOCATION_IP", "not-an-ip")],
            [("NETPOS_LOG_LEVEL", "verbose")],
            [("NETPOS_PUBLIC_IP_PROVIDERS", " , ")],
            [("NETPOS_KINDS", ",")],
            [("NETPOS_RETRY_PROVIDERS", "nowhere")],
        ] {
            let config = config_from(&vars).unwrap();
            assert!(config.validate().is_err(), "{:?} should be rejected", vars);
        }
    }
}
