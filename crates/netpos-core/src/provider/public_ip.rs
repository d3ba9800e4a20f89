//! Built-in public address providers
//!
//! Ordered cheapest first: plain-text services before JSON ones.

use serde::Deserialize;

use super::spec::{EndpointTemplate, ProviderSpec};
use crate::error::{Error, Result};
use crate::ip::is_valid_ip;

/// Default fallback order for the public address
pub const DEFAULT_CHAIN: &[&str] = &["ipify", "icanhazip", "ifconfig.me", "ipinfo"];

/// `{"ip": "..."}` as returned by ipify (`?format=json`) and ipinfo
#[derive(Debug, Deserialize)]
struct IpBody {
    ip: String,
}

/// Parse a plain-text body holding a single address
pub fn parse_plain_text(body: &[u8]) -> Result<String> {
    let text = std::str::from_utf8(body)
        .map_err(|e| Error::Other(format!("response is not UTF-8: {}", e)))?
        .trim();

    if text.is_empty() {
        return Err(Error::Other("empty response".to_string()));
    }
    Ok(text.to_string())
}

fn parse_ip_json(body: &[u8]) -> Result<String> {
    let parsed: IpBody = serde_json::from_slice(body)?;
    Ok(parsed.ip.trim().to_string())
}

#[allow(clippy::ptr_arg)]
fn validate_address(candidate: &String) -> bool {
    is_valid_ip(candidate)
}

/// api.ipify.org (JSON)
pub fn ipify() -> ProviderSpec<String> {
    ProviderSpec::new(
        "ipify",
        EndpointTemplate::fixed("https://api.ipify.org?format=json"),
        parse_ip_json,
        validate_address,
    )
}

/// icanhazip.com (plain text)
pub fn icanhazip() -> ProviderSpec<String> {
    ProviderSpec::new(
        "icanhazip",
        EndpointTemplate::fixed("https://icanhazip.com"),
        parse_plain_text,
        validate_address,
    )
}

/// ifconfig.me (plain text)
pub fn ifconfig_me() -> ProviderSpec<String> {
    ProviderSpec::new(
        "ifconfig.me",
        EndpointTemplate::fixed("https://ifconfig.me/ip"),
        parse_plain_text,
        validate_address,
    )
}

/// ipinfo.io (JSON)
pub fn ipinfo() -> ProviderSpec<String> {
    ProviderSpec::new(
        "ipinfo",
        EndpointTemplate::fixed("https://ipinfo.io/json"),
        parse_ip_json,
        validate_address,
    )
}

/// Every built-in public address provider
pub fn builtin() -> Vec<ProviderSpec<String>> {
    vec![ipify(), icanhazip(), ifconfig_me(), ipinfo()]
}
