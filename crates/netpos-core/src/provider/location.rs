//! Built-in geolocation providers
//!
//! Each service has its own payload shape and its own way of reporting a
//! failed lookup inside a 200 response. Both are mapped onto [`GeoLocation`]
//! here; the resolver only ever sees the common type.

use serde::{Deserialize, Serialize};

use super::spec::{EndpointTemplate, ProviderSpec};
use crate::error::{Error, Result};
use crate::ip::is_valid_ip;

/// Default fallback order for geolocation
pub const DEFAULT_CHAIN: &[&str] = &["ipapi", "ip-api", "ipwhois"];

/// Geolocation of one address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Address that was located
    pub ip: String,
    /// City name
    pub city: Option<String>,
    /// Region, state or province
    pub region: Option<String>,
    /// Country name
    pub country: Option<String>,
    /// ISO 3166-1 alpha-2 country code
    pub country_code: Option<String>,
    /// Latitude in decimal degrees
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees
    pub longitude: Option<f64>,
    /// IANA time zone name (`Europe/Berlin`)
    pub timezone: Option<String>,
    /// Network operator
    pub isp: Option<String>,
    /// Name of the provider that answered
    pub provider: String,
}

impl GeoLocation {
    /// Coordinates, when both are present
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    /// A location is usable when it names a valid address and places it
    /// somewhere: a country or a coordinate pair
    pub fn is_complete(&self) -> bool {
        is_valid_ip(&self.ip) && (has_text(&self.country) || self.coordinates().is_some())
    }
}

fn has_text(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// ipapi.co payload
#[derive(Debug, Deserialize)]
struct IpapiBody {
    #[serde(default)]
    error: bool,
    reason: Option<String>,
    ip: Option<String>,
    city: Option<String>,
    region: Option<String>,
    country_name: Option<String>,
    country_code: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    timezone: Option<String>,
    org: Option<String>,
}

fn parse_ipapi(body: &[u8]) -> Result<GeoLocation> {
    let parsed: IpapiBody = serde_json::from_slice(body)?;
    if parsed.error {
        return Err(Error::provider(
            "ipapi",
            parsed.reason.unwrap_or_else(|| "lookup failed".to_string()),
        ));
    }

    Ok(GeoLocation {
        ip: parsed.ip.unwrap_or_default(),
        city: parsed.city,
        region: parsed.region,
        country: parsed.country_name,
        country_code: parsed.country_code,
        latitude: parsed.latitude,
        longitude: parsed.longitude,
        timezone: parsed.timezone,
        isp: parsed.org,
        provider: "ipapi".to_string(),
    })
}

/// ip-api.com payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiBody {
    status: String,
    message: Option<String>,
    query: Option<String>,
    city: Option<String>,
    region_name: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    timezone: Option<String>,
    isp: Option<String>,
}

fn parse_ip_api(body: &[u8]) -> Result<GeoLocation> {
    let parsed: IpApiBody = serde_json::from_slice(body)?;
    if parsed.status != "success" {
        return Err(Error::provider(
            "ip-api",
            parsed.message.unwrap_or_else(|| format!("status {}", parsed.status)),
        ));
    }

    Ok(GeoLocation {
        ip: parsed.query.unwrap_or_default(),
        city: parsed.city,
        region: parsed.region_name,
        country: parsed.country,
        country_code: parsed.country_code,
        latitude: parsed.lat,
        longitude: parsed.lon,
        timezone: parsed.timezone,
        isp: parsed.isp,
        provider: "ip-api".to_string(),
    })
}

/// ipwho.is payload
#[derive(Debug, Deserialize)]
struct IpwhoisBody {
    success: bool,
    message: Option<String>,
    ip: Option<String>,
    city: Option<String>,
    region: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    timezone: Option<IpwhoisTimezone>,
    connection: Option<IpwhoisConnection>,
}

#[derive(Debug, Deserialize)]
struct IpwhoisTimezone {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IpwhoisConnection {
    isp: Option<String>,
}

fn parse_ipwhois(body: &[u8]) -> Result<GeoLocation> {
    let parsed: IpwhoisBody = serde_json::from_slice(body)?;
    if !parsed.success {
        return Err(Error::provider(
            "ipwhois",
            parsed.message.unwrap_or_else(|| "lookup failed".to_string()),
        ));
    }

    Ok(GeoLocation {
        ip: parsed.ip.unwrap_or_default(),
        city: parsed.city,
        region: parsed.region,
        country: parsed.country,
        country_code: parsed.country_code,
        latitude: parsed.latitude,
        longitude: parsed.longitude,
        timezone: parsed.timezone.and_then(|tz| tz.id),
        isp: parsed.connection.and_then(|c| c.isp),
        provider: "ipwhois".to_string(),
    })
}

fn validate_location(candidate: &GeoLocation) -> bool {
    candidate.is_complete()
}

/// ipapi.co
pub fn ipapi() -> ProviderSpec<GeoLocation> {
    ProviderSpec::new(
        "ipapi",
        EndpointTemplate::new("https://ipapi.co/{param}/json/").with_bare("https://ipapi.co/json/"),
        parse_ipapi,
        validate_location,
    )
}

/// ip-api.com (free tier is plain HTTP only)
pub fn ip_api() -> ProviderSpec<GeoLocation> {
    ProviderSpec::new(
        "ip-api",
        EndpointTemplate::new("http://ip-api.com/json/{param}").with_bare("http://ip-api.com/json/"),
        parse_ip_api,
        validate_location,
    )
}

/// ipwho.is
pub fn ipwhois() -> ProviderSpec<GeoLocation> {
    ProviderSpec::new(
        "ipwhois",
        EndpointTemplate::new("https://ipwho.is/{param}").with_bare("https://ipwho.is/"),
        parse_ipwhois,
        validate_location,
    )
}

/// Every built-in geolocation provider
pub fn builtin() -> Vec<ProviderSpec<GeoLocation>> {
    vec![ipapi(), ip_api(), ipwhois()]
}
