//! Test doubles and common utilities for resolution contract tests
//!
//! The doubles stand in for the two capabilities the core consumes: a
//! scripted [`Fetcher`] keyed by URL, and a fixed [`InterfaceLister`].

#![allow(dead_code)]

use async_trait::async_trait;
use netpos_core::error::{Error, Result};
use netpos_core::traits::{AddressFamily, Fetcher, InterfaceAddress, InterfaceLister, InterfaceMap};
use netpos_core::{Aggregator, NetposConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// Built-in provider endpoints, as the resolver renders them
pub const IPIFY: &str = "https://api.ipify.org?format=json";
pub const ICANHAZIP: &str = "https://icanhazip.com";
pub const IFCONFIG_ME: &str = "https://ifconfig.me/ip";
pub const IPINFO: &str = "https://ipinfo.io/json";
pub const IPAPI_SELF: &str = "https://ipapi.co/json/";
pub const IP_API_SELF: &str = "http://ip-api.com/json/";
pub const IPWHOIS_SELF: &str = "https://ipwho.is/";

pub fn ipapi_for(ip: &str) -> String {
    format!("https://ipapi.co/{}/json/", ip)
}

pub fn ip_api_for(ip: &str) -> String {
    format!("http://ip-api.com/json/{}", ip)
}

/// ipapi.co body for `ip`
pub fn ipapi_body(ip: &str, country: &str) -> String {
    format!(
        r#"{{"ip":"{}","city":"Springfield","region":"Somewhere","country_name":"{}","country_code":"XX","latitude":10.5,"longitude":-20.25,"timezone":"UTC","org":"Example ISP"}}"#,
        ip, country
    )
}

/// ip-api.com body for `ip`
pub fn ip_api_body(ip: &str, country: &str) -> String {
    format!(
        r#"{{"status":"success","query":"{}","city":"Springfield","regionName":"Somewhere","country":"{}","countryCode":"XX","lat":10.5,"lon":-20.25,"timezone":"UTC","isp":"Example ISP"}}"#,
        ip, country
    )
}

/// What the scripted fetcher does for one URL
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer with this body
    Body(Vec<u8>),
    /// Fail with a transport error
    Fail(String),
    /// Never answer (the resolver's timeout must fire)
    Hang,
    /// Answer after a delay
    Delayed(Duration, Vec<u8>),
}

/// A Fetcher answering from a URL → reply script, recording every call
#[derive(Default)]
pub struct ScriptedFetcher {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reply for `url` (replaces any earlier one)
    pub fn script(&self, url: impl Into<String>, reply: Reply) {
        self.replies.lock().unwrap().insert(url.into(), reply);
    }

    pub fn with(self, url: impl Into<String>, reply: Reply) -> Self {
        self.script(url, reply);
        self
    }

    pub fn with_body(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.with(url, Reply::Body(body.into().into_bytes()))
    }

    pub fn with_failure(self, url: impl Into<String>) -> Self {
        self.with(url, Reply::Fail("connection refused".to_string()))
    }

    /// Every URL fetched, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of fetches of `url`
    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(url.to_string());
        let reply = self.replies.lock().unwrap().get(url).cloned();

        match reply {
            Some(Reply::Body(body)) => Ok(body),
            Some(Reply::Fail(message)) => Err(Error::http(message)),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                Err(Error::http("hung request returned"))
            }
            Some(Reply::Delayed(delay, body)) => {
                tokio::time::sleep(delay).await;
                Ok(body)
            }
            None => Err(Error::http(format!("no route to {}", url))),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// An InterfaceLister returning a fixed snapshot (or failing), counting calls
pub struct StaticLister {
    snapshot: Option<InterfaceMap>,
    calls: AtomicUsize,
}

impl StaticLister {
    /// Loopback plus one external IPv4 interface
    pub fn new() -> Self {
        let mut map = InterfaceMap::new();
        map.insert(
            "lo".to_string(),
            vec![InterfaceAddress {
                address: "127.0.0.1".to_string(),
                netmask: "255.0.0.0".to_string(),
                family: AddressFamily::V4,
                mac: "00:00:00:00:00:00".to_string(),
                internal: true,
                cidr: Some("127.0.0.1/8".to_string()),
            }],
        );
        map.insert(
            "eth0".to_string(),
            vec![InterfaceAddress {
                address: "192.168.1.20".to_string(),
                netmask: "255.255.255.0".to_string(),
                family: AddressFamily::V4,
                mac: "52:54:00:12:34:56".to_string(),
                internal: false,
                cidr: Some("192.168.1.20/24".to_string()),
            }],
        );
        Self {
            snapshot: Some(map),
            calls: AtomicUsize::new(0),
        }
    }

    /// A lister whose enumeration always fails
    pub fn failing() -> Self {
        Self {
            snapshot: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InterfaceLister for StaticLister {
    fn list_interfaces(&self) -> Result<InterfaceMap> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.snapshot
            .clone()
            .ok_or_else(|| Error::interfaces("getifaddrs failed: permission denied"))
    }
}

/// Default configuration with the given public-ip and location chains
pub fn config_with(public_ip: &[&str], location: &[&str]) -> NetposConfig {
    let mut config = NetposConfig::new();
    config.public_ip = config.public_ip.with_providers(public_ip.iter().copied());
    config.location = config.location.with_providers(location.iter().copied());
    config
}

/// Build an aggregator over the doubles
pub fn aggregator(
    config: NetposConfig,
    fetcher: &Arc<ScriptedFetcher>,
    lister: &Arc<StaticLister>,
) -> Aggregator {
    Aggregator::new(config, fetcher.clone(), lister.clone()).unwrap()
}
