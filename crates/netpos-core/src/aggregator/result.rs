//! Composite resolution results

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::kind::ResourceKind;
use crate::provider::GeoLocation;
use crate::traits::InterfaceMap;

/// A resolved value of any kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResolvedValue {
    PublicIp(String),
    ClientAddress(String),
    Location(GeoLocation),
    Interfaces(InterfaceMap),
}

impl ResolvedValue {
    /// Kind this value answers
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResolvedValue::PublicIp(_) => ResourceKind::PublicIp,
            ResolvedValue::ClientAddress(_) => ResourceKind::ClientAddress,
            ResolvedValue::Location(_) => ResourceKind::Location,
            ResolvedValue::Interfaces(_) => ResourceKind::Interfaces,
        }
    }
}

/// Outcome of one aggregate resolution
///
/// Every requested kind has an entry in `values`; failed kinds map to `None`
/// and have their reason in `errors`. The timestamp is the moment the result
/// was assembled, regardless of whether values came from a cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeResult {
    values: BTreeMap<ResourceKind, Option<ResolvedValue>>,
    errors: BTreeMap<ResourceKind, String>,
    produced_at: DateTime<Utc>,
}

impl CompositeResult {
    pub(crate) fn new(
        values: BTreeMap<ResourceKind, Option<ResolvedValue>>,
        errors: BTreeMap<ResourceKind, String>,
    ) -> Self {
        Self {
            values,
            errors,
            produced_at: Utc::now(),
        }
    }

    /// Value for `kind`, if it was requested and resolved
    pub fn value(&self, kind: ResourceKind) -> Option<&ResolvedValue> {
        self.values.get(&kind).and_then(Option::as_ref)
    }

    /// Failure reason for `kind`, if it was requested and failed
    pub fn error(&self, kind: ResourceKind) -> Option<&str> {
        self.errors.get(&kind).map(String::as_str)
    }

    /// Every requested kind with its value or absence
    pub fn values(&self) -> &BTreeMap<ResourceKind, Option<ResolvedValue>> {
        &self.values
    }

    /// Every failed kind with its reason
    pub fn errors(&self) -> &BTreeMap<ResourceKind, String> {
        &self.errors
    }

    /// When this result was produced
    pub fn produced_at(&self) -> DateTime<Utc> {
        self.produced_at
    }

    /// Whether every requested kind resolved
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Kinds that were requested
    pub fn requested(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.values.keys().copied()
    }

    /// Resolved public address
    pub fn public_ip(&self) -> Option<&str> {
        match self.value(ResourceKind::PublicIp)? {
            ResolvedValue::PublicIp(ip) => Some(ip),
            _ => None,
        }
    }

    /// Extracted caller address
    pub fn client_address(&self) -> Option<&str> {
        match self.value(ResourceKind::ClientAddress)? {
            ResolvedValue::ClientAddress(ip) => Some(ip),
            _ => None,
        }
    }

    /// Resolved geolocation
    pub fn location(&self) -> Option<&GeoLocation> {
        match self.value(ResourceKind::Location)? {
            ResolvedValue::Location(location) => Some(location),
            _ => None,
        }
    }

    /// Enumerated interfaces
    pub fn interfaces(&self) -> Option<&InterfaceMap> {
        match self.value(ResourceKind::Interfaces)? {
            ResolvedValue::Interfaces(interfaces) => Some(interfaces),
            _ => None,
        }
    }
}
