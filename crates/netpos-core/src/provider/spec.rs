//! Provider descriptions
//!
//! A [`ProviderSpec`] says how to reach one third-party service and how to
//! turn its response into a trusted value. It performs no I/O itself.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;

const PLACEHOLDER: &str = "{param}";

/// Request URL template for a provider
///
/// The template may contain a `{param}` placeholder. A parameterless request
/// uses the explicit bare URL when one is set, or the template itself when it
/// has no placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTemplate {
    template: String,
    bare: Option<String>,
}

impl EndpointTemplate {
    /// Create a template, e.g. `https://ipwho.is/{param}`
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            bare: None,
        }
    }

    /// A URL that takes no parameter
    pub fn fixed(url: impl Into<String>) -> Self {
        Self::new(url)
    }

    /// Set the URL used when no parameter is given
    pub fn with_bare(mut self, url: impl Into<String>) -> Self {
        self.bare = Some(url.into());
        self
    }

    /// Whether the template accepts a parameter
    pub fn is_parameterized(&self) -> bool {
        self.template.contains(PLACEHOLDER)
    }

    /// Build the request URL, or `None` if this endpoint cannot serve the
    /// request shape
    pub fn render(&self, param: Option<&str>) -> Option<String> {
        match param {
            Some(p) if self.is_parameterized() => Some(self.template.replace(PLACEHOLDER, p)),
            Some(_) => None,
            None if self.bare.is_some() => self.bare.clone(),
            None if !self.is_parameterized() => Some(self.template.clone()),
            None => None,
        }
    }
}

type ParseFn<T> = Arc<dyn Fn(&[u8]) -> Result<T> + Send + Sync>;
type ValidateFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// One entry of a fallback chain
pub struct ProviderSpec<T> {
    name: String,
    endpoint: EndpointTemplate,
    parse: ParseFn<T>,
    validate: ValidateFn<T>,
    retry: bool,
}

impl<T> ProviderSpec<T> {
    /// Describe a provider
    ///
    /// # Parameters
    ///
    /// - `name`: Short unique name (used in logs and configuration)
    /// - `endpoint`: How to build the request URL
    /// - `parse`: Raw body to typed candidate
    /// - `validate`: Definite accept/reject of a parsed candidate
    pub fn new(
        name: impl Into<String>,
        endpoint: EndpointTemplate,
        parse: impl Fn(&[u8]) -> Result<T> + Send + Sync + 'static,
        validate: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint,
            parse: Arc::new(parse),
            validate: Arc::new(validate),
            retry: false,
        }
    }

    /// Opt in to retrying this provider's fetch before moving on
    pub fn with_retry(mut self, retry: bool) -> Self {
        self.retry = retry;
        self
    }

    /// Provider name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Endpoint template
    pub fn endpoint(&self) -> &EndpointTemplate {
        &self.endpoint
    }

    /// Whether fetches are retried in place
    pub fn retries(&self) -> bool {
        self.retry
    }

    /// Request URL for `param`
    pub fn url(&self, param: Option<&str>) -> Option<String> {
        self.endpoint.render(param)
    }

    /// Parse a response body
    pub fn parse(&self, body: &[u8]) -> Result<T> {
        (self.parse)(body)
    }

    /// Accept or reject a parsed candidate
    pub fn validate(&self, candidate: &T) -> bool {
        (self.validate)(candidate)
    }
}

impl<T> Clone for ProviderSpec<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            endpoint: self.endpoint.clone(),
            parse: Arc::clone(&self.parse),
            validate: Arc::clone(&self.validate),
            retry: self.retry,
        }
    }
}

impl<T> fmt::Debug for ProviderSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSpec")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("retry", &self.retry)
            .finish()
    }
}
