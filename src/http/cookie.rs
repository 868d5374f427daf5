//! Cookie parsing (`Cookie`) and encoding (`Set-Cookie`).

use std::collections::BTreeMap;

use ::cookie::time::Duration;
use ::cookie::Cookie;
use thiserror::Error;

pub use ::cookie::SameSite;

/// Error type for cookie encoding.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CookieError {
    #[error("invalid cookie name '{0}'")]
    InvalidName(String),

    #[error("invalid cookie attribute {attribute}: '{value}'")]
    InvalidAttribute { attribute: &'static str, value: String },
}

/// A cookie to set: a value plus optional attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetCookie {
    pub value: String,
    pub max_age: Option<i64>,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<SameSite>,
}

impl SetCookie {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// Render the `Set-Cookie` header value for cookie `name`.
    pub fn encode(&self, name: &str) -> Result<String, CookieError> {
        if name.is_empty() || !name.bytes().all(is_token_byte) {
            return Err(CookieError::InvalidName(name.to_string()));
        }

        let mut builder = Cookie::build((name.to_string(), self.value.clone()));

        if self.http_only {
            builder = builder.http_only(true);
        }
        if self.secure {
            builder = builder.secure(true);
        }

        if let Some(max_age) = self.max_age {
            builder = builder.max_age(Duration::seconds(max_age));
        }
        if let Some(domain) = &self.domain {
            check_attribute("Domain", domain)?;
            builder = builder.domain(domain.clone());
        }
        if let Some(path) = &self.path {
            check_attribute("Path", path)?;
            builder = builder.path(path.clone());
        }
        if let Some(same_site) = self.same_site {
            builder = builder.same_site(same_site);
        }

        Ok(builder.build().encoded().to_string())
    }
}

impl From<&str> for SetCookie {
    fn from(value: &str) -> Self {
        SetCookie::new(value)
    }
}

impl From<String> for SetCookie {
    fn from(value: String) -> Self {
        SetCookie::new(value)
    }
}

/// Parse a `Cookie` request header into name/value pairs.
///
/// Values are percent-decoded and unquoted; the first occurrence of a name
/// wins and malformed pairs are skipped.
pub fn parse_cookie_header(header: &str) -> BTreeMap<String, String> {
    let mut cookies = BTreeMap::new();

    for cookie in Cookie::split_parse_encoded(header).flatten() {
        cookies
            .entry(cookie.name().to_string())
            .or_insert_with(|| cookie.value_trimmed().to_string());
    }

    cookies
}

// RFC 7230 token characters.
fn is_token_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&byte)
}

fn check_attribute(attribute: &'static str, value: &str) -> Result<(), CookieError> {
    if value.bytes().any(|b| b == b';' || b.is_ascii_control()) {
        return Err(CookieError::InvalidAttribute {
            attribute,
            value: value.to_string(),
        });
    }
    Ok(())
}
