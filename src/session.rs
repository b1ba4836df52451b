//! Per-account request context
//!
//! An `AccountSession` binds one token, one proxy and one User-Agent to a reusable
//! `reqwest::Client`. It is built once and never mutated afterwards.

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};

use crate::error::{PinpollError, Result};
use crate::identity::random_user_agent;

/// Transport settings shared by every session
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(20),
        }
    }
}

/// One account's immutable request context
pub struct AccountSession {
    index: usize,
    proxy: String,
    user_agent: String,
    http: Client,
}

impl AccountSession {
    /// Build the session for account `index`.
    ///
    /// Returns `Ok(None)` when there is no proxy for this account; the caller skips it.
    pub fn create(index: usize, token: &str, proxy: Option<&str>, settings: &HttpSettings) -> Result<Option<Self>> {
        let Some(proxy) = proxy else {
            return Ok(None);
        };

        let user_agent = random_user_agent();
        let http = build_client(token, proxy, &user_agent, settings)?;

        Ok(Some(Self {
            index,
            proxy: proxy.to_string(),
            user_agent,
            http,
        }))
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn proxy(&self) -> &str {
        &self.proxy
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// The proxied client; carries auth and identity headers on every request
    pub fn http(&self) -> &Client {
        &self.http
    }
}

impl fmt::Debug for AccountSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountSession")
            .field("index", &self.index)
            .field("proxy", &self.proxy)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

fn build_client(token: &str, proxy: &str, user_agent: &str, settings: &HttpSettings) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert("lang", HeaderValue::from_static("en-US"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| PinpollError::Configuration(format!("Token is not a valid header value: {}", e)))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);

    let proxy = reqwest::Proxy::all(proxy)
        .map_err(|e| PinpollError::Configuration(format!("Invalid proxy {}: {}", proxy, e)))?;

    Client::builder()
        .default_headers(headers)
        .user_agent(user_agent)
        .proxy(proxy)
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.timeout)
        .build()
        .map_err(|e| PinpollError::Configuration(format!("Failed to create HTTP client: {}", e)))
}
