use std::time::Duration;

use hdx_config::Configuration;
use ureq::{
    http::{HeaderMap, HeaderValue},
    Agent, Proxy, RequestBuilder,
};

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub user_agent: Option<String>,
    pub headers: Option<HeaderMap>,
    pub proxy: Option<Proxy>,
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    /// A user agent of `HDXRustLibrary/<version>` with no proxy, extra headers
    /// or timeout.
    fn default() -> Self {
        Self {
            user_agent: Some(hdx_config::config::USER_AGENT_PREFIX.into()),
            proxy: None,
            headers: None,
            timeout: None,
        }
    }
}

impl ClientConfig {
    /// Client settings for a configuration: its user agent and, when the
    /// `HTTPS_PROXY` or `ALL_PROXY` variables are set, their proxy.
    pub fn from_configuration(configuration: &Configuration) -> Self {
        Self {
            user_agent: Some(configuration.get_user_agent().to_string()),
            proxy: Proxy::try_from_env(),
            headers: None,
            timeout: None,
        }
    }

    /// Builds an HTTP `Agent` from this config.
    ///
    /// Non 2xx responses are returned rather than raised, since CKAN reports
    /// action failures in a JSON body with an error status.
    pub fn build(&self) -> Agent {
        let mut config = Agent::config_builder()
            .proxy(self.proxy.clone())
            .timeout_global(self.timeout)
            .http_status_as_error(false);

        if let Some(user_agent) = &self.user_agent {
            config = config.user_agent(user_agent);
        }

        config.build().into()
    }

    /// Adds a default header sent with every request.
    pub fn with_header(mut self, name: &'static str, value: HeaderValue) -> Self {
        self.headers
            .get_or_insert_with(HeaderMap::new)
            .insert(name, value);
        self
    }
}

/// Apply headers from an optional `HeaderMap` to a `RequestBuilder`.
pub fn apply_headers<B>(
    mut req: RequestBuilder<B>,
    headers: &Option<HeaderMap>,
) -> RequestBuilder<B> {
    if let Some(headers) = headers {
        for (key, value) in headers.iter() {
            req = req.header(key, value);
        }
    }
    req
}
