//! HTTP adapters for the AMap web services.

mod driving;
mod ip;

pub use driving::AmapDrivingPlanner;
pub use ip::AmapIpLocator;

use geodash_core::config::ServiceConfig;
use geodash_core::error::{GeodashError, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;

/// Query value encoding; coordinate separators stay readable
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b',')
    .remove(b';')
    .remove(b'.')
    .remove(b'-')
    .remove(b'_');

/// Shared HTTP plumbing for the AMap REST endpoints
#[derive(Debug, Clone)]
struct AmapService {
    /// Base URL without trailing slash (e.g., "https://restapi.amap.com")
    base_url: String,

    /// Web-service key appended to every request
    key: String,

    client: reqwest::Client,
}

impl AmapService {
    fn from_config(config: &ServiceConfig) -> Result<Self> {
        let key = config
            .key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GeodashError::ConfigMissing { key: "services.key".to_string() })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GeodashError::Http { reason: format!("Failed to build client: {}", e) })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key,
            client,
        })
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> String {
        let mut url = format!("{}{}?key={}", self.base_url, path, encode(&self.key));
        for (name, value) in params {
            url.push('&');
            url.push_str(name);
            url.push('=');
            url.push_str(&encode(value));
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .client
            .get(self.url(path, params))
            .send()
            .await
            .map_err(|e| GeodashError::Http {
                reason: format!("Failed to reach {}{}: {}", self.base_url, path, e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeodashError::Http {
                reason: format!("AMap API error ({}): {}", status, error_text),
            });
        }

        response.json().await.map_err(|e| GeodashError::Http {
            reason: format!("Failed to parse AMap response: {}", e),
        })
    }
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}
