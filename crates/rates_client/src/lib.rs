//! HTTP exchange-rate source.
//!
//! Blocking reqwest client (no Tokio runtime required). One GET per
//! uncached currency pair; caching lives in the caller's
//! `ExchangeRateService`.

use std::time::Duration;

use pricecheck_recon::config::RatesConfig;
use pricecheck_recon::fx::{RateError, RateSource};

const USER_AGENT: &str = concat!("pricecheck/", env!("CARGO_PKG_VERSION"));

/// Query parameter carrying an API key, and its value.
#[derive(Debug, Clone)]
pub struct ApiKey {
    pub param: String,
    pub value: String,
}

/// Exchange-rate endpoint queried as `GET {endpoint}?from=XXX&to=YYY`.
pub struct HttpRateSource {
    http: reqwest::blocking::Client,
    endpoint: String,
    rate_field: String,
    api_key: Option<ApiKey>,
}

impl HttpRateSource {
    /// Build from the run config. The API key, if any, is read from the
    /// environment variable the config names.
    pub fn new(config: &RatesConfig) -> Result<Self, RateError> {
        let api_key = match config.api_key_env {
            Some(ref var) => match std::env::var(var) {
                Ok(v) if !v.trim().is_empty() => Some(ApiKey {
                    param: config.api_key_param.clone(),
                    value: v.trim().to_string(),
                }),
                _ => {
                    log::warn!("{var} is not set, querying exchange rates without an API key");
                    None
                }
            },
            None => None,
        };
        Self::with_options(
            &config.endpoint,
            &config.rate_field,
            Duration::from_secs(config.timeout_secs),
            api_key,
        )
    }

    pub fn with_options(
        endpoint: &str,
        rate_field: &str,
        timeout: Duration,
        api_key: Option<ApiKey>,
    ) -> Result<Self, RateError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RateError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            rate_field: rate_field.to_string(),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl RateSource for HttpRateSource {
    fn fetch_rate(&self, from: &str, to: &str) -> Result<f64, RateError> {
        let mut params = vec![("from", from.to_string()), ("to", to.to_string())];
        if let Some(ref key) = self.api_key {
            params.push((key.param.as_str(), key.value.clone()));
        }

        log::debug!("GET {} {from}->{to}", self.endpoint);
        let response = self
            .http
            .get(&self.endpoint)
            .query(&params)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    RateError::Timeout(e.to_string())
                } else {
                    RateError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RateError::Http(status, snippet(&body)));
        }

        let text = response.text().map_err(|e| {
            if e.is_timeout() {
                RateError::Timeout(e.to_string())
            } else {
                RateError::Network(e.to_string())
            }
        })?;
        let body: serde_json::Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))
            .map_err(|e| RateError::Parse(format!("{e} (body: {})", snippet(&text))))?;

        extract_rate(&body, &self.rate_field)
    }
}

/// Read a positive rate at a JSON pointer. Numeric strings are accepted.
pub fn extract_rate(body: &serde_json::Value, pointer: &str) -> Result<f64, RateError> {
    let field = body.pointer(pointer).ok_or_else(|| {
        RateError::Parse(format!(
            "no '{pointer}' in response (body: {})",
            snippet(&body.to_string())
        ))
    })?;
    let rate = match field {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match rate {
        Some(r) if r.is_finite() && r > 0.0 => Ok(r),
        _ => Err(RateError::Parse(format!("'{pointer}' is not a positive number: {field}"))),
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}
