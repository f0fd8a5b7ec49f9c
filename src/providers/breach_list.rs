//! Breach-list provider client (ingest source).
//!
//! One bulk call fetches every disclosed breach; the client keeps only
//! disclosures added in the current or previous calendar year. Unlike the
//! enrichment providers, a dead breach-list provider is fatal: with no
//! incidents there is no run.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Datelike, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::incident::RawIncident;
use crate::providers::BREACH_LIST_SERVICE;
use crate::rate_limit::{RetryPolicy, SharedRateLimiter};

/// Source label carried into report records
pub const SOURCE_NAME: &str = "HIBP";

const API_KEY_HEADER: &str = "hibp-api-key";

#[derive(Debug, Clone)]
pub struct BreachListClient {
    http: reqwest::Client,
    base_url: String,
    limiter: SharedRateLimiter,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct ProviderBreach {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Domain", default)]
    domain: Option<String>,
    #[serde(rename = "BreachDate")]
    breach_date: String,
    #[serde(rename = "AddedDate")]
    added_date: String,
    #[serde(rename = "DataClasses", default)]
    data_classes: Vec<String>,
    #[serde(rename = "PwnCount", default)]
    pwn_count: Option<u64>,
}

impl BreachListClient {
    pub fn new(config: &AppConfig, api_key: &str, limiter: SharedRateLimiter) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(api_key).context("Breach-list API key is not valid header text")?,
        );

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http.request_timeout_secs))
            .user_agent(config.http.user_agent.clone())
            .default_headers(headers)
            .build()
            .context("Failed to build breach-list HTTP client")?;

        Ok(Self {
            http,
            base_url: config.providers.breach_base_url.trim_end_matches('/').to_string(),
            limiter,
            retry: RetryPolicy::new(
                config.pipeline.retry_attempts,
                config.pipeline.retry_backoff_base_secs,
            ),
        })
    }

    /// Fetch all breaches added in the recent window. Errors here abort the
    /// run; the watermark stays untouched so the next run retries.
    pub async fn fetch_recent_breaches(&self) -> Result<Vec<RawIncident>> {
        let url = format!("{}/breaches", self.base_url);
        let current_year = Utc::now().year();

        for attempt in 0..self.retry.max_attempts {
            if !self.limiter.admit(BREACH_LIST_SERVICE).await {
                continue;
            }

            let response = match self.http.get(&url).send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Breach-list request failed: {}", e);
                    sleep(self.retry.delay_for_attempt(attempt)).await;
                    continue;
                }
            };

            let status = response.status();
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(anyhow!("Breach-list provider rejected the API key"));
            }
            if !status.is_success() {
                warn!("Breach-list provider returned {}", status);
                sleep(self.retry.delay_for_attempt(attempt)).await;
                continue;
            }

            let breaches: Vec<ProviderBreach> = response
                .json()
                .await
                .context("Breach-list response did not parse")?;

            let incidents: Vec<RawIncident> = breaches
                .into_iter()
                .filter(|b| is_recent(&b.added_date, current_year))
                .map(to_incident)
                .collect();

            info!("Fetched {} recent breaches", incidents.len());
            return Ok(incidents);
        }

        Err(anyhow!(
            "Breach-list provider unreachable after {} attempts",
            self.retry.max_attempts
        ))
    }
}

/// Keep disclosures added this calendar year or the previous one.
fn is_recent(added_date: &str, current_year: i32) -> bool {
    match added_date.parse::<DateTime<Utc>>() {
        Ok(added) => added.year() >= current_year - 1,
        Err(e) => {
            debug!("Unparseable AddedDate '{}': {}", added_date, e);
            false
        }
    }
}

fn to_incident(breach: ProviderBreach) -> RawIncident {
    RawIncident {
        date: breach.breach_date,
        title: breach.title,
        source: SOURCE_NAME.to_string(),
        source_url: format!("https://haveibeenpwned.com/PwnedWebsites#{}", breach.name),
        raw_content: breach.data_classes.join(", "),
        organizations: breach
            .domain
            .filter(|d| !d.is_empty())
            .map(|d| vec![d])
            .unwrap_or_default(),
        categories: vec!["breach".to_string()],
        compromised_data: breach.data_classes,
        record_count: breach.pwn_count,
    }
}
