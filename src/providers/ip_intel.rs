//! IP-intelligence provider client (geolocation and network operator).
//!
//! Keyed by resolved address, not hostname. Lookups are total: any failure
//! degrades to the "None"/"Unknown" defaults instead of surfacing an
//! error, since a missing geo answer only costs a record its region.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::incident::{NONE_DETECTED, UNKNOWN_COUNTRY};

// Network operator strings lead with an autonomous-system tag,
// e.g. "AS13335 Cloudflare, Inc."
static AS_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"AS\d+\s*").unwrap());

#[derive(Debug, Clone)]
pub struct IpIntelClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

/// Operator and location attributes for one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkIntel {
    /// Operator name with the AS tag stripped, or "None"
    pub cdn: String,
    /// ISO alpha-2 country code, or "Unknown"
    pub country: String,
}

impl NetworkIntel {
    pub fn unknown() -> Self {
        NetworkIntel {
            cdn: NONE_DETECTED.to_string(),
            country: UNKNOWN_COUNTRY.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IpInfoPayload {
    #[serde(default)]
    org: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

impl IpIntelClient {
    pub fn new(config: &AppConfig, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http.ip_api_timeout_secs))
            .user_agent(config.http.user_agent.clone())
            .build()
            .context("Failed to build IP-intelligence HTTP client")?;

        Ok(Self {
            http,
            base_url: config.providers.ip_api_base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Look up one address. Total; never errors.
    pub async fn lookup(&self, ip: IpAddr) -> NetworkIntel {
        let url = format!("{}/{}/json", self.base_url, ip);
        let mut request = self.http.get(&url);
        if let Some(token) = &self.token {
            request = request.query(&[("token", token.as_str())]);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("IP-intelligence request for {} failed: {}", ip, e);
                return NetworkIntel::unknown();
            }
        };

        if !response.status().is_success() {
            warn!(
                "IP-intelligence lookup for {} returned {}",
                ip,
                response.status()
            );
            return NetworkIntel::unknown();
        }

        match response.json::<IpInfoPayload>().await {
            Ok(payload) => to_intel(payload),
            Err(e) => {
                debug!("IP-intelligence payload for {} did not parse: {}", ip, e);
                NetworkIntel::unknown()
            }
        }
    }
}

fn to_intel(payload: IpInfoPayload) -> NetworkIntel {
    let cdn = payload
        .org
        .map(|org| AS_PREFIX.replace_all(&org, "").trim().to_string())
        .filter(|org| !org.is_empty())
        .unwrap_or_else(|| NONE_DETECTED.to_string());

    let country = payload
        .country
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string());

    NetworkIntel { cdn, country }
}
