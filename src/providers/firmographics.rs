//! Firmographics/contact provider client (organization enrichment, person
//! match, and same-industry search).
//!
//! All requests flow through one retry loop that understands the
//! provider's status-code contract: 429 retries with backoff, 401 is
//! terminal, 422 is a permanent miss for the input. Response headers are
//! fed back to the rate limiter after every answered call.

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::config::AppConfig;
use crate::incident::{ContactProfile, SizeBucket, EMAIL_RESTRICTED, NOT_AVAILABLE, NOT_FOUND, UNKNOWN_COMPANY};
use crate::providers::{ProviderOutcome, FIRMOGRAPHICS_SERVICE};
use crate::rate_limit::{RetryPolicy, SharedRateLimiter};

/// Security leadership titles tried most-senior-first. Iteration stops at
/// the first title that yields a person.
pub const PRIORITY_TITLES: &[&str] = &[
    "Chief Information Security Officer",
    "CISO",
    "Chief Security Officer",
    "CSO",
    "VP of Security",
    "Director of Security",
];

/// Human-readable provider name, used as the source of potential-target records
pub const PROVIDER_NAME: &str = "Apollo";

#[derive(Debug, Clone)]
pub struct FirmographicsClient {
    http: reqwest::Client,
    base_url: String,
    limiter: SharedRateLimiter,
    retry: RetryPolicy,
}

/// Organization attributes from the enrich endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgEnrichment {
    pub name: Option<String>,
    pub employee_count: Option<i64>,
    pub industry: Option<String>,
}

impl OrgEnrichment {
    pub fn size_bucket(&self) -> SizeBucket {
        SizeBucket::from_employee_count(self.employee_count)
    }

    pub fn company_name(&self) -> String {
        self.name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNKNOWN_COMPANY.to_string())
    }
}

/// One candidate from the same-industry search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarCompany {
    pub domain: String,
    pub name: Option<String>,
    pub industry: Option<String>,
    pub employee_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct EnrichResponse {
    organization: Option<OrgPayload>,
}

#[derive(Debug, Deserialize)]
struct OrgPayload {
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    estimated_num_employees: Option<i64>,
    #[serde(default)]
    industry: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MatchResponse {
    person: Option<PersonPayload>,
}

#[derive(Debug, Deserialize)]
struct PersonPayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    linkedin_url: Option<String>,
    #[serde(default)]
    contact: Option<ContactPayload>,
}

#[derive(Debug, Deserialize)]
struct ContactPayload {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone_numbers: Option<Vec<PhonePayload>>,
}

#[derive(Debug, Deserialize)]
struct PhonePayload {
    #[serde(default)]
    sanitized_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organizations: Vec<OrgPayload>,
}

impl FirmographicsClient {
    pub fn new(config: &AppConfig, api_key: &str, limiter: SharedRateLimiter) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key).context("Firmographics API key is not valid header text")?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http.request_timeout_secs))
            .user_agent(config.http.user_agent.clone())
            .default_headers(headers)
            .build()
            .context("Failed to build firmographics HTTP client")?;

        Ok(Self {
            http,
            base_url: config.providers.firmographics_base_url.trim_end_matches('/').to_string(),
            limiter,
            retry: RetryPolicy::new(
                config.pipeline.retry_attempts,
                config.pipeline.retry_backoff_base_secs,
            ),
        })
    }

    /// Company firmographics for the size screen and the firmographic half
    /// of organization enrichment. Callers cache the result per domain.
    pub async fn enrich_organization(&self, domain: &str) -> ProviderOutcome<OrgEnrichment> {
        let query = [("domain".to_string(), domain.to_string())];
        let response: EnrichResponse =
            match self.request(Method::GET, "organizations/enrich", &query).await.try_unwrap() {
                Ok(parsed) => parsed,
                Err(outcome) => return outcome,
            };

        match response.organization {
            Some(org) => ProviderOutcome::Success(OrgEnrichment {
                name: org.name,
                employee_count: org.estimated_num_employees,
                industry: org.industry,
            }),
            None => {
                debug!("No organization data for domain {}", domain);
                ProviderOutcome::Miss
            }
        }
    }

    /// Contact discovery: the priority titles first-match-wins, then a
    /// generic lookup, then the all-sentinel profile. Always total.
    pub async fn find_contact(&self, domain: &str) -> ContactProfile {
        for title in PRIORITY_TITLES {
            match self.match_person(domain, Some(title)).await {
                ProviderOutcome::Success(profile) => return profile,
                ProviderOutcome::Unauthorized => return ContactProfile::not_found(),
                ProviderOutcome::Miss | ProviderOutcome::Unavailable => continue,
            }
        }

        debug!("No security title matched for {}, trying generic lookup", domain);
        match self.match_person(domain, None).await {
            ProviderOutcome::Success(profile) => profile,
            _ => ContactProfile::not_found(),
        }
    }

    async fn match_person(
        &self,
        domain: &str,
        title: Option<&str>,
    ) -> ProviderOutcome<ContactProfile> {
        let mut query = vec![
            ("domain".to_string(), domain.to_string()),
            ("reveal_personal_emails".to_string(), "true".to_string()),
            ("reveal_phone_numbers".to_string(), "false".to_string()),
        ];
        if let Some(title) = title {
            query.push(("title".to_string(), title.to_string()));
        }

        let response: MatchResponse =
            match self.request(Method::POST, "people/match", &query).await.try_unwrap() {
                Ok(parsed) => parsed,
                Err(outcome) => return outcome,
            };

        match response.person {
            Some(person) => ProviderOutcome::Success(person_to_profile(person, title)),
            None => ProviderOutcome::Miss,
        }
    }

    /// Same-industry companies for related-target discovery, US/CA only.
    /// Over-fetches past `max_results` so post-filtering the seed domain
    /// still leaves enough candidates.
    pub async fn search_similar(
        &self,
        seed_domain: &str,
        industry: &str,
        max_results: usize,
    ) -> ProviderOutcome<Vec<SimilarCompany>> {
        let query = vec![
            ("q_organization_industries".to_string(), industry.to_string()),
            ("page".to_string(), "1".to_string()),
            ("per_page".to_string(), (max_results + 5).to_string()),
            ("organization_location_countries".to_string(), "US".to_string()),
            ("organization_location_countries".to_string(), "CA".to_string()),
        ];

        let response: SearchResponse =
            match self.request(Method::GET, "organizations/search", &query).await.try_unwrap() {
                Ok(parsed) => parsed,
                Err(outcome) => return outcome,
            };

        let candidates = filter_similar(response.organizations, seed_domain, max_results);
        ProviderOutcome::Success(candidates)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
    ) -> ProviderOutcome<T> {
        let url = format!("{}/{}", self.base_url, path);

        for attempt in 0..self.retry.max_attempts {
            if !self.limiter.admit(FIRMOGRAPHICS_SERVICE).await {
                debug!("Admission denied for firmographics call to {}", path);
                return ProviderOutcome::Unavailable;
            }

            let sent = self
                .http
                .request(method.clone(), &url)
                .query(query)
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(e) => {
                    warn!("Firmographics request to {} failed: {}", path, e);
                    sleep(self.retry.delay_for_attempt(attempt)).await;
                    continue;
                }
            };

            match response.status() {
                StatusCode::TOO_MANY_REQUESTS => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!("Firmographics rate limit hit, retrying in {:?}", delay);
                    sleep(delay).await;
                    continue;
                }
                StatusCode::UNAUTHORIZED => {
                    error!("Firmographics authentication rejected, check the API key");
                    return ProviderOutcome::Unauthorized;
                }
                StatusCode::UNPROCESSABLE_ENTITY => {
                    debug!("Firmographics rejected input for {} as unprocessable", path);
                    return ProviderOutcome::Miss;
                }
                status => {
                    self.limiter.observe_response_headers(response.headers()).await;

                    if !status.is_success() {
                        warn!("Firmographics call to {} returned {}", path, status);
                        sleep(self.retry.delay_for_attempt(attempt)).await;
                        continue;
                    }

                    match response.json::<T>().await {
                        Ok(parsed) => return ProviderOutcome::Success(parsed),
                        Err(e) => {
                            warn!("Firmographics response from {} did not parse: {}", path, e);
                            sleep(self.retry.delay_for_attempt(attempt)).await;
                            continue;
                        }
                    }
                }
            }
        }

        warn!(
            "Firmographics call to {} failed after {} attempts",
            path, self.retry.max_attempts
        );
        ProviderOutcome::Unavailable
    }
}

fn person_to_profile(person: PersonPayload, requested_title: Option<&str>) -> ContactProfile {
    let phone = person
        .contact
        .as_ref()
        .and_then(|c| c.phone_numbers.as_ref())
        .and_then(|numbers| numbers.first())
        .and_then(|number| number.sanitized_number.clone())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let title = person
        .title
        .clone()
        .filter(|t| !t.is_empty())
        .or_else(|| requested_title.map(str::to_string))
        .unwrap_or_else(|| NOT_FOUND.to_string());

    ContactProfile {
        name: person
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| NOT_FOUND.to_string()),
        title,
        phone,
        email: resolve_email(&person),
        linkedin_url: person
            .linkedin_url
            .clone()
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    }
}

/// A locked primary email falls back to the nested contact email; a value
/// that exists but stays locked surfaces as the restricted sentinel, never
/// the provider's raw marker.
fn resolve_email(person: &PersonPayload) -> String {
    let primary = person.email.as_deref().filter(|e| !e.is_empty());
    let fallback = person
        .contact
        .as_ref()
        .and_then(|c| c.email.as_deref())
        .filter(|e| !e.is_empty());

    match (primary, fallback) {
        (Some(email), _) if !is_locked(email) => email.to_string(),
        (_, Some(email)) if !is_locked(email) => email.to_string(),
        (Some(_), _) | (_, Some(_)) => EMAIL_RESTRICTED.to_string(),
        (None, None) => NOT_AVAILABLE.to_string(),
    }
}

fn is_locked(email: &str) -> bool {
    email.to_lowercase().contains("not_unlocked")
}

fn filter_similar(
    organizations: Vec<OrgPayload>,
    seed_domain: &str,
    max_results: usize,
) -> Vec<SimilarCompany> {
    organizations
        .into_iter()
        .filter_map(|org| {
            let domain = org.domain.filter(|d| !d.is_empty())?;
            if domain == seed_domain {
                return None;
            }
            Some(SimilarCompany {
                domain,
                name: org.name,
                industry: org.industry,
                employee_count: org.estimated_num_employees,
            })
        })
        .take(max_results)
        .collect()
}
