//! Shared fixtures and mock-server builders for the integration suites.

#![allow(dead_code)]

use breachscout::config::{
    ApiCredentials, AppConfig, HttpConfig, OutputConfig, PipelineConfig, ProvidersConfig,
    RateLimitsConfig, WafConfig,
};
use chrono::{Datelike, Utc};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config wired to mock provider endpoints, with short retry delays so
/// failure-path tests stay fast.
pub fn test_config(breach_url: &str, firmographics_url: &str, ip_url: &str) -> AppConfig {
    AppConfig {
        http: HttpConfig {
            user_agent: "breachscout-tests/0.1".to_string(),
            request_timeout_secs: 5,
            ip_api_timeout_secs: 5,
        },
        providers: ProvidersConfig {
            breach_base_url: breach_url.to_string(),
            firmographics_base_url: firmographics_url.to_string(),
            ip_api_base_url: ip_url.to_string(),
        },
        rate_limits: RateLimitsConfig {
            firmographics_per_minute: 100,
            breach_per_minute: 30,
            default_per_minute: 10,
            cooldown_secs: 1,
            low_water_mark: 10,
        },
        pipeline: PipelineConfig {
            max_workers: 4,
            similar_targets_per_domain: 3,
            retry_attempts: 2,
            retry_backoff_base_secs: 1,
        },
        waf: WafConfig {
            // Deliberately not installed anywhere; detection degrades to "None"
            binary: "breachscout-test-missing-waf-tool".to_string(),
            timeout_secs: 5,
        },
        output: OutputConfig {
            directory: "output".to_string(),
            watermark_file: "data/last_run.txt".to_string(),
        },
    }
}

pub fn test_credentials() -> ApiCredentials {
    ApiCredentials {
        breach_list_key: "test-hibp-key".to_string(),
        firmographics_key: "test-apollo-key".to_string(),
        ip_api_token: None,
    }
}

/// AddedDate inside the client's recent window regardless of when the
/// suite runs.
pub fn recent_added_date() -> String {
    format!("{}-02-01T00:00:00Z", Utc::now().year())
}

/// AddedDate old enough to always fall outside the recent window.
pub fn stale_added_date() -> String {
    format!("{}-02-01T00:00:00Z", Utc::now().year() - 3)
}

pub fn breach_json(name: &str, title: &str, domain: Option<&str>, breach_date: &str) -> serde_json::Value {
    json!({
        "Name": name,
        "Title": title,
        "Domain": domain,
        "BreachDate": breach_date,
        "AddedDate": recent_added_date(),
        "DataClasses": ["Email addresses", "Passwords"],
        "PwnCount": 12345
    })
}

/// Mock breach-list provider serving the given breach array at /breaches.
pub async fn mock_breach_server(breaches: Vec<serde_json::Value>) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/breaches"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::Value::Array(breaches)))
        .mount(&server)
        .await;

    server
}

/// Mount an organizations/enrich answer for one domain on an existing
/// firmographics mock server.
pub async fn mount_enrich(
    server: &MockServer,
    domain: &str,
    name: &str,
    employees: i64,
    industry: &str,
) {
    Mock::given(method("GET"))
        .and(path("/organizations/enrich"))
        .and(query_param("domain", domain))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organization": {
                "domain": domain,
                "name": name,
                "estimated_num_employees": employees,
                "industry": industry
            }
        })))
        .mount(server)
        .await;
}

/// Catch-all people/match answer with no person, so contact enrichment
/// walks the full title list and degrades to sentinels.
pub async fn mount_no_contacts(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/people/match"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "person": null })))
        .mount(server)
        .await;
}

/// organizations/search answer listing the given candidate organizations.
pub async fn mount_search(server: &MockServer, organizations: Vec<serde_json::Value>) {
    Mock::given(method("GET"))
        .and(path("/organizations/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organizations": organizations
        })))
        .mount(server)
        .await;
}

/// IP-intelligence answer for one address.
pub async fn mount_ip_intel(server: &MockServer, ip: &str, org: &str, country: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/json", ip)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "org": org,
            "country": country
        })))
        .mount(server)
        .await;
}
