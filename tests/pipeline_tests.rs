//! End-to-end orchestrator runs against mock providers.
//!
//! Targets are IP literals so DNS validation and address resolution succeed
//! locally; the WAF binary is deliberately absent so detection degrades to
//! "None" everywhere.

mod common;

use breachscout::incident::RecordKind;
use breachscout::pipeline::Orchestrator;
use chrono::NaiveDate;
use serde_json::json;
use wiremock::MockServer;

use common::{
    breach_json, mock_breach_server, mount_enrich, mount_ip_intel, mount_no_contacts,
    mount_search, test_config, test_credentials,
};

const ALPHA: &str = "11.11.11.11";
const BETA: &str = "22.22.22.22";
const DELTA: &str = "33.33.33.33";
const PEER: &str = "44.44.44.44";

async fn firmographics_server() -> MockServer {
    let server = MockServer::start().await;
    mount_enrich(&server, ALPHA, "Alpha Inc", 300, "software").await;
    mount_enrich(&server, BETA, "Beta GmbH", 500, "software").await;
    mount_enrich(&server, DELTA, "Delta LLC", 30, "software").await;
    mount_no_contacts(&server).await;
    server
}

async fn ip_server() -> MockServer {
    let server = MockServer::start().await;
    mount_ip_intel(&server, ALPHA, "AS20940 Akamai International B.V.", "US").await;
    mount_ip_intel(&server, BETA, "AS24940 Hetzner Online GmbH", "DE").await;
    mount_ip_intel(&server, PEER, "AS13335 Cloudflare, Inc.", "US").await;
    server
}

#[tokio::test]
async fn full_run_filters_merges_and_discovers() {
    let breach_server = mock_breach_server(vec![
        breach_json("Alpha", "Alpha Breach", Some(ALPHA), "2025-03-14"),
        // Exact repeat of (title, organization): dropped at ingest dedup
        breach_json("Alpha", "Alpha Breach", Some(ALPHA), "2025-03-14"),
        // Same domain under a new title: dropped at domain extraction
        breach_json("AlphaAgain", "Alpha Rebreach", Some(ALPHA), "2025-03-20"),
        // Geolocates to DE: dropped by the region filter after enrichment
        breach_json("Beta", "Beta Breach", Some(BETA), "2025-03-15"),
        // 30 employees: dropped at the size screen
        breach_json("Delta", "Delta Breach", Some(DELTA), "2025-03-16"),
        // No organization reference at all: dropped at extraction
        breach_json("Nameless", "Nameless Breach", None, "2025-03-17"),
    ])
    .await;

    let firmo_server = firmographics_server().await;
    // Discovery proposes one already-seen domain and one new candidate
    mount_search(
        &firmo_server,
        vec![
            json!({ "domain": BETA, "name": "Beta GmbH", "estimated_num_employees": 500 }),
            json!({ "domain": PEER, "name": "Peer Co", "estimated_num_employees": 800 }),
        ],
    )
    .await;
    let ip_srv = ip_server().await;

    let config = test_config(&breach_server.uri(), &firmo_server.uri(), &ip_srv.uri());
    let orchestrator = Orchestrator::new(config, &test_credentials()).unwrap();

    let report = orchestrator.run(None).await.unwrap();

    assert_eq!(report.counts.fetched, 6);
    assert_eq!(report.counts.deduplicated, 5);
    assert_eq!(report.counts.validated, 3);
    assert_eq!(report.counts.screened, 2);
    assert_eq!(report.counts.discovered, 1);
    assert_eq!(report.counts.published, 2);

    let breach: Vec<_> = report
        .records
        .iter()
        .filter(|r| r.kind == RecordKind::Breach)
        .collect();
    assert_eq!(breach.len(), 1, "only the AMER-classified breach publishes");
    let alpha = breach[0];
    assert_eq!(alpha.company_website, ALPHA);
    assert_eq!(alpha.company_name, "Alpha Inc");
    assert_eq!(alpha.company_size, "250–999");
    assert_eq!(alpha.cdn, "Akamai International B.V.");
    assert_eq!(alpha.security, "None");
    assert_eq!(alpha.country, "US-AMER");
    assert_eq!(alpha.date, "2025-03-14");
    assert_eq!(alpha.contact_name, "Not Found");
    assert_eq!(alpha.contact_email, "Not Available");
    assert_eq!(alpha.source, "HIBP");
    assert_eq!(alpha.record_count, Some(12345));
    assert_eq!(alpha.compromised_data[0], "Email addresses");

    let discovered: Vec<_> = report
        .records
        .iter()
        .filter(|r| r.kind == RecordKind::PotentialTarget)
        .collect();
    assert_eq!(discovered.len(), 1, "the already-seen candidate is not re-added");
    let peer = discovered[0];
    assert_eq!(peer.company_website, PEER);
    assert_eq!(peer.company_name, "Peer Co");
    assert_eq!(peer.company_size, "250–999");
    assert_eq!(peer.date, "Similar Company");
    assert_eq!(peer.breach_type, "Potential Target");
    assert_eq!(peer.source, "Apollo");
    assert_eq!(peer.country, "US-AMER");
}

#[tokio::test]
async fn domains_never_repeat_in_the_final_set() {
    let breach_server = mock_breach_server(vec![
        breach_json("AcmeOne", "Acme First Breach", Some(ALPHA), "2025-02-01"),
        breach_json("AcmeTwo", "Acme Second Breach", Some(ALPHA), "2025-03-01"),
    ])
    .await;

    let firmo_server = firmographics_server().await;
    mount_search(&firmo_server, vec![]).await;
    let ip_srv = ip_server().await;

    let config = test_config(&breach_server.uri(), &firmo_server.uri(), &ip_srv.uri());
    let orchestrator = Orchestrator::new(config, &test_credentials()).unwrap();

    let report = orchestrator.run(None).await.unwrap();
    let alpha_records = report
        .records
        .iter()
        .filter(|r| r.company_website == ALPHA)
        .count();
    assert_eq!(alpha_records, 1);
    // First occurrence wins
    assert_eq!(report.records[0].date, "2025-02-01");
}

#[tokio::test]
async fn unresolvable_domain_never_reaches_the_final_set() {
    // "bad..dot.com" fails the syntactic check ahead of resolution, so the
    // incident dies at domain validation without a network lookup.
    let breach_server = mock_breach_server(vec![
        breach_json("Alpha", "Alpha Breach", Some(ALPHA), "2025-03-14"),
        breach_json("Ghost", "Ghost Breach", Some("bad..dot.com"), "2025-03-18"),
    ])
    .await;

    let firmo_server = firmographics_server().await;
    mount_search(&firmo_server, vec![]).await;
    let ip_srv = ip_server().await;

    let config = test_config(&breach_server.uri(), &firmo_server.uri(), &ip_srv.uri());
    let orchestrator = Orchestrator::new(config, &test_credentials()).unwrap();

    let report = orchestrator.run(None).await.unwrap();
    assert_eq!(report.counts.deduplicated, 2);
    assert_eq!(report.counts.validated, 1);
    assert!(report
        .records
        .iter()
        .all(|r| r.company_website != "bad..dot.com"));
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].company_website, ALPHA);
}

#[tokio::test]
async fn watermark_excludes_already_processed_incidents() {
    let breach_server = mock_breach_server(vec![
        breach_json("Alpha", "Alpha Breach", Some(ALPHA), "2025-03-14"),
        breach_json("Beta", "Beta Breach", Some(BETA), "2025-05-01"),
    ])
    .await;

    let firmo_server = firmographics_server().await;
    mount_search(&firmo_server, vec![]).await;
    let ip_srv = ip_server().await;

    let config = test_config(&breach_server.uri(), &firmo_server.uri(), &ip_srv.uri());
    let orchestrator = Orchestrator::new(config, &test_credentials()).unwrap();

    // Alpha (2025-03-14) is at or before the watermark; only Beta survives
    // ingest, and Beta then falls to the region filter.
    let watermark = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
    let report = orchestrator.run(Some(watermark)).await.unwrap();

    assert_eq!(report.counts.deduplicated, 1);
    assert_eq!(report.counts.validated, 1);
    assert!(report.records.iter().all(|r| r.company_website != ALPHA));
}

#[tokio::test]
async fn provider_outage_degrades_records_instead_of_failing_the_run() {
    let breach_server =
        mock_breach_server(vec![breach_json("Alpha", "Alpha Breach", Some(ALPHA), "2025-03-14")])
            .await;

    // Firmographics provider is down entirely
    let config = test_config(&breach_server.uri(), "http://127.0.0.1:9", "http://127.0.0.1:9");
    let orchestrator = Orchestrator::new(config, &test_credentials()).unwrap();

    let report = orchestrator.run(None).await.unwrap();
    // Size screen buckets the failure as N/A and excludes the domain
    assert_eq!(report.counts.validated, 1);
    assert_eq!(report.counts.screened, 0);
    assert!(report.records.is_empty());
}

#[tokio::test]
async fn ingest_failure_is_fatal() {
    let config = test_config("http://127.0.0.1:9", "http://127.0.0.1:9", "http://127.0.0.1:9");
    let orchestrator = Orchestrator::new(config, &test_credentials()).unwrap();
    assert!(orchestrator.run(None).await.is_err());
}
