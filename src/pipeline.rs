//! Enrichment orchestration pipeline.
//!
//! One run is a fixed sequence of stages with a join barrier between each:
//! ingest, domain extraction, size screen, organization enrichment, contact
//! enrichment, merge and region filter, related-target discovery, finalize.
//! Per-domain work inside a stage fans out onto a bounded worker pool and
//! may finish in any order; no stage consumes the previous stage's output
//! until every unit has completed.
//!
//! Failure policy: one domain's enrichment failure degrades that domain's
//! record to documented defaults. Only an unreachable breach-list provider
//! at ingest aborts the run.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info};

use crate::config::{ApiCredentials, AppConfig};
use crate::dns::DomainValidator;
use crate::domain_utils::normalize_domain;
use crate::incident::{
    deduplicate_incidents, ContactProfile, EnrichedRecord, OrganizationProfile, RawIncident,
    SizeBucket, UNKNOWN_COMPANY,
};
use crate::providers::firmographics::{OrgEnrichment, SimilarCompany, PROVIDER_NAME};
use crate::providers::ip_intel::NetworkIntel;
use crate::providers::{BreachListClient, FirmographicsClient, IpIntelClient, WafDetector};
use crate::rate_limit::SharedRateLimiter;
use crate::region;
use crate::watermark::DATE_FORMAT;

/// Per-stage cardinality counters, reported in the console summary and the
/// JSON export.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageCounts {
    pub fetched: usize,
    pub deduplicated: usize,
    pub validated: usize,
    pub screened: usize,
    pub published: usize,
    pub discovered: usize,
}

/// Everything one pipeline run produced. The caller publishes the records
/// and only then advances the watermark to `run_date`.
#[derive(Debug)]
pub struct RunReport {
    pub records: Vec<EnrichedRecord>,
    pub run_date: NaiveDate,
    pub counts: StageCounts,
}

/// A validated enrichment candidate: one incident with its canonical,
/// resolvable domain.
#[derive(Debug, Clone)]
struct Target {
    domain: String,
    incident: RawIncident,
}

/// Per-run firmographics cache. Set once per domain, read by every later
/// stage; a `None` entry records a confirmed miss so it is not retried.
type FirmographicsCache = Mutex<HashMap<String, Option<OrgEnrichment>>>;

pub struct Orchestrator {
    config: AppConfig,
    breach_list: BreachListClient,
    firmographics: FirmographicsClient,
    ip_intel: IpIntelClient,
    waf: WafDetector,
    validator: DomainValidator,
}

impl Orchestrator {
    pub fn new(config: AppConfig, credentials: &ApiCredentials) -> Result<Self> {
        let limiter = SharedRateLimiter::from_config(&config.rate_limits);
        let breach_list =
            BreachListClient::new(&config, &credentials.breach_list_key, limiter.clone())?;
        let firmographics =
            FirmographicsClient::new(&config, &credentials.firmographics_key, limiter)?;
        let ip_intel = IpIntelClient::new(&config, credentials.ip_api_token.clone())?;
        let waf = WafDetector::from_config(&config.waf);

        Ok(Self {
            config,
            breach_list,
            firmographics,
            ip_intel,
            waf,
            validator: DomainValidator::new(),
        })
    }

    /// Run the full pipeline. `watermark` gates ingest to incidents strictly
    /// newer than the last successful run.
    pub async fn run(&self, watermark: Option<NaiveDate>) -> Result<RunReport> {
        let mut counts = StageCounts::default();

        // Stage 1: ingest. The only stage whose failure aborts the run.
        let incidents = self.breach_list.fetch_recent_breaches().await?;
        counts.fetched = incidents.len();

        let incidents = deduplicate_incidents(incidents);
        let incidents = filter_newer_than(incidents, watermark);
        counts.deduplicated = incidents.len();
        info!("{} incidents after dedup and watermark filter", counts.deduplicated);

        // Stage 2: domain extraction and DNS validation.
        let targets = self.extract_targets(incidents).await;
        counts.validated = targets.len();
        info!("{} incidents carry a resolvable domain", counts.validated);

        // Every domain the run touched; related-target discovery must never
        // re-propose one of these.
        let seen: Mutex<HashSet<String>> =
            Mutex::new(targets.iter().map(|t| t.domain.clone()).collect());

        // Stage 3: size screen.
        let cache: FirmographicsCache = Mutex::new(HashMap::new());
        let targets = self.size_screen(targets, &cache).await;
        counts.screened = targets.len();
        info!("{} domains passed the size screen", counts.screened);

        // Stage 4: organization enrichment.
        let org_profiles = self.enrich_organizations(&targets, &cache).await;

        // Stage 5: contact enrichment.
        let contacts = self.enrich_contacts(&targets).await;

        // Stage 6: merge and region filter.
        let mut records = Vec::new();
        let mut retained: Vec<String> = Vec::new();
        for target in &targets {
            let org = org_profiles
                .get(&target.domain)
                .cloned()
                .unwrap_or_else(|| OrganizationProfile::unavailable(&target.domain));
            if !passes_region_filter(&org.country) {
                debug!(
                    "Dropping {} from publication: country {} is outside AMER",
                    target.domain, org.country
                );
                continue;
            }

            let contact = contacts
                .get(&target.domain)
                .cloned()
                .unwrap_or_else(ContactProfile::not_found);
            records.push(EnrichedRecord::from_breach(&target.incident, &org, &contact));
            retained.push(target.domain.clone());
        }

        // Stage 7: related-target discovery, single level.
        let discovered = self.discover_related(&retained, &cache, &seen).await;
        counts.discovered = discovered.len();
        records.extend(discovered);

        counts.published = records.len();
        info!(
            "Run complete: {} records ({} discovered targets)",
            counts.published, counts.discovered
        );

        Ok(RunReport {
            records,
            run_date: Utc::now().date_naive(),
            counts,
        })
    }

    /// Stage 2: normalize each incident's primary organization reference and
    /// keep only candidates that resolve. An incident without a usable
    /// domain is dropped silently; a repeat domain keeps its first incident.
    async fn extract_targets(&self, incidents: Vec<RawIncident>) -> Vec<Target> {
        let mut claimed: HashSet<String> = HashSet::new();
        let mut targets = Vec::new();

        for incident in incidents {
            let Some(reference) = incident.primary_organization() else {
                debug!("Incident '{}' names no organization, skipping", incident.title);
                continue;
            };

            let domain = normalize_domain(reference);
            if domain.is_empty() || !claimed.insert(domain.clone()) {
                continue;
            }

            if self.validator.is_resolvable(&domain).await {
                targets.push(Target { domain, incident });
            } else {
                debug!("Domain {} does not resolve, excluding incident", domain);
            }
        }

        targets
    }

    /// Stage 3: coarse admission filter ahead of the expensive stages.
    /// A failed size call buckets as N/A and the domain is excluded.
    async fn size_screen(&self, targets: Vec<Target>, cache: &FirmographicsCache) -> Vec<Target> {
        let pool = Semaphore::new(self.config.pipeline.max_workers);

        let screens = targets.into_iter().map(|target| {
            let pool = &pool;
            async move {
                let _permit = pool.acquire().await.ok()?;
                let bucket = self
                    .cached_firmographics(&target.domain, cache)
                    .await
                    .map(|org| org.size_bucket())
                    .unwrap_or(SizeBucket::Unknown);

                if bucket.below_screen_threshold() {
                    debug!("{} screened out at size {}", target.domain, bucket);
                    None
                } else {
                    Some(target)
                }
            }
        });

        join_all(screens).await.into_iter().flatten().collect()
    }

    /// Stage 4: per-domain fan-out that merges network/WAF/geo data with the
    /// cached firmographics into one profile. Always total per domain.
    async fn enrich_organizations(
        &self,
        targets: &[Target],
        cache: &FirmographicsCache,
    ) -> HashMap<String, OrganizationProfile> {
        let pool = Semaphore::new(self.config.pipeline.max_workers);

        let enrichments = targets.iter().map(|target| {
            let pool = &pool;
            async move {
                let profile = match pool.acquire().await {
                    Ok(_permit) => self.build_org_profile(&target.domain, cache).await,
                    Err(_) => OrganizationProfile::unavailable(&target.domain),
                };
                (target.domain.clone(), profile)
            }
        });

        join_all(enrichments).await.into_iter().collect()
    }

    /// Stage 5: per-domain contact discovery. The client already guarantees
    /// a fully-populated profile, sentinels included.
    async fn enrich_contacts(&self, targets: &[Target]) -> HashMap<String, ContactProfile> {
        let pool = Semaphore::new(self.config.pipeline.max_workers);

        let lookups = targets.iter().map(|target| {
            let pool = &pool;
            async move {
                let contact = match pool.acquire().await {
                    Ok(_permit) => self.firmographics.find_contact(&target.domain).await,
                    Err(_) => ContactProfile::not_found(),
                };
                (target.domain.clone(), contact)
            }
        });

        join_all(lookups).await.into_iter().collect()
    }

    /// Stage 7: same-industry expansion of each retained domain. Candidates
    /// already in the seen-set are skipped; accepted candidates get the
    /// network/WAF/geo half of enrichment only and are marked seen so the
    /// expansion stays single-level.
    async fn discover_related(
        &self,
        retained: &[String],
        cache: &FirmographicsCache,
        seen: &Mutex<HashSet<String>>,
    ) -> Vec<EnrichedRecord> {
        let cap = self.config.pipeline.similar_targets_per_domain;
        if cap == 0 {
            return Vec::new();
        }

        let pool = Semaphore::new(self.config.pipeline.max_workers);

        let expansions = retained.iter().map(|domain| {
            let pool = &pool;
            async move {
                let Ok(_permit) = pool.acquire().await else {
                    return Vec::new();
                };

                let Some(industry) = self
                    .cached_firmographics(domain, cache)
                    .await
                    .and_then(|org| org.industry)
                else {
                    debug!("No industry on record for {}, skipping discovery", domain);
                    return Vec::new();
                };

                let candidates = self
                    .firmographics
                    .search_similar(domain, &industry, cap)
                    .await
                    .into_option()
                    .unwrap_or_default();

                let mut records = Vec::new();
                for candidate in candidates {
                    if !seen.lock().await.insert(candidate.domain.clone()) {
                        debug!("Candidate {} already seen, skipping", candidate.domain);
                        continue;
                    }
                    let profile = self.build_candidate_profile(&candidate).await;
                    records.push(EnrichedRecord::potential_target(&profile, PROVIDER_NAME));
                }
                records
            }
        });

        join_all(expansions).await.into_iter().flatten().collect()
    }

    /// Firmographics keyed by domain, fetched at most once per run.
    async fn cached_firmographics(
        &self,
        domain: &str,
        cache: &FirmographicsCache,
    ) -> Option<OrgEnrichment> {
        if let Some(hit) = cache.lock().await.get(domain) {
            return hit.clone();
        }

        let fetched = self
            .firmographics
            .enrich_organization(domain)
            .await
            .into_option();
        cache
            .lock()
            .await
            .insert(domain.to_string(), fetched.clone());
        fetched
    }

    async fn build_org_profile(
        &self,
        domain: &str,
        cache: &FirmographicsCache,
    ) -> OrganizationProfile {
        let firmographics = self.cached_firmographics(domain, cache).await;
        let (network, waf) = tokio::join!(self.network_intel(domain), self.waf.detect(domain));

        OrganizationProfile {
            domain: domain.to_string(),
            company_name: firmographics
                .as_ref()
                .map(|org| org.company_name())
                .unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
            size_bucket: firmographics
                .as_ref()
                .map(|org| org.size_bucket())
                .unwrap_or(SizeBucket::Unknown),
            cdn: network.cdn,
            waf,
            country: region::render_country(&network.country),
        }
    }

    /// Network/WAF/geo-only profile for a discovered candidate; name and
    /// size come from the search result itself.
    async fn build_candidate_profile(&self, candidate: &SimilarCompany) -> OrganizationProfile {
        let (network, waf) = tokio::join!(
            self.network_intel(&candidate.domain),
            self.waf.detect(&candidate.domain)
        );

        OrganizationProfile {
            domain: candidate.domain.clone(),
            company_name: candidate
                .name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
            size_bucket: SizeBucket::from_employee_count(candidate.employee_count),
            cdn: network.cdn,
            waf,
            country: region::render_country(&network.country),
        }
    }

    async fn network_intel(&self, domain: &str) -> NetworkIntel {
        match self.validator.first_ip(domain).await {
            Some(ip) => self.ip_intel.lookup(ip).await,
            None => NetworkIntel::unknown(),
        }
    }
}

/// Publication is restricted to AMER-classified countries.
fn passes_region_filter(rendered_country: &str) -> bool {
    rendered_country.starts_with("US-") || rendered_country.starts_with("CA-")
}

/// Keep incidents strictly newer than the watermark. Incidents whose date
/// does not parse are kept; they cannot be compared, and losing them
/// silently would hide real disclosures.
fn filter_newer_than(incidents: Vec<RawIncident>, watermark: Option<NaiveDate>) -> Vec<RawIncident> {
    let Some(watermark) = watermark else {
        return incidents;
    };

    incidents
        .into_iter()
        .filter(|incident| {
            match NaiveDate::parse_from_str(&incident.date, DATE_FORMAT) {
                Ok(date) => date > watermark,
                Err(_) => {
                    debug!(
                        "Incident '{}' has unparseable date '{}', keeping it",
                        incident.title, incident.date
                    );
                    true
                }
            }
        })
        .collect()
}
