use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Placeholder for missing person/organization names
pub const NOT_FOUND: &str = "Not Found";
/// Placeholder for missing contact channels
pub const NOT_AVAILABLE: &str = "Not Available";
/// Placeholder for provider-locked email addresses
pub const EMAIL_RESTRICTED: &str = "Available (Upgrade Required)";
/// Placeholder CDN/WAF value when nothing was detected
pub const NONE_DETECTED: &str = "None";
/// Placeholder country when geolocation failed
pub const UNKNOWN_COUNTRY: &str = "Unknown";
/// Placeholder company name when firmographics failed
pub const UNKNOWN_COMPANY: &str = "Unknown";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecordKind {
    // Confirmed disclosure from the breach-list provider
    Breach,
    // Same-industry company surfaced by related-target discovery
    PotentialTarget,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Breach => "breach",
            RecordKind::PotentialTarget => "potential_target",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse employee-count classification. Bucket bounds are
/// inclusive-lower/exclusive-upper, so a count of exactly 50 lands in Small.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SizeBucket {
    Micro,      // 1–49
    Small,      // 50–249
    Medium,     // 250–999
    Large,      // 1,000–4,999
    Enterprise, // 5,000+
    Unknown,    // N/A
}

impl SizeBucket {
    pub fn from_employee_count(count: Option<i64>) -> Self {
        match count {
            None => SizeBucket::Unknown,
            Some(n) if n < 50 => SizeBucket::Micro,
            Some(n) if n < 250 => SizeBucket::Small,
            Some(n) if n < 1000 => SizeBucket::Medium,
            Some(n) if n < 5000 => SizeBucket::Large,
            Some(_) => SizeBucket::Enterprise,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SizeBucket::Micro => "1–49",
            SizeBucket::Small => "50–249",
            SizeBucket::Medium => "250–999",
            SizeBucket::Large => "1,000–4,999",
            SizeBucket::Enterprise => "5,000+",
            SizeBucket::Unknown => "N/A",
        }
    }

    /// Buckets the size screen refuses to pass on to full enrichment
    pub fn below_screen_threshold(&self) -> bool {
        matches!(self, SizeBucket::Micro | SizeBucket::Unknown)
    }
}

impl std::fmt::Display for SizeBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One disclosed breach event as fetched from the breach-list provider,
/// pre-deduplication. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawIncident {
    pub date: String,
    pub title: String,
    pub source: String,
    pub source_url: String,
    pub raw_content: String,
    pub organizations: Vec<String>,
    pub categories: Vec<String>,
    pub compromised_data: Vec<String>,
    pub record_count: Option<u64>,
}

impl RawIncident {
    /// The organization reference all enrichment keys off. Entries can hold
    /// comma-separated lists; only the first element counts.
    pub fn primary_organization(&self) -> Option<&str> {
        self.organizations
            .first()
            .map(|org| org.split(',').next().unwrap_or(org).trim())
            .filter(|org| !org.is_empty())
    }
}

/// Drops repeat disclosures, keyed by (title, first organization).
/// First occurrence wins. Idempotent.
pub fn deduplicate_incidents(incidents: Vec<RawIncident>) -> Vec<RawIncident> {
    let mut seen: HashSet<(String, Option<String>)> = HashSet::new();
    let mut deduped = Vec::with_capacity(incidents.len());

    for incident in incidents {
        let key = (
            incident.title.clone(),
            incident.organizations.first().cloned(),
        );
        if seen.insert(key) {
            deduped.push(incident);
        }
    }

    deduped
}

/// Network, geo, and firmographic attributes of one target domain.
/// Built incrementally across the size screen and organization enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationProfile {
    pub domain: String,
    pub company_name: String,
    pub size_bucket: SizeBucket,
    pub cdn: String,
    /// Sorted, comma-joined WAF vendor names, "None", or "Timeout"
    pub waf: String,
    /// Country code with region suffix when known, e.g. "US-AMER"
    pub country: String,
}

impl OrganizationProfile {
    /// The documented default profile for a domain whose enrichment failed.
    pub fn unavailable(domain: &str) -> Self {
        OrganizationProfile {
            domain: domain.to_string(),
            company_name: UNKNOWN_COMPANY.to_string(),
            size_bucket: SizeBucket::Unknown,
            cdn: NONE_DETECTED.to_string(),
            waf: NONE_DETECTED.to_string(),
            country: UNKNOWN_COUNTRY.to_string(),
        }
    }
}

/// Point of contact for a target domain. Every field is always populated,
/// with sentinels standing in for anything the provider could not supply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactProfile {
    pub name: String,
    pub title: String,
    pub phone: String,
    pub email: String,
    pub linkedin_url: String,
}

impl ContactProfile {
    pub fn not_found() -> Self {
        ContactProfile {
            name: NOT_FOUND.to_string(),
            title: NOT_FOUND.to_string(),
            phone: NOT_AVAILABLE.to_string(),
            email: NOT_AVAILABLE.to_string(),
            linkedin_url: NOT_AVAILABLE.to_string(),
        }
    }
}

/// The join of one incident, one OrganizationProfile, and one
/// ContactProfile, flattened to the report sink's field set. The CSV sink
/// publishes the named columns only; the incident's category, data-class,
/// and record-count detail rides along for the JSON export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub kind: RecordKind,
    pub date: String,
    pub company_name: String,
    pub company_website: String,
    pub company_size: String,
    pub breach_type: String,
    pub cdn: String,
    pub security: String,
    pub country: String,
    pub contact_name: String,
    pub contact_title: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub linkedin_url: String,
    pub source: String,
    pub categories: Vec<String>,
    pub compromised_data: Vec<String>,
    pub record_count: Option<u64>,
}

impl EnrichedRecord {
    pub fn from_breach(
        incident: &RawIncident,
        org: &OrganizationProfile,
        contact: &ContactProfile,
    ) -> Self {
        EnrichedRecord {
            kind: RecordKind::Breach,
            date: incident.date.clone(),
            company_name: org.company_name.clone(),
            company_website: org.domain.clone(),
            company_size: org.size_bucket.as_str().to_string(),
            breach_type: incident.raw_content.clone(),
            cdn: org.cdn.clone(),
            security: org.waf.clone(),
            country: org.country.clone(),
            contact_name: contact.name.clone(),
            contact_title: contact.title.clone(),
            contact_phone: contact.phone.clone(),
            contact_email: contact.email.clone(),
            linkedin_url: contact.linkedin_url.clone(),
            source: incident.source.clone(),
            categories: incident.categories.clone(),
            compromised_data: incident.compromised_data.clone(),
            record_count: incident.record_count,
        }
    }

    /// Related-target record. No incident backs it, so the date and breach
    /// type carry fixed markers and the contact block stays at sentinels.
    pub fn potential_target(org: &OrganizationProfile, source: &str) -> Self {
        let contact = ContactProfile::not_found();
        EnrichedRecord {
            kind: RecordKind::PotentialTarget,
            date: "Similar Company".to_string(),
            company_name: org.company_name.clone(),
            company_website: org.domain.clone(),
            company_size: org.size_bucket.as_str().to_string(),
            breach_type: "Potential Target".to_string(),
            cdn: org.cdn.clone(),
            security: org.waf.clone(),
            country: org.country.clone(),
            contact_name: contact.name,
            contact_title: contact.title,
            contact_phone: contact.phone,
            contact_email: contact.email,
            linkedin_url: contact.linkedin_url,
            source: source.to_string(),
            categories: vec![RecordKind::PotentialTarget.as_str().to_string()],
            compromised_data: Vec::new(),
            record_count: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incident(title: &str, org: &str) -> RawIncident {
        RawIncident {
            date: "2025-04-01".to_string(),
            title: title.to_string(),
            source: "HIBP".to_string(),
            source_url: format!("https://haveibeenpwned.com/PwnedWebsites#{}", title),
            raw_content: "Email addresses, Passwords".to_string(),
            organizations: vec![org.to_string()],
            categories: vec!["breach".to_string()],
            compromised_data: vec!["Email addresses".to_string(), "Passwords".to_string()],
            record_count: Some(1000),
        }
    }

    #[test]
    fn test_size_bucket_thresholds() {
        assert_eq!(SizeBucket::from_employee_count(None), SizeBucket::Unknown);
        assert_eq!(SizeBucket::from_employee_count(Some(1)), SizeBucket::Micro);
        assert_eq!(SizeBucket::from_employee_count(Some(30)), SizeBucket::Micro);
        assert_eq!(SizeBucket::from_employee_count(Some(49)), SizeBucket::Micro);
        assert_eq!(SizeBucket::from_employee_count(Some(249)), SizeBucket::Small);
        assert_eq!(SizeBucket::from_employee_count(Some(999)), SizeBucket::Medium);
        assert_eq!(SizeBucket::from_employee_count(Some(4999)), SizeBucket::Large);
        assert_eq!(SizeBucket::from_employee_count(Some(50000)), SizeBucket::Enterprise);
    }

    #[test]
    fn test_size_bucket_boundary_counts_take_higher_bracket() {
        assert_eq!(SizeBucket::from_employee_count(Some(50)), SizeBucket::Small);
        assert_eq!(SizeBucket::from_employee_count(Some(250)), SizeBucket::Medium);
        assert_eq!(SizeBucket::from_employee_count(Some(1000)), SizeBucket::Large);
        assert_eq!(SizeBucket::from_employee_count(Some(5000)), SizeBucket::Enterprise);
    }

    #[test]
    fn test_size_bucket_labels() {
        assert_eq!(SizeBucket::Micro.as_str(), "1–49");
        assert_eq!(SizeBucket::Large.as_str(), "1,000–4,999");
        assert_eq!(SizeBucket::Unknown.as_str(), "N/A");
    }

    #[test]
    fn test_screen_threshold_excludes_micro_and_unknown() {
        assert!(SizeBucket::Micro.below_screen_threshold());
        assert!(SizeBucket::Unknown.below_screen_threshold());
        assert!(!SizeBucket::Small.below_screen_threshold());
        assert!(!SizeBucket::Enterprise.below_screen_threshold());
    }

    #[test]
    fn test_deduplicate_keeps_first_occurrence() {
        let incidents = vec![
            incident("Acme Breach", "acme.com"),
            incident("Acme Breach", "acme.com"),
            incident("Acme Breach", "acme.org"),
            incident("Other Breach", "other.com"),
        ];

        let deduped = deduplicate_incidents(incidents);
        assert_eq!(deduped.len(), 3);
        assert_eq!(deduped[0].organizations[0], "acme.com");
    }

    #[test]
    fn test_deduplicate_is_idempotent() {
        let incidents = vec![
            incident("Acme Breach", "acme.com"),
            incident("Acme Breach", "acme.com"),
            incident("Other Breach", "other.com"),
        ];

        let once = deduplicate_incidents(incidents);
        let twice = deduplicate_incidents(once.clone());
        assert_eq!(once.len(), twice.len());
        let titles: Vec<&str> = twice.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Acme Breach", "Other Breach"]);
    }

    #[test]
    fn test_primary_organization_takes_first_of_comma_list() {
        let mut inc = incident("Multi Org", "first.com, second.com");
        assert_eq!(inc.primary_organization(), Some("first.com"));

        inc.organizations = vec![];
        assert_eq!(inc.primary_organization(), None);

        inc.organizations = vec!["".to_string()];
        assert_eq!(inc.primary_organization(), None);
    }

    #[test]
    fn test_unavailable_profile_defaults() {
        let profile = OrganizationProfile::unavailable("acme.com");
        assert_eq!(profile.company_name, "Unknown");
        assert_eq!(profile.size_bucket, SizeBucket::Unknown);
        assert_eq!(profile.cdn, "None");
        assert_eq!(profile.waf, "None");
        assert_eq!(profile.country, "Unknown");
    }

    #[test]
    fn test_contact_sentinels_always_populated() {
        let contact = ContactProfile::not_found();
        assert_eq!(contact.name, NOT_FOUND);
        assert_eq!(contact.title, NOT_FOUND);
        assert_eq!(contact.phone, NOT_AVAILABLE);
        assert_eq!(contact.email, NOT_AVAILABLE);
        assert_eq!(contact.linkedin_url, NOT_AVAILABLE);
    }

    #[test]
    fn test_potential_target_record_markers() {
        let org = OrganizationProfile {
            domain: "peer.com".to_string(),
            company_name: "Peer Inc".to_string(),
            size_bucket: SizeBucket::Medium,
            cdn: "Cloudflare, Inc.".to_string(),
            waf: "Cloudflare".to_string(),
            country: "US-AMER".to_string(),
        };

        let record = EnrichedRecord::potential_target(&org, "Apollo");
        assert_eq!(record.kind, RecordKind::PotentialTarget);
        assert_eq!(record.date, "Similar Company");
        assert_eq!(record.breach_type, "Potential Target");
        assert_eq!(record.source, "Apollo");
        assert_eq!(record.contact_name, NOT_FOUND);
        assert_eq!(record.categories, vec!["potential_target".to_string()]);
        assert!(record.compromised_data.is_empty());
        assert_eq!(record.record_count, None);
    }

    #[test]
    fn test_breach_record_carries_incident_detail() {
        let inc = incident("Acme Breach", "acme.com");
        let org = OrganizationProfile::unavailable("acme.com");
        let record = EnrichedRecord::from_breach(&inc, &org, &ContactProfile::not_found());

        assert_eq!(record.categories, vec!["breach".to_string()]);
        assert_eq!(
            record.compromised_data,
            vec!["Email addresses".to_string(), "Passwords".to_string()]
        );
        assert_eq!(record.record_count, Some(1000));
    }
}
