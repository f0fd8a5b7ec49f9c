//! Clients for the external enrichment providers.
//!
//! Every client passes the shared admission gate before a call and wraps
//! the call in a bounded retry loop. Failures come back as typed outcomes;
//! callers decide whether an unavailable provider degrades a record or
//! excludes a domain, and nothing here can crash the pipeline.

pub mod breach_list;
pub mod firmographics;
pub mod ip_intel;
pub mod waf;

pub use breach_list::BreachListClient;
pub use firmographics::{FirmographicsClient, OrgEnrichment, SimilarCompany};
pub use ip_intel::{IpIntelClient, NetworkIntel};
pub use waf::WafDetector;

/// Admission-gate service key for the firmographics/contact provider
pub const FIRMOGRAPHICS_SERVICE: &str = "firmographics";
/// Admission-gate service key for the breach-list provider
pub const BREACH_LIST_SERVICE: &str = "breach-list";

/// What one provider call produced for one unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutcome<T> {
    /// The provider answered with a usable payload
    Success(T),
    /// The provider has no data for this input, or rejected it as
    /// unprocessable. Permanent for this input; retrying is pointless.
    Miss,
    /// Retries exhausted or admission denied. The unit of work degrades to
    /// its documented defaults.
    Unavailable,
    /// Credentials rejected. Terminal for every call to this provider.
    Unauthorized,
}

impl<T> ProviderOutcome<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            ProviderOutcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ProviderOutcome::Unauthorized)
    }

    /// Split success from the non-success outcomes so the latter can be
    /// returned unchanged under a different payload type.
    pub fn try_unwrap<U>(self) -> Result<T, ProviderOutcome<U>> {
        match self {
            ProviderOutcome::Success(value) => Ok(value),
            ProviderOutcome::Miss => Err(ProviderOutcome::Miss),
            ProviderOutcome::Unavailable => Err(ProviderOutcome::Unavailable),
            ProviderOutcome::Unauthorized => Err(ProviderOutcome::Unauthorized),
        }
    }
}
