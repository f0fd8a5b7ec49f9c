// Allow dead code for public API functions that may not be used internally
// but are part of the library's exposed interface
#![allow(dead_code)]

pub mod cli;
pub mod config;
pub mod dns;
pub mod domain_utils;
pub mod export;
pub mod incident;
pub mod pipeline;
pub mod providers;
pub mod rate_limit;
pub mod region;
pub mod watermark;

pub use incident::{ContactProfile, EnrichedRecord, OrganizationProfile, RawIncident, SizeBucket};
pub use pipeline::{Orchestrator, RunReport, StageCounts};
