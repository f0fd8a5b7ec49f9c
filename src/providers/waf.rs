//! WAF detection via an external fingerprinting tool.
//!
//! The boundary is "hostname in, vendor string out": the subprocess is an
//! implementation detail and nothing upstream may depend on more than the
//! rendered result. A missing tool or a failed run yields "None"; a run
//! that overshoots the hard timeout yields "Timeout".

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::WafConfig;
use crate::incident::NONE_DETECTED;

/// Sentinel for a detection run that exceeded the hard timeout
pub const TIMEOUT_SENTINEL: &str = "Timeout";

/// Vendor keywords scanned for in the tool's free-text output.
pub const WAF_VENDORS: &[&str] = &[
    "Cloudflare",
    "Akamai",
    "Fastly",
    "AWS",
    "Amazon",
    "Google",
    "Azure",
    "Imperva",
    "F5",
    "Radware",
    "Edgecast",
    "Sucuri",
    "Wordfence",
    "StackPath",
    "SiteLock",
    "Barracuda",
    "Fortinet",
    "DenyALL",
    "DDoS-GUARD",
];

pub struct WafDetector {
    binary_path: PathBuf,
    timeout: Duration,
}

impl WafDetector {
    pub fn new(binary_path: PathBuf, timeout: Duration) -> Self {
        Self {
            binary_path,
            timeout,
        }
    }

    pub fn from_config(config: &WafConfig) -> Self {
        Self::new(
            PathBuf::from(&config.binary),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn is_available(&self) -> bool {
        self.binary_path.exists() || which::which(&self.binary_path).is_ok()
    }

    /// Fingerprint one hostname. Total: every failure mode degrades to a
    /// sentinel instead of an error.
    pub async fn detect(&self, hostname: &str) -> String {
        if !self.is_available() {
            debug!(
                "WAF detector binary not found at {:?}, reporting none for {}",
                self.binary_path, hostname
            );
            return NONE_DETECTED.to_string();
        }

        debug!("Running WAF detection for {}", hostname);

        let mut child = match Command::new(&self.binary_path)
            .arg(hostname)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to spawn WAF detector for {}: {}", hostname, e);
                return NONE_DETECTED.to_string();
            }
        };

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                scan_for_vendors(&stdout)
            }
            Ok(Err(e)) => {
                warn!("WAF detector failed for {}: {}", hostname, e);
                NONE_DETECTED.to_string()
            }
            Err(_) => {
                warn!(
                    "WAF detection timed out for {} after {:?}",
                    hostname, self.timeout
                );
                TIMEOUT_SENTINEL.to_string()
            }
        }
    }
}

/// Scan free-text tool output against the vendor keyword list. Matches are
/// case-insensitive, deduplicated, sorted, and comma-joined.
pub fn scan_for_vendors(output: &str) -> String {
    let haystack = output.to_lowercase();
    let matches: BTreeSet<&str> = WAF_VENDORS
        .iter()
        .filter(|vendor| haystack.contains(&vendor.to_lowercase()))
        .copied()
        .collect();

    if matches.is_empty() {
        NONE_DETECTED.to_string()
    } else {
        matches.into_iter().collect::<Vec<_>>().join(", ")
    }
}
