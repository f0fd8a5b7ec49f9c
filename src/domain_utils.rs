/// Canonicalize a free-text organization reference into a bare host:
/// scheme prefix stripped, truncated at the first path separator,
/// lowercased. Idempotent.
pub fn normalize_domain(raw: &str) -> String {
    let mut host = raw.trim();

    loop {
        if let Some(rest) = host.strip_prefix("https://") {
            host = rest;
        } else if let Some(rest) = host.strip_prefix("http://") {
            host = rest;
        } else {
            break;
        }
    }

    host.split('/').next().unwrap_or("").trim().to_lowercase()
}

/// Syntactic sanity check applied before spending a DNS lookup on a
/// candidate. DNS resolution remains the authoritative validity test.
pub fn is_well_formed(domain: &str) -> bool {
    // Must contain at least one dot
    if !domain.contains('.') {
        return false;
    }

    // Must not contain protocols or paths
    if domain.contains("://") || domain.contains('/') {
        return false;
    }

    // Must not start or end with dot or hyphen
    if domain.starts_with('.') || domain.ends_with('.')
        || domain.starts_with('-') || domain.ends_with('-') {
        return false;
    }

    // Must not contain consecutive dots
    if domain.contains("..") {
        return false;
    }

    domain.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}
