//! Country-to-region classification for the publication filter.
//!
//! Table-driven over ISO alpha-2 codes. AMER is exactly {US, CA}; the rest
//! of the Americas classify as LATAM. Every input maps to exactly one
//! bucket, with unlisted codes falling back to Other.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Region {
    Amer,
    Latam,
    Emea,
    Apac,
    Other,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Amer => "AMER",
            Region::Latam => "LATAM",
            Region::Emea => "EMEA",
            Region::Apac => "APAC",
            Region::Other => "Other",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const AMER_COUNTRIES: &[&str] = &["US", "CA"];

// Americas outside US/CA, Caribbean territories included
const LATAM_COUNTRIES: &[&str] = &[
    "AI", "AG", "AR", "AW", "BS", "BB", "BZ", "BM", "BO", "BQ", "BR", "BV", "CL", "CO", "CR",
    "CU", "CW", "DM", "DO", "EC", "SV", "FK", "GL", "GD", "GP", "GT", "GY", "HT", "HN", "JM",
    "MQ", "MX", "MS", "NI", "PA", "PY", "PE", "PR", "BL", "KN", "LC", "MF", "PM", "VC", "SR",
    "SX", "TT", "TC", "UY", "VE", "VG", "VI", "GS",
];

const EMEA_COUNTRIES: &[&str] = &[
    // Europe
    "AX", "AL", "AD", "AT", "BY", "BE", "BA", "BG", "HR", "CZ", "DK", "EE", "FO", "FI", "FR",
    "DE", "GI", "GR", "GG", "HU", "IS", "IE", "IM", "IT", "JE", "LV", "LI", "LT", "LU", "MT",
    "MD", "MC", "ME", "NL", "MK", "NO", "PL", "PT", "RO", "RU", "SM", "RS", "SK", "SI", "ES",
    "SJ", "SE", "CH", "UA", "GB", "VA",
    // Middle East
    "BH", "CY", "GE", "IR", "IQ", "IL", "JO", "KW", "LB", "OM", "PS", "QA", "SA", "SY", "AE",
    "YE", "TR",
    // Africa
    "DZ", "AO", "BJ", "BW", "BF", "BI", "CV", "CM", "CF", "TD", "KM", "CG", "CD", "CI", "DJ",
    "EG", "GQ", "ER", "SZ", "ET", "GA", "GM", "GH", "GN", "GW", "KE", "LS", "LR", "LY", "MG",
    "MW", "ML", "MR", "MU", "YT", "MA", "MZ", "NA", "NE", "NG", "RE", "RW", "SH", "ST", "SN",
    "SC", "SL", "ZA", "SO", "SS", "SD", "TZ", "TG", "TN", "UG", "EH", "ZM", "ZW", "TF",
];

const APAC_COUNTRIES: &[&str] = &[
    // Asia, minus the Middle East codes classified EMEA above
    "AF", "AM", "AZ", "BD", "BT", "BN", "KH", "CN", "IN", "ID", "JP", "KZ", "KP", "KR", "KG",
    "LA", "MO", "MY", "MV", "MN", "MM", "NP", "PK", "PH", "SG", "LK", "TW", "TJ", "TH", "TL",
    "TM", "UZ", "VN",
    // Oceania
    "AS", "AU", "CX", "CC", "CK", "FJ", "PF", "GU", "HM", "KI", "MH", "FM", "NR", "NC", "NZ",
    "NU", "NF", "MP", "PW", "PG", "PN", "SB", "TK", "TO", "TV", "UM", "VU", "WF", "WS",
];

static REGION_BY_COUNTRY: Lazy<HashMap<&'static str, Region>> = Lazy::new(|| {
    let mut table = HashMap::new();
    for code in AMER_COUNTRIES {
        table.insert(*code, Region::Amer);
    }
    for code in LATAM_COUNTRIES {
        table.insert(*code, Region::Latam);
    }
    for code in EMEA_COUNTRIES {
        table.insert(*code, Region::Emea);
    }
    for code in APAC_COUNTRIES {
        table.insert(*code, Region::Apac);
    }
    table
});

/// Classify an ISO alpha-2 country code. Total over arbitrary input.
pub fn classify(country_code: &str) -> Region {
    let code = country_code.trim().to_ascii_uppercase();
    REGION_BY_COUNTRY
        .get(code.as_str())
        .copied()
        .unwrap_or(Region::Other)
}

/// Report-facing country rendering: "US-AMER" when the region is known,
/// the bare input otherwise (covers the "Unknown" geo sentinel too).
pub fn render_country(country_code: &str) -> String {
    match classify(country_code) {
        Region::Other => country_code.to_string(),
        region => format!("{}-{}", country_code, region),
    }
}
