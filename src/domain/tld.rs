//! Top-level-domain derivation.
//!
//! The "TLD" here is the last two dot-separated labels of a domain
//! (`gateway.icloud.com` → `icloud.com`), a heuristic approximation of
//! the registrable domain. Multi-part public suffixes are deliberately
//! not recognized: `foo.co.uk` yields `co.uk`. Aggregations group on
//! this value, so changing the heuristic would fragment historical
//! rollups.

use std::sync::OnceLock;

use regex::Regex;

/// Matches `(label).(tld)` at the end of the domain string.
const TLD_PATTERN: &str = r"^(?:.*\.)?(\w[\w-]*\.[a-zA-Z]{2,})$";

static TLD_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn tld_regex() -> Option<&'static Regex> {
    TLD_RE.get_or_init(|| Regex::new(TLD_PATTERN).ok()).as_ref()
}

/// Derives the top-level label pair from a domain, lowercased.
///
/// Inputs the pattern cannot match (bare labels like `localhost`, IP
/// addresses) are returned unchanged so they still group under their
/// own key. Empty input yields `None`.
#[must_use]
pub fn derive_tld(domain: &str) -> Option<String> {
    let domain = domain.trim();
    if domain.is_empty() {
        return None;
    }
    let Some(re) = tld_regex() else {
        return Some(domain.to_string());
    };
    match re.captures(domain).and_then(|caps| caps.get(1)) {
        Some(m) => Some(m.as_str().to_lowercase()),
        None => Some(domain.to_string()),
    }
}
