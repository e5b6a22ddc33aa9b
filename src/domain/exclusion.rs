//! Domain exclusion filter compiler.
//!
//! Turns a list of exact/wildcard domain patterns into one predicate
//! that every read path shares: the log listing, stats overview, top
//! domains, top TLDs, and device usage all filter through the same
//! compiled [`DomainExclusion`], both as SQL conditions and as the
//! in-memory [`matches`](DomainExclusion::matches) check.

use tracing::warn;

/// A compiled domain exclusion predicate.
///
/// `None` from [`compile`](Self::compile) means "exclude nothing";
/// callers must treat the absent filter that way rather than special-
/// casing an empty one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainExclusion {
    /// Lowercased exact domains, combined as `NOT IN (set)`.
    exact: Vec<String>,
    /// Lowercased wildcard patterns; a domain matching any of them is
    /// excluded.
    wildcards: Vec<String>,
}

impl DomainExclusion {
    /// Compiles a pattern list into a predicate.
    ///
    /// Blank entries are dropped. Patterns containing `*` are wildcards;
    /// the degenerate patterns `*`, `**` and `*.*` would exclude every
    /// domain and are dropped with a warning — almost certainly a
    /// configuration error, not an intent. Returns `None` when nothing
    /// survives.
    #[must_use]
    pub fn compile(patterns: &[String]) -> Option<Self> {
        let mut exact = Vec::new();
        let mut wildcards = Vec::new();

        for raw in patterns {
            let pattern = raw.trim();
            if pattern.is_empty() {
                continue;
            }
            if pattern.contains('*') {
                if is_degenerate(pattern) {
                    warn!(pattern, "dropping degenerate wildcard exclusion pattern");
                    continue;
                }
                wildcards.push(pattern.to_lowercase());
            } else {
                exact.push(pattern.to_lowercase());
            }
        }

        if exact.is_empty() && wildcards.is_empty() {
            None
        } else {
            Some(Self { exact, wildcards })
        }
    }

    /// Lowercased exact domains for the `NOT IN` condition.
    #[must_use]
    pub fn exact(&self) -> &[String] {
        &self.exact
    }

    /// Wildcard patterns translated to SQL `ILIKE` syntax (`*` → `%`,
    /// with `%`/`_`/`\` in the literal text escaped).
    #[must_use]
    pub fn like_patterns(&self) -> Vec<String> {
        self.wildcards.iter().map(|p| to_like_pattern(p)).collect()
    }

    /// Returns `true` when the domain is excluded by this predicate.
    ///
    /// Case-insensitive; mirrors the SQL conditions exactly so the two
    /// read paths cannot drift.
    #[must_use]
    pub fn matches(&self, domain: &str) -> bool {
        let domain = domain.to_lowercase();
        if self.exact.iter().any(|d| d == &domain) {
            return true;
        }
        self.wildcards.iter().any(|p| glob_match(p, &domain))
    }
}

/// Patterns that would match every domain.
fn is_degenerate(pattern: &str) -> bool {
    matches!(pattern, "*" | "**" | "*.*")
}

/// Translates a wildcard pattern to an `ILIKE` pattern.
fn to_like_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for ch in pattern.chars() {
        match ch {
            '*' => out.push('%'),
            '%' | '_' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            c => out.push(c),
        }
    }
    out
}

/// Glob match where `*` matches any run of characters. Both sides must
/// already be lowercased.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if pattern.get(p) == Some(&'*') {
            backtrack = Some((p, t));
            p += 1;
        } else if pattern.get(p) == text.get(t) {
            p += 1;
            t += 1;
        } else if let Some((star, mark)) = backtrack {
            backtrack = Some((star, mark + 1));
            p = star + 1;
            t = mark + 1;
        } else {
            return false;
        }
    }
    while pattern.get(p) == Some(&'*') {
        p += 1;
    }
    p == pattern.len()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn compile(patterns: &[&str]) -> Option<DomainExclusion> {
        let owned: Vec<String> = patterns.iter().map(ToString::to_string).collect();
        DomainExclusion::compile(&owned)
    }

    #[test]
    fn empty_and_blank_lists_compile_to_none() {
        assert_eq!(compile(&[]), None);
        assert_eq!(compile(&["", "   "]), None);
    }

    #[test]
    fn exact_and_wildcard_retained_set() {
        let Some(filter) = compile(&["*.apple.com", "*tracking*"]) else {
            panic!("expected a filter");
        };
        let domains = [
            "a.apple.com",
            "apple.com",
            "tracking.net",
            "x.tracking.net",
            "ads.com",
        ];
        let retained: Vec<&str> = domains
            .iter()
            .copied()
            .filter(|d| !filter.matches(d))
            .collect();
        assert_eq!(retained, vec!["apple.com", "ads.com"]);
    }

    #[test]
    fn degenerate_wildcards_exclude_nothing() {
        assert_eq!(compile(&["*"]), None);
        assert_eq!(compile(&["**"]), None);
        assert_eq!(compile(&["*.*"]), None);

        // The rest of the list still applies.
        let Some(filter) = compile(&["*", "ads.com"]) else {
            panic!("expected a filter");
        };
        assert!(filter.matches("ads.com"));
        assert!(!filter.matches("example.com"));
    }

    #[test]
    fn exact_match_is_case_insensitive() {
        let Some(filter) = compile(&["Ads.Example.COM"]) else {
            panic!("expected a filter");
        };
        assert!(filter.matches("ads.example.com"));
        assert!(filter.matches("ADS.EXAMPLE.COM"));
        assert!(!filter.matches("sub.ads.example.com"));
    }

    #[test]
    fn wildcard_match_is_case_insensitive() {
        let Some(filter) = compile(&["*.Apple.com"]) else {
            panic!("expected a filter");
        };
        assert!(filter.matches("GATEWAY.ICLOUD.APPLE.COM"));
        assert!(!filter.matches("apple.com"));
    }

    #[test]
    fn interior_and_multiple_stars() {
        let Some(filter) = compile(&["a*b*c"]) else {
            panic!("expected a filter");
        };
        assert!(filter.matches("abc"));
        assert!(filter.matches("axxbyyc"));
        assert!(!filter.matches("axxbyy"));
    }

    #[test]
    fn like_patterns_escape_sql_metacharacters() {
        let Some(filter) = compile(&["*.apple.com", "100%_deals.*"]) else {
            panic!("expected a filter");
        };
        assert_eq!(
            filter.like_patterns(),
            vec![
                "%.apple.com".to_string(),
                "100\\%\\_deals.%".to_string()
            ]
        );
    }
}
