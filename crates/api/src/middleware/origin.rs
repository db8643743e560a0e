//! Origin allow-list.
//!
//! Entries without `*` are matched exactly (case-sensitive). Entries with
//! `*` are compiled once into anchored, case-insensitive regexes where `*`
//! matches any substring and everything else is literal.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};

use super::admission::{AdmissionCheck, Denial, RequestMeta, Verdict};

/// Decides whether a request's `Origin` header is acceptable.
#[derive(Debug, Clone)]
pub struct OriginFilter {
    exact: HashSet<String>,
    patterns: Vec<Regex>,
}

impl OriginFilter {
    /// Build the filter from allow-list entries.
    ///
    /// Blank entries are ignored and duplicates collapse.
    ///
    /// # Errors
    ///
    /// Returns `regex::Error` if a wildcard pattern compiles to an oversized
    /// regex.
    pub fn new<S: AsRef<str>>(entries: &[S]) -> Result<Self, regex::Error> {
        let mut exact = HashSet::new();
        let mut seen_patterns = HashSet::new();
        let mut patterns = Vec::new();

        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            if entry.contains('*') {
                if seen_patterns.insert(entry.to_string()) {
                    patterns.push(compile_wildcard(entry)?);
                }
            } else {
                exact.insert(entry.to_string());
            }
        }

        Ok(Self { exact, patterns })
    }

    /// Whether `origin` may make requests.
    ///
    /// An absent or empty origin (curl, server-to-server, same-origin
    /// navigation) is always allowed. Anything that is not visible ASCII
    /// never matches.
    #[must_use]
    pub fn is_allowed(&self, origin: Option<&str>) -> bool {
        let Some(origin) = origin.filter(|o| !o.is_empty()) else {
            return true;
        };

        if !origin.bytes().all(|b| b.is_ascii_graphic()) {
            return false;
        }

        self.exact.contains(origin) || self.patterns.iter().any(|p| p.is_match(origin))
    }
}

fn compile_wildcard(pattern: &str) -> Result<Regex, regex::Error> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");

    RegexBuilder::new(&format!("^{body}$"))
        .case_insensitive(true)
        .build()
}

impl AdmissionCheck for OriginFilter {
    fn name(&self) -> &'static str {
        "origin"
    }

    fn check(&self, meta: &RequestMeta) -> Verdict {
        if self.is_allowed(meta.origin.as_deref()) {
            Verdict::Allow
        } else {
            Verdict::Deny(Denial::OriginRejected {
                origin: meta.origin.clone().unwrap_or_default(),
            })
        }
    }
}
