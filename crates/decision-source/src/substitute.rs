//! Placeholder substitution: `{{FIELD}}` tokens resolved from a listing.
//!
//! Resolution order: canonical field map first, then the record's free-form
//! data bag. Unresolved tokens are left literal by design — not an error —
//! but every substitution can report them so replay tooling surfaces the
//! misses.

use listflow_core_types::{ActionEnvelope, ListingRecord};
use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([A-Za-z][A-Za-z0-9_]*)\}\}").expect("static regex"));

/// Diagnostic counts for one substitution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubstitutionReport {
    pub resolved: u32,
    /// Token identifiers left literal, in order of first appearance.
    pub unresolved: Vec<String>,
}

impl SubstitutionReport {
    fn merge(&mut self, other: SubstitutionReport) {
        self.resolved += other.resolved;
        for token in other.unresolved {
            if !self.unresolved.contains(&token) {
                self.unresolved.push(token);
            }
        }
    }
}

/// Replace `{{FIELD}}` tokens in `text` with record values.
pub fn substitute(text: &str, record: &ListingRecord) -> String {
    substitute_with_report(text, record).0
}

/// Like [`substitute`], also reporting resolved/unresolved token counts.
pub fn substitute_with_report(text: &str, record: &ListingRecord) -> (String, SubstitutionReport) {
    let mut report = SubstitutionReport::default();
    let out = TOKEN_RE.replace_all(text, |caps: &regex::Captures<'_>| {
        let identifier = caps[1].to_lowercase();
        match record.lookup(&identifier) {
            Some(value) => {
                report.resolved += 1;
                value
            }
            None => {
                if !report.unresolved.contains(&identifier) {
                    report.unresolved.push(identifier);
                }
                // Silent pass-through: the literal token stays.
                caps[0].to_string()
            }
        }
    });
    (out.into_owned(), report)
}

/// Run every string-valued field of an action envelope through
/// substitution. Non-string fields pass through untouched.
pub fn substitute_envelope(
    envelope: &ActionEnvelope,
    record: &ListingRecord,
) -> (ActionEnvelope, SubstitutionReport) {
    let mut report = SubstitutionReport::default();
    let out = envelope.map_strings(|text| {
        let (replaced, partial) = substitute_with_report(text, record);
        report.merge(partial);
        replaced
    });
    (out, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> ListingRecord {
        ListingRecord {
            address: Some("123 Main St".into()),
            city: Some("Springfield".into()),
            price: Some(450_000.0),
            data: std::collections::HashMap::from([("agent".into(), json!("J. Rivera"))]),
            ..Default::default()
        }
    }

    #[test]
    fn canonical_tokens_resolve_case_insensitively() {
        let (out, report) = substitute_with_report("{{ADDRESS}}, {{city}}", &record());
        assert_eq!(out, "123 Main St, Springfield");
        assert_eq!(report.resolved, 2);
        assert!(report.unresolved.is_empty());
    }

    #[test]
    fn bag_is_the_fallback() {
        assert_eq!(substitute("by {{AGENT}}", &record()), "by J. Rivera");
    }

    #[test]
    fn unknown_token_left_literal() {
        let (out, report) = substitute_with_report("lot: {{LOTSIZE}}", &record());
        assert_eq!(out, "lot: {{LOTSIZE}}");
        assert_eq!(report.resolved, 0);
        assert_eq!(report.unresolved, vec!["lotsize".to_string()]);
    }

    #[test]
    fn substitution_is_deterministic() {
        let text = "{{ADDRESS}} {{unknown}} {{PRICE}}";
        let rec = record();
        assert_eq!(substitute(text, &rec), substitute(text, &rec));
        assert_eq!(substitute(text, &rec), "123 Main St {{unknown}} 450000");
    }

    #[test]
    fn envelope_substitution_touches_only_string_fields() {
        let mut env = ActionEnvelope::type_text("#addr", "{{ADDRESS}}");
        env.x = Some(9.0);
        env.url = Some("https://site/{{MLSNUMBER}}".into());

        let (out, report) = substitute_envelope(&env, &record());
        assert_eq!(out.text, Some(json!("123 Main St")));
        assert_eq!(out.url, Some("https://site/{{MLSNUMBER}}".into()));
        assert_eq!(out.x, Some(9.0));
        assert_eq!(report.resolved, 1);
        assert_eq!(report.unresolved, vec!["mlsnumber".to_string()]);
    }

    #[test]
    fn malformed_tokens_are_not_tokens() {
        assert_eq!(substitute("{{}} {{1bad}} {not}", &record()), "{{}} {{1bad}} {not}");
    }
}
