//! Merging per-chunk structured results into one document-level result.
//!
//! Deterministic and order-preserving: list fields are concatenated in
//! chunk order with no de-duplication (an entity repeated across a chunk
//! boundary shows up twice — a known, accepted limitation); scalar text
//! fields keep the longest non-empty value seen.

use crate::StructuredResult;

/// Merge per-chunk results in chunk order.
///
/// An empty slice returns [`StructuredResult::undetermined`] rather than
/// failing — callers never need to special-case "no chunk survived".
pub fn merge_results(results: &[StructuredResult]) -> StructuredResult {
    if results.is_empty() {
        return StructuredResult::undetermined();
    }
    if results.len() == 1 {
        return results[0].clone();
    }

    let mut merged = StructuredResult::default();

    for r in results {
        merged.policy_type = longest_of(merged.policy_type.take(), r.policy_type.clone());
        merged.insurer = longest_of(merged.insurer.take(), r.insurer.clone());
        merged.policy_number = longest_of(merged.policy_number.take(), r.policy_number.clone());
        merged.effective_dates =
            longest_of(merged.effective_dates.take(), r.effective_dates.clone());
        merged.explanation = longest_of(merged.explanation.take(), r.explanation.clone());

        merged.coverages.extend(r.coverages.iter().cloned());
        merged.exclusions.extend(r.exclusions.iter().cloned());
        merged.contacts.extend(r.contacts.iter().cloned());
        merged.warnings.extend(r.warnings.iter().cloned());

        // A merged document is only as trustworthy as its weakest chunk.
        merged.confidence = match (merged.confidence, r.confidence) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
    }

    merged
}

/// Keep the longer non-empty of two optional strings; earlier chunks win ties.
fn longest_of(a: Option<String>, b: Option<String>) -> Option<String> {
    let a = a.filter(|s| !s.trim().is_empty());
    let b = b.filter(|s| !s.trim().is_empty());
    match (a, b) {
        (Some(a), Some(b)) => {
            if b.chars().count() > a.chars().count() {
                Some(b)
            } else {
                Some(a)
            }
        }
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Coverage;

    fn result_with(coverages: &[&str], exclusions: &[&str]) -> StructuredResult {
        StructuredResult {
            coverages: coverages
                .iter()
                .map(|n| Coverage {
                    name: n.to_string(),
                    ..Default::default()
                })
                .collect(),
            exclusions: exclusions.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_input_returns_undetermined_default() {
        let merged = merge_results(&[]);
        assert_eq!(merged, StructuredResult::undetermined());
    }

    #[test]
    fn single_result_passes_through() {
        let r = result_with(&["fire"], &["flood"]);
        assert_eq!(merge_results(std::slice::from_ref(&r)), r);
    }

    #[test]
    fn lists_concatenate_in_chunk_order_without_dedup() {
        let a = result_with(&["fire", "theft"], &["war"]);
        let b = result_with(&["theft", "liability"], &["war", "nuclear"]);
        let merged = merge_results(&[a, b]);

        let names: Vec<&str> = merged.coverages.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["fire", "theft", "theft", "liability"]);
        assert_eq!(merged.exclusions, vec!["war", "war", "nuclear"]);
    }

    #[test]
    fn scalar_fields_keep_longest_non_empty() {
        let a = StructuredResult {
            policy_type: Some("auto".into()),
            explanation: Some("short".into()),
            ..Default::default()
        };
        let b = StructuredResult {
            policy_type: Some("".into()),
            explanation: Some("a considerably longer explanation".into()),
            ..Default::default()
        };
        let merged = merge_results(&[a, b]);
        assert_eq!(merged.policy_type.as_deref(), Some("auto"));
        assert_eq!(
            merged.explanation.as_deref(),
            Some("a considerably longer explanation")
        );
    }

    #[test]
    fn earlier_chunk_wins_scalar_ties() {
        let a = StructuredResult {
            insurer: Some("Acme Mutual".into()),
            ..Default::default()
        };
        let b = StructuredResult {
            insurer: Some("Zeta Mutual".into()),
            ..Default::default()
        };
        let merged = merge_results(&[a, b]);
        assert_eq!(merged.insurer.as_deref(), Some("Acme Mutual"));
    }

    #[test]
    fn confidence_takes_minimum_present_value() {
        let a = StructuredResult {
            confidence: Some(0.9),
            ..Default::default()
        };
        let b = StructuredResult {
            confidence: Some(0.4),
            ..Default::default()
        };
        let c = StructuredResult::default();
        let merged = merge_results(&[a, b, c]);
        assert_eq!(merged.confidence, Some(0.4));
    }

    #[test]
    fn warnings_accumulate() {
        let a = StructuredResult {
            warnings: vec!["w1".into()],
            ..Default::default()
        };
        let b = StructuredResult {
            warnings: vec!["w2".into()],
            ..Default::default()
        };
        assert_eq!(merge_results(&[a, b]).warnings, vec!["w1", "w2"]);
    }
}
