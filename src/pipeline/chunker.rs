//! Partition blocking feedback into bounded, severity-ordered revision chunks.

use indexmap::IndexMap;

use super::types::{ReviewFeedbackItem, RevisionChunk};

struct CaseGroup {
    case_id: String,
    items: Vec<ReviewFeedbackItem>,
    max_rank: u8,
}

/// Split `feedback` into revision chunks.
///
/// Up to `soft_limit` distinct cases go out as one chunk. Beyond that the
/// fewest chunks of at most `hard_limit` cases are used, filled evenly in
/// severity order. Feedback without a case id is copied into every chunk.
pub fn chunk_feedback(
    feedback: &[ReviewFeedbackItem],
    soft_limit: usize,
    hard_limit: usize,
) -> Vec<RevisionChunk> {
    let hard = hard_limit.max(1);
    let soft = soft_limit.clamp(1, hard);

    let mut groups: IndexMap<&str, CaseGroup> = IndexMap::new();
    let mut general = Vec::new();

    for item in feedback {
        match item.case_id.as_deref() {
            Some(case_id) => {
                let group = groups.entry(case_id).or_insert_with(|| CaseGroup {
                    case_id: case_id.to_string(),
                    items: Vec::new(),
                    max_rank: 0,
                });
                group.max_rank = group.max_rank.max(item.severity.rank());
                group.items.push(item.clone());
            }
            None => general.push(item.clone()),
        }
    }

    if groups.is_empty() {
        return Vec::new();
    }

    let mut groups: Vec<CaseGroup> = groups.into_values().collect();
    groups.sort_by(|a, b| {
        b.max_rank
            .cmp(&a.max_rank)
            .then_with(|| b.items.len().cmp(&a.items.len()))
    });

    let total = groups.len();
    let target = if total <= soft {
        total
    } else {
        let chunk_count = total.div_ceil(hard);
        total.div_ceil(chunk_count).max(soft).min(hard)
    };

    let mut chunks = Vec::new();
    let mut current = RevisionChunk {
        feedback: Vec::new(),
        case_ids: Vec::new(),
    };

    for group in groups {
        if current.case_ids.len() >= target {
            chunks.push(std::mem::replace(
                &mut current,
                RevisionChunk {
                    feedback: Vec::new(),
                    case_ids: Vec::new(),
                },
            ));
        }
        current.case_ids.push(group.case_id);
        current.feedback.extend(group.items);
    }
    chunks.push(current);

    for chunk in &mut chunks {
        chunk.feedback.extend(general.iter().cloned());
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::Severity;
    use std::collections::HashSet;

    fn item(case_id: Option<&str>, severity: Severity) -> ReviewFeedbackItem {
        ReviewFeedbackItem {
            case_id: case_id.map(str::to_string),
            issue_type: "coverage".to_string(),
            severity,
            summary: "needs work".to_string(),
            suggestion: "fix it".to_string(),
        }
    }

    #[test]
    fn test_empty_feedback_yields_no_chunks() {
        assert!(chunk_feedback(&[], 12, 16).is_empty());
        assert!(chunk_feedback(&[item(None, Severity::Critical)], 12, 16).is_empty());
    }

    #[test]
    fn test_within_soft_limit_single_chunk() {
        let feedback: Vec<_> = (1..=12)
            .map(|i| item(Some(&format!("TC-{}", i)), Severity::Major))
            .collect();
        let chunks = chunk_feedback(&feedback, 12, 16);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].case_ids.len(), 12);
        assert_eq!(chunks[0].feedback.len(), 12);
    }

    #[test]
    fn test_twenty_five_critical_cases_split_in_two() {
        let feedback: Vec<_> = (1..=25)
            .map(|i| item(Some(&format!("TC-{}", i)), Severity::Critical))
            .collect();
        let chunks = chunk_feedback(&feedback, 12, 16);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].case_ids.len(), 13);
        assert_eq!(chunks[1].case_ids.len(), 12);

        let mut seen = HashSet::new();
        for chunk in &chunks {
            assert!(chunk.case_ids.len() <= 16);
            for id in &chunk.case_ids {
                assert!(seen.insert(id.clone()), "{} appears twice", id);
            }
        }
        assert_eq!(seen.len(), 25);
    }

    #[test]
    fn test_never_exceeds_hard_limit() {
        let feedback: Vec<_> = (1..=50)
            .map(|i| item(Some(&format!("TC-{}", i)), Severity::Major))
            .collect();
        let chunks = chunk_feedback(&feedback, 12, 16);
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.case_ids.len() <= 16));
        let total: usize = chunks.iter().map(|c| c.case_ids.len()).sum();
        assert_eq!(total, 50);
    }

    #[test]
    fn test_orders_by_severity_then_feedback_count() {
        let feedback = vec![
            item(Some("A"), Severity::Major),
            item(Some("B"), Severity::Major),
            item(Some("B"), Severity::Minor),
            item(Some("C"), Severity::Critical),
            item(Some("D"), Severity::Minor),
        ];
        let chunks = chunk_feedback(&feedback, 1, 2);
        let order: Vec<&str> = chunks
            .iter()
            .flat_map(|c| c.case_ids.iter().map(String::as_str))
            .collect();
        assert_eq!(order, vec!["C", "B", "A", "D"]);
        assert!(chunks.iter().all(|c| c.case_ids.len() <= 2));
    }

    #[test]
    fn test_general_feedback_in_every_chunk() {
        let mut feedback: Vec<_> = (1..=5)
            .map(|i| item(Some(&format!("TC-{}", i)), Severity::Critical))
            .collect();
        feedback.push(item(None, Severity::Major));
        let chunks = chunk_feedback(&feedback, 2, 2);
        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert_eq!(
                chunk.feedback.iter().filter(|f| f.case_id.is_none()).count(),
                1
            );
        }
    }

    #[test]
    fn test_case_feedback_travels_with_its_case() {
        let feedback = vec![
            item(Some("A"), Severity::Major),
            item(Some("B"), Severity::Critical),
            item(Some("A"), Severity::Critical),
        ];
        let chunks = chunk_feedback(&feedback, 1, 1);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].case_ids, vec!["A".to_string()]);
        assert_eq!(chunks[0].feedback.len(), 2);
        assert_eq!(chunks[1].case_ids, vec!["B".to_string()]);
    }
}
