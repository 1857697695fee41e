//! Merging of scored results coming from several query branches.

use std::collections::HashMap;

use crate::models::ScoredResult;

/// Keeps the best-scoring result per product and orders them by score, descending.
///
/// A later duplicate only replaces the kept entry when its score is strictly
/// higher, and the sort is stable, so the first occurrence wins exact ties.
pub fn deduplicate_and_rank(results: Vec<ScoredResult>) -> Vec<ScoredResult> {
    let mut merged: Vec<ScoredResult> = Vec::with_capacity(results.len());
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(results.len());

    for result in results {
        match positions.get(&result.product_id) {
            Some(&index) => {
                if result.score > merged[index].score {
                    merged[index] = result;
                }
            }
            None => {
                positions.insert(result.product_id.clone(), merged.len());
                merged.push(result);
            }
        }
    }

    merged.sort_by(|a, b| b.score.total_cmp(&a.score));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn scored(id: &str, score: f64) -> ScoredResult {
        ScoredResult {
            product_id: id.to_string(),
            score,
            metadata: serde_json::json!({ "source": format!("{id}-{score}") }),
        }
    }

    fn ids_and_scores(results: &[ScoredResult]) -> Vec<(&str, f64)> {
        results
            .iter()
            .map(|r| (r.product_id.as_str(), r.score))
            .collect()
    }

    #[test]
    fn test_keeps_max_score_per_product() {
        let merged = deduplicate_and_rank(vec![
            scored("a", 80.0),
            scored("b", 90.0),
            scored("a", 95.0),
        ]);

        assert_eq!(ids_and_scores(&merged), vec![("a", 95.0), ("b", 90.0)]);
    }

    #[test]
    fn test_first_occurrence_wins_ties() {
        let first = scored("a", 70.0);
        let mut second = scored("a", 70.0);
        second.metadata = serde_json::json!({ "source": "text" });

        let merged = deduplicate_and_rank(vec![first.clone(), second]);
        assert_eq!(merged, vec![first]);
    }

    #[test]
    fn test_equal_scores_keep_input_order() {
        let merged = deduplicate_and_rank(vec![
            scored("x", 50.0),
            scored("y", 60.0),
            scored("z", 50.0),
        ]);

        assert_eq!(
            ids_and_scores(&merged),
            vec![("y", 60.0), ("x", 50.0), ("z", 50.0)]
        );
    }

    #[test]
    fn test_single_branch_passes_through() {
        let input = vec![scored("a", 99.1), scored("b", 87.5), scored("c", 12.0)];
        assert_eq!(deduplicate_and_rank(input.clone()), input);
    }

    #[test]
    fn test_empty_input() {
        assert!(deduplicate_and_rank(Vec::new()).is_empty());
    }

    #[test]
    fn test_merge_properties() {
        let inputs = vec![
            vec![scored("a", 1.0), scored("a", 2.0), scored("a", 3.0)],
            vec![scored("p", 40.0), scored("q", 40.0), scored("p", 10.0), scored("r", 99.9)],
            vec![
                scored("m", 0.0),
                scored("n", 100.0),
                scored("m", 55.5),
                scored("n", 20.0),
                scored("o", 55.5),
            ],
        ];

        for input in inputs {
            let merged = deduplicate_and_rank(input.clone());

            let distinct: HashSet<&str> = input.iter().map(|r| r.product_id.as_str()).collect();
            assert_eq!(merged.len(), distinct.len());

            for result in &merged {
                let max = input
                    .iter()
                    .filter(|r| r.product_id == result.product_id)
                    .map(|r| r.score)
                    .fold(f64::MIN, f64::max);
                assert_eq!(result.score, max);
            }

            assert!(merged.windows(2).all(|w| w[0].score >= w[1].score));

            assert_eq!(deduplicate_and_rank(merged.clone()), merged);
        }
    }
}
