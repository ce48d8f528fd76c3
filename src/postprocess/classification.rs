use crate::errors::{IdentError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub label: String,
    pub score: f32,
}

/// Turns the classifier's confidence vector into the top `result_count`
/// categories.
///
/// Confidences below `threshold` are zeroed rather than dropped, so the result
/// still holds `result_count` entries when enough labels exist. Sorting is
/// stable: equal scores keep label order.
pub fn rank_categories(
    scores: &[f32],
    labels: &[String],
    threshold: f32,
    result_count: usize,
) -> Result<Vec<Category>> {
    if scores.len() != labels.len() {
        return Err(IdentError::invalid_shape(format!(
            "classifier produced {} scores for {} labels",
            scores.len(),
            labels.len()
        )));
    }

    let mut categories = labels
        .iter()
        .zip(scores)
        .map(|(label, &score)| Category {
            label: label.clone(),
            score: if score < threshold { 0.0 } else { score },
        })
        .collect::<Vec<_>>();

    categories.sort_by(|a, b| b.score.total_cmp(&a.score));
    categories.truncate(result_count);
    Ok(categories)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_threshold_sort_truncate() -> Result<()> {
        let result = rank_categories(&[0.1, 0.5, 0.05], &labels(&["A", "B", "C"]), 0.3, 2)?;
        assert_eq!(
            result,
            vec![
                Category {
                    label: "B".to_string(),
                    score: 0.5
                },
                Category {
                    label: "A".to_string(),
                    score: 0.0
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn test_ties_keep_label_order() -> Result<()> {
        let result = rank_categories(
            &[0.4, 0.9, 0.4, 0.9],
            &labels(&["w", "x", "y", "z"]),
            0.0,
            4,
        )?;
        let order: Vec<_> = result.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(order, ["x", "z", "w", "y"]);
        Ok(())
    }

    #[test]
    fn test_score_at_threshold_is_kept() -> Result<()> {
        let result = rank_categories(&[0.3], &labels(&["only"]), 0.3, 3)?;
        assert_eq!(result[0].score, 0.3);
        assert_eq!(result.len(), 1);
        Ok(())
    }

    #[test]
    fn test_length_mismatch() {
        let result = rank_categories(&[0.1, 0.2], &labels(&["a"]), 0.3, 1);
        assert!(matches!(result, Err(IdentError::InvalidTensorShape { .. })));
    }

    #[test]
    fn test_empty_input() -> Result<()> {
        assert!(rank_categories(&[], &[], 0.3, 3)?.is_empty());
        Ok(())
    }
}
