use crate::models::ProjectResult;
use crate::rubric::Rubric;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::warn;

/// Compute the rubric-weighted total for one project's per-criterion scores.
///
/// The total is a weighted mean expressed on the rubric's native scale
/// (e.g. 1-10), rounded to 2 decimal places. A criterion with no score
/// contributes 0. When all weights are 0 the result falls back to the plain
/// mean of the scores that are present, or 0.0 when there are none.
/// Pure function: identical inputs always yield the identical total.
pub fn weighted_total(scores: &HashMap<String, f64>, rubric: &Rubric) -> f64 {
    let total_weight = rubric.total_weight();

    if total_weight == 0 {
        warn!("Rubric weights sum to zero; falling back to unweighted mean");
        return unweighted_mean(scores, rubric);
    }

    let mut weighted_sum = 0.0;
    for criterion in &rubric.criteria {
        let score = match scores.get(&criterion.name) {
            Some(score) if score.is_finite() => *score,
            Some(_) => {
                warn!(criterion = %criterion.name, "Non-finite score treated as 0");
                0.0
            }
            None => 0.0,
        };
        weighted_sum += score * criterion.weight as f64;
    }

    round2(weighted_sum / total_weight as f64)
}

fn unweighted_mean(scores: &HashMap<String, f64>, rubric: &Rubric) -> f64 {
    let present: Vec<f64> = rubric
        .criteria
        .iter()
        .filter_map(|c| scores.get(&c.name))
        .copied()
        .filter(|s| s.is_finite())
        .collect();

    if present.is_empty() {
        return 0.0;
    }

    round2(present.iter().sum::<f64>() / present.len() as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sort a batch of finalized results by total score, highest first.
///
/// The sort is stable: results with equal totals keep their original
/// processing order. A NaN total sorts last rather than panicking.
pub fn rank(results: &mut [ProjectResult]) {
    results.sort_by(|a, b| compare_totals(b.total_score, a.total_score));
}

fn compare_totals(a: f64, b: f64) -> Ordering {
    match a.partial_cmp(&b) {
        Some(ordering) => ordering,
        // NaN on either side: push NaN below any real score
        None => {
            if a.is_nan() && b.is_nan() {
                Ordering::Equal
            } else if a.is_nan() {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
    }
}
