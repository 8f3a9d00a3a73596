use crate::models::{AggregatedJudgment, JudgeRecord, JudgmentOrigin};
use crate::rubric::Rubric;
use anyhow::{Result, bail};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

/// Merge the records of two independent judges into one judgment.
///
/// Both failed: error carrying both diagnostics (the caller synthesizes the
/// zero-score result). One failed: the survivor is returned verbatim with
/// single-judge provenance. Both succeeded: per-criterion scores are averaged
/// and rationale/feedback text is fused with sentence-level deduplication.
/// The output always covers every rubric criterion, and both source records
/// are retained for audit.
pub fn aggregate(
    id_a: &str,
    record_a: JudgeRecord,
    id_b: &str,
    record_b: JudgeRecord,
    rubric: &Rubric,
) -> Result<AggregatedJudgment> {
    let mut source_judgments = BTreeMap::new();
    source_judgments.insert(id_a.to_string(), record_a.clone());
    source_judgments.insert(id_b.to_string(), record_b.clone());

    match (record_a, record_b) {
        (JudgeRecord::Failure { error: err_a }, JudgeRecord::Failure { error: err_b }) => {
            bail!("Both judges failed. {id_a}: {err_a}; {id_b}: {err_b}")
        }
        (JudgeRecord::Success { scores, rationales, feedback }, JudgeRecord::Failure { error }) => {
            info!(failed_judge = id_b, %error, "Falling back to single judge");
            Ok(AggregatedJudgment {
                scores,
                rationales,
                feedback,
                origin: JudgmentOrigin::Single(id_a.to_string()),
                source_judgments,
            })
        }
        (JudgeRecord::Failure { error }, JudgeRecord::Success { scores, rationales, feedback }) => {
            info!(failed_judge = id_a, %error, "Falling back to single judge");
            Ok(AggregatedJudgment {
                scores,
                rationales,
                feedback,
                origin: JudgmentOrigin::Single(id_b.to_string()),
                source_judgments,
            })
        }
        (
            JudgeRecord::Success {
                scores: scores_a,
                rationales: rationales_a,
                feedback: feedback_a,
            },
            JudgeRecord::Success {
                scores: scores_b,
                rationales: rationales_b,
                feedback: feedback_b,
            },
        ) => {
            let mut scores = HashMap::new();
            let mut rationales = HashMap::new();

            for criterion in &rubric.criteria {
                let name = &criterion.name;
                scores.insert(name.clone(), combine_scores(scores_a.get(name), scores_b.get(name)));
                rationales.insert(
                    name.clone(),
                    combine_rationales(rationales_a.get(name), rationales_b.get(name)),
                );
            }

            Ok(AggregatedJudgment {
                scores,
                rationales,
                feedback: fuse_text(&feedback_a, &feedback_b),
                origin: JudgmentOrigin::Consensus,
                source_judgments,
            })
        }
    }
}

/// Mean of the values present, rounded to 1 decimal place; 0.0 if neither
/// judge scored the criterion
fn combine_scores(a: Option<&f64>, b: Option<&f64>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => round1((a + b) / 2.0),
        (Some(only), None) | (None, Some(only)) => {
            debug!("Criterion scored by only one judge");
            round1(*only)
        }
        (None, None) => 0.0,
    }
}

fn combine_rationales(a: Option<&String>, b: Option<&String>) -> String {
    match (a, b) {
        (Some(a), Some(b)) => fuse_text(a, b),
        (Some(only), None) | (None, Some(only)) => only.clone(),
        (None, None) => "No rationale provided.".to_string(),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Combine two free-text blocks, dropping near-identical sentences.
///
/// Sentences are compared case- and punctuation-insensitively; the first
/// occurrence wins and original order is preserved, so the result is
/// deterministic for identical inputs and never drops a judge's distinct
/// observations wholesale.
pub fn fuse_text(a: &str, b: &str) -> String {
    let mut seen = HashSet::new();
    let mut fused: Vec<String> = Vec::new();

    for sentence in split_sentences(a).into_iter().chain(split_sentences(b)) {
        let key: String = sentence
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(|c| c.to_lowercase())
            .collect();
        if key.is_empty() || seen.insert(key) {
            fused.push(sentence);
        }
    }

    fused.join(" ")
}

/// Split text into trimmed sentence units at terminal punctuation and
/// line breaks
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        if ch == '\n' {
            push_trimmed(&mut sentences, &mut current);
            continue;
        }
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            push_trimmed(&mut sentences, &mut current);
        }
    }
    push_trimmed(&mut sentences, &mut current);

    sentences
}

fn push_trimmed(sentences: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    current.clear();
}
