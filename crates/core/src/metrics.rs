//! Scoring of generated targets against reference targets.
//!
//! Every metric sees both texts through [`DecodedTarget`], so malformed
//! generations lower scores instead of aborting an evaluation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::decode::DecodedTarget;

const BLEU_MAX_ORDER: usize = 4;

/// A (reference, prediction) row of an inference output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub target: String,
    pub prediction: String,
}

/// An accumulating metric over decoded (reference, prediction) pairs.
pub trait TodMetric {
    fn name(&self) -> &'static str;

    fn update(&mut self, reference: &DecodedTarget, prediction: &DecodedTarget);

    /// Current score in `[0, 1]`.
    fn compute(&self) -> f64;

    /// Named scores this metric contributes to a report.
    fn scores(&self) -> Vec<(String, f64)> {
        vec![(self.name().to_string(), self.compute())]
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Which list a GoalMetric scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalMetricKind {
    Belief,
    Action,
}

/// Average per-item recall and joint (exact set) accuracy of beliefs or actions.
#[derive(Debug, Clone)]
pub struct GoalMetric {
    kind: GoalMetricKind,
    matched_items: usize,
    total_items: usize,
    joint_hits: usize,
    turns: usize,
}

impl GoalMetric {
    pub fn new(kind: GoalMetricKind) -> Self {
        Self {
            kind,
            matched_items: 0,
            total_items: 0,
            joint_hits: 0,
            turns: 0,
        }
    }

    pub fn joint_accuracy(&self) -> f64 {
        ratio(self.joint_hits, self.turns)
    }

    fn score_items<T: Eq + std::hash::Hash>(&mut self, reference: &[T], prediction: &[T]) {
        let predicted: HashSet<&T> = prediction.iter().collect();
        let expected: HashSet<&T> = reference.iter().collect();
        self.matched_items += reference.iter().filter(|item| predicted.contains(item)).count();
        self.total_items += reference.len();
        if predicted == expected {
            self.joint_hits += 1;
        }
        self.turns += 1;
    }
}

impl TodMetric for GoalMetric {
    fn name(&self) -> &'static str {
        match self.kind {
            GoalMetricKind::Belief => "goal_accuracy",
            GoalMetricKind::Action => "action_accuracy",
        }
    }

    fn update(&mut self, reference: &DecodedTarget, prediction: &DecodedTarget) {
        match self.kind {
            GoalMetricKind::Belief => self.score_items(&reference.beliefs, &prediction.beliefs),
            GoalMetricKind::Action => self.score_items(&reference.actions, &prediction.actions),
        }
    }

    fn compute(&self) -> f64 {
        ratio(self.matched_items, self.total_items)
    }

    fn scores(&self) -> Vec<(String, f64)> {
        vec![
            (self.name().to_string(), self.compute()),
            (format!("{}_joint", self.name()), self.joint_accuracy()),
        ]
    }
}

/// Exact-match accuracy of the active intent, over turns that have one.
#[derive(Debug, Clone, Default)]
pub struct IntentAccuracyMetric {
    hits: usize,
    turns: usize,
}

impl TodMetric for IntentAccuracyMetric {
    fn name(&self) -> &'static str {
        "intent_accuracy"
    }

    fn update(&mut self, reference: &DecodedTarget, prediction: &DecodedTarget) {
        let Some(expected) = &reference.active_intent else {
            return;
        };
        self.turns += 1;
        if prediction.active_intent.as_ref() == Some(expected) {
            self.hits += 1;
        }
    }

    fn compute(&self) -> f64 {
        ratio(self.hits, self.turns)
    }
}

/// Micro-averaged F1 of requested slots.
#[derive(Debug, Clone, Default)]
pub struct RequestedSlotsMetric {
    true_positives: usize,
    false_positives: usize,
    false_negatives: usize,
}

impl TodMetric for RequestedSlotsMetric {
    fn name(&self) -> &'static str {
        "requested_slots"
    }

    fn update(&mut self, reference: &DecodedTarget, prediction: &DecodedTarget) {
        let expected: HashSet<_> = reference.requested_slots.iter().collect();
        let predicted: HashSet<_> = prediction.requested_slots.iter().collect();
        let hits = expected.intersection(&predicted).count();
        self.true_positives += hits;
        self.false_positives += predicted.len() - hits;
        self.false_negatives += expected.len() - hits;
    }

    fn compute(&self) -> f64 {
        let precision = ratio(self.true_positives, self.true_positives + self.false_positives);
        let recall = ratio(self.true_positives, self.true_positives + self.false_negatives);
        if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        }
    }
}

/// Share of turns whose reference inform acts are all predicted.
#[derive(Debug, Clone, Default)]
pub struct InformMetric {
    hits: usize,
    turns: usize,
}

impl TodMetric for InformMetric {
    fn name(&self) -> &'static str {
        "inform"
    }

    fn update(&mut self, reference: &DecodedTarget, prediction: &DecodedTarget) {
        let informs: Vec<_> = reference.actions.iter().filter(|a| a.is_inform()).collect();
        if informs.is_empty() {
            return;
        }
        self.turns += 1;
        if informs.iter().all(|a| prediction.actions.contains(a)) {
            self.hits += 1;
        }
    }

    fn compute(&self) -> f64 {
        ratio(self.hits, self.turns)
    }
}

/// Share of turns where every requested slot is answered by a predicted inform act.
#[derive(Debug, Clone, Default)]
pub struct SuccessMetric {
    hits: usize,
    turns: usize,
}

impl TodMetric for SuccessMetric {
    fn name(&self) -> &'static str {
        "success"
    }

    fn update(&mut self, reference: &DecodedTarget, prediction: &DecodedTarget) {
        if reference.requested_slots.is_empty() {
            return;
        }
        self.turns += 1;
        let answered = reference.requested_slots.iter().all(|requested| {
            prediction.actions.iter().any(|action| {
                action.is_inform()
                    && action.domain == requested.domain
                    && action.slot_name == requested.slot_name
            })
        });
        if answered {
            self.hits += 1;
        }
    }

    fn compute(&self) -> f64 {
        ratio(self.hits, self.turns)
    }
}

/// Corpus-level BLEU-4 of responses, with brevity penalty and no smoothing.
#[derive(Debug, Clone, Default)]
pub struct ResponseBleuMetric {
    matches: [usize; BLEU_MAX_ORDER],
    possible: [usize; BLEU_MAX_ORDER],
    reference_length: usize,
    prediction_length: usize,
}

fn ngram_counts<'a>(tokens: &'a [&'a str], n: usize) -> HashMap<&'a [&'a str], usize> {
    let mut counts = HashMap::new();
    for window in tokens.windows(n) {
        *counts.entry(window).or_insert(0) += 1;
    }
    counts
}

impl TodMetric for ResponseBleuMetric {
    fn name(&self) -> &'static str {
        "response_bleu"
    }

    fn update(&mut self, reference: &DecodedTarget, prediction: &DecodedTarget) {
        let Some(expected) = reference.response.as_deref().filter(|r| !r.trim().is_empty()) else {
            return;
        };
        let expected = expected.to_lowercase();
        let predicted = prediction.response.as_deref().unwrap_or("").to_lowercase();
        let ref_tokens: Vec<&str> = expected.split_whitespace().collect();
        let pred_tokens: Vec<&str> = predicted.split_whitespace().collect();

        self.reference_length += ref_tokens.len();
        self.prediction_length += pred_tokens.len();
        for n in 1..=BLEU_MAX_ORDER {
            let ref_counts = ngram_counts(&ref_tokens, n);
            let pred_counts = ngram_counts(&pred_tokens, n);
            self.matches[n - 1] += pred_counts
                .iter()
                .map(|(gram, count)| (*count).min(ref_counts.get(gram).copied().unwrap_or(0)))
                .sum::<usize>();
            self.possible[n - 1] += pred_tokens.len().saturating_sub(n - 1);
        }
    }

    fn compute(&self) -> f64 {
        if self.prediction_length == 0 {
            return 0.0;
        }
        let mut log_precision = 0.0;
        for (matches, possible) in self.matches.iter().zip(self.possible.iter()) {
            if *matches == 0 || *possible == 0 {
                return 0.0;
            }
            log_precision += (*matches as f64 / *possible as f64).ln();
        }
        let geometric_mean = (log_precision / BLEU_MAX_ORDER as f64).exp();
        let brevity_penalty = if self.prediction_length > self.reference_length {
            1.0
        } else {
            (1.0 - self.reference_length as f64 / self.prediction_length as f64).exp()
        };
        geometric_mean * brevity_penalty
    }
}

/// `0.5 * (inform + success) + bleu`.
pub fn combined_score(inform: f64, success: f64, bleu: f64) -> f64 {
    0.5 * (inform + success) + bleu
}

/// Scores by name, plus the number of pairs seen.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricReport {
    pub turns: usize,
    pub scores: BTreeMap<String, f64>,
}

impl MetricReport {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.scores.get(name).copied()
    }
}

impl fmt::Display for MetricReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "turns: {}", self.turns)?;
        for (name, score) in &self.scores {
            writeln!(f, "{}: {:.4}", name, score)?;
        }
        Ok(())
    }
}

/// A named set of metrics fed from the same batches.
pub struct MetricCollection {
    metrics: Vec<Box<dyn TodMetric>>,
    turns: usize,
}

impl Default for MetricCollection {
    fn default() -> Self {
        Self::new(vec![
            Box::new(GoalMetric::new(GoalMetricKind::Belief)),
            Box::new(GoalMetric::new(GoalMetricKind::Action)),
            Box::new(IntentAccuracyMetric::default()),
            Box::new(RequestedSlotsMetric::default()),
            Box::new(InformMetric::default()),
            Box::new(SuccessMetric::default()),
            Box::new(ResponseBleuMetric::default()),
        ])
    }
}

impl MetricCollection {
    pub fn new(metrics: Vec<Box<dyn TodMetric>>) -> Self {
        Self { metrics, turns: 0 }
    }

    pub fn add(&mut self, reference: &str, prediction: &str) {
        let reference = DecodedTarget::parse(reference);
        let prediction = DecodedTarget::parse(prediction);
        for metric in &mut self.metrics {
            metric.update(&reference, &prediction);
        }
        self.turns += 1;
    }

    pub fn add_batch<R, P>(&mut self, references: &[R], predictions: &[P])
    where
        R: AsRef<str>,
        P: AsRef<str>,
    {
        if references.len() != predictions.len() {
            warn!(
                "Batch has {} references but {} predictions; scoring the first {}",
                references.len(),
                predictions.len(),
                references.len().min(predictions.len())
            );
        }
        for (reference, prediction) in references.iter().zip(predictions) {
            self.add(reference.as_ref(), prediction.as_ref());
        }
    }

    /// Collect every score. `combined` is added when inform, success and
    /// response BLEU are all present.
    pub fn report(&self) -> MetricReport {
        let mut scores: BTreeMap<String, f64> = self
            .metrics
            .iter()
            .flat_map(|metric| metric.scores())
            .collect();
        if let (Some(inform), Some(success), Some(bleu)) = (
            scores.get("inform").copied(),
            scores.get("success").copied(),
            scores.get("response_bleu").copied(),
        ) {
            scores.insert("combined".to_string(), combined_score(inform, success, bleu));
        }
        MetricReport {
            turns: self.turns,
            scores,
        }
    }
}

/// Score a whole predictions file with the default metrics.
pub fn evaluate_predictions(rows: &[PredictionRow]) -> MetricReport {
    let mut collection = MetricCollection::default();
    for row in rows {
        collection.add(&row.target, &row.prediction);
    }
    collection.report()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Target;
    use crate::values::{Action, Belief, RequestedSlot};

    fn reference() -> String {
        Target {
            beliefs: vec![
                Belief::new("Hotels", "location", "Boston"),
                Belief::new("Hotels", "stars", "4"),
            ],
            actions: vec![
                Action::with_values("Hotels", "REQUEST", ""),
                Action::with_slot("Hotels", "INFORM", "phone_number"),
            ],
            response: Some("their phone number is 555 1234".to_string()),
            active_intent: Some("SearchHotel".to_string()),
            requested_slots: Some(vec![RequestedSlot::new("Hotels", "phone_number")]),
        }
        .encode()
    }

    #[test]
    fn test_perfect_prediction() {
        let text = reference();
        let report = evaluate_predictions(&[PredictionRow {
            target: text.clone(),
            prediction: text,
        }]);
        assert_eq!(report.turns, 1);
        for name in [
            "goal_accuracy",
            "goal_accuracy_joint",
            "action_accuracy",
            "intent_accuracy",
            "requested_slots",
            "inform",
            "success",
            "response_bleu",
        ] {
            let score = report.get(name).unwrap();
            assert!((score - 1.0).abs() < 1e-9, "{} = {}", name, score);
        }
        assert!((report.get("combined").unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_garbage_prediction_scores_zero() {
        let report = evaluate_predictions(&[PredictionRow {
            target: reference(),
            prediction: "<|beginbelief|>Hotels location Boston<|endbelief|>".to_string(),
        }]);
        assert_eq!(report.get("goal_accuracy"), Some(0.0));
        assert_eq!(report.get("inform"), Some(0.0));
        assert_eq!(report.get("success"), Some(0.0));
        assert_eq!(report.get("response_bleu"), Some(0.0));
        assert_eq!(report.get("combined"), Some(0.0));
    }

    #[test]
    fn test_partial_beliefs() {
        let prediction = Target::new(
            vec![Belief::new("Hotels", "location", "Boston")],
            Vec::new(),
            None,
        )
        .encode();
        let mut collection = MetricCollection::new(vec![Box::new(GoalMetric::new(
            GoalMetricKind::Belief,
        ))]);
        collection.add_batch(&[reference()], &[prediction]);
        let report = collection.report();
        assert!((report.get("goal_accuracy").unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(report.get("goal_accuracy_joint"), Some(0.0));
        assert_eq!(report.get("combined"), None);
    }

    #[test]
    fn test_bleu_brevity_penalty() {
        let mut bleu = ResponseBleuMetric::default();
        let reference = DecodedTarget {
            response: Some("a b c d e f g h".to_string()),
            ..Default::default()
        };
        let prediction = DecodedTarget {
            response: Some("a b c d".to_string()),
            ..Default::default()
        };
        bleu.update(&reference, &prediction);
        let expected = (1.0f64 - 8.0 / 4.0).exp();
        assert!((bleu.compute() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_turns_without_informs_are_not_counted() {
        let mut inform = InformMetric::default();
        inform.update(&DecodedTarget::default(), &DecodedTarget::default());
        assert_eq!(inform.compute(), 0.0);
        assert_eq!(inform.turns, 0);
    }
}
