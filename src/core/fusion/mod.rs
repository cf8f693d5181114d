//! # Decision Fusion
//!
//! Combines the two classifier outputs into one verdict.
//!
//! ## How It Works
//! 1. Read each score vector as `(real, fake)` - the ViT output through a
//!    softmax, the residual output as raw scores by default
//! 2. A model flags the image when its fake score beats its real score
//! 3. The image is AI-generated if **either** model flags it
//!
//! The OR rule trades precision for recall: a single suspicious model is
//! enough to flag an image.

use super::inference::{ModelId, ScoreVector};
use serde::{Deserialize, Serialize};

/// Numerically stable softmax: subtracts the max before exponentiating
pub fn softmax(values: &[f32]) -> Vec<f32> {
    if values.is_empty() {
        return Vec::new();
    }
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f64> = values.iter().map(|&v| ((v - max) as f64).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|&e| (e / sum) as f32).collect()
}

/// How a model's score vector is read before comparing real vs fake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreInterpretation {
    /// Compare the raw scores as returned
    Raw,
    /// Compare softmax probabilities
    Softmax,
}

impl ScoreInterpretation {
    fn apply(&self, scores: &ScoreVector) -> (f32, f32) {
        match self {
            ScoreInterpretation::Raw => (scores.real(), scores.fake()),
            ScoreInterpretation::Softmax => {
                let p = softmax(scores.as_slice());
                (p[0], p[1])
            }
        }
    }
}

/// Fusion settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Reading applied to the ViT scores
    pub normalized_scores: ScoreInterpretation,
    /// Reading applied to the residual scores.
    ///
    /// Defaults to `Raw`, matching how the residual model has always been
    /// read; `Softmax` makes both paths symmetric.
    pub residual_scores: ScoreInterpretation,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            normalized_scores: ScoreInterpretation::Softmax,
            residual_scores: ScoreInterpretation::Raw,
        }
    }
}

impl FusionConfig {
    /// Read both models through a softmax
    pub fn symmetric() -> Self {
        Self {
            normalized_scores: ScoreInterpretation::Softmax,
            residual_scores: ScoreInterpretation::Softmax,
        }
    }
}

/// Final class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Real,
    Fake,
}

impl Label {
    /// Text shown to end users
    pub fn display_text(&self) -> &'static str {
        match self {
            Label::Real => "실제 (Real)",
            Label::Fake => "AI 생성 (Fake)",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Real => write!(f, "Real"),
            Label::Fake => write!(f, "Fake"),
        }
    }
}

/// The answer handed back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_ai: bool,
    pub label: Label,
}

impl Verdict {
    pub fn from_is_ai(is_ai: bool) -> Self {
        Self {
            is_ai,
            label: if is_ai { Label::Fake } else { Label::Real },
        }
    }

    pub fn label_text(&self) -> &'static str {
        self.label.display_text()
    }
}

/// One model's contribution to the verdict
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelVote {
    pub model: ModelId,
    pub interpretation: ScoreInterpretation,
    /// Real score after interpretation
    pub real: f32,
    /// Fake score after interpretation
    pub fake: f32,
    pub is_fake: bool,
}

impl ModelVote {
    pub fn cast(model: ModelId, scores: &ScoreVector, interpretation: ScoreInterpretation) -> Self {
        let (real, fake) = interpretation.apply(scores);
        Self {
            model,
            interpretation,
            real,
            fake,
            is_fake: fake > real,
        }
    }
}

/// Detailed result of fusing both models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionOutcome {
    pub verdict: Verdict,
    pub normalized: ModelVote,
    pub residual: ModelVote,
    /// Number of models flagging fake (0-2)
    pub fake_votes: u8,
    /// Strongest supporting probability in [0, 1]: the largest softmax fake
    /// probability among flagging models when fake, otherwise the largest
    /// softmax real probability. Always read through softmax, whatever the
    /// interpretation used for voting, so both models share one scale.
    pub confidence: f32,
}

/// Apply the OR rule to two individual decisions
pub fn fuse_flags(is_fake_normalized: bool, is_fake_residual: bool) -> Verdict {
    Verdict::from_is_ai(is_fake_normalized || is_fake_residual)
}

/// Fuse the ViT scores and the residual scores
pub fn fuse(
    normalized_scores: &ScoreVector,
    residual_scores: &ScoreVector,
    config: &FusionConfig,
) -> FusionOutcome {
    let normalized = ModelVote::cast(ModelId::NormalizedRgb, normalized_scores, config.normalized_scores);
    let residual = ModelVote::cast(ModelId::ResidualGray, residual_scores, config.residual_scores);

    let verdict = fuse_flags(normalized.is_fake, residual.is_fake);
    let fake_votes = normalized.is_fake as u8 + residual.is_fake as u8;

    let probabilities = [
        (normalized.is_fake, ScoreInterpretation::Softmax.apply(normalized_scores)),
        (residual.is_fake, ScoreInterpretation::Softmax.apply(residual_scores)),
    ];
    let confidence = if verdict.is_ai {
        probabilities
            .iter()
            .filter(|(is_fake, _)| *is_fake)
            .map(|(_, (_, fake))| *fake)
            .fold(0.0, f32::max)
    } else {
        probabilities
            .iter()
            .map(|(_, (real, _))| *real)
            .fold(0.0, f32::max)
    };

    FusionOutcome {
        verdict,
        normalized,
        residual,
        fake_votes,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(model: ModelId, real: f32, fake: f32) -> ScoreVector {
        ScoreVector::new(model, vec![real, fake]).unwrap()
    }

    #[test]
    fn softmax_sums_to_one() {
        for input in [
            vec![2.0, 0.0],
            vec![-3.0, 5.0, 0.5],
            vec![100.0, 100.0],
            vec![-1000.0, 1000.0],
            vec![0.0],
        ] {
            let p = softmax(&input);
            let sum: f32 = p.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6, "{:?} -> {:?}", input, p);
            assert!(p.iter().all(|&v| (0.0..=1.0).contains(&v)));
        }
    }

    #[test]
    fn softmax_is_shift_invariant() {
        let base = softmax(&[0.3, -1.2, 2.5]);
        let shifted = softmax(&[10.3, 8.8, 12.5]);
        for (a, b) in base.iter().zip(&shifted) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn softmax_known_value() {
        let p = softmax(&[2.0, 0.0]);
        assert!((p[0] - 0.8808).abs() < 1e-3);
        assert!((p[1] - 0.1192).abs() < 1e-3);
    }

    #[test]
    fn softmax_of_empty_is_empty() {
        assert!(softmax(&[]).is_empty());
    }

    #[test]
    fn or_rule_truth_table() {
        assert_eq!(fuse_flags(false, false).label, Label::Real);
        assert_eq!(fuse_flags(true, false).label, Label::Fake);
        assert_eq!(fuse_flags(false, true).label, Label::Fake);
        assert_eq!(fuse_flags(true, true).label, Label::Fake);
        assert!(!fuse_flags(false, false).is_ai);
        assert!(fuse_flags(false, true).is_ai);
    }

    #[test]
    fn fuse_covers_all_four_combinations() {
        let config = FusionConfig::default();
        let cases = [
            ((2.0, 0.0), (1.0, 0.0), false, 0),
            ((0.0, 2.0), (1.0, 0.0), true, 1),
            ((2.0, 0.0), (0.0, 1.0), true, 1),
            ((0.0, 2.0), (0.0, 1.0), true, 2),
        ];

        for ((a_real, a_fake), (b_real, b_fake), expected, votes) in cases {
            let outcome = fuse(
                &scores(ModelId::NormalizedRgb, a_real, a_fake),
                &scores(ModelId::ResidualGray, b_real, b_fake),
                &config,
            );
            assert_eq!(outcome.verdict.is_ai, expected);
            assert_eq!(outcome.fake_votes, votes);
        }
    }

    #[test]
    fn vit_scores_read_through_softmax() {
        let outcome = fuse(
            &scores(ModelId::NormalizedRgb, 2.0, 0.0),
            &scores(ModelId::ResidualGray, 5.0, -5.0),
            &FusionConfig::default(),
        );

        assert!(!outcome.normalized.is_fake);
        assert!((outcome.normalized.real - 0.8808).abs() < 1e-3);
        assert_eq!(outcome.verdict, Verdict::from_is_ai(false));
    }

    #[test]
    fn residual_scores_stay_raw_by_default() {
        let outcome = fuse(
            &scores(ModelId::NormalizedRgb, 1.0, 0.0),
            &scores(ModelId::ResidualGray, -3.0, 4.0),
            &FusionConfig::default(),
        );

        assert_eq!(outcome.residual.interpretation, ScoreInterpretation::Raw);
        assert_eq!(outcome.residual.fake, 4.0);
        assert!(outcome.verdict.is_ai);
        // softmax([-3, 4])[1]
        assert!((outcome.confidence - 0.99909).abs() < 1e-4);
    }

    #[test]
    fn symmetric_config_softmaxes_residual() {
        let outcome = fuse(
            &scores(ModelId::NormalizedRgb, 1.0, 0.0),
            &scores(ModelId::ResidualGray, -3.0, 4.0),
            &FusionConfig::symmetric(),
        );

        assert!((outcome.residual.real + outcome.residual.fake - 1.0).abs() < 1e-6);
        assert!(outcome.residual.is_fake);
    }

    #[test]
    fn confidence_for_real_is_best_real_score() {
        let outcome = fuse(
            &scores(ModelId::NormalizedRgb, 0.0, -10.0),
            &scores(ModelId::ResidualGray, 0.7, 0.2),
            &FusionConfig::default(),
        );

        assert!(!outcome.verdict.is_ai);
        assert!((outcome.confidence - 1.0).abs() < 1e-3);
    }

    #[test]
    fn confidence_stays_a_probability_for_raw_logits() {
        let outcome = fuse(
            &scores(ModelId::NormalizedRgb, 0.9, 0.1),
            &scores(ModelId::ResidualGray, 5.0, -5.0),
            &FusionConfig::default(),
        );

        assert!(!outcome.verdict.is_ai);
        assert_eq!(outcome.residual.real, 5.0);
        assert!(outcome.confidence <= 1.0);
        // softmax([5, -5])[0]
        assert!((outcome.confidence - 0.99995).abs() < 1e-4);
    }

    #[test]
    fn tie_is_not_fake() {
        let outcome = fuse(
            &scores(ModelId::NormalizedRgb, 0.5, 0.5),
            &scores(ModelId::ResidualGray, 0.5, 0.5),
            &FusionConfig::default(),
        );
        assert!(!outcome.verdict.is_ai);
    }

    #[test]
    fn label_text() {
        assert_eq!(Verdict::from_is_ai(true).label_text(), "AI 생성 (Fake)");
        assert_eq!(Verdict::from_is_ai(false).label_text(), "실제 (Real)");
    }
}
