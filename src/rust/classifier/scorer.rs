use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use super::distance::{ConfidenceVector, DistanceVector};
use super::error::ClassifierError;

/// Persisted form of a scorer: its kind name and kind-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorerState {
    pub kind: String,
    pub params: serde_json::Value,
}

/// Maps a distance vector to a confidence vector on the same class axis.
///
/// Scorers are fitted once per training run on the distances from every stored
/// example to every class, paired with one-hot targets marking the example's
/// own class.
pub trait ConfidenceScorer: Send + Sync + Debug {
    /// Name recorded in [`ScorerState::kind`].
    fn kind(&self) -> &str;

    fn fit(&mut self, distances: &[DistanceVector], targets: &[Vec<f32>]) -> Result<(), ClassifierError>;

    fn predict(&self, distances: &[f32]) -> Result<ConfidenceVector, ClassifierError>;

    fn export_state(&self) -> ScorerState;

    fn import_state(&mut self, state: &ScorerState) -> Result<(), ClassifierError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct AnalyticParams {
    power: f32,
    background: f32,
    scale: f32,
    dimension: Option<usize>,
}

/// Closed-form scorer that needs no learning.
///
/// Every distance becomes `(1 / (1 + d / scale))^power`. A constant background
/// score is appended, the vector is L2-normalized and the background entry is
/// dropped again, so a phrase close to nothing gets low confidence everywhere.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticScorer {
    params: AnalyticParams,
}

impl Default for AnalyticScorer {
    fn default() -> Self {
        Self {
            params: AnalyticParams {
                power: 2.5,
                background: 0.1,
                scale: 1.0,
                dimension: None,
            },
        }
    }
}

impl AnalyticScorer {
    pub const KIND: &'static str = "analytic";

    /// # Errors
    /// - `ValidationError` unless `power` and `scale` are positive and `background` is non-negative
    pub fn new(power: f32, background: f32, scale: f32) -> Result<Self, ClassifierError> {
        let params = AnalyticParams {
            power,
            background,
            scale,
            dimension: None,
        };
        validate_params(&params)?;
        Ok(Self { params })
    }

    pub fn power(&self) -> f32 {
        self.params.power
    }

    pub fn background(&self) -> f32 {
        self.params.background
    }

    pub fn scale(&self) -> f32 {
        self.params.scale
    }

    /// Number of classes seen by `fit`, if fitted.
    pub fn dimension(&self) -> Option<usize> {
        self.params.dimension
    }

    fn score(&self, distance: f32) -> f32 {
        (1.0 / (1.0 + distance / self.params.scale)).powf(self.params.power)
    }
}

fn validate_params(params: &AnalyticParams) -> Result<(), ClassifierError> {
    if !(params.power > 0.0 && params.scale > 0.0 && params.background >= 0.0) {
        return Err(ClassifierError::ValidationError(format!(
            "Invalid analytic scorer parameters: power={}, background={}, scale={}",
            params.power, params.background, params.scale
        )));
    }
    Ok(())
}

fn validate_distances(distances: &[f32]) -> Result<(), ClassifierError> {
    if let Some(d) = distances.iter().find(|d| d.is_nan() || **d < 0.0) {
        return Err(ClassifierError::ValidationError(format!(
            "Distances must be non-negative, got {}",
            d
        )));
    }
    Ok(())
}

impl ConfidenceScorer for AnalyticScorer {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn fit(&mut self, distances: &[DistanceVector], targets: &[Vec<f32>]) -> Result<(), ClassifierError> {
        if distances.is_empty() || distances.len() != targets.len() {
            return Err(ClassifierError::ValidationError(format!(
                "Expected matching non-empty fit data, got {} distance rows and {} targets",
                distances.len(),
                targets.len()
            )));
        }
        let dimension = distances[0].len();
        for (row, target) in distances.iter().zip(targets) {
            if row.len() != dimension || target.len() != dimension {
                return Err(ClassifierError::ValidationError(format!(
                    "Fit rows must all have {} entries",
                    dimension
                )));
            }
            validate_distances(row)?;
            let ones = target.iter().filter(|&&t| t == 1.0).count();
            let zeros = target.iter().filter(|&&t| t == 0.0).count();
            if ones != 1 || ones + zeros != dimension {
                return Err(ClassifierError::ValidationError(
                    "Fit targets must be one-hot".into(),
                ));
            }
        }
        self.params.dimension = Some(dimension);
        Ok(())
    }

    fn predict(&self, distances: &[f32]) -> Result<ConfidenceVector, ClassifierError> {
        if let Some(dimension) = self.params.dimension {
            if distances.len() != dimension {
                return Err(ClassifierError::ValidationError(format!(
                    "Expected {} distances, got {}",
                    dimension,
                    distances.len()
                )));
            }
        }
        validate_distances(distances)?;

        let scores: Vec<f32> = distances.iter().map(|&d| self.score(d)).collect();
        let background = self.params.background;
        let norm = (scores.iter().map(|s| s * s).sum::<f32>() + background * background).sqrt();
        if norm == 0.0 {
            return Ok(vec![0.0; scores.len()]);
        }
        Ok(scores.into_iter().map(|s| s / norm).collect())
    }

    fn export_state(&self) -> ScorerState {
        ScorerState {
            kind: Self::KIND.to_string(),
            params: serde_json::json!({
                "power": self.params.power,
                "background": self.params.background,
                "scale": self.params.scale,
                "dimension": self.params.dimension,
            }),
        }
    }

    fn import_state(&mut self, state: &ScorerState) -> Result<(), ClassifierError> {
        if state.kind != Self::KIND {
            return Err(ClassifierError::ValidationError(format!(
                "Cannot import a {:?} scorer state into an analytic scorer",
                state.kind
            )));
        }
        let params: AnalyticParams = serde_json::from_value(state.params.clone())?;
        validate_params(&params)?;
        self.params = params;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let scorer = AnalyticScorer::default();
        assert_eq!(scorer.power(), 2.5);
        assert_eq!(scorer.background(), 0.1);
        assert_eq!(scorer.scale(), 1.0);
        assert_eq!(scorer.kind(), "analytic");
    }

    #[test]
    fn test_exact_match_dominates() {
        let scorer = AnalyticScorer::default();
        let confidences = scorer.predict(&[0.0, f32::INFINITY]).unwrap();
        assert!((confidences[0] - 1.0 / 1.01f32.sqrt()).abs() < 1e-6);
        assert_eq!(confidences[1], 0.0);
    }

    #[test]
    fn test_monotone_in_distance() {
        let scorer = AnalyticScorer::default();
        let confidences = scorer.predict(&[0.5, 0.7, 0.7, 3.0]).unwrap();
        assert!(confidences[0] > confidences[1]);
        assert_eq!(confidences[1], confidences[2]);
        assert!(confidences[2] > confidences[3]);
        assert!(confidences.iter().all(|c| (0.0..=1.0).contains(c)));
    }

    #[test]
    fn test_far_phrase_gets_low_confidence() {
        let scorer = AnalyticScorer::default();
        let confidences = scorer.predict(&[50.0, 60.0]).unwrap();
        assert!(confidences.iter().all(|&c| c < 0.01));
    }

    #[test]
    fn test_rejects_invalid_distances() {
        let scorer = AnalyticScorer::default();
        assert!(scorer.predict(&[f32::NAN]).is_err());
        assert!(scorer.predict(&[-1.0]).is_err());
    }

    #[test]
    fn test_fit_checks_shapes() {
        let mut scorer = AnalyticScorer::default();
        let distances = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        assert!(scorer.fit(&distances, &[vec![1.0, 0.0]]).is_err());
        assert!(scorer.fit(&distances, &[vec![1.0, 0.0], vec![0.5, 0.5]]).is_err());
        assert!(scorer.fit(&[], &[]).is_err());

        scorer.fit(&distances, &[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        assert_eq!(scorer.dimension(), Some(2));
        assert!(scorer.predict(&[0.0, 1.0, 2.0]).is_err());
        assert!(scorer.predict(&[0.0, 1.0]).is_ok());
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(AnalyticScorer::new(0.0, 0.1, 1.0).is_err());
        assert!(AnalyticScorer::new(2.0, -0.1, 1.0).is_err());
        assert!(AnalyticScorer::new(2.0, 0.1, 0.0).is_err());
        assert!(AnalyticScorer::new(2.0, 0.0, 0.5).is_ok());
    }

    #[test]
    fn test_state_round_trip() {
        let mut scorer = AnalyticScorer::new(3.0, 0.2, 0.7).unwrap();
        scorer.fit(&[vec![0.3, 0.0]], &[vec![0.0, 1.0]]).unwrap();
        let state = scorer.export_state();

        let mut restored = AnalyticScorer::default();
        restored.import_state(&state).unwrap();
        assert_eq!(restored, scorer);
        assert_eq!(restored.predict(&[0.4, 0.9]).unwrap(), scorer.predict(&[0.4, 0.9]).unwrap());
    }

    #[test]
    fn test_import_rejects_other_kind() {
        let state = ScorerState {
            kind: "logistic".into(),
            params: serde_json::json!({}),
        };
        assert!(AnalyticScorer::default().import_state(&state).is_err());
    }
}
