//! Voting ensemble combining heterogeneous classifiers

use crate::error::ModelError;
use crate::models::classifier::{argmax, Classifier, CLASS_COUNT};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How member outputs are combined
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Voting {
    /// Majority vote over predicted labels; no probabilities
    #[default]
    Hard,
    /// Argmax of the averaged member probabilities
    Soft,
}

impl fmt::Display for Voting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Voting::Hard => f.write_str("hard"),
            Voting::Soft => f.write_str("soft"),
        }
    }
}

/// Named member classifiers combined under a voting rule
pub struct VotingClassifier {
    members: Vec<(String, Box<dyn Classifier>)>,
    voting: Voting,
}

impl VotingClassifier {
    pub fn new(voting: Voting) -> Self {
        Self {
            members: Vec::new(),
            voting,
        }
    }

    /// Add a fitted member classifier
    pub fn with_member(mut self, name: &str, classifier: Box<dyn Classifier>) -> Self {
        self.members.push((name.to_string(), classifier));
        self
    }

    pub fn voting(&self) -> Voting {
        self.voting
    }

    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Fraction of members voting for each class
    pub fn vote_shares(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        if self.members.is_empty() {
            return Err(ModelError::Runtime("ensemble has no members".into()));
        }
        let mut votes = vec![0.0; CLASS_COUNT];
        for (_, member) in &self.members {
            votes[usize::from(member.predict_class(features)?)] += 1.0;
        }
        let total = self.members.len() as f64;
        Ok(votes.into_iter().map(|v| v / total).collect())
    }

    fn averaged_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        if self.members.is_empty() {
            return Err(ModelError::Runtime("ensemble has no members".into()));
        }
        let mut probs = vec![0.0; CLASS_COUNT];
        for (_, member) in &self.members {
            for (acc, p) in probs.iter_mut().zip(member.predict_proba(features)?) {
                *acc += p;
            }
        }
        let total = self.members.len() as f64;
        Ok(probs.into_iter().map(|p| p / total).collect())
    }
}

impl Classifier for VotingClassifier {
    fn name(&self) -> &str {
        "voting_ensemble"
    }

    fn n_features(&self) -> usize {
        self.members
            .first()
            .map(|(_, m)| m.n_features())
            .unwrap_or(0)
    }

    fn predict_class(&self, features: &[f64]) -> Result<u8, ModelError> {
        let scores = match self.voting {
            Voting::Hard => self.vote_shares(features)?,
            Voting::Soft => self.averaged_proba(features)?,
        };
        Ok(argmax(&scores) as u8)
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        match self.voting {
            Voting::Hard => Err(ModelError::ProbabilityUnavailable(
                "hard voting ensemble".into(),
            )),
            Voting::Soft => self.averaged_proba(features),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Member returning fixed probabilities
    struct Fixed(Vec<f64>);

    impl Classifier for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn n_features(&self) -> usize {
            1
        }

        fn predict_class(&self, _features: &[f64]) -> Result<u8, ModelError> {
            Ok(argmax(&self.0) as u8)
        }

        fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>, ModelError> {
            Ok(self.0.clone())
        }
    }

    fn ensemble(voting: Voting) -> VotingClassifier {
        VotingClassifier::new(voting)
            .with_member("a", Box::new(Fixed(vec![0.4, 0.6])))
            .with_member("b", Box::new(Fixed(vec![0.45, 0.55])))
            .with_member("c", Box::new(Fixed(vec![0.95, 0.05])))
    }

    #[test]
    fn test_hard_voting_follows_majority() {
        let model = ensemble(Voting::Hard);
        assert_eq!(model.predict_class(&[0.0]).unwrap(), 1);

        let shares = model.vote_shares(&[0.0]).unwrap();
        assert!((shares[1] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_hard_voting_has_no_probabilities() {
        let model = ensemble(Voting::Hard);
        assert!(matches!(
            model.predict_proba(&[0.0]),
            Err(ModelError::ProbabilityUnavailable(_))
        ));
    }

    #[test]
    fn test_soft_voting_averages_probabilities() {
        let model = ensemble(Voting::Soft);
        let probs = model.predict_proba(&[0.0]).unwrap();
        assert!((probs[0] - 0.6).abs() < 1e-12);
        assert!((probs[1] - 0.4).abs() < 1e-12);
        // soft voting can disagree with the majority
        assert_eq!(model.predict_class(&[0.0]).unwrap(), 0);
    }

    #[test]
    fn test_ensemble_exposes_no_importances() {
        assert!(ensemble(Voting::Hard).feature_importances().is_none());
    }

    #[test]
    fn test_empty_ensemble_errors() {
        let model = VotingClassifier::new(Voting::Hard);
        assert!(model.predict_class(&[0.0]).is_err());
    }
}
