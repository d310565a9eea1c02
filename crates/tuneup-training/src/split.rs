//! Episode-grouped train/validation split.

use crate::error::{TrainingError, TrainingResult};
use crate::gemini::ConvertedExample;
use crate::record::EpisodeId;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub train: Vec<ConvertedExample>,
    pub validation: Vec<ConvertedExample>,
    pub train_episodes: usize,
    pub validation_episodes: usize,
}

impl DatasetSplit {
    /// Validation share by example count.
    ///
    /// Episodes differ in size, so this drifts from the requested fraction.
    #[must_use]
    pub fn realized_validation_fraction(&self) -> f64 {
        let total = self.train.len() + self.validation.len();
        if total == 0 {
            return 0.0;
        }
        self.validation.len() as f64 / total as f64
    }
}

/// Split examples so that no episode appears on both sides.
///
/// Episodes are shuffled deterministically from `seed`; the first
/// `floor(n * (1 - val_fraction))` go to training.
pub fn split_by_episode(
    examples: Vec<ConvertedExample>,
    val_fraction: f64,
    seed: u64,
) -> TrainingResult<DatasetSplit> {
    if !val_fraction.is_finite() || val_fraction <= 0.0 || val_fraction >= 1.0 {
        return Err(TrainingError::Split(format!(
            "validation fraction must be in (0, 1), got {val_fraction}"
        )));
    }

    let mut episodes: Vec<EpisodeId> = {
        let mut seen = HashSet::new();
        examples
            .iter()
            .filter(|ex| seen.insert(&ex.episode_id))
            .map(|ex| ex.episode_id.clone())
            .collect()
    };

    let n = episodes.len();
    if n < 2 {
        return Err(TrainingError::Split(format!(
            "need at least 2 distinct episodes to split, found {n}"
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    episodes.shuffle(&mut rng);

    let train_count = (n as f64 * (1.0 - val_fraction)).floor() as usize;
    if train_count == 0 {
        return Err(TrainingError::Split(format!(
            "validation fraction {val_fraction} leaves no training episodes out of {n}"
        )));
    }
    if train_count >= n {
        return Err(TrainingError::Split(format!(
            "validation fraction {val_fraction} leaves no validation episodes out of {n}"
        )));
    }

    let train_set: HashSet<EpisodeId> = episodes.drain(..train_count).collect();
    let (train, validation): (Vec<_>, Vec<_>) =
        examples.into_iter().partition(|ex| train_set.contains(&ex.episode_id));

    Ok(DatasetSplit {
        train,
        validation,
        train_episodes: train_set.len(),
        validation_episodes: episodes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::{Content, GeminiRole, Part};

    fn example(episode: &str, text: &str) -> ConvertedExample {
        ConvertedExample {
            turns: vec![Content { role: GeminiRole::Model, parts: vec![Part::text(text)] }],
            system_instruction: None,
            episode_id: EpisodeId::new(episode),
        }
    }

    fn corpus() -> Vec<ConvertedExample> {
        let mut out = Vec::new();
        for ep in 0..10 {
            for i in 0..=(ep % 3) {
                out.push(example(&format!("ep-{ep}"), &format!("{ep}-{i}")));
            }
        }
        out
    }

    #[test]
    fn test_episodes_never_straddle_the_split() {
        for seed in 0..50 {
            let split = split_by_episode(corpus(), 0.3, seed).unwrap();
            let train: HashSet<_> = split.train.iter().map(|e| e.episode_id.clone()).collect();
            let val: HashSet<_> = split.validation.iter().map(|e| e.episode_id.clone()).collect();
            assert!(train.is_disjoint(&val), "seed {seed} leaked an episode");
            assert_eq!(split.train.len() + split.validation.len(), corpus().len());
        }
    }

    #[test]
    fn test_episode_counts_follow_floor_rule() {
        let split = split_by_episode(corpus(), 0.25, 7).unwrap();
        assert_eq!(split.train_episodes, 7);
        assert_eq!(split.validation_episodes, 3);
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let a = split_by_episode(corpus(), 0.2, 42).unwrap();
        let b = split_by_episode(corpus(), 0.2, 42).unwrap();
        assert_eq!(a.train, b.train);
        assert_eq!(a.validation, b.validation);
    }

    #[test]
    fn test_single_episode_is_rejected() {
        let examples = vec![example("only", "a"), example("only", "b")];
        let err = split_by_episode(examples, 0.2, 1).unwrap_err();
        assert!(matches!(err, TrainingError::Split(_)));
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(split_by_episode(Vec::new(), 0.5, 1).is_err());
    }

    #[test]
    fn test_fraction_outside_open_interval_is_rejected() {
        for fraction in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            assert!(split_by_episode(corpus(), fraction, 1).is_err(), "{fraction} accepted");
        }
    }

    #[test]
    fn test_fraction_leaving_no_training_episodes_is_rejected() {
        let examples = vec![example("a", "1"), example("b", "2")];
        assert!(split_by_episode(examples, 0.9, 3).is_err());
    }

    #[test]
    fn test_fraction_leaving_no_validation_episodes_is_rejected() {
        let err = split_by_episode(corpus(), 1e-17, 3).unwrap_err();
        assert!(matches!(err, TrainingError::Split(msg) if msg.contains("no validation episodes")));
    }

    #[test]
    fn test_realized_fraction_is_by_example_count() {
        let examples = vec![
            example("big", "1"),
            example("big", "2"),
            example("big", "3"),
            example("small", "4"),
        ];
        let split = split_by_episode(examples, 0.5, 11).unwrap();
        let expected = split.validation.len() as f64 / 4.0;
        assert!((split.realized_validation_fraction() - expected).abs() < f64::EPSILON);
        assert!(split.validation.len() == 1 || split.validation.len() == 3);
    }
}
