//! Mask strength levels: which model candidate becomes the committed mask.

use serde::{Deserialize, Serialize};

/// Strength selector for ranked mask candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskStrength {
    /// Highest-confidence candidate.
    #[default]
    Auto,
    Weakest,
    Medium,
    Strongest,
}

impl MaskStrength {
    pub fn all() -> &'static [MaskStrength] {
        &[
            MaskStrength::Auto,
            MaskStrength::Weakest,
            MaskStrength::Medium,
            MaskStrength::Strongest,
        ]
    }

    /// Numeric level (0 = auto, 1..=3 = fixed rank).
    pub fn value(self) -> usize {
        match self {
            MaskStrength::Auto => 0,
            MaskStrength::Weakest => 1,
            MaskStrength::Medium => 2,
            MaskStrength::Strongest => 3,
        }
    }

    pub fn from_value(value: usize) -> Option<Self> {
        match value {
            0 => Some(MaskStrength::Auto),
            1 => Some(MaskStrength::Weakest),
            2 => Some(MaskStrength::Medium),
            3 => Some(MaskStrength::Strongest),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MaskStrength::Auto => "Best",
            MaskStrength::Weakest => "Weakest",
            MaskStrength::Medium => "Medium",
            MaskStrength::Strongest => "Strongest",
        }
    }

    /// Index of the chosen candidate given their confidence scores.
    ///
    /// `Auto` takes the highest score (first on ties). A fixed level `n`
    /// counts from the end of the list: `scores.len() - n`.
    pub fn select_index(self, scores: &[f32]) -> Option<usize> {
        match self {
            MaskStrength::Auto => scores
                .iter()
                .enumerate()
                .fold(None, |best: Option<(usize, f32)>, (i, &s)| match best {
                    Some((_, b)) if b >= s => best,
                    _ => Some((i, s)),
                })
                .map(|(i, _)| i),
            level => scores.len().checked_sub(level.value()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_levels_index_from_end() {
        let scores = [0.9, 0.8, 0.7, 0.6];
        assert_eq!(MaskStrength::Weakest.select_index(&scores), Some(3));
        assert_eq!(MaskStrength::Medium.select_index(&scores), Some(2));
        assert_eq!(MaskStrength::Strongest.select_index(&scores), Some(1));
    }

    #[test]
    fn test_auto_ignores_position() {
        assert_eq!(MaskStrength::Auto.select_index(&[0.2, 0.95, 0.5]), Some(1));
        assert_eq!(MaskStrength::Auto.select_index(&[0.5, 0.5]), Some(0));
        assert_eq!(MaskStrength::Auto.select_index(&[]), None);
    }

    #[test]
    fn test_level_beyond_candidates() {
        assert_eq!(MaskStrength::Strongest.select_index(&[0.1, 0.2]), None);
        assert_eq!(MaskStrength::Medium.select_index(&[0.1, 0.2]), Some(0));
    }

    #[test]
    fn test_value_round_trip() {
        for strength in MaskStrength::all() {
            assert_eq!(MaskStrength::from_value(strength.value()), Some(*strength));
        }
        assert_eq!(MaskStrength::from_value(4), None);
    }
}
