//! Elo rating maths.
//!
//! Pure, storage-free. The tuning lives in an [`EloConfig`] held by each
//! [`EloCalculator`], so differently tuned calculators can coexist.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

const LOSS_SCORE: f64 = 0.0;
const DRAW_SCORE: f64 = 0.5;
const WIN_SCORE: f64 = 1.0;

/// Expected scores stay strictly inside (0, 1) even for huge rating gaps.
const MIN_EXPECTED: f64 = f64::EPSILON;
const MAX_EXPECTED: f64 = 1.0 - f64::EPSILON;

/// Outcome of a match from the point of view of its two participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Draw,
    Player1,
    Player2,
}

impl Winner {
    /// Actual score of player 1 (1.0, 0.5 or 0.0).
    pub fn player1_score(self) -> f64 {
        match self {
            Winner::Player1 => WIN_SCORE,
            Winner::Draw => DRAW_SCORE,
            Winner::Player2 => LOSS_SCORE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EloConfig {
    /// Largest rating shift a single match can cause.
    pub k: i32,
    /// Rating gap at which the stronger player is expected to score ten times more.
    pub spread: f64,
    /// Rating given to freshly created accounts.
    pub default_rating: i32,
}

impl EloConfig {
    pub fn new(k: i32, spread: f64, default_rating: i32) -> Result<Self, AppError> {
        if k < 0 {
            return Err(AppError::Config(format!("ELO_K must not be negative, got {k}")));
        }
        if !spread.is_finite() || spread <= 0.0 {
            return Err(AppError::Config(format!(
                "ELO_SPREAD must be a positive number, got {spread}"
            )));
        }
        Ok(Self {
            k,
            spread,
            default_rating,
        })
    }
}

impl Default for EloConfig {
    fn default() -> Self {
        Self {
            k: 32,
            spread: 400.0,
            default_rating: 1200,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EloCalculator {
    config: EloConfig,
}

impl EloCalculator {
    pub fn new(config: EloConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EloConfig {
        &self.config
    }

    /// Probability that a player rated `rating_a` beats one rated `rating_b`.
    pub fn expected_score(&self, rating_a: i32, rating_b: i32) -> f64 {
        let diff = f64::from(rating_b) - f64::from(rating_a);
        (1.0 / (1.0 + 10f64.powf(diff / self.config.spread))).clamp(MIN_EXPECTED, MAX_EXPECTED)
    }

    /// New ratings for both players. Player 2 loses exactly what player 1 gains.
    pub fn apply_outcome(&self, rating1: i32, rating2: i32, winner: Winner) -> (i32, i32) {
        let expected1 = self.expected_score(rating1, rating2);
        // f64::round rounds half away from zero; the cast saturates.
        let delta = (f64::from(self.config.k) * (winner.player1_score() - expected1)).round() as i64;

        let (r1, r2) = (i64::from(rating1), i64::from(rating2));
        let min = i64::from(i32::MIN);
        let max = i64::from(i32::MAX);

        // Keep both results in range without breaking the zero-sum property.
        let delta = delta.clamp((min - r1).max(r2 - max), (max - r1).min(r2 - min));

        ((r1 + delta) as i32, (r2 - delta) as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculator() -> EloCalculator {
        EloCalculator::default()
    }

    #[test]
    fn new_ratings_match_reference_table() {
        let cases = [
            (2000, 2000, Winner::Player1, 2016, 1984),
            (2000, 2000, Winner::Player2, 1984, 2016),
            (2000, 2000, Winner::Draw, 2000, 2000),
            (2000, 2400, Winner::Player1, 2029, 2371),
            (2000, 2400, Winner::Player2, 1997, 2403),
            (2000, 2400, Winner::Draw, 2013, 2387),
            (2400, 2000, Winner::Draw, 2387, 2013),
        ];

        for (r1, r2, winner, want1, want2) in cases {
            assert_eq!(
                calculator().apply_outcome(r1, r2, winner),
                (want1, want2),
                "{r1} vs {r2}, {winner:?}"
            );
        }
    }

    #[test]
    fn win_chance_matches_reference_values() {
        let calc = calculator();
        assert!((calc.expected_score(2000, 2000) - 0.5).abs() < 1e-12);
        assert!((calc.expected_score(2000, 2800) - 1.0 / 101.0).abs() < 1e-12);
        assert!((calc.expected_score(2800, 2000) - 100.0 / 101.0).abs() < 1e-12);
    }

    #[test]
    fn expected_scores_are_complementary() {
        let calc = calculator();
        for (a, b) in [(1200, 1200), (1500, 900), (-40, 3100), (2750, 2749)] {
            let sum = calc.expected_score(a, b) + calc.expected_score(b, a);
            assert!((sum - 1.0).abs() < 1e-12, "{a} vs {b}: {sum}");
        }
    }

    #[test]
    fn huge_gaps_never_reach_certainty() {
        let calc = calculator();
        let underdog = calc.expected_score(i32::MIN, i32::MAX);
        let favourite = calc.expected_score(i32::MAX, i32::MIN);

        assert!(underdog > 0.0 && underdog < 1.0, "{underdog}");
        assert!(favourite > 0.0 && favourite < 1.0, "{favourite}");
        assert!((underdog + favourite - 1.0).abs() < 1e-12);
    }

    #[test]
    fn updates_are_zero_sum() {
        let calc = calculator();
        for winner in [Winner::Player1, Winner::Draw, Winner::Player2] {
            for (r1, r2) in [(1200, 1350), (3000, 100), (-20, 15)] {
                let (n1, n2) = calc.apply_outcome(r1, r2, winner);
                assert_eq!(n1 - r1, -(n2 - r2));
            }
        }
    }

    #[test]
    fn tuning_is_per_calculator() {
        let steep = EloCalculator::new(EloConfig::new(64, 400.0, 1200).unwrap());
        assert_eq!(steep.apply_outcome(2000, 2000, Winner::Player1), (2032, 1968));
        assert_eq!(calculator().apply_outcome(2000, 2000, Winner::Player1), (2016, 1984));
    }

    #[test]
    fn extreme_ratings_saturate_instead_of_wrapping() {
        let calc = calculator();
        let (n1, n2) = calc.apply_outcome(i32::MAX - 3, i32::MAX - 3, Winner::Player1);
        assert_eq!(n1, i32::MAX);
        assert_eq!(n1 - (i32::MAX - 3), -(n2 - (i32::MAX - 3)));

        let (n1, n2) = calc.apply_outcome(i32::MIN + 2, i32::MIN + 2, Winner::Player2);
        assert_eq!(n1, i32::MIN);
        assert_eq!(n2, i32::MIN + 4);
    }

    #[test]
    fn invalid_spread_is_rejected() {
        assert!(EloConfig::new(32, 0.0, 1200).is_err());
        assert!(EloConfig::new(32, f64::NAN, 1200).is_err());
        assert!(EloConfig::new(-1, 400.0, 1200).is_err());
    }
}
