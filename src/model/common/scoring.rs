use serde::{Deserialize, Serialize};

/// Largest value each individual score input may take.
pub const MAX_INPUT: u32 = 2;

/// Largest possible priority score: `(2+2+2)*2 + 2`.
pub const MAX_SCORE: u32 = 14;

/// The four moderator-set inputs behind an opinion's priority score,
/// each on a 0–2 scale. `supporter_points` is a moderator judgement, not
/// the raw upvote count.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub importance: u32,
    pub urgency: u32,
    pub expected_impact: u32,
    pub supporter_points: u32,
}

impl Scores {
    /// Clamp every input into the valid 0–2 range.
    pub fn clamped(self) -> Self {
        Self {
            importance: self.importance.min(MAX_INPUT),
            urgency: self.urgency.min(MAX_INPUT),
            expected_impact: self.expected_impact.min(MAX_INPUT),
            supporter_points: self.supporter_points.min(MAX_INPUT),
        }
    }

    /// The derived priority score, always in 0–14.
    ///
    /// Pure and side-effect free: the stored score of any opinion must equal
    /// this function applied to its stored inputs.
    pub fn priority(self) -> u32 {
        let s = self.clamped();
        (s.importance + s.urgency + s.expected_impact) * 2 + s.supporter_points
    }
}

/// Map a priority score onto the 1–5 star tier.
pub fn tier(score: u32) -> u8 {
    match score {
        s if s >= 12 => 5,
        s if s >= 9 => 4,
        s if s >= 6 => 3,
        s if s >= 3 => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_is_bounded_for_all_valid_inputs() {
        for importance in 0..=MAX_INPUT {
            for urgency in 0..=MAX_INPUT {
                for expected_impact in 0..=MAX_INPUT {
                    for supporter_points in 0..=MAX_INPUT {
                        let score = Scores {
                            importance,
                            urgency,
                            expected_impact,
                            supporter_points,
                        }
                        .priority();
                        assert!(score <= MAX_SCORE);
                        assert!((1..=5).contains(&tier(score)));
                    }
                }
            }
        }
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        let scores = Scores {
            importance: 100,
            urgency: 3,
            expected_impact: 2,
            supporter_points: 99,
        };
        assert_eq!(scores.priority(), MAX_SCORE);
    }

    #[test]
    fn worked_example() {
        // (2+1+1)*2 + 0 = 8, tier 3.
        let scores = Scores {
            importance: 2,
            urgency: 1,
            expected_impact: 1,
            supporter_points: 0,
        };
        assert_eq!(scores.priority(), 8);
        assert_eq!(tier(8), 3);
    }

    #[test]
    fn supporter_points_add_exactly_their_value() {
        let base = Scores {
            importance: 2,
            urgency: 1,
            expected_impact: 1,
            supporter_points: 0,
        };
        let bumped = Scores {
            supporter_points: 2,
            ..base
        };
        assert_eq!(bumped.priority(), base.priority() + 2);
    }

    #[test]
    fn tier_is_monotonic_in_score() {
        let mut last = tier(0);
        for score in 0..=MAX_SCORE {
            let t = tier(score);
            assert!(t >= last);
            last = t;
        }
    }

    #[test]
    fn tier_boundaries() {
        assert_eq!(tier(0), 1);
        assert_eq!(tier(2), 1);
        assert_eq!(tier(3), 2);
        assert_eq!(tier(5), 2);
        assert_eq!(tier(6), 3);
        assert_eq!(tier(8), 3);
        assert_eq!(tier(9), 4);
        assert_eq!(tier(11), 4);
        assert_eq!(tier(12), 5);
        assert_eq!(tier(14), 5);
    }
}
