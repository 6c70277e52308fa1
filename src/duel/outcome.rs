//! Pure winner decisions. Both functions are deterministic over a duel
//! snapshot, so any holder of the same snapshot computes the same result.

use serde::{Deserialize, Serialize};

use crate::duel::record::PlayerSlot;

/// Why a round (or duel) ended without a winner.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TieReason {
    BothTimedOut,
    NeitherCorrect,
    EqualTimes,
    EqualScoreAndTime,
}

/// Outcome of a single round or of the whole duel.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Win { slot: PlayerSlot },
    Tie { reason: TieReason },
}

impl Outcome {
    pub fn winner(self) -> Option<PlayerSlot> {
        match self {
            Outcome::Win { slot } => Some(slot),
            Outcome::Tie { .. } => None,
        }
    }
}

/// Per-round winner. An empty answer means the player timed out.
///
/// Rules, in order: both empty → tie; neither correct → tie; exactly one
/// correct → that player; both correct → smaller answer time, equal → tie.
pub fn round_winner(
    p1_answer: &str,
    p1_time_ms: i64,
    p2_answer: &str,
    p2_time_ms: i64,
    correct_answer: &str,
) -> Outcome {
    if p1_answer.is_empty() && p2_answer.is_empty() {
        return Outcome::Tie {
            reason: TieReason::BothTimedOut,
        };
    }
    // A blank answer is a timeout: never correct, whatever the reference.
    let p1_correct = !p1_answer.is_empty() && p1_answer == correct_answer;
    let p2_correct = !p2_answer.is_empty() && p2_answer == correct_answer;
    match (p1_correct, p2_correct) {
        (false, false) => Outcome::Tie {
            reason: TieReason::NeitherCorrect,
        },
        (true, false) => Outcome::Win {
            slot: PlayerSlot::Player1,
        },
        (false, true) => Outcome::Win {
            slot: PlayerSlot::Player2,
        },
        (true, true) => {
            if p1_time_ms < p2_time_ms {
                Outcome::Win {
                    slot: PlayerSlot::Player1,
                }
            } else if p2_time_ms < p1_time_ms {
                Outcome::Win {
                    slot: PlayerSlot::Player2,
                }
            } else {
                Outcome::Tie {
                    reason: TieReason::EqualTimes,
                }
            }
        }
    }
}

/// Multi-round final winner from the cumulative tallies: higher score
/// wins, equal scores fall back to lower total time, both equal → tie.
pub fn final_winner(
    p1_score: u32,
    p1_total_time_ms: i64,
    p2_score: u32,
    p2_total_time_ms: i64,
) -> Outcome {
    if p1_score != p2_score {
        let slot = if p1_score > p2_score {
            PlayerSlot::Player1
        } else {
            PlayerSlot::Player2
        };
        return Outcome::Win { slot };
    }
    if p1_total_time_ms != p2_total_time_ms {
        let slot = if p1_total_time_ms < p2_total_time_ms {
            PlayerSlot::Player1
        } else {
            PlayerSlot::Player2
        };
        return Outcome::Win { slot };
    }
    Outcome::Tie {
        reason: TieReason::EqualScoreAndTime,
    }
}
