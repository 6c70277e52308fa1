//! Round settlement: turning a both-answered round into correctness,
//! tallies and an outcome, and picking the duel's final winner. Pure
//! functions; the session task is the only caller that acts on them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::duel::{
    outcome::{self, Outcome},
    record::{Duel, PlayerSlot},
};

/// One side's contribution to a resolved round.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct SideResult {
    pub correct: bool,
    /// Elapsed milliseconds to charge against the player's total. A timed
    /// out player already carries the full round duration here.
    pub time_ms: i64,
}

/// Everything the session needs to fold a round and tell the players.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RoundSettlement {
    pub round: u32,
    pub outcome: Outcome,
    pub player1: SideResult,
    pub player2: SideResult,
}

/// Resolve the current round against its correct answer. Returns `None`
/// until both answers are present.
pub fn resolve_round(duel: &Duel, correct_answer: &str) -> Option<RoundSettlement> {
    let p1_answer = duel.player1.answer.as_deref()?;
    let p2_answer = duel.player2.answer.as_deref()?;
    let p1_time = duel.player1.answer_time_ms.unwrap_or(0);
    let p2_time = duel.player2.answer_time_ms.unwrap_or(0);

    Some(RoundSettlement {
        round: duel.current_round,
        outcome: outcome::round_winner(p1_answer, p1_time, p2_answer, p2_time, correct_answer),
        player1: SideResult {
            correct: !p1_answer.is_empty() && p1_answer == correct_answer,
            time_ms: p1_time,
        },
        player2: SideResult {
            correct: !p2_answer.is_empty() && p2_answer == correct_answer,
            time_ms: p2_time,
        },
    })
}

/// Advance the duel onto `question_id`. A fresh id takes the strict
/// no-repeat path; an id the duel has already seen is accepted as the
/// exhausted-bank fallback (the picker only hands out a repeat once every
/// question has been used).
pub fn apply_next_question(duel: &mut Duel, question_id: i32) -> bool {
    if duel.question_history.contains(&question_id) {
        duel.advance_reusing(question_id)
    } else {
        duel.advance(question_id)
    }
}

/// Final winner id from the folded cumulative tallies; `None` = tie.
pub fn final_winner_id(duel: &Duel) -> Option<Uuid> {
    let decided = outcome::final_winner(
        duel.player1.score,
        duel.player1.total_time_ms,
        duel.player2.score,
        duel.player2.total_time_ms,
    );
    decided.winner().map(|slot| match slot {
        PlayerSlot::Player1 => duel.player1_id,
        PlayerSlot::Player2 => duel.player2_id,
    })
}
