//! The authoritative duel record and its field-scoped mutations.
//!
//! Shared fields (round, history, scores, status, winner) are only ever
//! mutated by the session task that owns the record; per-player answer
//! fields are written on behalf of exactly one player each.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::duel::advancer::RoundSettlement;

/// Which side of the duel a player occupies.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlayerSlot {
    Player1,
    Player2,
}

impl PlayerSlot {
    pub fn other(self) -> PlayerSlot {
        match self {
            PlayerSlot::Player1 => PlayerSlot::Player2,
            PlayerSlot::Player2 => PlayerSlot::Player1,
        }
    }
}

/// Duel life-cycle. Transitions are forward-only.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DuelStatus {
    Waiting,
    Active,
    Completed,
}

impl DuelStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DuelStatus::Waiting => "waiting",
            DuelStatus::Active => "active",
            DuelStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<DuelStatus> {
        match s {
            "waiting" => Ok(DuelStatus::Waiting),
            "active" => Ok(DuelStatus::Active),
            "completed" => Ok(DuelStatus::Completed),
            other => anyhow::bail!("unknown duel status {other:?}"),
        }
    }
}

/// One player's per-round answer fields plus cumulative tallies.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PlayerSide {
    /// `None` = not yet answered this round; `Some("")` = timed out.
    pub answer: Option<String>,
    /// Milliseconds since `round_start_time` at submission.
    pub answer_time_ms: Option<i64>,
    /// Cumulative correct-round count.
    pub score: u32,
    /// Cumulative elapsed milliseconds across resolved rounds.
    pub total_time_ms: i64,
}

/// One two-player trivia duel spanning one or more rounds.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Duel {
    pub id: Uuid,
    pub sport: String,
    pub status: DuelStatus,
    pub player1_id: Uuid,
    pub player2_id: Uuid,
    pub question_count: u32,
    /// 1-based, monotonically increasing, never exceeds `question_count`.
    pub current_round: u32,
    /// Question ids already used, one per round, no repeats. The last
    /// entry is the current round's question.
    pub question_history: Vec<i32>,
    /// Set when a round begins, cleared by the advance to the next round.
    pub round_start_time: Option<DateTime<Utc>>,
    pub player1: PlayerSide,
    pub player2: PlayerSide,
    /// Set exactly once at completion; `None` after completion = tie.
    pub winner_id: Option<Uuid>,
}

impl Duel {
    /// A fresh duel in `waiting`, round 1's question already chosen so the
    /// one-id-per-round invariant holds from the start.
    pub fn new(
        id: Uuid,
        sport: impl Into<String>,
        player1_id: Uuid,
        player2_id: Uuid,
        question_count: u32,
        first_question_id: i32,
    ) -> Duel {
        Duel {
            id,
            sport: sport.into(),
            status: DuelStatus::Waiting,
            player1_id,
            player2_id,
            question_count: question_count.max(1),
            current_round: 1,
            question_history: vec![first_question_id],
            round_start_time: None,
            player1: PlayerSide::default(),
            player2: PlayerSide::default(),
            winner_id: None,
        }
    }

    pub fn slot_of(&self, player_id: Uuid) -> Option<PlayerSlot> {
        if player_id == self.player1_id {
            Some(PlayerSlot::Player1)
        } else if player_id == self.player2_id {
            Some(PlayerSlot::Player2)
        } else {
            None
        }
    }

    pub fn player_id(&self, slot: PlayerSlot) -> Uuid {
        match slot {
            PlayerSlot::Player1 => self.player1_id,
            PlayerSlot::Player2 => self.player2_id,
        }
    }

    pub fn side(&self, slot: PlayerSlot) -> &PlayerSide {
        match slot {
            PlayerSlot::Player1 => &self.player1,
            PlayerSlot::Player2 => &self.player2,
        }
    }

    fn side_mut(&mut self, slot: PlayerSlot) -> &mut PlayerSide {
        match slot {
            PlayerSlot::Player1 => &mut self.player1,
            PlayerSlot::Player2 => &mut self.player2,
        }
    }

    /// The current round's question id (last entry of the history).
    pub fn current_question_id(&self) -> i32 {
        *self.question_history.last().unwrap_or(&0)
    }

    pub fn both_answered(&self) -> bool {
        self.player1.answer.is_some() && self.player2.answer.is_some()
    }

    pub fn is_final_round(&self) -> bool {
        self.current_round >= self.question_count
    }

    /// Start the current round: sets `round_start_time` and promotes a
    /// `waiting` duel to `active`. No-op on a completed duel or when the
    /// round is already running.
    pub fn begin_round(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == DuelStatus::Completed || self.round_start_time.is_some() {
            return false;
        }
        self.round_start_time = Some(now);
        if self.status == DuelStatus::Waiting {
            self.status = DuelStatus::Active;
        }
        true
    }

    /// Record one player's answer for the current round. Writes only that
    /// player's fields; first write wins — a repeat submission before the
    /// round advances is ignored. `elapsed_ms` is clamped into
    /// `[0, round_duration_ms]`.
    pub fn write_answer(
        &mut self,
        slot: PlayerSlot,
        answer: String,
        elapsed_ms: i64,
        round_duration_ms: i64,
    ) -> bool {
        if self.status != DuelStatus::Active || self.round_start_time.is_none() {
            return false;
        }
        let side = self.side_mut(slot);
        if side.answer.is_some() {
            return false;
        }
        side.answer = Some(answer);
        side.answer_time_ms = Some(elapsed_ms.clamp(0, round_duration_ms));
        true
    }

    /// Fold a resolved round's correctness and elapsed time into the
    /// cumulative tallies. Session-only caller.
    pub fn fold_round(&mut self, settlement: &RoundSettlement) {
        self.player1.score += u32::from(settlement.player1.correct);
        self.player2.score += u32::from(settlement.player2.correct);
        self.player1.total_time_ms += settlement.player1.time_ms;
        self.player2.total_time_ms += settlement.player2.time_ms;
    }

    /// Move to the next round: `current_round + 1`, append the next
    /// question id, clear both answer fields and `round_start_time`.
    /// Rejected past the final round or for an already-used question id.
    pub fn advance(&mut self, next_question_id: i32) -> bool {
        if self.question_history.contains(&next_question_id) {
            return false;
        }
        self.advance_unchecked(next_question_id)
    }

    /// Exhausted-bank fallback: advances onto a question id this duel has
    /// already seen. Reusing a question beats stalling a duel longer than
    /// the question bank.
    pub fn advance_reusing(&mut self, next_question_id: i32) -> bool {
        self.advance_unchecked(next_question_id)
    }

    fn advance_unchecked(&mut self, next_question_id: i32) -> bool {
        if self.status == DuelStatus::Completed || self.current_round >= self.question_count {
            return false;
        }
        self.current_round += 1;
        self.question_history.push(next_question_id);
        self.player1.answer = None;
        self.player1.answer_time_ms = None;
        self.player2.answer = None;
        self.player2.answer_time_ms = None;
        self.round_start_time = None;
        true
    }

    /// Terminal transition. Idempotent: the first call sets `winner_id`
    /// and `completed`; later calls change nothing.
    pub fn complete(&mut self, winner_id: Option<Uuid>) -> bool {
        if self.status == DuelStatus::Completed {
            return false;
        }
        self.status = DuelStatus::Completed;
        self.winner_id = winner_id;
        self.round_start_time = None;
        true
    }
}
