use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::duel::record::{Duel, DuelStatus, PlayerSide};

/// Raw `duels` row; converted into [`Duel`] for the engine.
#[derive(Debug, FromRow)]
pub struct DuelRow {
    pub id: Uuid,
    pub sport: String,
    pub status: String,
    pub player1_id: Uuid,
    pub player2_id: Uuid,
    pub question_count: i32,
    pub current_round: i32,
    pub question_history: Vec<i32>,
    pub round_start_time: Option<DateTime<Utc>>,
    pub player1_answer: Option<String>,
    pub player1_answer_time_ms: Option<i64>,
    pub player1_score: i32,
    pub player1_total_time_ms: i64,
    pub player2_answer: Option<String>,
    pub player2_answer_time_ms: Option<i64>,
    pub player2_score: i32,
    pub player2_total_time_ms: i64,
    pub winner_id: Option<Uuid>,
}

impl TryFrom<DuelRow> for Duel {
    type Error = anyhow::Error;

    fn try_from(r: DuelRow) -> anyhow::Result<Duel> {
        Ok(Duel {
            id: r.id,
            sport: r.sport,
            status: DuelStatus::parse(&r.status)?,
            player1_id: r.player1_id,
            player2_id: r.player2_id,
            question_count: r.question_count.max(1) as u32,
            current_round: r.current_round.max(1) as u32,
            question_history: r.question_history,
            round_start_time: r.round_start_time,
            player1: PlayerSide {
                answer: r.player1_answer,
                answer_time_ms: r.player1_answer_time_ms,
                score: r.player1_score.max(0) as u32,
                total_time_ms: r.player1_total_time_ms,
            },
            player2: PlayerSide {
                answer: r.player2_answer,
                answer_time_ms: r.player2_answer_time_ms,
                score: r.player2_score.max(0) as u32,
                total_time_ms: r.player2_total_time_ms,
            },
            winner_id: r.winner_id,
        })
    }
}
