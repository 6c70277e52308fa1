use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::models::DuelRow,
    duel::record::{Duel, DuelStatus},
};

/// Insert a fresh duel row (status `waiting`, round 1's question already
/// seeded into the history).
pub async fn create_duel(db: &PgPool, duel: &Duel) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO duels
            (id, sport, status, player1_id, player2_id,
             question_count, current_round, question_history)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(duel.id)
    .bind(&duel.sport)
    .bind(duel.status.as_str())
    .bind(duel.player1_id)
    .bind(duel.player2_id)
    .bind(duel.question_count as i32)
    .bind(duel.current_round as i32)
    .bind(&duel.question_history)
    .execute(db)
    .await
    .context("inserting duel")?;
    Ok(())
}

pub async fn fetch_duel(db: &PgPool, duel_id: Uuid) -> anyhow::Result<Option<Duel>> {
    let row: Option<DuelRow> = sqlx::query_as(
        r#"
        SELECT id, sport, status, player1_id, player2_id,
               question_count, current_round, question_history,
               round_start_time,
               player1_answer, player1_answer_time_ms,
               player1_score, player1_total_time_ms,
               player2_answer, player2_answer_time_ms,
               player2_score, player2_total_time_ms,
               winner_id
          FROM duels
         WHERE id = $1
        "#,
    )
    .bind(duel_id)
    .fetch_optional(db)
    .await
    .context("fetching duel")?;

    row.map(Duel::try_from).transpose()
}

/// Write-through of everything the session mutates mid-duel. Completed
/// rows are left alone; [`finish`] owns that transition.
pub async fn save_progress(db: &PgPool, duel: &Duel) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE duels
           SET status = $2,
               current_round = $3,
               question_history = $4,
               round_start_time = $5,
               player1_answer = $6,
               player1_answer_time_ms = $7,
               player1_score = $8,
               player1_total_time_ms = $9,
               player2_answer = $10,
               player2_answer_time_ms = $11,
               player2_score = $12,
               player2_total_time_ms = $13,
               updated_at = now()
         WHERE id = $1
           AND status <> 'completed'
        "#,
    )
    .bind(duel.id)
    .bind(duel.status.as_str())
    .bind(duel.current_round as i32)
    .bind(&duel.question_history)
    .bind(duel.round_start_time)
    .bind(&duel.player1.answer)
    .bind(duel.player1.answer_time_ms)
    .bind(duel.player1.score as i32)
    .bind(duel.player1.total_time_ms)
    .bind(&duel.player2.answer)
    .bind(duel.player2.answer_time_ms)
    .bind(duel.player2.score as i32)
    .bind(duel.player2.total_time_ms)
    .execute(db)
    .await
    .context("saving duel progress")?;
    Ok(())
}

/// Terminal write: final tallies + winner + `completed`, guarded so a
/// repeat call is a no-op and never changes `winner_id`. Returns whether
/// this call performed the transition.
pub async fn finish(db: &PgPool, duel: &Duel, winner_id: Option<Uuid>) -> anyhow::Result<bool> {
    let res = sqlx::query(
        r#"
        UPDATE duels
           SET status = $2,
               winner_id = $3,
               round_start_time = NULL,
               player1_score = $4,
               player1_total_time_ms = $5,
               player2_score = $6,
               player2_total_time_ms = $7,
               updated_at = now()
         WHERE id = $1
           AND status <> 'completed'
        "#,
    )
    .bind(duel.id)
    .bind(DuelStatus::Completed.as_str())
    .bind(winner_id)
    .bind(duel.player1.score as i32)
    .bind(duel.player1.total_time_ms)
    .bind(duel.player2.score as i32)
    .bind(duel.player2.total_time_ms)
    .execute(db)
    .await
    .context("finishing duel")?;

    Ok(res.rows_affected() > 0)
}
