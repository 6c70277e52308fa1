//! In-memory warm cache over the `questions` table.
//!
//! Loaded once at start-up so round advancement never waits on Postgres.
//! Also the place where "pick a question this duel hasn't seen" lives.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use rand::seq::IndexedRandom;
use sqlx::PgPool;

use crate::protocol::QuestionView;

/// One immutable row from the `questions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuestionDef {
    pub id: i32,
    pub sport: String,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub difficulty: i32,
}

impl QuestionDef {
    /// Client-facing view; strips the correct answer.
    pub fn view(&self) -> QuestionView {
        QuestionView {
            id: self.id,
            text: self.text.clone(),
            options: self.options.clone(),
            difficulty: self.difficulty,
        }
    }
}

/// Global map (sport, id) → QuestionDef (read-only once warmed).
pub static QUESTIONS: Lazy<DashMap<(String, i32), QuestionDef>> = Lazy::new(DashMap::new);

/// Fetch the `questions` table and populate [`QUESTIONS`]. Idempotent.
pub async fn warm_questions(db: &PgPool) -> anyhow::Result<()> {
    let rows: Vec<QuestionDef> = sqlx::query_as(
        "SELECT id, sport, text, options, correct_answer, difficulty FROM questions",
    )
    .fetch_all(db)
    .await?;

    for q in rows {
        QUESTIONS.insert((q.sport.clone(), q.id), q);
    }
    Ok(())
}

/// Retrieve a cached question for a sport by id.
pub fn get_question(sport: &str, id: i32) -> Option<QuestionDef> {
    QUESTIONS
        .get(&(sport.to_owned(), id))
        .map(|e| e.value().clone())
}

/// Pick a question id for `sport` uniformly at random among ids not in
/// `exclude`. When every id has been used already, fall back to any id so
/// a long duel can still continue.
pub fn pick_unused_question_id(sport: &str, exclude: &[i32]) -> Option<i32> {
    let all: Vec<i32> = QUESTIONS
        .iter()
        .filter(|e| e.key().0 == sport)
        .map(|e| e.key().1)
        .collect();

    let unused: Vec<i32> = all
        .iter()
        .copied()
        .filter(|id| !exclude.contains(id))
        .collect();

    let pool = if unused.is_empty() { &all } else { &unused };
    pool.choose(&mut rand::rng()).copied()
}

/// Warm every in-memory cache we have (called once at startup).
pub async fn warm_all(db: &PgPool) {
    if let Err(e) = warm_questions(db).await {
        log::warn!("question cache warm-up failed: {e:?}");
    }
}
