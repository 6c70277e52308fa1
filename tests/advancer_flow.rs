//! Round settlement, clock derivation, phase derivation and question
//! picking — the pieces the session task wires together.

use chrono::{Duration as ChronoDuration, Utc};
use quizclash_server::duel::{
    advancer::{apply_next_question, final_winner_id, resolve_round},
    clock,
    outcome::Outcome,
    record::{Duel, PlayerSlot},
    session::round_start_message,
    state::{phase_of, DuelPhase},
};
use quizclash_server::protocol::ServerMsg;
use quizclash_server::questions::{self, QuestionDef};
use uuid::Uuid;

const ROUND_MS: i64 = 15_000;

fn duel_of(question_count: u32) -> Duel {
    Duel::new(
        Uuid::new_v4(),
        "basketball",
        Uuid::new_v4(),
        Uuid::new_v4(),
        question_count,
        1,
    )
}

fn play_round(duel: &mut Duel, a1: &str, t1: i64, a2: &str, t2: i64, correct: &str) {
    duel.begin_round(Utc::now());
    duel.write_answer(PlayerSlot::Player1, a1.into(), t1, ROUND_MS);
    duel.write_answer(PlayerSlot::Player2, a2.into(), t2, ROUND_MS);
    let settlement = resolve_round(duel, correct).expect("both answered");
    duel.fold_round(&settlement);
}

#[test]
fn settlement_needs_both_answers() {
    let mut duel = duel_of(1);
    duel.begin_round(Utc::now());
    duel.write_answer(PlayerSlot::Player1, "A".into(), 100, ROUND_MS);
    assert!(resolve_round(&duel, "A").is_none());
}

#[test]
fn settlement_carries_correctness_and_times() {
    let mut duel = duel_of(2);
    duel.begin_round(Utc::now());
    duel.write_answer(PlayerSlot::Player1, "A".into(), 4000, ROUND_MS);
    duel.write_answer(PlayerSlot::Player2, "".into(), ROUND_MS, ROUND_MS);

    let s = resolve_round(&duel, "A").unwrap();
    assert_eq!(s.round, 1);
    assert!(s.player1.correct);
    assert!(!s.player2.correct);
    assert_eq!(s.player1.time_ms, 4000);
    // A timed-out player is charged the full round.
    assert_eq!(s.player2.time_ms, ROUND_MS);
    assert_eq!(
        s.outcome,
        Outcome::Win {
            slot: PlayerSlot::Player1
        }
    );
}

#[test]
fn three_round_duel_is_decided_on_score() {
    // Player1 correct in rounds 1 and 2, wrong in round 3; player2 correct
    // only in round 2 and faster throughout. Score 2-1 → player1.
    let mut duel = duel_of(3);

    play_round(&mut duel, "A", 5000, "x", 1000, "A");
    duel.advance(2);
    play_round(&mut duel, "B", 6000, "B", 1500, "B");
    duel.advance(3);
    play_round(&mut duel, "x", 7000, "y", 1200, "C");

    assert_eq!(duel.player1.score, 2);
    assert_eq!(duel.player2.score, 1);
    assert_eq!(final_winner_id(&duel), Some(duel.player1_id));
}

#[test]
fn tied_scores_are_broken_by_total_time() {
    let mut duel = duel_of(2);

    play_round(&mut duel, "A", 4000, "x", 4200, "A"); // p1 takes round 1
    duel.advance(2);
    play_round(&mut duel, "y", 5000, "B", 4500, "B"); // p2 takes round 2

    assert_eq!(duel.player1.score, duel.player2.score);
    assert_eq!(duel.player1.total_time_ms, 9000);
    assert_eq!(duel.player2.total_time_ms, 8700);
    assert_eq!(final_winner_id(&duel), Some(duel.player2_id));
}

#[test]
fn dead_even_duel_has_no_winner() {
    let mut duel = duel_of(1);
    play_round(&mut duel, "A", 3000, "A", 3000, "A");
    assert_eq!(final_winner_id(&duel), None);
}

#[test]
fn remaining_time_counts_down_and_floors_at_zero() {
    let start = Utc::now();
    assert_eq!(clock::remaining_ms(start, start, ROUND_MS), ROUND_MS);

    let later = start + ChronoDuration::milliseconds(6_000);
    assert_eq!(clock::remaining_ms(start, later, ROUND_MS), 9_000);

    let past_buzzer = start + ChronoDuration::milliseconds(ROUND_MS + 500);
    assert_eq!(clock::remaining_ms(start, past_buzzer, ROUND_MS), 0);
    assert_eq!(clock::elapsed_ms(start, later), 6_000);
}

#[test]
fn phase_follows_the_record() {
    let mut duel = duel_of(2);
    assert_eq!(phase_of(&duel), DuelPhase::Waiting);

    duel.begin_round(Utc::now());
    assert_eq!(phase_of(&duel), DuelPhase::Playing);

    duel.write_answer(PlayerSlot::Player1, "A".into(), 100, ROUND_MS);
    assert_eq!(phase_of(&duel), DuelPhase::Playing);
    duel.write_answer(PlayerSlot::Player2, "B".into(), 200, ROUND_MS);
    assert_eq!(phase_of(&duel), DuelPhase::RoundResult);

    duel.advance(2);
    assert_eq!(phase_of(&duel), DuelPhase::Waiting);

    duel.complete(None);
    assert_eq!(phase_of(&duel), DuelPhase::Results);
}

#[test]
fn phase_transitions_are_forward_only() {
    assert!(DuelPhase::Waiting.can_transition(DuelPhase::Playing));
    assert!(DuelPhase::Playing.can_transition(DuelPhase::RoundResult));
    assert!(DuelPhase::RoundResult.can_transition(DuelPhase::Waiting));
    assert!(DuelPhase::Playing.can_transition(DuelPhase::Results));
    assert!(!DuelPhase::Results.can_transition(DuelPhase::Waiting));
    assert!(!DuelPhase::Playing.can_transition(DuelPhase::Waiting));
    assert!(!DuelPhase::RoundResult.can_transition(DuelPhase::Playing));
}

fn seed_question(sport: &str, id: i32) {
    questions::QUESTIONS.insert(
        (sport.to_owned(), id),
        QuestionDef {
            id,
            sport: sport.to_owned(),
            text: format!("question {id}"),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_answer: "A".into(),
            difficulty: 1,
        },
    );
}

#[test]
fn unused_questions_are_preferred() {
    // Sport names are unique per test: the cache is process-global.
    for id in 1..=3 {
        seed_question("hockey", id);
    }

    let picked = questions::pick_unused_question_id("hockey", &[1, 3]).unwrap();
    assert_eq!(picked, 2);
}

#[test]
fn exhausted_pool_falls_back_to_any_question() {
    for id in 1..=2 {
        seed_question("curling", id);
    }

    let picked = questions::pick_unused_question_id("curling", &[1, 2]).unwrap();
    assert!((1..=2).contains(&picked));
}

#[test]
fn empty_pool_yields_nothing() {
    assert!(questions::pick_unused_question_id("cricket", &[]).is_none());
}

#[test]
fn duel_longer_than_the_bank_reuses_a_question() {
    // One question in the bank, three rounds to play: the picker hands
    // the used id back and the advance accepts it rather than stalling.
    seed_question("darts", 1);
    let mut duel = Duel::new(
        Uuid::new_v4(),
        "darts",
        Uuid::new_v4(),
        Uuid::new_v4(),
        3,
        1,
    );
    play_round(&mut duel, "A", 1000, "B", 2000, "A");

    let qid = questions::pick_unused_question_id("darts", &duel.question_history).unwrap();
    assert_eq!(qid, 1, "bank is exhausted, so the used id comes back");
    assert!(apply_next_question(&mut duel, qid));
    assert_eq!(duel.current_round, 2);
    assert_eq!(duel.question_history, vec![1, 1]);

    play_round(&mut duel, "A", 1000, "B", 2000, "A");
    assert!(apply_next_question(&mut duel, 1));
    assert_eq!(duel.current_round, 3);
}

#[test]
fn advanced_state_cannot_settle_the_same_round_twice() {
    // What the session persists between rounds is the already-advanced
    // record: answers cleared, clock not yet running. A session restored
    // from it has nothing left to fold for the previous round.
    let mut duel = duel_of(3);
    play_round(&mut duel, "A", 4000, "x", 5000, "A");
    assert_eq!(duel.player1.score, 1);

    assert!(apply_next_question(&mut duel, 2));
    assert_eq!(phase_of(&duel), DuelPhase::Waiting);
    assert!(
        resolve_round(&duel, "A").is_none(),
        "cleared answers leave nothing to settle"
    );
    assert_eq!(duel.player1.score, 1);
    assert_eq!(duel.player1.total_time_ms, 4000);
    assert_eq!(duel.player2.total_time_ms, 5000);
}

#[test]
fn mid_round_catch_up_replays_the_question() {
    seed_question("rugby", 5);
    let mut duel = Duel::new(
        Uuid::new_v4(),
        "rugby",
        Uuid::new_v4(),
        Uuid::new_v4(),
        1,
        5,
    );
    duel.begin_round(Utc::now());
    assert_eq!(phase_of(&duel), DuelPhase::Playing);

    let msg = round_start_message(&duel).expect("question is cached");
    match msg {
        ServerMsg::RoundStart {
            duel_id,
            round,
            question,
        } => {
            assert_eq!(duel_id, duel.id);
            assert_eq!(round, 1);
            assert_eq!(question.id, 5);
        }
        other => panic!("expected RoundStart, got {other:?}"),
    }
}

#[test]
fn question_view_withholds_the_correct_answer() {
    seed_question("tennis", 7);
    let q = questions::get_question("tennis", 7).unwrap();
    let view = q.view();
    assert_eq!(view.id, 7);
    assert!(view.options.contains(&q.correct_answer));
    let json = serde_json::to_string(&view).unwrap();
    assert!(!json.contains("correct_answer"));
}
