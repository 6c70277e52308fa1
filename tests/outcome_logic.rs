//! Deterministic winner decisions: per-round and whole-duel.

use quizclash_server::duel::outcome::{final_winner, round_winner, Outcome, TieReason};
use quizclash_server::duel::record::PlayerSlot;

#[test]
fn faster_correct_answer_wins_single_question() {
    // Both name the right team; the quicker buzz takes it.
    let decided = round_winner(
        "Boston Celtics",
        4200,
        "Boston Celtics",
        3100,
        "Boston Celtics",
    );
    assert_eq!(
        decided,
        Outcome::Win {
            slot: PlayerSlot::Player2
        }
    );
}

#[test]
fn both_timing_out_is_a_tie() {
    let decided = round_winner("", 15_000, "", 15_000, "Boston Celtics");
    assert_eq!(
        decided,
        Outcome::Tie {
            reason: TieReason::BothTimedOut
        }
    );
}

#[test]
fn neither_correct_is_a_tie() {
    let decided = round_winner("Lakers", 2000, "Knicks", 2500, "Boston Celtics");
    assert_eq!(
        decided,
        Outcome::Tie {
            reason: TieReason::NeitherCorrect
        }
    );
}

#[test]
fn lone_correct_answer_wins_regardless_of_speed() {
    let decided = round_winner("Boston Celtics", 14_000, "Knicks", 900, "Boston Celtics");
    assert_eq!(
        decided,
        Outcome::Win {
            slot: PlayerSlot::Player1
        }
    );
}

#[test]
fn equal_correct_times_tie() {
    let decided = round_winner("A", 5000, "A", 5000, "A");
    assert_eq!(
        decided,
        Outcome::Tie {
            reason: TieReason::EqualTimes
        }
    );
}

#[test]
fn empty_never_matches_an_answer() {
    // One player timed out, the other answered wrong: neither-correct tie,
    // not a both-timed-out tie.
    let decided = round_winner("", 15_000, "Knicks", 4000, "Boston Celtics");
    assert_eq!(
        decided,
        Outcome::Tie {
            reason: TieReason::NeitherCorrect
        }
    );
}

#[test]
fn timed_out_answer_is_never_credited_as_correct() {
    // A blank reference answer must not string-match a blank (timed out)
    // submission into a win.
    let decided = round_winner("", 15_000, "Knicks", 4_000, "");
    assert_eq!(
        decided,
        Outcome::Tie {
            reason: TieReason::NeitherCorrect
        }
    );
}

#[test]
fn round_winner_is_deterministic() {
    let a = round_winner("x", 100, "y", 200, "x");
    let b = round_winner("x", 100, "y", 200, "x");
    assert_eq!(a, b);
}

#[test]
fn equal_scores_fall_back_to_total_time() {
    // 1-1 after two rounds; player2's 8700 ms beats player1's 9000 ms.
    let decided = final_winner(1, 4000 + 5000, 1, 4200 + 4500);
    assert_eq!(
        decided,
        Outcome::Win {
            slot: PlayerSlot::Player2
        }
    );
}

#[test]
fn higher_score_wins_regardless_of_timing() {
    // 3-round duel, 2 correct vs 1; player2 was much faster overall.
    let decided = final_winner(2, 40_000, 1, 9_000);
    assert_eq!(
        decided,
        Outcome::Win {
            slot: PlayerSlot::Player1
        }
    );
}

#[test]
fn equal_score_and_time_is_a_tie() {
    let decided = final_winner(1, 8000, 1, 8000);
    assert_eq!(
        decided,
        Outcome::Tie {
            reason: TieReason::EqualScoreAndTime
        }
    );
}
