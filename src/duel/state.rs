//! Per-duel phase, derivable by anyone holding a snapshot: the server
//! session and both clients compute the same phase from the same record.

use serde::{Deserialize, Serialize};

use crate::duel::record::{Duel, DuelStatus};

/// waiting → playing → round_result → waiting … → results (terminal).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DuelPhase {
    Waiting,
    Playing,
    RoundResult,
    Results,
}

/// Derive the phase from a duel snapshot.
pub fn phase_of(duel: &Duel) -> DuelPhase {
    if duel.status == DuelStatus::Completed {
        return DuelPhase::Results;
    }
    match duel.round_start_time {
        Some(_) if duel.both_answered() => DuelPhase::RoundResult,
        Some(_) => DuelPhase::Playing,
        None => DuelPhase::Waiting,
    }
}

impl DuelPhase {
    /// Forward-only transition check within a round; `Results` is
    /// terminal and `Waiting` is re-entered once per advanced round.
    pub fn can_transition(self, next: DuelPhase) -> bool {
        use DuelPhase::*;
        match (self, next) {
            (Results, _) => false,
            (_, Results) => true,
            (Waiting, Playing) => true,
            (Playing, RoundResult) => true,
            (RoundResult, Waiting) => true,
            _ => false,
        }
    }
}
